//! Common utilities module
//!
//! This module contains shared utilities used across the color correction core.

pub mod error;

pub use error::{CorrectionError, ErrorKind, Result};
