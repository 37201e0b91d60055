//! Color-card based color correction for clinical photographs.
//!
//! Locates the reference circles of a physical color card, samples their
//! colors, solves a 3x3 linear transform and applies it to the full image.

pub mod color_correction;
pub mod logger;
