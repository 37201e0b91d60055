//! Linear color transform module
//!
//! Solves the 3x3 matrix mapping observed reference colors onto target
//! reference colors, and applies it to every pixel of an image.

mod applicator;
mod solver;
pub mod types;

pub use applicator::apply_transform;
pub use solver::solve_transform;
pub use types::ColorTransformMatrix;
