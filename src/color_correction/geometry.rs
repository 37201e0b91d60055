//! Inference of the third reference circle from the two detected ones.
//!
//! The red mark of the card is frequently confused with skin or anatomical
//! features by the detector, so its box is derived from the blue and green
//! boxes instead of being detected.

use tracing::debug;

use crate::color_correction::common::error::{CorrectionError, Result};
use crate::color_correction::detection::BoundingBox;

/// Policy deriving the box of a reference mark from two known marks.
///
/// The default [`ReflectionEstimator`] encodes the layout of one specific
/// color card. Cards with a different layout plug in their own policy.
pub trait ThirdCircleEstimator: Send + Sync {
    /// `known_a` is the mark opposite the estimated one, `known_b` the middle mark.
    fn estimate(&self, known_a: &BoundingBox, known_b: &BoundingBox) -> Result<BoundingBox>;
}

/// Assumes the three marks are colinear with the middle mark halfway
/// between the other two, and that apparent size scales geometrically
/// along the row.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReflectionEstimator;

impl ThirdCircleEstimator for ReflectionEstimator {
    fn estimate(&self, known_a: &BoundingBox, known_b: &BoundingBox) -> Result<BoundingBox> {
        estimate_third_circle(known_a, known_b)
    }
}

/// Reflects `known_a` through `known_b`.
///
/// Center: `2 * center_b - center_a`. Size per axis: `size_b^2 / size_a`.
pub fn estimate_third_circle(known_a: &BoundingBox, known_b: &BoundingBox) -> Result<BoundingBox> {
    for (name, bbox) in [("opposite", known_a), ("middle", known_b)] {
        if !bbox.is_finite() {
            return Err(CorrectionError::DegenerateGeometry(format!(
                "{} box is not finite: {:?}",
                name, bbox
            )));
        }
        if bbox.width <= 0.0 || bbox.height <= 0.0 {
            return Err(CorrectionError::DegenerateGeometry(format!(
                "{} box has non-positive size {}x{}",
                name, bbox.width, bbox.height
            )));
        }
    }

    let estimated = BoundingBox::new(
        2.0 * known_b.center_x - known_a.center_x,
        2.0 * known_b.center_y - known_a.center_y,
        known_b.width * known_b.width / known_a.width,
        known_b.height * known_b.height / known_a.height,
    );

    // Tiny opposite boxes can still overflow f32.
    if !estimated.is_finite() || estimated.width <= 0.0 || estimated.height <= 0.0 {
        return Err(CorrectionError::DegenerateGeometry(format!(
            "estimated box is degenerate: {:?}",
            estimated
        )));
    }

    debug!(
        cx = estimated.center_x,
        cy = estimated.center_y,
        w = estimated.width,
        h = estimated.height,
        "Estimated third circle"
    );
    Ok(estimated)
}

/// The red mark sits opposite the blue one, with green in the middle.
pub fn estimate_red(blue: &BoundingBox, green: &BoundingBox) -> Result<BoundingBox> {
    estimate_third_circle(blue, green)
}
