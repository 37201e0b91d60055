//! Reference color sampling.

use image::Rgb32FImage;
use tracing::debug;

use crate::color_correction::common::error::{CorrectionError, Result};
use crate::color_correction::detection::BoundingBox;

/// Per-channel arithmetic mean, in the value range of the sampled image.
pub type RgbMean = [f64; 3];

/// The three reference colors of the card, always complete and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceColorSet {
    red: RgbMean,
    green: RgbMean,
    blue: RgbMean,
}

impl ReferenceColorSet {
    pub fn new(red: RgbMean, green: RgbMean, blue: RgbMean) -> Result<Self> {
        for (name, color) in [("red", &red), ("green", &green), ("blue", &blue)] {
            if !color.iter().all(|c| c.is_finite()) {
                return Err(CorrectionError::InvalidReferenceColors(format!(
                    "{} reference is not finite: {:?}",
                    name, color
                )));
            }
        }
        Ok(Self { red, green, blue })
    }

    pub fn red(&self) -> RgbMean {
        self.red
    }

    pub fn green(&self) -> RgbMean {
        self.green
    }

    pub fn blue(&self) -> RgbMean {
        self.blue
    }

    /// Colors in red, green, blue order.
    pub fn columns(&self) -> [RgbMean; 3] {
        [self.red, self.green, self.blue]
    }
}

/// Mean color of the central part of `bbox`.
///
/// The box is shrunk around its center by `shrink_factor` so the sampled
/// rectangle stays inside the circular mark, mapped to pixels using the
/// dimensions of `image` and clamped to its bounds.
pub fn sample_color(bbox: &BoundingBox, image: &Rgb32FImage, shrink_factor: f32) -> Result<RgbMean> {
    if !shrink_factor.is_finite() || shrink_factor < 1.0 {
        return Err(CorrectionError::invalid_parameter("shrink_factor", shrink_factor));
    }
    if !bbox.is_finite() {
        return Err(CorrectionError::DegenerateGeometry(format!(
            "sampling box is not finite: {:?}",
            bbox
        )));
    }

    let (x_min, y_min, x_max, y_max) = bbox
        .shrunk(shrink_factor)
        .to_pixel_rect(image.width(), image.height());

    if x_max <= x_min || y_max <= y_min {
        return Err(CorrectionError::EmptySampleRegion {
            x_min,
            x_max,
            y_min,
            y_max,
        });
    }

    let mut sums = [0.0f64; 3];
    for y in y_min..y_max {
        for x in x_min..x_max {
            let pixel = image.get_pixel(x, y);
            for (sum, &value) in sums.iter_mut().zip(pixel.0.iter()) {
                *sum += value as f64;
            }
        }
    }

    let count = ((x_max - x_min) as u64 * (y_max - y_min) as u64) as f64;
    let mean = sums.map(|s| s / count);

    debug!(
        x_min, y_min, x_max, y_max,
        r = mean[0], g = mean[1], b = mean[2],
        "Sampled color"
    );
    Ok(mean)
}
