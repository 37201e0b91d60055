//! Color correction configuration types

use crate::color_correction::common::error::{CorrectionError, Result};

/// Quarter-turn rotation applied to the detection copy before inference.
///
/// Datasets photographed in a fixed orientation may need the card rotated
/// into the orientation the detector expects. The full-resolution image
/// that gets corrected is never rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionRotation {
    #[default]
    None,
    Clockwise90,
    Rotate180,
    CounterClockwise90,
}

/// Text queries sent to the detector for the two detectable reference marks.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceQueries {
    pub green: String,
    pub blue: String,
    /// Tried in order when `green` yields no detection
    pub green_fallbacks: Vec<String>,
    /// Tried in order when `blue` yields no detection
    pub blue_fallbacks: Vec<String>,
}

impl Default for ReferenceQueries {
    fn default() -> Self {
        Self {
            green: "green circle".to_string(),
            blue: "blue circle".to_string(),
            green_fallbacks: Vec::new(),
            blue_fallbacks: vec!["dark blue circle".to_string()],
        }
    }
}

impl ReferenceQueries {
    pub fn primary(&self) -> Vec<String> {
        vec![self.green.clone(), self.blue.clone()]
    }
}

/// Configuration for per-image color correction
#[derive(Debug, Clone)]
pub struct CorrectionConfig {
    /// Rotation applied to the detection copy
    pub rotation: DetectionRotation,
    /// Side of the square detection copy, `None` keeps the native size
    pub detection_size: Option<u32>,
    /// Sampling rectangle is the box shrunk by this factor around its center
    pub shrink_factor: f32,
    /// Detector vocabulary
    pub queries: ReferenceQueries,
    /// Quality used when re-encoding JPEG output
    pub jpeg_quality: u8,
    /// Whether to reject images with a zero dimension before processing
    pub validate_dimensions: bool,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            rotation: DetectionRotation::None,
            detection_size: Some(768),
            shrink_factor: 2.0,
            queries: ReferenceQueries::default(),
            jpeg_quality: 95,
            validate_dimensions: true,
        }
    }
}

impl CorrectionConfig {
    pub fn builder() -> CorrectionConfigBuilder {
        CorrectionConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.shrink_factor.is_finite() || self.shrink_factor < 1.0 {
            return Err(CorrectionError::invalid_parameter(
                "shrink_factor",
                self.shrink_factor,
            ));
        }
        if self.detection_size == Some(0) {
            return Err(CorrectionError::invalid_parameter("detection_size", 0));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(CorrectionError::invalid_parameter(
                "jpeg_quality",
                self.jpeg_quality,
            ));
        }
        let all_queries = [&self.queries.green, &self.queries.blue]
            .into_iter()
            .chain(&self.queries.green_fallbacks)
            .chain(&self.queries.blue_fallbacks);
        for query in all_queries {
            if query.trim().is_empty() {
                return Err(CorrectionError::invalid_parameter("queries", "<empty>"));
            }
        }
        if self.queries.green == self.queries.blue {
            return Err(CorrectionError::invalid_parameter(
                "queries",
                &self.queries.green,
            ));
        }
        Ok(())
    }
}

/// Builder for CorrectionConfig
#[derive(Default)]
pub struct CorrectionConfigBuilder {
    rotation: Option<DetectionRotation>,
    detection_size: Option<Option<u32>>,
    shrink_factor: Option<f32>,
    queries: Option<ReferenceQueries>,
    jpeg_quality: Option<u8>,
    validate_dimensions: Option<bool>,
}

impl CorrectionConfigBuilder {
    pub fn rotation(mut self, rotation: DetectionRotation) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn detection_size(mut self, size: Option<u32>) -> Self {
        self.detection_size = Some(size);
        self
    }

    pub fn shrink_factor(mut self, factor: f32) -> Self {
        self.shrink_factor = Some(factor);
        self
    }

    pub fn queries(mut self, queries: ReferenceQueries) -> Self {
        self.queries = Some(queries);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = Some(quality);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn build(self) -> CorrectionConfig {
        let default = CorrectionConfig::default();
        CorrectionConfig {
            rotation: self.rotation.unwrap_or(default.rotation),
            detection_size: self.detection_size.unwrap_or(default.detection_size),
            shrink_factor: self.shrink_factor.unwrap_or(default.shrink_factor),
            queries: self.queries.unwrap_or(default.queries),
            jpeg_quality: self.jpeg_quality.unwrap_or(default.jpeg_quality),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = CorrectionConfig::builder()
            .rotation(DetectionRotation::Clockwise90)
            .detection_size(None)
            .shrink_factor(3.0)
            .jpeg_quality(80)
            .build();

        assert_eq!(config.rotation, DetectionRotation::Clockwise90);
        assert_eq!(config.detection_size, None);
        assert_eq!(config.shrink_factor, 3.0);
        assert_eq!(config.jpeg_quality, 80);
        assert!(config.validate_dimensions);
        assert_eq!(config.queries, ReferenceQueries::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_queries_carry_blue_fallback() {
        let queries = ReferenceQueries::default();
        assert_eq!(queries.primary(), vec!["green circle", "blue circle"]);
        assert_eq!(queries.blue_fallbacks, vec!["dark blue circle"]);
    }

    #[test]
    fn test_validate_rejects_small_shrink_factor() {
        let config = CorrectionConfig::builder().shrink_factor(0.5).build();
        assert!(matches!(
            config.validate(),
            Err(CorrectionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_queries() {
        let queries = ReferenceQueries {
            green: "circle".to_string(),
            blue: "circle".to_string(),
            ..ReferenceQueries::default()
        };
        let config = CorrectionConfig::builder().queries(queries).build();
        assert!(config.validate().is_err());
    }
}
