use tracing::{debug, instrument};

use crate::color_correction::common::error::{CorrectionError, Result};
use crate::color_correction::detection::types::DetectionResult;
use crate::color_correction::imaging::DetectionFrame;

/// An open-vocabulary object detector.
///
/// Given the detection copy of an image and an ordered list of text queries,
/// returns one `(label_index, score, box)` triple per internal proposal.
/// Several proposals may share a label.
pub trait BoxDetector: Send {
    fn detect(&self, frame: &DetectionFrame, queries: &[String]) -> Result<DetectionResult>;
}

impl<D: BoxDetector + Sync + ?Sized> BoxDetector for &D {
    fn detect(&self, frame: &DetectionFrame, queries: &[String]) -> Result<DetectionResult> {
        (**self).detect(frame, queries)
    }
}

impl<D: BoxDetector + ?Sized> BoxDetector for Box<D> {
    fn detect(&self, frame: &DetectionFrame, queries: &[String]) -> Result<DetectionResult> {
        (**self).detect(frame, queries)
    }
}

/// Checks the contract of a [`BoxDetector`] around every call.
///
/// Queries must be non-empty; returned triples must reference a query,
/// carry a finite score and a finite box. Violations surface as
/// `InferenceFailure` instead of reaching the selector.
pub struct DetectorAdapter<B: BoxDetector> {
    backend: B,
}

impl<B: BoxDetector> DetectorAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[instrument(skip(self, frame), fields(source = %frame.source.display()))]
    pub fn detect(&self, frame: &DetectionFrame, queries: &[String]) -> Result<DetectionResult> {
        if queries.is_empty() {
            return Err(CorrectionError::invalid_parameter("queries", "[]"));
        }

        let result = self.backend.detect(frame, queries)?;

        if result.queries.as_slice() != queries {
            return Err(CorrectionError::InferenceFailure(format!(
                "detector answered queries {:?}, expected {:?}",
                result.queries, queries
            )));
        }

        for detection in &result.detections {
            if detection.label_index >= queries.len() {
                return Err(CorrectionError::InferenceFailure(format!(
                    "label index {} out of range for {} queries",
                    detection.label_index,
                    queries.len()
                )));
            }
            if !detection.score.is_finite() || !detection.bbox.is_finite() {
                return Err(CorrectionError::InferenceFailure(format!(
                    "non-finite detection for '{}'",
                    queries[detection.label_index]
                )));
            }
        }

        debug!(proposals = result.len(), "Detection complete");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_correction::detection::types::{BoundingBox, Detection};
    use image::Rgb32FImage;
    use std::path::PathBuf;

    struct FixedDetector {
        detections: Vec<Detection>,
    }

    impl BoxDetector for FixedDetector {
        fn detect(&self, _frame: &DetectionFrame, queries: &[String]) -> Result<DetectionResult> {
            Ok(DetectionResult::new(queries.to_vec(), self.detections.clone()))
        }
    }

    fn frame() -> DetectionFrame {
        DetectionFrame {
            source: PathBuf::from("card.jpg"),
            image: Rgb32FImage::new(4, 4),
        }
    }

    fn queries() -> Vec<String> {
        vec!["green circle".to_string(), "blue circle".to_string()]
    }

    #[test]
    fn test_passes_valid_detections_through() {
        let adapter = DetectorAdapter::new(FixedDetector {
            detections: vec![Detection {
                label_index: 1,
                score: 0.8,
                bbox: BoundingBox::new(0.5, 0.5, 0.1, 0.1),
            }],
        });
        let result = adapter.detect(&frame(), &queries()).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_rejects_empty_queries() {
        let adapter = DetectorAdapter::new(FixedDetector { detections: Vec::new() });
        let result = adapter.detect(&frame(), &[]);
        assert!(matches!(result, Err(CorrectionError::InvalidParameter { .. })));
    }

    #[test]
    fn test_rejects_out_of_range_label() {
        let adapter = DetectorAdapter::new(FixedDetector {
            detections: vec![Detection {
                label_index: 2,
                score: 0.8,
                bbox: BoundingBox::new(0.5, 0.5, 0.1, 0.1),
            }],
        });
        let result = adapter.detect(&frame(), &queries());
        assert!(matches!(result, Err(CorrectionError::InferenceFailure(_))));
    }

    #[test]
    fn test_rejects_nan_score() {
        let adapter = DetectorAdapter::new(FixedDetector {
            detections: vec![Detection {
                label_index: 0,
                score: f32::NAN,
                bbox: BoundingBox::new(0.5, 0.5, 0.1, 0.1),
            }],
        });
        let result = adapter.detect(&frame(), &queries());
        assert!(matches!(result, Err(CorrectionError::InferenceFailure(_))));
    }
}
