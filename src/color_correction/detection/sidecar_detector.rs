//! Detector backend fed by predictions stored next to the images.
//!
//! An external open-vocabulary detector writes one JSON file per image into
//! a predictions directory. This backend reads them back and maps each
//! prediction's label text onto the query list of the current call, so the
//! core pipeline sees exactly what an in-process model would return.
//!
//! File layout: `<predictions_dir>/<image file name>.json`
//!
//! ```json
//! {"detections": [{"label": "green circle", "score": 0.93, "box": [0.5, 0.5, 0.1, 0.1]}]}
//! ```
//!
//! Boxes are `[center_x, center_y, width, height]`, normalized to the
//! detection copy the predictions were computed on.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::color_correction::common::error::{CorrectionError, Result};
use crate::color_correction::detection::detector::BoxDetector;
use crate::color_correction::detection::types::{BoundingBox, Detection, DetectionResult};
use crate::color_correction::imaging::DetectionFrame;

#[derive(Debug, Deserialize)]
struct PredictionFile {
    detections: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    label: String,
    score: f32,
    #[serde(rename = "box")]
    bbox: [f32; 4],
}

pub struct SidecarDetector {
    predictions_dir: PathBuf,
}

impl SidecarDetector {
    /// Opens a predictions directory. Fails with `ModelUnavailable` when the
    /// directory does not exist.
    pub fn open(predictions_dir: impl Into<PathBuf>) -> Result<Self> {
        let predictions_dir = predictions_dir.into();
        if !predictions_dir.is_dir() {
            return Err(CorrectionError::ModelUnavailable(format!(
                "predictions directory not found: {}",
                predictions_dir.display()
            )));
        }
        Ok(Self { predictions_dir })
    }

    pub fn predictions_path(&self, source: &Path) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| {
            CorrectionError::InferenceFailure(format!(
                "image path has no file name: {}",
                source.display()
            ))
        })?;
        let mut name = file_name.to_os_string();
        name.push(".json");
        Ok(self.predictions_dir.join(name))
    }
}

impl BoxDetector for SidecarDetector {
    fn detect(&self, frame: &DetectionFrame, queries: &[String]) -> Result<DetectionResult> {
        let path = self.predictions_path(&frame.source)?;
        debug!("Reading predictions from {}", path.display());

        let content = std::fs::read_to_string(&path).map_err(|e| {
            CorrectionError::InferenceFailure(format!("{}: {}", path.display(), e))
        })?;
        let file: PredictionFile = serde_json::from_str(&content).map_err(|e| {
            CorrectionError::InferenceFailure(format!("{}: {}", path.display(), e))
        })?;

        let detections = file
            .detections
            .into_iter()
            .filter_map(|p| {
                let label_index = queries.iter().position(|q| *q == p.label)?;
                Some(Detection {
                    label_index,
                    score: p.score,
                    bbox: BoundingBox::from_cxcywh(p.bbox),
                })
            })
            .collect();

        Ok(DetectionResult::new(queries.to_vec(), detections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb32FImage;
    use tempfile::tempdir;

    fn frame(name: &str) -> DetectionFrame {
        DetectionFrame {
            source: PathBuf::from("photos").join(name),
            image: Rgb32FImage::new(2, 2),
        }
    }

    #[test]
    fn test_missing_directory_is_model_unavailable() {
        let dir = tempdir().unwrap();
        let result = SidecarDetector::open(dir.path().join("nope"));
        assert!(matches!(result, Err(CorrectionError::ModelUnavailable(_))));
    }

    #[test]
    fn test_maps_labels_to_query_indices() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("card.jpg.json"),
            r#"{"detections": [
                {"label": "blue circle", "score": 0.7, "box": [0.7, 0.3, 0.1, 0.1]},
                {"label": "hand", "score": 0.99, "box": [0.1, 0.1, 0.2, 0.2]},
                {"label": "green circle", "score": 0.9, "box": [0.5, 0.5, 0.1, 0.1]}
            ]}"#,
        )
        .unwrap();

        let detector = SidecarDetector::open(dir.path()).unwrap();
        let queries = vec!["green circle".to_string(), "blue circle".to_string()];
        let result = detector.detect(&frame("card.jpg"), &queries).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.detections[0].label_index, 1);
        assert_eq!(result.detections[1].label_index, 0);
        assert_eq!(result.detections[1].bbox, BoundingBox::new(0.5, 0.5, 0.1, 0.1));
    }

    #[test]
    fn test_missing_or_malformed_file_is_inference_failure() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("bad.jpg.json"), "{not json").unwrap();
        let detector = SidecarDetector::open(dir.path()).unwrap();
        let queries = vec!["green circle".to_string()];

        assert!(matches!(
            detector.detect(&frame("missing.jpg"), &queries),
            Err(CorrectionError::InferenceFailure(_))
        ));
        assert!(matches!(
            detector.detect(&frame("bad.jpg"), &queries),
            Err(CorrectionError::InferenceFailure(_))
        ));
    }
}
