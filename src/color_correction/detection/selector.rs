use crate::color_correction::common::error::{CorrectionError, Result};
use crate::color_correction::detection::types::{BoundingBox, DetectionResult};

/// Returns the box of the highest-scoring detection carrying `label`.
///
/// Equal scores resolve to the first occurrence in detector order.
pub fn select_best(label: &str, detections: &DetectionResult) -> Result<BoundingBox> {
    let label_index = detections
        .label_index(label)
        .ok_or_else(|| CorrectionError::LabelNotFound(label.to_string()))?;

    detections
        .detections
        .iter()
        .filter(|d| d.label_index == label_index)
        .fold(None, |best: Option<(f32, BoundingBox)>, d| match best {
            Some((score, _)) if score >= d.score => best,
            _ => Some((d.score, d.bbox)),
        })
        .map(|(_, bbox)| bbox)
        .ok_or_else(|| CorrectionError::LabelNotFound(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_correction::detection::types::Detection;

    fn detection(label_index: usize, score: f32, cx: f32) -> Detection {
        Detection {
            label_index,
            score,
            bbox: BoundingBox::new(cx, 0.5, 0.1, 0.1),
        }
    }

    fn result(detections: Vec<Detection>) -> DetectionResult {
        DetectionResult::new(
            vec!["green circle".to_string(), "blue circle".to_string()],
            detections,
        )
    }

    #[test]
    fn test_picks_highest_score_for_label() {
        let detections = result(vec![
            detection(0, 0.3, 0.1),
            detection(1, 0.9, 0.2),
            detection(0, 0.7, 0.3),
            detection(0, 0.5, 0.4),
        ]);
        assert_eq!(select_best("green circle", &detections).unwrap().center_x, 0.3);
        assert_eq!(select_best("blue circle", &detections).unwrap().center_x, 0.2);
    }

    #[test]
    fn test_ties_resolve_to_first_occurrence() {
        let detections = result(vec![
            detection(1, 0.6, 0.1),
            detection(1, 0.6, 0.2),
        ]);
        assert_eq!(select_best("blue circle", &detections).unwrap().center_x, 0.1);
    }

    #[test]
    fn test_label_without_detections_is_not_found() {
        let detections = result(vec![detection(0, 0.9, 0.1)]);
        let err = select_best("blue circle", &detections).unwrap_err();
        assert!(matches!(err, CorrectionError::LabelNotFound(ref l) if l == "blue circle"));
    }

    #[test]
    fn test_unknown_label_is_not_found() {
        let detections = result(vec![detection(0, 0.9, 0.1)]);
        assert!(matches!(
            select_best("red circle", &detections),
            Err(CorrectionError::LabelNotFound(_))
        ));
    }
}
