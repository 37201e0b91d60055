//! Detection data types

/// Axis-aligned box in normalized image coordinates.
///
/// All four values are fractions of the image width/height. Geometric
/// extrapolation may push them slightly outside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
        Self {
            center_x,
            center_y,
            width,
            height,
        }
    }

    /// Builds a box from the `[cx, cy, w, h]` layout detectors emit.
    pub fn from_cxcywh(values: [f32; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn to_cxcywh(&self) -> [f32; 4] {
        [self.center_x, self.center_y, self.width, self.height]
    }

    pub fn is_finite(&self) -> bool {
        self.to_cxcywh().iter().all(|v| v.is_finite())
    }

    /// The same center with width and height divided by `factor`.
    pub fn shrunk(&self, factor: f32) -> Self {
        Self::new(
            self.center_x,
            self.center_y,
            self.width / factor,
            self.height / factor,
        )
    }

    /// Pixel-space rectangle `(x_min, y_min, x_max, y_max)` for an image of
    /// the given size, truncated toward zero and clamped to the image bounds.
    /// The max edges are exclusive.
    pub fn to_pixel_rect(&self, image_width: u32, image_height: u32) -> (u32, u32, u32, u32) {
        let to_px = |fraction: f32, extent: u32| -> u32 {
            let px = (fraction * extent as f32).trunc();
            px.clamp(0.0, extent as f32) as u32
        };
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        (
            to_px(self.center_x - half_w, image_width),
            to_px(self.center_y - half_h, image_height),
            to_px(self.center_x + half_w, image_width),
            to_px(self.center_y + half_h, image_height),
        )
    }
}

/// One detector proposal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Index into the query list the detection was produced for
    pub label_index: usize,
    pub score: f32,
    pub bbox: BoundingBox,
}

/// All proposals for one image and one query set, in detector order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionResult {
    pub queries: Vec<String>,
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn new(queries: Vec<String>, detections: Vec<Detection>) -> Self {
        Self {
            queries,
            detections,
        }
    }

    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.queries.iter().position(|q| q == label)
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_rect_truncates_and_clamps() {
        let bbox = BoundingBox::new(0.25, 0.5, 0.25, 0.5);
        assert_eq!(bbox.to_pixel_rect(80, 40), (10, 10, 30, 30));

        // x: -0.25..0.25, y: 0.75..1.25
        let bbox = BoundingBox::new(0.0, 1.0, 0.5, 0.5);
        assert_eq!(bbox.to_pixel_rect(80, 40), (0, 30, 20, 40));
    }

    #[test]
    fn test_shrunk_keeps_center() {
        let bbox = BoundingBox::new(0.4, 0.6, 0.2, 0.1).shrunk(2.0);
        assert_eq!(bbox, BoundingBox::new(0.4, 0.6, 0.1, 0.05));
    }

    #[test]
    fn test_label_index_lookup() {
        let result = DetectionResult::new(
            vec!["green circle".to_string(), "blue circle".to_string()],
            Vec::new(),
        );
        assert_eq!(result.label_index("blue circle"), Some(1));
        assert_eq!(result.label_index("red circle"), None);
        assert!(result.is_empty());
    }
}
