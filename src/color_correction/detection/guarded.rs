use std::sync::Mutex;

use crate::color_correction::common::error::{CorrectionError, Result};
use crate::color_correction::detection::detector::BoxDetector;
use crate::color_correction::detection::types::DetectionResult;
use crate::color_correction::imaging::DetectionFrame;

/// Serializes inference calls of a detector that is not safe to call
/// concurrently, so it can be shared across batch worker threads.
///
/// Only the inference call holds the lock; sampling, solving and pixel
/// transformation stay parallel.
pub struct GuardedDetector<D: BoxDetector> {
    inner: Mutex<D>,
}

impl<D: BoxDetector> GuardedDetector<D> {
    pub fn new(detector: D) -> Self {
        Self {
            inner: Mutex::new(detector),
        }
    }

    pub fn into_inner(self) -> Result<D> {
        self.inner
            .into_inner()
            .map_err(|_| CorrectionError::ModelUnavailable("detector lock poisoned".to_string()))
    }
}

impl<D: BoxDetector> BoxDetector for GuardedDetector<D> {
    fn detect(&self, frame: &DetectionFrame, queries: &[String]) -> Result<DetectionResult> {
        let detector = self
            .inner
            .lock()
            .map_err(|_| CorrectionError::ModelUnavailable("detector lock poisoned".to_string()))?;
        detector.detect(frame, queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb32FImage;
    use rayon::prelude::*;
    use std::cell::Cell;
    use std::path::PathBuf;

    // Cell makes this detector !Sync on purpose.
    struct CountingDetector {
        calls: Cell<usize>,
    }

    impl BoxDetector for CountingDetector {
        fn detect(&self, _frame: &DetectionFrame, queries: &[String]) -> Result<DetectionResult> {
            self.calls.set(self.calls.get() + 1);
            Ok(DetectionResult::new(queries.to_vec(), Vec::new()))
        }
    }

    #[test]
    fn test_guarded_detector_is_shared_across_threads() {
        let guarded = GuardedDetector::new(CountingDetector { calls: Cell::new(0) });
        let frame = DetectionFrame {
            source: PathBuf::from("a.jpg"),
            image: Rgb32FImage::new(2, 2),
        };
        let queries = vec!["green circle".to_string()];

        (0..16).into_par_iter().for_each(|_| {
            guarded.detect(&frame, &queries).unwrap();
        });

        assert_eq!(guarded.into_inner().unwrap().calls.get(), 16);
    }
}
