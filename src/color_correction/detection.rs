//! Reference-mark detection module
//!
//! Wraps an external open-vocabulary detector behind the [`BoxDetector`]
//! trait and picks the most confident box per requested label.

mod detector;
mod guarded;
mod selector;
mod sidecar_detector;
pub mod types;

pub use detector::{BoxDetector, DetectorAdapter};
pub use guarded::GuardedDetector;
pub use selector::select_best;
pub use sidecar_detector::SidecarDetector;
pub use types::{BoundingBox, Detection, DetectionResult};
