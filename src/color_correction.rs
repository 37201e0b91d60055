//! Color correction module
//!
//! This module provides the color-card correction core: detection adapters,
//! reference-circle geometry, color sampling, transform solving and
//! application, plus the per-image and batch orchestration around them.

pub mod batch;
pub mod common;
pub mod config;
pub mod detection;
pub mod geometry;
pub mod imaging;
pub mod pipeline;
pub mod sampling;
pub mod transform;
pub mod visualization;

pub use common::{
    CorrectionError,
    ErrorKind,
    Result,
};

pub use config::{
    CorrectionConfig,
    CorrectionConfigBuilder,
    DetectionRotation,
    ReferenceQueries,
};

pub use detection::{
    BoundingBox,
    BoxDetector,
    Detection,
    DetectionResult,
    DetectorAdapter,
    GuardedDetector,
    SidecarDetector,
    select_best,
};

pub use geometry::{
    ReflectionEstimator,
    ThirdCircleEstimator,
    estimate_red,
    estimate_third_circle,
};

pub use imaging::{
    CorrectedImageWriter,
    DetectionFrame,
    StandardImageWriter,
};

pub use sampling::{
    ReferenceColorSet,
    RgbMean,
    sample_color,
};

pub use transform::{
    ColorTransformMatrix,
    apply_transform,
    solve_transform,
};

pub use pipeline::ColorCorrectionPipeline;

pub use batch::{
    BatchConfig,
    BatchConfigBuilder,
    BatchReport,
    BatchRunner,
    ImageOutcome,
    ImageSelection,
    OutputLocation,
};
