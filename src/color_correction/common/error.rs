use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorrectionError {
    #[error("No detection carries label '{0}'")]
    LabelNotFound(String),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Sampling region is empty: x=[{x_min}, {x_max}), y=[{y_min}, {y_max})")]
    EmptySampleRegion {
        x_min: u32,
        x_max: u32,
        y_min: u32,
        y_max: u32,
    },

    #[error("Reference color matrix is singular (determinant {determinant:e})")]
    SingularReferenceMatrix { determinant: f64 },

    #[error("Image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("Detection model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Detection inference failed: {0}")]
    InferenceFailure(String),

    #[error("Invalid reference colors: {0}")]
    InvalidReferenceColors(String),

    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to encode image: {0}")]
    EncodeFailure(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Discriminant of [`CorrectionError`], used when aggregating batch outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LabelNotFound,
    DegenerateGeometry,
    EmptySampleRegion,
    SingularReferenceMatrix,
    ImageNotFound,
    DecodeFailure,
    ModelUnavailable,
    InferenceFailure,
    InvalidReferenceColors,
    InvalidParameter,
    OutputWriteError,
    EncodeFailure,
    Io,
}

impl CorrectionError {
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LabelNotFound(_) => ErrorKind::LabelNotFound,
            Self::DegenerateGeometry(_) => ErrorKind::DegenerateGeometry,
            Self::EmptySampleRegion { .. } => ErrorKind::EmptySampleRegion,
            Self::SingularReferenceMatrix { .. } => ErrorKind::SingularReferenceMatrix,
            Self::ImageNotFound(_) => ErrorKind::ImageNotFound,
            Self::DecodeFailure(_) => ErrorKind::DecodeFailure,
            Self::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            Self::InferenceFailure(_) => ErrorKind::InferenceFailure,
            Self::InvalidReferenceColors(_) => ErrorKind::InvalidReferenceColors,
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::OutputWriteError(_) => ErrorKind::OutputWriteError,
            Self::EncodeFailure(_) => ErrorKind::EncodeFailure,
            Self::IoError(_) => ErrorKind::Io,
        }
    }

    /// True when re-running detection with different text queries may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LabelNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CorrectionError>;
