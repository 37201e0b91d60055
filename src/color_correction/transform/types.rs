//! Transform data types

use nalgebra::{Matrix3, Vector3};

use crate::color_correction::common::error::{CorrectionError, Result};

/// 3x3 matrix mapping an observed RGB vector to a target RGB vector.
///
/// Always finite. Only constructed by the solver or from validated rows,
/// never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTransformMatrix {
    matrix: Matrix3<f64>,
}

impl ColorTransformMatrix {
    pub(crate) fn from_matrix(matrix: Matrix3<f64>) -> Result<Self> {
        if matrix.iter().all(|v| v.is_finite()) {
            Ok(Self { matrix })
        } else {
            Err(CorrectionError::InvalidParameter {
                parameter: "transform".to_string(),
                value: format!("{:?}", matrix),
            })
        }
    }

    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Result<Self> {
        Self::from_matrix(Matrix3::from_fn(|r, c| rows[r][c]))
    }

    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let m = &self.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// `self @ rgb`
    pub fn apply(&self, rgb: [f64; 3]) -> [f64; 3] {
        let out = self.matrix * Vector3::from(rgb);
        [out.x, out.y, out.z]
    }

    /// Row-major single-precision copy for the per-pixel hot loop.
    pub(crate) fn to_f32_rows(&self) -> [[f32; 3]; 3] {
        self.to_rows().map(|row| row.map(|v| v as f32))
    }
}
