use nalgebra::{Matrix3, Vector3};
use tracing::{debug, instrument};

use crate::color_correction::common::error::{CorrectionError, Result};
use crate::color_correction::sampling::ReferenceColorSet;
use crate::color_correction::transform::types::ColorTransformMatrix;

/// Lower bound on `|det| / (|c_r| * |c_g| * |c_b|)`, the volume spanned by
/// the reference colors relative to a perfectly independent set of the
/// same lengths. Washed-out cards stay above 1e-2; near-duplicate
/// references fall orders below.
const MIN_INDEPENDENCE: f64 = 1e-3;

/// Scale-free independence of the columns, in [0, 1].
fn independence(matrix: &Matrix3<f64>, determinant: f64) -> f64 {
    let norms: f64 = matrix.column_iter().map(|c| c.norm()).product();
    if norms > 0.0 && norms.is_finite() {
        determinant.abs() / norms
    } else {
        0.0
    }
}

fn column_matrix(colors: &ReferenceColorSet) -> Matrix3<f64> {
    Matrix3::from_columns(&colors.columns().map(Vector3::from))
}

/// Solves `A` such that `A @ M_observed = M_target`, where both matrices hold
/// the red, green and blue reference colors as columns.
///
/// Without a target the identity is used, so each observed reference color
/// maps onto its unit basis vector.
#[instrument(skip_all)]
pub fn solve_transform(
    observed: &ReferenceColorSet,
    target: Option<&ReferenceColorSet>,
) -> Result<ColorTransformMatrix> {
    let m_observed = column_matrix(observed);
    let determinant = m_observed.determinant();

    if !determinant.is_finite() || independence(&m_observed, determinant) < MIN_INDEPENDENCE {
        return Err(CorrectionError::SingularReferenceMatrix { determinant });
    }

    let inverse = m_observed
        .try_inverse()
        .ok_or(CorrectionError::SingularReferenceMatrix { determinant })?;

    let m_target = target.map(column_matrix).unwrap_or_else(Matrix3::identity);
    let transform = m_target * inverse;

    debug!(determinant, shared_reference = target.is_some(), "Solved color transform");
    ColorTransformMatrix::from_matrix(transform)
        .map_err(|_| CorrectionError::SingularReferenceMatrix { determinant })
}
