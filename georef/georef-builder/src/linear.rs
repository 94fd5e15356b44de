//! Shared fit for the planar families that are linear in their parameters.
//!
//! Each family only supplies its design rows and how its parameter vector
//! assembles into a homogeneous 3×3 matrix; building `A`, `P` and `X`,
//! normalising and solving is common.

use crate::error::EstimationResult;
use crate::normalize::Normalization;
use crate::params::SolverParams;
use crate::solver::solve_weighted;
use georef_types::Correspondence2;
use nalgebra::{DMatrix, DVector, Matrix3, Point2};
use tracing::debug;

/// A planar model whose two observation equations per point are linear in
/// the parameters.
pub(crate) trait LinearModel {
    /// Number of parameters.
    const PARAMETERS: usize;

    /// Writes the X and Y design rows for one correspondence and returns the
    /// matching observations.
    fn design_rows(
        source: &Point2<f64>,
        target: &Point2<f64>,
        row_x: &mut [f64],
        row_y: &mut [f64],
    ) -> (f64, f64);

    /// Homogeneous matrix for a solved parameter vector.
    fn matrix(parameters: &DVector<f64>) -> Matrix3<f64>;
}

/// Fits `M` to the correspondences and returns its homogeneous matrix in
/// original coordinates.
///
/// `weights` holds one weight per correspondence, applied to both of its
/// observation rows.
pub(crate) fn fit_linear<M: LinearModel>(
    correspondences: &[Correspondence2],
    weights: &[f64],
    solver: &SolverParams,
) -> EstimationResult<Matrix3<f64>> {
    let source_norm = Normalization::from_points(correspondences.iter().map(|c| &c.source));
    let target_norm = Normalization::from_points(correspondences.iter().map(|c| &c.target));

    let rows = correspondences.len() * 2;
    let mut design = DMatrix::zeros(rows, M::PARAMETERS);
    let mut observations = DVector::zeros(rows);
    let mut row_weights = DVector::zeros(rows);
    let mut row_x = vec![0.0; M::PARAMETERS];
    let mut row_y = vec![0.0; M::PARAMETERS];

    for (i, (c, &w)) in correspondences.iter().zip(weights).enumerate() {
        let s = source_norm.apply(&c.source);
        let t = target_norm.apply(&c.target);
        row_x.fill(0.0);
        row_y.fill(0.0);
        let (obs_x, obs_y) = M::design_rows(&s, &t, &mut row_x, &mut row_y);
        for k in 0..M::PARAMETERS {
            design[(2 * i, k)] = row_x[k];
            design[(2 * i + 1, k)] = row_y[k];
        }
        observations[2 * i] = obs_x;
        observations[2 * i + 1] = obs_y;
        row_weights[2 * i] = w;
        row_weights[2 * i + 1] = w;
    }

    debug!(
        points = correspondences.len(),
        parameters = M::PARAMETERS,
        "Building planar design matrix"
    );
    let parameters = solve_weighted(&design, &row_weights, &observations, solver)?;
    let normalized = M::matrix(&parameters);
    Ok(target_norm.inverse_matrix() * normalized * source_norm.matrix())
}
