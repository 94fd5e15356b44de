//! Weighted least-squares solve of the normal equations.
//!
//! Every parametric family reduces its fit to the same linear problem:
//! find `x` minimising `(X − A·x)ᵗ P (X − A·x)` for a design matrix `A`,
//! a diagonal weight matrix `P` and an observation vector `X`. The solution
//! satisfies the normal equations `(AᵗPA)·x = AᵗPX`.

use crate::error::{EstimationError, EstimationResult};
use crate::params::SolverParams;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

/// Solves `(AᵗPA)·x = AᵗPX` for `x`.
///
/// The normal matrix is Jacobi-equilibrated (scaled to a unit diagonal)
/// before its conditioning is checked, so parameters with very different
/// magnitudes do not trip the singularity test.
///
/// # Arguments
///
/// * `design` - Design matrix `A` (observations × parameters)
/// * `weights` - Diagonal of the weight matrix `P`
/// * `observations` - Observation vector `X`
/// * `params` - Solver parameters
///
/// # Errors
///
/// Returns an error if:
/// - The dimensions are inconsistent or there are more parameters than observations
/// - A weight is negative or non-finite
/// - The normal matrix is singular or near-singular (degenerate geometry)
///
/// # Example
///
/// ```
/// use georef_builder::{solve_weighted, SolverParams};
/// use nalgebra::{DMatrix, DVector};
///
/// // Fit y = a + b·t to three exact samples of y = 1 + 2t
/// let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
/// let p = DVector::from_element(3, 1.0);
/// let x = DVector::from_vec(vec![1.0, 3.0, 5.0]);
///
/// let solution = solve_weighted(&a, &p, &x, &SolverParams::default()).unwrap();
/// assert!((solution[0] - 1.0).abs() < 1e-12);
/// assert!((solution[1] - 2.0).abs() < 1e-12);
/// ```
pub fn solve_weighted(
    design: &DMatrix<f64>,
    weights: &DVector<f64>,
    observations: &DVector<f64>,
    params: &SolverParams,
) -> EstimationResult<DVector<f64>> {
    let (rows, unknowns) = design.shape();
    if weights.len() != rows || observations.len() != rows {
        return Err(EstimationError::InvalidParameter(format!(
            "design has {rows} rows but {} weights and {} observations",
            weights.len(),
            observations.len()
        )));
    }
    if unknowns == 0 || unknowns > rows {
        return Err(EstimationError::DegenerateGeometry(format!(
            "{unknowns} parameters cannot be determined from {rows} observations"
        )));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(EstimationError::InvalidParameter(
            "weights must be finite and non-negative".to_string(),
        ));
    }

    // AᵗP as a row-scaled copy of A
    let mut weighted = design.clone();
    for (mut row, &w) in weighted.row_iter_mut().zip(weights.iter()) {
        row *= w;
    }
    let normal = design.transpose() * &weighted;
    let rhs = weighted.transpose() * observations;

    let diagonal = normal.diagonal();
    if diagonal.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
        warn!(unknowns, rows, "Parameter with no observation support");
        return Err(EstimationError::DegenerateGeometry(
            "a parameter has no observation support".to_string(),
        ));
    }
    let scale = diagonal.map(|d| 1.0 / d.sqrt());
    let equilibrated = normal.component_mul(&(&scale * scale.transpose()));

    let singular_values = equilibrated.clone().svd(false, false).singular_values;
    let largest = singular_values.max();
    let smallest = singular_values.min();
    let ratio = smallest / largest;
    debug!(unknowns, rows, conditioning = ratio, "Solving normal equations");
    if !(ratio.is_finite() && ratio > params.singularity_tolerance) {
        warn!(ratio, "Normal matrix is singular");
        return Err(EstimationError::DegenerateGeometry(format!(
            "normal matrix is singular (singular value ratio {ratio:.3e})"
        )));
    }

    let cholesky = equilibrated.cholesky().ok_or_else(|| {
        EstimationError::DegenerateGeometry("normal matrix is not positive definite".to_string())
    })?;
    let solution = cholesky.solve(&rhs.component_mul(&scale)).component_mul(&scale);

    if solution.iter().any(|v| !v.is_finite()) {
        return Err(EstimationError::DegenerateGeometry(
            "solution is not finite".to_string(),
        ));
    }
    Ok(solution)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_overdetermined_line_fit() {
        // y = 2 + 0.5t with symmetric noise around it
        let t = [0.0, 1.0, 2.0, 3.0];
        let noise = [0.1, -0.1, -0.1, 0.1];
        let mut a = DMatrix::zeros(4, 2);
        let mut x = DVector::zeros(4);
        for i in 0..4 {
            a[(i, 0)] = 1.0;
            a[(i, 1)] = t[i];
            x[i] = 2.0 + 0.5 * t[i] + noise[i];
        }
        let p = DVector::from_element(4, 1.0);

        let solution = solve_weighted(&a, &p, &x, &SolverParams::default()).unwrap();
        assert_relative_eq!(solution[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(solution[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_pull_solution() {
        // Constant model: weighted mean of observations
        let a = DMatrix::from_element(2, 1, 1.0);
        let x = DVector::from_vec(vec![0.0, 10.0]);
        let p = DVector::from_vec(vec![3.0, 1.0]);

        let solution = solve_weighted(&a, &p, &x, &SolverParams::default()).unwrap();
        assert_relative_eq!(solution[0], 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_badly_scaled_columns_are_not_degenerate() {
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0e6, 1.0, 2.0e6]);
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let p = DVector::from_element(3, 1.0);

        let solution = solve_weighted(&a, &p, &x, &SolverParams::default()).unwrap();
        assert_relative_eq!(solution[1], 1.0e-6, epsilon = 1e-15);
    }

    #[test]
    fn test_dependent_columns_are_degenerate() {
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let p = DVector::from_element(3, 1.0);

        let result = solve_weighted(&a, &p, &x, &SolverParams::default());
        assert!(matches!(result, Err(EstimationError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_zero_column_is_degenerate() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 0.0]);
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let p = DVector::from_element(2, 1.0);

        let result = solve_weighted(&a, &p, &x, &SolverParams::default());
        assert!(matches!(result, Err(EstimationError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_underdetermined() {
        let a = DMatrix::from_element(1, 2, 1.0);
        let x = DVector::from_element(1, 1.0);
        let p = DVector::from_element(1, 1.0);

        let result = solve_weighted(&a, &p, &x, &SolverParams::default());
        assert!(matches!(result, Err(EstimationError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = DMatrix::from_element(3, 1, 1.0);
        let x = DVector::from_element(2, 1.0);
        let p = DVector::from_element(3, 1.0);

        let result = solve_weighted(&a, &p, &x, &SolverParams::default());
        assert!(matches!(result, Err(EstimationError::InvalidParameter(_))));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let a = DMatrix::from_element(2, 1, 1.0);
        let x = DVector::from_element(2, 1.0);
        let p = DVector::from_vec(vec![1.0, -1.0]);

        let result = solve_weighted(&a, &p, &x, &SolverParams::default());
        assert!(matches!(result, Err(EstimationError::InvalidParameter(_))));
    }
}
