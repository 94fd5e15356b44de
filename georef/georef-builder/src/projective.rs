//! Eight-parameter planar projective transform (homography).
//!
//! ```text
//! X = (a0·x + a1·y + a2) / (c0·x + c1·y + 1)
//! Y = (b0·x + b1·y + b2) / (c0·x + c1·y + 1)
//! ```
//!
//! Fitted by the direct linear method: each equation is multiplied through
//! by its denominator, which makes it linear in the eight coefficients.

use crate::checks::{check_input, point_weights};
use crate::error::{EstimationError, EstimationResult};
use crate::family::TransformFamily;
use crate::linear::{LinearModel, fit_linear};
use crate::params::SolverParams;
use crate::statistics::log_fit;
use crate::traits::{CoordinateTransform, TransformBuilder};
use georef_types::Correspondence2;
use nalgebra::{DVector, Matrix3, Point2, Vector3};
use std::fmt::Write as _;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Relative size of the homogeneous denominator below which a point is
/// treated as lying on the line at infinity.
const HORIZON_TOLERANCE: f64 = 1e-12;

/// Design rows of the projective family,
/// parameters `[a0, a1, a2, b0, b1, b2, c0, c1]`.
pub(crate) struct ProjectiveModel;

impl LinearModel for ProjectiveModel {
    const PARAMETERS: usize = 8;

    fn design_rows(
        source: &Point2<f64>,
        target: &Point2<f64>,
        row_x: &mut [f64],
        row_y: &mut [f64],
    ) -> (f64, f64) {
        let (x, y) = (source.x, source.y);
        row_x[0] = x;
        row_x[1] = y;
        row_x[2] = 1.0;
        row_x[6] = -x * target.x;
        row_x[7] = -y * target.x;
        row_y[3] = x;
        row_y[4] = y;
        row_y[5] = 1.0;
        row_y[6] = -x * target.y;
        row_y[7] = -y * target.y;
        (target.x, target.y)
    }

    fn matrix(p: &DVector<f64>) -> Matrix3<f64> {
        Matrix3::new(p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7], 1.0)
    }
}

/// A fitted homography, stored with its bottom-right entry scaled to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProjectiveTransform2 {
    matrix: Matrix3<f64>,
}

impl ProjectiveTransform2 {
    /// Creates a homography from a homogeneous matrix.
    ///
    /// # Errors
    ///
    /// Returns `DegenerateGeometry` if the matrix is singular, non-finite or
    /// cannot be scaled so its bottom-right entry is 1.
    pub fn from_matrix3(matrix: Matrix3<f64>) -> EstimationResult<Self> {
        let scale = matrix[(2, 2)];
        let magnitude = matrix.amax();
        if !magnitude.is_finite() || scale.abs() <= HORIZON_TOLERANCE * magnitude {
            return Err(EstimationError::DegenerateGeometry(
                "projective matrix maps the origin to infinity".to_string(),
            ));
        }
        let matrix = matrix / scale;
        if matrix.determinant().abs() <= f64::EPSILON * matrix.amax().powi(3) {
            return Err(EstimationError::DegenerateGeometry(
                "projective matrix is singular".to_string(),
            ));
        }
        Ok(Self { matrix })
    }

    /// Homogeneous 3×3 matrix of the map.
    #[must_use]
    pub const fn to_matrix3(&self) -> Matrix3<f64> {
        self.matrix
    }

    /// Coefficients `[a0, a1, a2, b0, b1, b2, c0, c1]`.
    #[must_use]
    pub fn coefficients(&self) -> [f64; 8] {
        let m = &self.matrix;
        [
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
            m[(2, 0)],
            m[(2, 1)],
        ]
    }

    /// The inverse homography.
    ///
    /// # Errors
    ///
    /// Returns `DegenerateGeometry` if the inverse cannot be normalised.
    pub fn inverse(&self) -> EstimationResult<Self> {
        let inverse = self.matrix.try_inverse().ok_or_else(|| {
            EstimationError::DegenerateGeometry("projective matrix is singular".to_string())
        })?;
        Self::from_matrix3(inverse)
    }
}

impl CoordinateTransform<2> for ProjectiveTransform2 {
    fn transform_point(&self, point: &Point2<f64>) -> EstimationResult<Point2<f64>> {
        let h = self.matrix * Vector3::new(point.x, point.y, 1.0);
        let m = &self.matrix;
        let reference = (m[(2, 0)] * point.x).abs() + (m[(2, 1)] * point.y).abs() + m[(2, 2)].abs();
        if !h.z.is_finite() || h.z.abs() <= HORIZON_TOLERANCE * reference {
            return Err(EstimationError::EvaluationOutOfDomain {
                x: point.x,
                y: point.y,
            });
        }
        Ok(Point2::new(h.x / h.z, h.y / h.z))
    }
}

/// Least-squares builder for [`ProjectiveTransform2`].
#[derive(Debug, Clone)]
pub struct ProjectiveBuilder {
    correspondences: Vec<Correspondence2>,
    weighted: bool,
    solver: SolverParams,
}

impl ProjectiveBuilder {
    /// Creates a builder over at least four correspondences.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` with fewer than four correspondences and
    /// `InvalidAccuracy` when an accuracy cannot be used as a weight.
    pub fn new(correspondences: Vec<Correspondence2>) -> EstimationResult<Self> {
        check_input(TransformFamily::Projective, &correspondences)?;
        Ok(Self {
            correspondences,
            weighted: false,
            solver: SolverParams::default(),
        })
    }

    /// Weights each correspondence by its inverse variance.
    #[must_use]
    pub const fn include_weights(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    /// Sets the solver parameters.
    #[must_use]
    pub const fn with_solver_params(mut self, solver: SolverParams) -> Self {
        self.solver = solver;
        self
    }

    fn fit(&self) -> EstimationResult<ProjectiveTransform2> {
        let weights = point_weights(&self.correspondences, self.weighted)?;
        let matrix = fit_linear::<ProjectiveModel>(&self.correspondences, &weights, &self.solver)?;
        ProjectiveTransform2::from_matrix3(matrix)
    }
}

impl TransformBuilder<2> for ProjectiveBuilder {
    type Transform = ProjectiveTransform2;

    fn family(&self) -> TransformFamily {
        TransformFamily::Projective
    }

    fn correspondences(&self) -> &[Correspondence2] {
        &self.correspondences
    }

    fn transform(&self) -> EstimationResult<ProjectiveTransform2> {
        let transform = self.fit()?;
        log_fit(self.family(), self.correspondences.len());
        Ok(transform)
    }

    fn describe(&self) -> EstimationResult<String> {
        let [a0, a1, a2, b0, b1, b2, c0, c1] = self.fit()?.coefficients();
        let mut out = format!("Projective ({} points)\n", self.correspondences.len());
        let _ = writeln!(out, "  X = (a0*x + a1*y + a2) / (c0*x + c1*y + 1)");
        let _ = writeln!(out, "    a0 = {a0:.9}\n    a1 = {a1:.9}\n    a2 = {a2:.6}");
        let _ = writeln!(out, "  Y = (b0*x + b1*y + b2) / (c0*x + c1*y + 1)");
        let _ = writeln!(out, "    b0 = {b0:.9}\n    b1 = {b1:.9}\n    b2 = {b2:.6}");
        let _ = writeln!(out, "  c0 = {c0:.6e}\n  c1 = {c1:.6e}");
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn known() -> ProjectiveTransform2 {
        ProjectiveTransform2::from_matrix3(Matrix3::new(
            1.2, 0.1, 5.0, //
            -0.05, 0.9, -3.0, //
            1e-3, 2e-3, 1.0,
        ))
        .unwrap()
    }

    fn pairs(truth: &ProjectiveTransform2, sources: &[(f64, f64)]) -> Vec<Correspondence2> {
        sources
            .iter()
            .map(|&(x, y)| {
                let s = Point2::new(x, y);
                Correspondence2::new(s, truth.transform_point(&s).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_exact_four_points() {
        let truth = known();
        let builder = ProjectiveBuilder::new(pairs(
            &truth,
            &[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)],
        ))
        .unwrap();
        let fitted = builder.transform().unwrap();

        for (a, b) in fitted.coefficients().iter().zip(truth.coefficients()) {
            assert_relative_eq!(*a, b, epsilon = 1e-8);
        }
        assert!(builder.error_statistics().unwrap().rms() < 1e-6);
    }

    #[test]
    fn test_three_points_insufficient() {
        let result = ProjectiveBuilder::new(pairs(&known(), &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]));
        assert!(matches!(
            result,
            Err(EstimationError::InsufficientData { required: 4, .. })
        ));
    }

    #[test]
    fn test_collinear_is_degenerate() {
        let builder = ProjectiveBuilder::new(pairs(
            &known(),
            &[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0), (40.0, 0.0)],
        ))
        .unwrap();
        assert!(matches!(
            builder.transform(),
            Err(EstimationError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_line_at_infinity() {
        // w = x + 1 vanishes on x = -1
        let t = ProjectiveTransform2::from_matrix3(Matrix3::new(
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            1.0, 0.0, 1.0,
        ))
        .unwrap();
        assert!(matches!(
            t.transform_point(&Point2::new(-1.0, 3.0)),
            Err(EstimationError::EvaluationOutOfDomain { .. })
        ));
        assert!(t.transform_point(&Point2::new(1.0, 3.0)).is_ok());
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = known();
        let inv = t.inverse().unwrap();
        let p = Point2::new(42.0, 17.0);
        let q = t.transform_point(&p).unwrap();
        assert_relative_eq!(inv.transform_point(&q).unwrap(), p, epsilon = 1e-9);
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let result = ProjectiveTransform2::from_matrix3(Matrix3::new(
            1.0, 2.0, 3.0, //
            2.0, 4.0, 6.0, //
            0.0, 0.0, 1.0,
        ));
        assert!(matches!(result, Err(EstimationError::DegenerateGeometry(_))));
    }
}
