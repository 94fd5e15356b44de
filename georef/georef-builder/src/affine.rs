//! Six-parameter planar affine transform.
//!
//! ```text
//! X = a0·x + a1·y + a2
//! Y = b0·x + b1·y + b2
//! ```

use crate::checks::{check_input, point_weights};
use crate::error::{EstimationError, EstimationResult};
use crate::family::TransformFamily;
use crate::linear::{LinearModel, fit_linear};
use crate::params::SolverParams;
use crate::statistics::log_fit;
use crate::traits::{CoordinateTransform, TransformBuilder};
use georef_types::Correspondence2;
use nalgebra::{DVector, Matrix2, Matrix3, Point2, Vector2};
use std::fmt::Write as _;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Design rows of the affine family, parameters `[a0, a1, a2, b0, b1, b2]`.
pub(crate) struct AffineModel;

impl LinearModel for AffineModel {
    const PARAMETERS: usize = 6;

    fn design_rows(
        source: &Point2<f64>,
        target: &Point2<f64>,
        row_x: &mut [f64],
        row_y: &mut [f64],
    ) -> (f64, f64) {
        row_x[0] = source.x;
        row_x[1] = source.y;
        row_x[2] = 1.0;
        row_y[3] = source.x;
        row_y[4] = source.y;
        row_y[5] = 1.0;
        (target.x, target.y)
    }

    fn matrix(p: &DVector<f64>) -> Matrix3<f64> {
        Matrix3::new(p[0], p[1], p[2], p[3], p[4], p[5], 0.0, 0.0, 1.0)
    }
}

/// A fitted planar affine map `p ↦ L·p + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AffineTransform2 {
    /// Linear part `[[a0, a1], [b0, b1]]`.
    pub linear: Matrix2<f64>,
    /// Translation `(a2, b2)`.
    pub translation: Vector2<f64>,
}

impl AffineTransform2 {
    /// Creates an affine map from its linear part and translation.
    #[must_use]
    pub const fn new(linear: Matrix2<f64>, translation: Vector2<f64>) -> Self {
        Self {
            linear,
            translation,
        }
    }

    /// The identity map.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(Matrix2::identity(), Vector2::zeros())
    }

    /// Takes the affine part of a homogeneous matrix, ignoring its last row.
    #[must_use]
    pub fn from_matrix3(m: &Matrix3<f64>) -> Self {
        Self::new(
            Matrix2::new(m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)]),
            Vector2::new(m[(0, 2)], m[(1, 2)]),
        )
    }

    /// Homogeneous 3×3 matrix of the map.
    #[must_use]
    pub fn to_matrix3(&self) -> Matrix3<f64> {
        let l = &self.linear;
        let t = &self.translation;
        Matrix3::new(
            l[(0, 0)],
            l[(0, 1)],
            t.x,
            l[(1, 0)],
            l[(1, 1)],
            t.y,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Coefficients `[a0, a1, a2, b0, b1, b2]`.
    #[must_use]
    pub fn coefficients(&self) -> [f64; 6] {
        [
            self.linear[(0, 0)],
            self.linear[(0, 1)],
            self.translation.x,
            self.linear[(1, 0)],
            self.linear[(1, 1)],
            self.translation.y,
        ]
    }

    /// Maps a point. Affine maps are defined everywhere.
    #[must_use]
    pub fn apply(&self, point: &Point2<f64>) -> Point2<f64> {
        Point2::from(self.linear * point.coords + self.translation)
    }

    /// The inverse map.
    ///
    /// # Errors
    ///
    /// Returns `DegenerateGeometry` if the linear part is singular.
    pub fn inverse(&self) -> EstimationResult<Self> {
        let inverse = self.linear.try_inverse().ok_or_else(|| {
            EstimationError::DegenerateGeometry("affine linear part is singular".to_string())
        })?;
        Ok(Self::new(inverse, -(inverse * self.translation)))
    }
}

impl Default for AffineTransform2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl CoordinateTransform<2> for AffineTransform2 {
    fn transform_point(&self, point: &Point2<f64>) -> EstimationResult<Point2<f64>> {
        Ok(self.apply(point))
    }
}

/// Least-squares builder for [`AffineTransform2`].
///
/// # Example
///
/// ```
/// use georef_builder::{AffineBuilder, Correspondence2, CoordinateTransform, TransformBuilder};
/// use nalgebra::Point2;
///
/// let pairs = vec![
///     Correspondence2::from_coords(0.0, 0.0, 10.0, 20.0),
///     Correspondence2::from_coords(1.0, 0.0, 12.0, 20.0),
///     Correspondence2::from_coords(0.0, 1.0, 10.0, 23.0),
/// ];
/// let builder = AffineBuilder::new(pairs).unwrap();
/// let transform = builder.transform().unwrap();
///
/// let p = transform.transform_point(&Point2::new(2.0, 2.0)).unwrap();
/// assert!((p.x - 14.0).abs() < 1e-9);
/// assert!((p.y - 26.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct AffineBuilder {
    correspondences: Vec<Correspondence2>,
    weighted: bool,
    solver: SolverParams,
}

impl AffineBuilder {
    /// Creates a builder over at least three correspondences.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` with fewer than three correspondences and
    /// `InvalidAccuracy` when an accuracy cannot be used as a weight.
    pub fn new(correspondences: Vec<Correspondence2>) -> EstimationResult<Self> {
        check_input(TransformFamily::Affine, &correspondences)?;
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

    /// Whether accuracy weighting is enabled.
    #[must_use]
    pub const fn is_weighted(&self) -> bool {
        self.weighted
    }

    fn fit(&self) -> EstimationResult<AffineTransform2> {
        let weights = point_weights(&self.correspondences, self.weighted)?;
        let matrix = fit_linear::<AffineModel>(&self.correspondences, &weights, &self.solver)?;
        Ok(AffineTransform2::from_matrix3(&matrix))
    }
}

impl TransformBuilder<2> for AffineBuilder {
    type Transform = AffineTransform2;

    fn family(&self) -> TransformFamily {
        TransformFamily::Affine
    }

    fn correspondences(&self) -> &[Correspondence2] {
        &self.correspondences
    }

    fn transform(&self) -> EstimationResult<AffineTransform2> {
        let transform = self.fit()?;
        log_fit(self.family(), self.correspondences.len());
        Ok(transform)
    }

    fn describe(&self) -> EstimationResult<String> {
        let [a0, a1, a2, b0, b1, b2] = self.fit()?.coefficients();
        let mut out = format!("Affine ({} points)\n", self.correspondences.len());
        let _ = writeln!(out, "  X = a0*x + a1*y + a2");
        let _ = writeln!(out, "    a0 = {a0:.9}\n    a1 = {a1:.9}\n    a2 = {a2:.6}");
        let _ = writeln!(out, "  Y = b0*x + b1*y + b2");
        let _ = writeln!(out, "    b0 = {b0:.9}\n    b1 = {b1:.9}\n    b2 = {b2:.6}");
        Ok(out)
    }
}
