//! Four-parameter planar similarity (Helmert) transform.
//!
//! ```text
//! X = a·x − b·y + cx
//! Y = b·x + a·y + cy
//! ```
//!
//! The scale is `sqrt(a² + b²)` and the rotation `atan2(b, a)`.

use crate::checks::{check_input, point_weights};
use crate::error::{EstimationError, EstimationResult};
use crate::family::TransformFamily;
use crate::linear::{LinearModel, fit_linear};
use crate::params::SolverParams;
use crate::statistics::log_fit;
use crate::traits::{CoordinateTransform, TransformBuilder};
use georef_types::Correspondence2;
use nalgebra::{DVector, Matrix3, Point2, Vector2};
use std::fmt::Write as _;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Design rows of the similarity family, parameters `[a, b, cx, cy]`.
pub(crate) struct SimilarityModel;

impl LinearModel for SimilarityModel {
    const PARAMETERS: usize = 4;

    fn design_rows(
        source: &Point2<f64>,
        target: &Point2<f64>,
        row_x: &mut [f64],
        row_y: &mut [f64],
    ) -> (f64, f64) {
        row_x[0] = source.x;
        row_x[1] = -source.y;
        row_x[2] = 1.0;
        row_y[0] = source.y;
        row_y[1] = source.x;
        row_y[3] = 1.0;
        (target.x, target.y)
    }

    fn matrix(p: &DVector<f64>) -> Matrix3<f64> {
        Matrix3::new(p[0], -p[1], p[2], p[1], p[0], p[3], 0.0, 0.0, 1.0)
    }
}

/// A fitted planar similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimilarityTransform2 {
    /// `scale · cos(rotation)`.
    pub a: f64,
    /// `scale · sin(rotation)`.
    pub b: f64,
    /// Translation.
    pub translation: Vector2<f64>,
}

impl SimilarityTransform2 {
    /// Creates a similarity from its raw coefficients.
    #[must_use]
    pub const fn new(a: f64, b: f64, translation: Vector2<f64>) -> Self {
        Self { a, b, translation }
    }

    /// Creates a similarity from scale, rotation (radians, counter-clockwise)
    /// and translation.
    #[must_use]
    pub fn from_scale_rotation(scale: f64, rotation: f64, translation: Vector2<f64>) -> Self {
        let (sin, cos) = rotation.sin_cos();
        Self::new(scale * cos, scale * sin, translation)
    }

    /// The identity map.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, Vector2::zeros())
    }

    /// Uniform scale factor.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// Rotation angle in radians.
    #[must_use]
    pub fn rotation(&self) -> f64 {
        self.b.atan2(self.a)
    }

    /// Homogeneous 3×3 matrix of the map.
    #[must_use]
    pub fn to_matrix3(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.a,
            -self.b,
            self.translation.x,
            self.b,
            self.a,
            self.translation.y,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Maps a point.
    #[must_use]
    pub fn apply(&self, point: &Point2<f64>) -> Point2<f64> {
        Point2::new(
            self.a * point.x - self.b * point.y + self.translation.x,
            self.b * point.x + self.a * point.y + self.translation.y,
        )
    }

    /// The inverse similarity.
    ///
    /// # Errors
    ///
    /// Returns `DegenerateGeometry` if the scale is zero.
    pub fn inverse(&self) -> EstimationResult<Self> {
        let norm = self.a * self.a + self.b * self.b;
        if norm <= f64::MIN_POSITIVE || !norm.is_finite() {
            return Err(EstimationError::DegenerateGeometry(
                "similarity has zero scale".to_string(),
            ));
        }
        let a = self.a / norm;
        let b = -self.b / norm;
        let t = &self.translation;
        let translation = Vector2::new(-(a * t.x - b * t.y), -(b * t.x + a * t.y));
        Ok(Self::new(a, b, translation))
    }
}

impl CoordinateTransform<2> for SimilarityTransform2 {
    fn transform_point(&self, point: &Point2<f64>) -> EstimationResult<Point2<f64>> {
        Ok(self.apply(point))
    }
}

/// Least-squares builder for [`SimilarityTransform2`].
#[derive(Debug, Clone)]
pub struct SimilarityBuilder {
    correspondences: Vec<Correspondence2>,
    weighted: bool,
    solver: SolverParams,
}

impl SimilarityBuilder {
    /// Creates a builder over at least three correspondences.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` with fewer than three correspondences and
    /// `InvalidAccuracy` when an accuracy cannot be used as a weight.
    pub fn new(correspondences: Vec<Correspondence2>) -> EstimationResult<Self> {
        check_input(TransformFamily::Similarity, &correspondences)?;
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

    fn fit(&self) -> EstimationResult<SimilarityTransform2> {
        let weights = point_weights(&self.correspondences, self.weighted)?;
        let m = fit_linear::<SimilarityModel>(&self.correspondences, &weights, &self.solver)?;
        // Denormalisation keeps the similarity structure
        Ok(SimilarityTransform2::new(
            m[(0, 0)],
            m[(1, 0)],
            Vector2::new(m[(0, 2)], m[(1, 2)]),
        ))
    }
}

impl TransformBuilder<2> for SimilarityBuilder {
    type Transform = SimilarityTransform2;

    fn family(&self) -> TransformFamily {
        TransformFamily::Similarity
    }

    fn correspondences(&self) -> &[Correspondence2] {
        &self.correspondences
    }

    fn transform(&self) -> EstimationResult<SimilarityTransform2> {
        let transform = self.fit()?;
        log_fit(self.family(), self.correspondences.len());
        Ok(transform)
    }

    fn describe(&self) -> EstimationResult<String> {
        let t = self.fit()?;
        let mut out = format!("Similarity ({} points)\n", self.correspondences.len());
        let _ = writeln!(out, "  X = a*x - b*y + cx");
        let _ = writeln!(out, "  Y = b*x + a*y + cy");
        let _ = writeln!(out, "    a  = {:.9}\n    b  = {:.9}", t.a, t.b);
        let _ = writeln!(
            out,
            "    cx = {:.6}\n    cy = {:.6}",
            t.translation.x, t.translation.y
        );
        let _ = writeln!(
            out,
            "  scale = {:.9}, rotation = {:.9} rad",
            t.scale(),
            t.rotation()
        );
        Ok(out)
    }
}
