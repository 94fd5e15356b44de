//! Piecewise-affine ("rubber sheet") transform over a Delaunay TIN.
//!
//! The quadrilateral corners and every correspondence become mesh vertices.
//! Each triangle carries the affine map fitted exactly through its three
//! vertices, so the transform interpolates every correspondence and is
//! continuous across triangle edges.

use crate::affine::{AffineBuilder, AffineModel, AffineTransform2};
use crate::checks::{check_input, point_weights};
use crate::error::{EstimationError, EstimationResult};
use crate::family::TransformFamily;
use crate::linear::fit_linear;
use crate::params::SolverParams;
use crate::statistics::log_fit;
use crate::traits::{CoordinateTransform, TransformBuilder};
use georef_tin::{Tin, TinParams, triangulate};
use georef_types::{Correspondence2, Quadrilateral};
use nalgebra::Point2;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

/// Builder for [`RubberSheetTransform`].
///
/// The mesh is triangulated when the builder is created, so boundary and
/// vertex problems surface immediately as `Triangulation` errors.
///
/// # Example
///
/// ```
/// use georef_builder::{
///     CoordinateTransform, Correspondence2, Quadrilateral, RubberSheetBuilder, TransformBuilder,
/// };
/// use nalgebra::Point2;
///
/// let quad = Quadrilateral::from_source_and_target([
///     ([0.0, 0.0], [0.0, 0.0]),
///     ([100.0, 0.0], [100.0, 0.0]),
///     ([100.0, 100.0], [100.0, 100.0]),
///     ([0.0, 100.0], [0.0, 100.0]),
/// ]);
/// let pairs = vec![Correspondence2::from_coords(50.0, 50.0, 52.0, 49.0)];
///
/// let builder = RubberSheetBuilder::new(pairs, quad).unwrap();
/// let transform = builder.transform().unwrap();
///
/// let p = transform.transform_point(&Point2::new(50.0, 50.0)).unwrap();
/// assert!((p.x - 52.0).abs() < 1e-9);
/// assert!(transform.transform_point(&Point2::new(150.0, 50.0)).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RubberSheetBuilder {
    interior: Vec<Correspondence2>,
    tin: Arc<Tin>,
    weighted: bool,
}

impl RubberSheetBuilder {
    /// Triangulates `correspondences` inside `quad` with default parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccuracy` for unusable accuracies and `Triangulation`
    /// when the quadrilateral is degenerate or non-convex, a vertex lies
    /// outside it, or two vertices coincide.
    pub fn new(correspondences: Vec<Correspondence2>, quad: Quadrilateral) -> EstimationResult<Self> {
        Self::with_params(correspondences, quad, &TinParams::default())
    }

    /// Triangulates `correspondences` inside `quad` with explicit parameters.
    ///
    /// # Errors
    ///
    /// See [`RubberSheetBuilder::new`].
    pub fn with_params(
        correspondences: Vec<Correspondence2>,
        quad: Quadrilateral,
        params: &TinParams,
    ) -> EstimationResult<Self> {
        check_input(TransformFamily::RubberSheet, &correspondences)?;
        let tin = triangulate(&quad, &correspondences, params)?;
        Ok(Self {
            interior: correspondences,
            tin: Arc::new(tin),
            weighted: false,
        })
    }

    /// Builds the boundary from source-space corners whose targets are
    /// predicted by an affine fit of the correspondences.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` with fewer than three correspondences,
    /// any error of the affine fit, and the errors of
    /// [`RubberSheetBuilder::with_params`].
    pub fn with_fitted_corners(
        correspondences: Vec<Correspondence2>,
        corners: [Point2<f64>; 4],
        params: &TinParams,
    ) -> EstimationResult<Self> {
        let required = TransformFamily::Affine.minimum_point_count();
        if correspondences.len() < required {
            return Err(EstimationError::InsufficientData {
                family: TransformFamily::RubberSheet,
                required,
                provided: correspondences.len(),
            });
        }
        let affine = AffineBuilder::new(correspondences.clone())?.transform()?;
        let quad = Quadrilateral::new(corners.map(|c| Correspondence2::new(c, affine.apply(&c))));
        debug!(corners = ?quad.corners(), "Fitted rubber-sheet corners");
        Self::with_params(correspondences, quad, params)
    }

    /// Requires accuracies on every interior correspondence.
    ///
    /// Triangle fits are exactly determined, so weights never change the
    /// result; only their presence is checked.
    #[must_use]
    pub const fn include_weights(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    /// The triangulated mesh.
    #[must_use]
    pub fn tin(&self) -> &Tin {
        &self.tin
    }

    /// Correspondences supplied by the caller, without the corners.
    #[must_use]
    pub fn interior(&self) -> &[Correspondence2] {
        &self.interior
    }
}

/// Solver settings for the per-triangle fits.
///
/// The mesh already rejects triangles below its area tolerance, so only
/// numerically singular triangles are refused here.
fn triangle_solver() -> SolverParams {
    SolverParams::default().with_singularity_tolerance(f64::EPSILON * f64::EPSILON)
}

impl TransformBuilder<2> for RubberSheetBuilder {
    type Transform = RubberSheetTransform;

    fn family(&self) -> TransformFamily {
        TransformFamily::RubberSheet
    }

    /// Every mesh vertex, corners included.
    fn correspondences(&self) -> &[Correspondence2] {
        self.tin.vertices()
    }

    fn transform(&self) -> EstimationResult<RubberSheetTransform> {
        point_weights(&self.interior, self.weighted)?;

        let solver = triangle_solver();
        let unit = [1.0; 3];
        let maps = (0..self.tin.triangle_count())
            .map(|t| {
                let corners = self.tin.correspondences(t).ok_or_else(|| {
                    EstimationError::DegenerateGeometry(format!("triangle {t} is missing"))
                })?;
                let corners = corners.map(|c| *c);
                let matrix = fit_linear::<AffineModel>(&corners, &unit, &solver)?;
                Ok(AffineTransform2::from_matrix3(&matrix))
            })
            .collect::<EstimationResult<Vec<_>>>()?;
        debug!(triangles = maps.len(), "Fitted triangle maps");

        let transform = RubberSheetTransform {
            tin: Arc::clone(&self.tin),
            maps,
        };
        log_fit(self.family(), self.tin.vertex_count());
        Ok(transform)
    }

    fn describe(&self) -> EstimationResult<String> {
        let transform = self.transform()?;
        let mut out = format!(
            "Rubber sheet ({} vertices, {} triangles)\n",
            self.tin.vertex_count(),
            self.tin.triangle_count()
        );
        for (t, (triangle, map)) in self.tin.triangles().iter().zip(&transform.maps).enumerate() {
            let [a0, a1, a2, b0, b1, b2] = map.coefficients();
            let [i, j, k] = triangle.vertices();
            let _ = writeln!(out, "  triangle {t} [{i}, {j}, {k}]");
            let _ = writeln!(out, "    X = {a0:.9}*x + {a1:.9}*y + {a2:.6}");
            let _ = writeln!(out, "    Y = {b0:.9}*x + {b1:.9}*y + {b2:.6}");
        }
        Ok(out)
    }
}

/// A piecewise-affine transform defined on the triangulated hull.
#[derive(Debug, Clone)]
pub struct RubberSheetTransform {
    tin: Arc<Tin>,
    maps: Vec<AffineTransform2>,
}

impl RubberSheetTransform {
    /// The underlying mesh.
    #[must_use]
    pub fn tin(&self) -> &Tin {
        &self.tin
    }

    /// Affine map of one triangle.
    #[must_use]
    pub fn triangle_transform(&self, triangle: usize) -> Option<&AffineTransform2> {
        self.maps.get(triangle)
    }
}

impl CoordinateTransform<2> for RubberSheetTransform {
    fn transform_point(&self, point: &Point2<f64>) -> EstimationResult<Point2<f64>> {
        let map = self
            .tin
            .locate(point)
            .and_then(|t| self.maps.get(t))
            .ok_or(EstimationError::EvaluationOutOfDomain {
                x: point.x,
                y: point.y,
            })?;
        Ok(map.apply(point))
    }
}
