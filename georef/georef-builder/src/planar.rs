//! Fitting a planar family chosen at runtime.

use crate::advanced_affine::AdvancedAffineBuilder;
use crate::affine::{AffineBuilder, AffineTransform2};
use crate::error::{EstimationError, EstimationResult};
use crate::family::TransformFamily;
use crate::params::FitOptions;
use crate::projective::{ProjectiveBuilder, ProjectiveTransform2};
use crate::rubber_sheet::{RubberSheetBuilder, RubberSheetTransform};
use crate::similarity::{SimilarityBuilder, SimilarityTransform2};
use crate::traits::{CoordinateTransform, TransformBuilder};
use georef_types::{Bounds2, Correspondence2};
use nalgebra::{Matrix3, Point2, Vector2};

/// A fitted planar transform of any family.
#[derive(Debug, Clone)]
pub enum PlanarTransform {
    /// Six-parameter affine.
    Affine(AffineTransform2),
    /// Four-parameter similarity.
    Similarity(SimilarityTransform2),
    /// Eight-parameter homography.
    Projective(ProjectiveTransform2),
    /// Affine fitted through its decomposition.
    AdvancedAffine(AffineTransform2),
    /// Piecewise affine over a TIN.
    RubberSheet(RubberSheetTransform),
}

impl PlanarTransform {
    /// Family the transform was fitted as.
    #[must_use]
    pub const fn family(&self) -> TransformFamily {
        match self {
            Self::Affine(_) => TransformFamily::Affine,
            Self::Similarity(_) => TransformFamily::Similarity,
            Self::Projective(_) => TransformFamily::Projective,
            Self::AdvancedAffine(_) => TransformFamily::AdvancedAffine,
            Self::RubberSheet(_) => TransformFamily::RubberSheet,
        }
    }

    /// Homogeneous matrix of a global transform; `None` for rubber sheets.
    #[must_use]
    pub fn to_matrix3(&self) -> Option<Matrix3<f64>> {
        match self {
            Self::Affine(t) | Self::AdvancedAffine(t) => Some(t.to_matrix3()),
            Self::Similarity(t) => Some(t.to_matrix3()),
            Self::Projective(t) => Some(t.to_matrix3()),
            Self::RubberSheet(_) => None,
        }
    }
}

impl CoordinateTransform<2> for PlanarTransform {
    fn transform_point(&self, point: &Point2<f64>) -> EstimationResult<Point2<f64>> {
        match self {
            Self::Affine(t) | Self::AdvancedAffine(t) => t.transform_point(point),
            Self::Similarity(t) => t.transform_point(point),
            Self::Projective(t) => t.transform_point(point),
            Self::RubberSheet(t) => t.transform_point(point),
        }
    }
}

/// Fits `family` to planar correspondences.
///
/// Rubber sheets use `options.boundary` when set; otherwise the source
/// bounds are padded by `options.boundary_margin` of their diagonal and the
/// corner targets predicted by an affine fit.
///
/// # Errors
///
/// Returns `InvalidParameter` for the three-dimensional Bursa-Wolf family
/// and otherwise any error of the family's builder.
///
/// # Example
///
/// ```
/// use georef_builder::{fit_planar, CoordinateTransform, Correspondence2, FitOptions, TransformFamily};
/// use nalgebra::Point2;
///
/// let pairs: Vec<_> = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]
///     .iter()
///     .map(|&(x, y)| Correspondence2::from_coords(x, y, x + 100.0, y + 200.0))
///     .collect();
///
/// for family in [TransformFamily::Affine, TransformFamily::Similarity, TransformFamily::Projective] {
///     let transform = fit_planar(family, &pairs, &FitOptions::default()).unwrap();
///     let p = transform.transform_point(&Point2::new(5.0, 5.0)).unwrap();
///     assert!((p.x - 105.0).abs() < 1e-9 && (p.y - 205.0).abs() < 1e-9);
/// }
/// ```
pub fn fit_planar(
    family: TransformFamily,
    correspondences: &[Correspondence2],
    options: &FitOptions,
) -> EstimationResult<PlanarTransform> {
    let pairs = correspondences.to_vec();
    match family {
        TransformFamily::Affine => AffineBuilder::new(pairs)?
            .include_weights(options.weighted)
            .with_solver_params(options.solver)
            .transform()
            .map(PlanarTransform::Affine),
        TransformFamily::Similarity => SimilarityBuilder::new(pairs)?
            .include_weights(options.weighted)
            .with_solver_params(options.solver)
            .transform()
            .map(PlanarTransform::Similarity),
        TransformFamily::Projective => ProjectiveBuilder::new(pairs)?
            .include_weights(options.weighted)
            .with_solver_params(options.solver)
            .transform()
            .map(PlanarTransform::Projective),
        TransformFamily::AdvancedAffine => AdvancedAffineBuilder::new(pairs)?
            .include_weights(options.weighted)
            .with_solver_params(options.solver)
            .transform()
            .map(PlanarTransform::AdvancedAffine),
        TransformFamily::RubberSheet => {
            let builder = match options.boundary {
                Some(quad) => RubberSheetBuilder::with_params(pairs, quad, &options.tin)?,
                None => {
                    let corners = padded_corners(correspondences, options.boundary_margin);
                    RubberSheetBuilder::with_fitted_corners(pairs, corners, &options.tin)?
                }
            };
            builder
                .include_weights(options.weighted)
                .transform()
                .map(PlanarTransform::RubberSheet)
        }
        TransformFamily::BursaWolf => Err(EstimationError::InvalidParameter(
            "Bursa-Wolf is a 3D family; use BursaWolfBuilder".to_string(),
        )),
    }
}

/// Counter-clockwise corners of the source bounds, grown by `margin` times
/// their diagonal on every side.
fn padded_corners(correspondences: &[Correspondence2], margin: f64) -> [Point2<f64>; 4] {
    let bounds = Bounds2::from_points(correspondences.iter().map(|c| &c.source));
    let pad = Vector2::repeat(margin * bounds.diagonal());
    let (min, max) = (bounds.min - pad, bounds.max + pad);
    [
        min,
        Point2::new(max.x, min.y),
        max,
        Point2::new(min.x, max.y),
    ]
}
