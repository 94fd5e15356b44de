//! The shared builder and transform interfaces.

use crate::error::EstimationResult;
use crate::family::TransformFamily;
use crate::statistics::{ErrorStatistics, log_residuals};
use georef_types::Correspondence;
use nalgebra::Point;
use std::fmt;

/// A fitted transform from source to target coordinates.
///
/// Transforms are immutable and can be evaluated concurrently.
pub trait CoordinateTransform<const D: usize>: fmt::Debug + Send + Sync {
    /// Maps a single source coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error if the point lies outside the transform's domain.
    fn transform_point(&self, point: &Point<f64, D>) -> EstimationResult<Point<f64, D>>;

    /// Maps a batch of source coordinates.
    ///
    /// # Errors
    ///
    /// Returns the first evaluation error; no partial output is returned.
    fn transform_points(&self, points: &[Point<f64, D>]) -> EstimationResult<Vec<Point<f64, D>>> {
        points.iter().map(|p| self.transform_point(p)).collect()
    }
}

/// Common contract of every transform builder.
///
/// Builders only differ in how they parameterise the fit; evaluation of
/// the residual statistics is shared.
pub trait TransformBuilder<const D: usize> {
    /// The fitted transform type.
    type Transform: CoordinateTransform<D>;

    /// Family of the builder.
    fn family(&self) -> TransformFamily;

    /// Correspondences the transform is fitted to.
    fn correspondences(&self) -> &[Correspondence<D>];

    /// Fits and returns the transform.
    ///
    /// # Errors
    ///
    /// Returns an error if weights are missing or the geometry is degenerate.
    fn transform(&self) -> EstimationResult<Self::Transform>;

    /// Residual statistics of the fitted transform over every correspondence.
    ///
    /// # Errors
    ///
    /// Returns an error if the fit fails.
    fn error_statistics(&self) -> EstimationResult<ErrorStatistics> {
        let transform = self.transform()?;
        let stats = ErrorStatistics::evaluate(&transform, self.correspondences())?;
        log_residuals(self.family(), &stats);
        Ok(stats)
    }

    /// Human-readable dump of the fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the fit fails.
    fn describe(&self) -> EstimationResult<String>;

    /// Fewest correspondences the builder accepts.
    fn minimum_point_count(&self) -> usize {
        self.family().minimum_point_count()
    }
}
