//! Residual statistics of a fitted transform.

// Point counts don't overflow in practice
#![allow(clippy::cast_precision_loss)]

use crate::error::EstimationResult;
use crate::family::TransformFamily;
use crate::traits::CoordinateTransform;
use georef_types::Correspondence;
use std::fmt;
use tracing::info;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Distances between mapped sources and observed targets.
///
/// # Example
///
/// ```
/// use georef_builder::ErrorStatistics;
///
/// let stats = ErrorStatistics::from_residuals(vec![3.0, 4.0]);
/// assert!((stats.rms() - 12.5_f64.sqrt()).abs() < 1e-12);
/// assert!((stats.max() - 4.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ErrorStatistics {
    residuals: Vec<f64>,
}

impl ErrorStatistics {
    /// Statistics over precomputed residual distances.
    #[must_use]
    pub const fn from_residuals(residuals: Vec<f64>) -> Self {
        Self { residuals }
    }

    /// Re-evaluates `transform` on every correspondence.
    ///
    /// # Errors
    ///
    /// Returns an error if any source cannot be evaluated.
    pub fn evaluate<const D: usize, T: CoordinateTransform<D> + ?Sized>(
        transform: &T,
        correspondences: &[Correspondence<D>],
    ) -> EstimationResult<Self> {
        let residuals = correspondences
            .iter()
            .map(|c| transform.transform_point(&c.source).map(|m| c.residual(&m)))
            .collect::<EstimationResult<Vec<_>>>()?;
        Ok(Self { residuals })
    }

    /// Root-mean-square residual, `sqrt(Σ r² / n)`. Zero when empty.
    #[must_use]
    pub fn rms(&self) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self.residuals.iter().map(|r| r * r).sum();
        (sum_sq / self.residuals.len() as f64).sqrt()
    }

    /// Mean residual. Zero when empty.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        self.residuals.iter().sum::<f64>() / self.residuals.len() as f64
    }

    /// Largest residual. Zero when empty.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.residuals.iter().copied().fold(0.0, f64::max)
    }

    /// Per-correspondence residuals, in input order.
    #[must_use]
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Number of evaluated correspondences.
    #[must_use]
    pub fn count(&self) -> usize {
        self.residuals.len()
    }
}

/// Logs a completed fit.
pub(crate) fn log_fit(family: TransformFamily, points: usize) {
    info!(family = family.name(), points, "Transform fitted");
}

/// Logs the residual summary of a fit.
pub(crate) fn log_residuals(family: TransformFamily, stats: &ErrorStatistics) {
    info!(
        family = family.name(),
        points = stats.count(),
        rms = stats.rms(),
        max = stats.max(),
        "Residuals evaluated"
    );
}

impl fmt::Display for ErrorStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Residuals over {} points: rms {:.6}, mean {:.6}, max {:.6}",
            self.count(),
            self.rms(),
            self.mean(),
            self.max()
        )
    }
}
