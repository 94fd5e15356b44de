//! Similarity normalisation of planar point sets.
//!
//! Points are shifted to their centroid and scaled so the mean distance from
//! it is √2. Fitting in normalised space and mapping the result back keeps
//! the normal equations well conditioned for large coordinates.

use nalgebra::{Matrix3, Point2};
use std::f64::consts::SQRT_2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Normalization {
    center: Point2<f64>,
    scale: f64,
}

impl Normalization {
    pub(crate) fn from_points<'a>(points: impl Iterator<Item = &'a Point2<f64>> + Clone) -> Self {
        let mut count = 0_usize;
        let mut sum = nalgebra::Vector2::zeros();
        for p in points.clone() {
            sum += p.coords;
            count += 1;
        }
        if count == 0 {
            return Self {
                center: Point2::origin(),
                scale: 1.0,
            };
        }
        #[allow(clippy::cast_precision_loss)]
        let n = count as f64;
        let center = Point2::from(sum / n);
        let mean_distance = points.map(|p| (p - center).norm()).sum::<f64>() / n;
        let scale = if mean_distance > 0.0 && mean_distance.is_finite() {
            SQRT_2 / mean_distance
        } else {
            1.0
        };
        Self { center, scale }
    }

    pub(crate) fn apply(&self, point: &Point2<f64>) -> Point2<f64> {
        Point2::from((point - self.center) * self.scale)
    }

    /// Homogeneous matrix taking original to normalised coordinates.
    pub(crate) fn matrix(&self) -> Matrix3<f64> {
        let s = self.scale;
        Matrix3::new(
            s,
            0.0,
            -s * self.center.x,
            0.0,
            s,
            -s * self.center.y,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Homogeneous matrix taking normalised back to original coordinates.
    pub(crate) fn inverse_matrix(&self) -> Matrix3<f64> {
        let inv = 1.0 / self.scale;
        Matrix3::new(
            inv,
            0.0,
            self.center.x,
            0.0,
            inv,
            self.center.y,
            0.0,
            0.0,
            1.0,
        )
    }
}
