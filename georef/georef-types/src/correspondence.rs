//! Source/target coordinate pairs.

use nalgebra::{Point, Point2, Point3, SVector};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A paired source/target coordinate, optionally weighted by accuracy.
///
/// `accuracy` is the standard deviation of the observation. Weighted fits use
/// its inverse variance, `1 / accuracy²`, as the observation weight.
///
/// # Example
///
/// ```
/// use georef_types::{Correspondence, Point2};
///
/// let pair = Correspondence::new(Point2::new(0.0, 0.0), Point2::new(5.0, 5.0));
/// assert!(pair.accuracy.is_none());
/// assert!((pair.displacement().norm() - 50.0_f64.sqrt()).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Correspondence<const D: usize> {
    /// Position in the source space.
    pub source: Point<f64, D>,
    /// Observed position in the target space.
    pub target: Point<f64, D>,
    /// Standard deviation of the observation, if known.
    pub accuracy: Option<f64>,
}

/// A planar correspondence.
pub type Correspondence2 = Correspondence<2>;

/// A three-dimensional (typically geocentric) correspondence.
pub type Correspondence3 = Correspondence<3>;

impl<const D: usize> Correspondence<D> {
    /// Create an unweighted correspondence.
    #[inline]
    #[must_use]
    pub const fn new(source: Point<f64, D>, target: Point<f64, D>) -> Self {
        Self {
            source,
            target,
            accuracy: None,
        }
    }

    /// Attach a measurement accuracy (standard deviation).
    #[inline]
    #[must_use]
    pub const fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Inverse-variance weight derived from the accuracy.
    ///
    /// Returns `None` when no accuracy is attached.
    #[inline]
    #[must_use]
    pub fn weight(&self) -> Option<f64> {
        self.accuracy.map(|a| 1.0 / (a * a))
    }

    /// Whether the attached accuracy (if any) can be used as a weight.
    ///
    /// Accuracies must be finite and strictly positive.
    #[inline]
    #[must_use]
    pub fn has_usable_accuracy(&self) -> bool {
        self.accuracy.is_none_or(|a| a.is_finite() && a > 0.0)
    }

    /// Vector from source to target.
    #[inline]
    #[must_use]
    pub fn displacement(&self) -> SVector<f64, D> {
        self.target - self.source
    }

    /// Distance between a mapped source position and the observed target.
    ///
    /// # Example
    ///
    /// ```
    /// use georef_types::{Correspondence2, Point2};
    ///
    /// let pair = Correspondence2::from_coords(0.0, 0.0, 3.0, 4.0);
    /// assert!((pair.residual(&Point2::new(0.0, 0.0)) - 5.0).abs() < 1e-12);
    /// ```
    #[inline]
    #[must_use]
    pub fn residual(&self, mapped: &Point<f64, D>) -> f64 {
        (mapped.coords - self.target.coords).norm()
    }

    /// Swap source and target.
    #[inline]
    #[must_use]
    pub const fn reversed(&self) -> Self {
        Self {
            source: self.target,
            target: self.source,
            accuracy: self.accuracy,
        }
    }
}

impl Correspondence<2> {
    /// Create a planar correspondence from raw coordinates.
    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Point2::new is not const in nalgebra
    pub fn from_coords(sx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self::new(Point2::new(sx, sy), Point2::new(tx, ty))
    }
}

impl Correspondence<3> {
    /// Create a 3D correspondence from coordinate arrays.
    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Point3::new is not const in nalgebra
    pub fn from_arrays(source: [f64; 3], target: [f64; 3]) -> Self {
        Self::new(
            Point3::new(source[0], source[1], source[2]),
            Point3::new(target[0], target[1], target[2]),
        )
    }
}
