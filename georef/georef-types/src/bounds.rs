//! Planar axis-aligned bounds.

use nalgebra::{Point2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A planar axis-aligned bounding box.
///
/// Used to derive scale-aware tolerances for geometric predicates.
///
/// # Example
///
/// ```
/// use georef_types::{Bounds2, Point2};
///
/// let bounds = Bounds2::from_points([Point2::new(0.0, 0.0), Point2::new(3.0, 4.0)].iter());
/// assert!((bounds.diagonal() - 5.0).abs() < 1e-12);
/// assert!(bounds.contains(&Point2::new(1.0, 1.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds2 {
    /// Minimum corner.
    pub min: Point2<f64>,
    /// Maximum corner.
    pub max: Point2<f64>,
}

impl Bounds2 {
    /// Create bounds from two corners, correcting inverted axes.
    #[must_use]
    pub fn new(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self {
            min: Point2::new(min.x.min(max.x), min.y.min(max.y)),
            max: Point2::new(min.x.max(max.x), min.y.max(max.y)),
        }
    }

    /// Create empty bounds (min > max), ready to be expanded.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Point2::new is not const in nalgebra
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Create bounds enclosing every point of an iterator.
    ///
    /// Returns empty bounds if the iterator is empty.
    #[must_use]
    pub fn from_points<'a>(points: impl Iterator<Item = &'a Point2<f64>>) -> Self {
        let mut bounds = Self::empty();
        for point in points {
            bounds.expand_to_include(point);
        }
        bounds
    }

    /// Whether no point has been included yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Grow the bounds to include a point.
    pub fn expand_to_include(&mut self, point: &Point2<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// Width and height.
    ///
    /// Returns zero size for empty bounds.
    #[must_use]
    pub fn size(&self) -> Vector2<f64> {
        if self.is_empty() {
            Vector2::zeros()
        } else {
            self.max - self.min
        }
    }

    /// Length of the diagonal.
    #[inline]
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        self.size().norm()
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Point2<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Whether a point lies inside or on the boundary.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

impl Default for Bounds2 {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_bounds() {
        let bounds = Bounds2::empty();
        assert!(bounds.is_empty());
        assert_relative_eq!(bounds.diagonal(), 0.0);
    }

    #[test]
    fn test_new_corrects_inverted_corners() {
        let bounds = Bounds2::new(Point2::new(5.0, 5.0), Point2::new(0.0, 1.0));
        assert_relative_eq!(bounds.min.x, 0.0);
        assert_relative_eq!(bounds.min.y, 1.0);
        assert_relative_eq!(bounds.max.x, 5.0);
        assert_relative_eq!(bounds.max.y, 5.0);
    }

    #[test]
    fn test_contains_boundary() {
        let bounds = Bounds2::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        assert!(bounds.contains(&Point2::new(10.0, 0.0)));
        assert!(!bounds.contains(&Point2::new(10.0 + 1e-9, 0.0)));
        assert_relative_eq!(bounds.center().x, 5.0);
    }
}
