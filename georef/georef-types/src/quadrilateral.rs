//! Four-corner boundary of a rubber-sheet domain.

use crate::{Bounds2, Correspondence2};
use nalgebra::Point2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Four corner correspondences in cyclic order.
///
/// The quadrilateral bounds the triangulation domain in source space; every
/// interior vertex must lie within or on it. Geometric validity (non-zero
/// area, convexity, no self-intersection) is checked by the triangulation
/// engine, which reports it as a triangulation error.
///
/// # Example
///
/// ```
/// use georef_types::{Correspondence2, Quadrilateral};
///
/// let quad = Quadrilateral::new([
///     Correspondence2::from_coords(0.0, 0.0, 0.0, 0.0),
///     Correspondence2::from_coords(0.0, 1.0, 0.0, 1.0),
///     Correspondence2::from_coords(1.0, 1.0, 1.0, 1.0),
///     Correspondence2::from_coords(1.0, 0.0, 1.0, 0.0),
/// ]);
///
/// // Clockwise input is reported with a negative area
/// assert!(quad.signed_area() < 0.0);
/// assert!(quad.to_counter_clockwise().signed_area() > 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quadrilateral {
    corners: [Correspondence2; 4],
}

impl Quadrilateral {
    /// Create a quadrilateral from four corners in cyclic order.
    #[inline]
    #[must_use]
    pub const fn new(corners: [Correspondence2; 4]) -> Self {
        Self { corners }
    }

    /// Create a quadrilateral from `(source, target)` coordinate pairs.
    #[must_use]
    pub fn from_source_and_target(corners: [([f64; 2], [f64; 2]); 4]) -> Self {
        Self {
            corners: corners
                .map(|(s, t)| Correspondence2::new(Point2::new(s[0], s[1]), Point2::new(t[0], t[1]))),
        }
    }

    /// The four corner correspondences.
    #[inline]
    #[must_use]
    pub const fn corners(&self) -> &[Correspondence2; 4] {
        &self.corners
    }

    /// Corner positions in source space.
    #[must_use]
    pub fn source_corners(&self) -> [Point2<f64>; 4] {
        self.corners.map(|c| c.source)
    }

    /// Shoelace area of the source polygon.
    ///
    /// Positive for counter-clockwise order, negative for clockwise.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        let p = self.source_corners();
        let mut twice = 0.0;
        for i in 0..4 {
            let a = p[i];
            let b = p[(i + 1) % 4];
            twice += a.x * b.y - b.x * a.y;
        }
        twice * 0.5
    }

    /// The same quadrilateral with corners in counter-clockwise order.
    ///
    /// Corner 0 is kept in place; only the traversal direction changes.
    #[must_use]
    pub fn to_counter_clockwise(&self) -> Self {
        if self.signed_area() < 0.0 {
            let [a, b, c, d] = self.corners;
            Self::new([a, d, c, b])
        } else {
            *self
        }
    }

    /// Source-space bounds of the corners.
    #[must_use]
    pub fn bounds(&self) -> Bounds2 {
        Bounds2::from_points(self.corners.iter().map(|c| &c.source))
    }
}
