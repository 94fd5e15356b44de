//! TIN triangles and their circumcircles.

use nalgebra::Point2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Twice the signed area of triangle `abc`.
///
/// Positive when `a`, `b`, `c` turn counter-clockwise.
///
/// # Example
///
/// ```
/// use georef_tin::orient2d;
/// use georef_types::Point2;
///
/// let a = Point2::new(0.0, 0.0);
/// let b = Point2::new(1.0, 0.0);
/// assert!(orient2d(&a, &b, &Point2::new(0.0, 1.0)) > 0.0);
/// assert!(orient2d(&a, &b, &Point2::new(0.0, -1.0)) < 0.0);
/// ```
#[inline]
#[must_use]
pub fn orient2d(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    let ab = b - a;
    let ac = c - a;
    ab.x * ac.y - ab.y * ac.x
}

/// Circle through the three vertices of a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Circumcircle {
    /// Center of the circle.
    pub center: Point2<f64>,
    /// Squared radius. Infinite for collinear vertices.
    pub radius_squared: f64,
}

impl Circumcircle {
    /// Circumcircle of three points.
    ///
    /// Collinear points yield an infinite radius centred on their centroid,
    /// so every other point tests as inside.
    ///
    /// # Example
    ///
    /// ```
    /// use georef_tin::Circumcircle;
    /// use georef_types::Point2;
    ///
    /// let circle = Circumcircle::through(
    ///     &Point2::new(0.0, 0.0),
    ///     &Point2::new(2.0, 0.0),
    ///     &Point2::new(0.0, 2.0),
    /// );
    /// assert!((circle.center.x - 1.0).abs() < 1e-12);
    /// assert!((circle.radius_squared - 2.0).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn through(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> Self {
        // Relative to `a` to keep precision for large coordinates
        let ab = b - a;
        let ac = c - a;
        let d = 2.0 * (ab.x * ac.y - ab.y * ac.x);
        if d == 0.0 || !d.is_finite() {
            return Self {
                center: Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0),
                radius_squared: f64::INFINITY,
            };
        }
        let ab2 = ab.norm_squared();
        let ac2 = ac.norm_squared();
        let ux = (ac.y * ab2 - ab.y * ac2) / d;
        let uy = (ab.x * ac2 - ac.x * ab2) / d;
        Self {
            center: Point2::new(a.x + ux, a.y + uy),
            radius_squared: ux * ux + uy * uy,
        }
    }

    /// Radius of the circle.
    #[inline]
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius_squared.sqrt()
    }

    /// Whether `point` lies strictly inside, by more than `tolerance`.
    ///
    /// `tolerance` is in squared length units; points within it of the
    /// circle count as on the circle, not inside.
    #[inline]
    #[must_use]
    pub fn contains_strictly(&self, point: &Point2<f64>, tolerance: f64) -> bool {
        (point - self.center).norm_squared() < self.radius_squared - tolerance
    }
}

/// A triangle of the TIN, stored by index into the mesh arenas.
///
/// Vertices are in counter-clockwise order. Neighbour `i` is the triangle
/// across the edge opposite vertex `i`, or `None` on the quadrilateral
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TinTriangle {
    vertices: [usize; 3],
    neighbors: [Option<usize>; 3],
    circumcircle: Circumcircle,
}

impl TinTriangle {
    pub(crate) fn new(
        vertices: [usize; 3],
        neighbors: [Option<usize>; 3],
        positions: [&Point2<f64>; 3],
    ) -> Self {
        Self {
            vertices,
            neighbors,
            circumcircle: Circumcircle::through(positions[0], positions[1], positions[2]),
        }
    }

    /// Vertex indices in counter-clockwise order.
    #[inline]
    #[must_use]
    pub const fn vertices(&self) -> [usize; 3] {
        self.vertices
    }

    /// Neighbouring triangle indices.
    #[inline]
    #[must_use]
    pub const fn neighbors(&self) -> [Option<usize>; 3] {
        self.neighbors
    }

    /// Cached circumcircle.
    #[inline]
    #[must_use]
    pub const fn circumcircle(&self) -> &Circumcircle {
        &self.circumcircle
    }

    /// Local position (0..3) of a mesh vertex in this triangle.
    #[inline]
    #[must_use]
    pub fn local_index(&self, vertex: usize) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }

    /// Local edge (0..3) shared with a neighbouring triangle.
    #[inline]
    #[must_use]
    pub fn neighbor_index(&self, triangle: usize) -> Option<usize> {
        self.neighbors.iter().position(|&n| n == Some(triangle))
    }

    /// Whether the triangle lies on the quadrilateral boundary.
    #[inline]
    #[must_use]
    pub fn is_boundary(&self) -> bool {
        self.neighbors.iter().any(Option::is_none)
    }

    pub(crate) fn replace_neighbor(&mut self, old: usize, new: usize) {
        for neighbor in &mut self.neighbors {
            if *neighbor == Some(old) {
                *neighbor = Some(new);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_orient_collinear() {
        let o = orient2d(
            &Point2::new(0.0, 0.0),
            &Point2::new(1.0, 1.0),
            &Point2::new(2.0, 2.0),
        );
        assert_relative_eq!(o, 0.0);
    }

    #[test]
    fn test_circumcircle_equidistant() {
        let a = Point2::new(1000.0, 2000.0);
        let b = Point2::new(1003.0, 2001.0);
        let c = Point2::new(999.0, 2004.0);
        let circle = Circumcircle::through(&a, &b, &c);
        let r2 = circle.radius_squared;
        assert_relative_eq!((a - circle.center).norm_squared(), r2, epsilon = 1e-8);
        assert_relative_eq!((b - circle.center).norm_squared(), r2, epsilon = 1e-8);
        assert_relative_eq!((c - circle.center).norm_squared(), r2, epsilon = 1e-8);
    }

    #[test]
    fn test_collinear_circle_is_infinite() {
        let circle = Circumcircle::through(
            &Point2::new(0.0, 0.0),
            &Point2::new(1.0, 0.0),
            &Point2::new(2.0, 0.0),
        );
        assert!(circle.radius_squared.is_infinite());
        assert!(circle.contains_strictly(&Point2::new(100.0, 100.0), 0.0));
    }

    #[test]
    fn test_contains_strictly_excludes_boundary() {
        let circle = Circumcircle::through(
            &Point2::new(-1.0, 0.0),
            &Point2::new(1.0, 0.0),
            &Point2::new(0.0, 1.0),
        );
        assert_relative_eq!(circle.radius(), 1.0, epsilon = 1e-12);
        assert!(circle.contains_strictly(&Point2::new(0.0, 0.0), 1e-12));
        assert!(!circle.contains_strictly(&Point2::new(0.0, -1.0), 1e-12));
        assert!(!circle.contains_strictly(&Point2::new(3.0, 0.0), 1e-12));
    }

    #[test]
    fn test_triangle_lookup() {
        let p = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        let tri = TinTriangle::new([4, 7, 9], [None, Some(3), None], [&p[0], &p[1], &p[2]]);
        assert_eq!(tri.local_index(7), Some(1));
        assert_eq!(tri.local_index(5), None);
        assert_eq!(tri.neighbor_index(3), Some(1));
        assert!(tri.is_boundary());
    }
}
