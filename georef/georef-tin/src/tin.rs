//! The immutable triangulated irregular network.

use crate::triangle::{TinTriangle, orient2d};
use georef_types::{Bounds2, Correspondence2};
use nalgebra::Point2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A Delaunay triangle mesh covering a quadrilateral.
///
/// The vertex arena holds correspondences; the first four are the
/// quadrilateral corners in counter-clockwise order, followed by the interior
/// vertices in insertion order. Triangles reference vertices and each other
/// by index.
///
/// A `Tin` is only produced by [`triangulate`](crate::triangulate) and never
/// changes afterwards.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tin {
    vertices: Vec<Correspondence2>,
    triangles: Vec<TinTriangle>,
    bounds: Bounds2,
    area_tolerance: f64,
}

/// Number of boundary corner vertices at the start of the vertex arena.
pub const CORNER_COUNT: usize = 4;

impl Tin {
    pub(crate) const fn from_parts(
        vertices: Vec<Correspondence2>,
        triangles: Vec<TinTriangle>,
        bounds: Bounds2,
        area_tolerance: f64,
    ) -> Self {
        Self {
            vertices,
            triangles,
            bounds,
            area_tolerance,
        }
    }

    /// All mesh vertices (corners first).
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[Correspondence2] {
        &self.vertices
    }

    /// A vertex by index.
    #[inline]
    #[must_use]
    pub fn vertex(&self, index: usize) -> Option<&Correspondence2> {
        self.vertices.get(index)
    }

    /// All triangles.
    #[inline]
    #[must_use]
    pub fn triangles(&self) -> &[TinTriangle] {
        &self.triangles
    }

    /// A triangle by index.
    #[inline]
    #[must_use]
    pub fn triangle(&self, index: usize) -> Option<&TinTriangle> {
        self.triangles.get(index)
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        // Interior edges are seen from both sides, boundary edges once
        let half_edges = self.triangles.len() * 3;
        let boundary = self
            .triangles
            .iter()
            .flat_map(|t| t.neighbors())
            .filter(Option::is_none)
            .count();
        (half_edges + boundary) / 2
    }

    /// Source-space bounds of the quadrilateral.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> &Bounds2 {
        &self.bounds
    }

    /// The three correspondences of a triangle, in counter-clockwise order.
    ///
    /// Returns `None` for an out-of-range triangle index.
    #[must_use]
    pub fn correspondences(&self, triangle: usize) -> Option<[&Correspondence2; 3]> {
        let tri = self.triangles.get(triangle)?;
        let [a, b, c] = tri.vertices();
        Some([&self.vertices[a], &self.vertices[b], &self.vertices[c]])
    }

    /// Source-space corner positions of a triangle.
    #[must_use]
    pub fn source_triangle(&self, triangle: usize) -> Option<[Point2<f64>; 3]> {
        self.correspondences(triangle)
            .map(|corners| corners.map(|c| c.source))
    }

    /// Index of the triangle containing `point` in source space.
    ///
    /// Points on a shared edge or vertex resolve to the first containing
    /// triangle in arena order, so every point maps to at most one triangle.
    /// Returns `None` outside the triangulated hull.
    ///
    /// # Example
    ///
    /// ```
    /// use georef_tin::{triangulate, TinParams};
    /// use georef_types::{Point2, Quadrilateral};
    ///
    /// let quad = Quadrilateral::from_source_and_target([
    ///     ([0.0, 0.0], [0.0, 0.0]),
    ///     ([10.0, 0.0], [10.0, 0.0]),
    ///     ([10.0, 10.0], [10.0, 10.0]),
    ///     ([0.0, 10.0], [0.0, 10.0]),
    /// ]);
    /// let tin = triangulate(&quad, &[], &TinParams::default()).unwrap();
    ///
    /// assert!(tin.locate(&Point2::new(5.0, 5.0)).is_some());
    /// assert!(tin.locate(&Point2::new(11.0, 5.0)).is_none());
    /// ```
    #[must_use]
    pub fn locate(&self, point: &Point2<f64>) -> Option<usize> {
        if !point.x.is_finite() || !point.y.is_finite() {
            return None;
        }
        (0..self.triangles.len()).find(|&t| self.contains_in(t, point))
    }

    /// Whether `point` lies inside or on the triangulated hull.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        self.locate(point).is_some()
    }

    /// Barycentric coordinates of `point` with respect to a triangle.
    #[must_use]
    pub fn barycentric(&self, triangle: usize, point: &Point2<f64>) -> Option<[f64; 3]> {
        let [a, b, c] = self.source_triangle(triangle)?;
        let area = orient2d(&a, &b, &c);
        if area == 0.0 {
            return None;
        }
        Some([
            orient2d(&b, &c, point) / area,
            orient2d(&c, &a, point) / area,
            orient2d(&a, &b, point) / area,
        ])
    }

    /// Pairs `(triangle, vertex)` where the vertex lies strictly inside the
    /// triangle's circumcircle.
    ///
    /// `relative_tolerance` is scaled by the squared quadrilateral diagonal.
    /// An empty result means the mesh satisfies the Delaunay property.
    #[must_use]
    pub fn delaunay_violations(&self, relative_tolerance: f64) -> Vec<(usize, usize)> {
        let diagonal = self.bounds.diagonal();
        let tolerance = relative_tolerance * diagonal * diagonal;
        let mut violations = Vec::new();
        for (t, tri) in self.triangles.iter().enumerate() {
            for (v, vertex) in self.vertices.iter().enumerate() {
                if tri.local_index(v).is_some() {
                    continue;
                }
                if tri.circumcircle().contains_strictly(&vertex.source, tolerance) {
                    violations.push((t, v));
                }
            }
        }
        violations
    }

    /// Whether every triangle has an empty circumcircle.
    #[must_use]
    pub fn is_delaunay(&self, relative_tolerance: f64) -> bool {
        self.delaunay_violations(relative_tolerance).is_empty()
    }

    fn contains_in(&self, triangle: usize, point: &Point2<f64>) -> bool {
        let Some([a, b, c]) = self.source_triangle(triangle) else {
            return false;
        };
        let tol = self.area_tolerance;
        orient2d(&b, &c, point) >= -tol
            && orient2d(&c, &a, point) >= -tol
            && orient2d(&a, &b, point) >= -tol
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::{TinParams, triangulate};
    use approx::assert_relative_eq;
    use georef_types::{Correspondence2, Point2, Quadrilateral};

    fn square(size: f64) -> Quadrilateral {
        Quadrilateral::from_source_and_target([
            ([0.0, 0.0], [0.0, 0.0]),
            ([size, 0.0], [size, 0.0]),
            ([size, size], [size, size]),
            ([0.0, size], [0.0, size]),
        ])
    }

    #[test]
    fn test_edge_count_euler() {
        let interior = vec![
            Correspondence2::from_coords(3.0, 4.0, 3.0, 4.0),
            Correspondence2::from_coords(7.0, 2.0, 7.0, 2.0),
            Correspondence2::from_coords(5.0, 8.0, 5.0, 8.0),
        ];
        let tin = triangulate(&square(10.0), &interior, &TinParams::default()).unwrap();
        // Euler for a triangulated disc: V - E + F = 1
        let v = tin.vertex_count() as i64;
        let e = tin.edge_count() as i64;
        let f = tin.triangle_count() as i64;
        assert_eq!(v - e + f, 1);
    }

    #[test]
    fn test_shared_edge_maps_to_one_triangle() {
        let tin = triangulate(&square(10.0), &[], &TinParams::default()).unwrap();
        // The diagonal is shared; locate still returns a single index
        let on_diagonal = Point2::new(5.0, 5.0);
        let found = tin.locate(&on_diagonal).unwrap();
        assert!(found < tin.triangle_count());
    }

    #[test]
    fn test_barycentric_sums_to_one() {
        let tin = triangulate(&square(10.0), &[], &TinParams::default()).unwrap();
        let p = Point2::new(2.0, 7.0);
        let t = tin.locate(&p).unwrap();
        let w = tin.barycentric(t, &p).unwrap();
        assert_relative_eq!(w[0] + w[1] + w[2], 1.0, epsilon = 1e-12);
        assert!(w.iter().all(|&x| x >= -1e-12));
    }

    #[test]
    fn test_non_finite_point_is_not_located() {
        let tin = triangulate(&square(10.0), &[], &TinParams::default()).unwrap();
        assert!(tin.locate(&Point2::new(f64::NAN, 1.0)).is_none());
    }
}
