//! Incremental Delaunay insertion inside a quadrilateral.
//!
//! The quadrilateral is split along its 0–2 diagonal, the diagonal is
//! legalised, and interior vertices are then inserted one at a time:
//! locate the containing triangle, split it (three ways inside, or both
//! triangles sharing an edge two ways each), and restore the empty
//! circumcircle property with Lawson edge flips.

use crate::error::{TinError, TinResult};
use crate::params::TinParams;
use crate::tin::{CORNER_COUNT, Tin};
use crate::triangle::{TinTriangle, orient2d};
use georef_types::{Correspondence2, Quadrilateral};
use nalgebra::Point2;
use tracing::{debug, info};

/// Where a point falls relative to a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Inside,
    /// On the edge opposite this local vertex.
    Edge(usize),
    /// Coincides with this local vertex.
    Vertex(usize),
}

/// Triangulates a quadrilateral with the given interior vertices.
///
/// Vertices are inserted in the order given, so co-circular configurations
/// resolve deterministically.
///
/// # Arguments
///
/// * `quad` - Boundary corners, in either winding order
/// * `interior` - Correspondences whose sources lie within or on the boundary
/// * `params` - Geometric tolerances
///
/// # Errors
///
/// Returns an error if:
/// - The quadrilateral is degenerate, self-intersecting or not convex
/// - A vertex lies outside the quadrilateral
/// - A vertex coincides with a corner or an earlier vertex
///
/// # Example
///
/// ```
/// use georef_tin::{triangulate, TinParams};
/// use georef_types::{Correspondence2, Quadrilateral};
///
/// let quad = Quadrilateral::from_source_and_target([
///     ([0.0, 0.0], [0.0, 0.0]),
///     ([100.0, 0.0], [100.0, 0.0]),
///     ([100.0, 100.0], [100.0, 100.0]),
///     ([0.0, 100.0], [0.0, 100.0]),
/// ]);
/// let interior = vec![
///     Correspondence2::from_coords(30.0, 40.0, 31.0, 41.0),
///     Correspondence2::from_coords(70.0, 60.0, 69.0, 62.0),
/// ];
///
/// let tin = triangulate(&quad, &interior, &TinParams::default()).unwrap();
/// assert_eq!(tin.vertex_count(), 6);
/// assert_eq!(tin.triangle_count(), 6);
/// assert!(tin.is_delaunay(1e-9));
/// ```
pub fn triangulate(
    quad: &Quadrilateral,
    interior: &[Correspondence2],
    params: &TinParams,
) -> TinResult<Tin> {
    if !(params.epsilon.is_finite() && params.epsilon >= 0.0) {
        return Err(TinError::InvalidParameter(format!(
            "epsilon must be finite and non-negative, got {}",
            params.epsilon
        )));
    }

    let quad = quad.to_counter_clockwise();
    let bounds = quad.bounds();
    let diagonal = bounds.diagonal();
    let area_tolerance = params.epsilon * diagonal * diagonal;
    validate_boundary(&quad, diagonal, area_tolerance)?;

    let mut mesher = Mesher::seed(&quad, params.epsilon * diagonal, area_tolerance);
    for (index, vertex) in interior.iter().enumerate() {
        mesher.insert(index, *vertex)?;
    }

    info!(
        vertices = mesher.vertices.len(),
        triangles = mesher.triangles.len(),
        flips = mesher.flips,
        "Triangulation complete"
    );

    Ok(Tin::from_parts(
        mesher.vertices,
        mesher.triangles,
        bounds,
        area_tolerance,
    ))
}

/// Rejects zero-area, self-intersecting and non-convex boundaries.
///
/// Expects counter-clockwise corners.
fn validate_boundary(quad: &Quadrilateral, diagonal: f64, area_tolerance: f64) -> TinResult<()> {
    let area = quad.signed_area();
    if !diagonal.is_finite() || diagonal <= 0.0 || area <= area_tolerance {
        return Err(TinError::DegenerateBoundary { area });
    }

    let p = quad.source_corners();
    for corner in 0..CORNER_COUNT {
        let prev = &p[(corner + CORNER_COUNT - 1) % CORNER_COUNT];
        let next = &p[(corner + 1) % CORNER_COUNT];
        let turn = orient2d(prev, &p[corner], next);
        if turn.abs() <= area_tolerance {
            return Err(TinError::DegenerateBoundary { area });
        }
        if turn < 0.0 {
            return Err(TinError::NonConvexBoundary { corner });
        }
    }
    Ok(())
}

/// Mutable mesh under construction.
struct Mesher {
    vertices: Vec<Correspondence2>,
    triangles: Vec<TinTriangle>,
    length_tolerance: f64,
    area_tolerance: f64,
    flips: usize,
}

impl Mesher {
    /// Splits the quadrilateral into two triangles and legalises the diagonal.
    fn seed(quad: &Quadrilateral, length_tolerance: f64, area_tolerance: f64) -> Self {
        let vertices = quad.corners().to_vec();
        let mut mesher = Self {
            vertices,
            triangles: Vec::new(),
            length_tolerance,
            area_tolerance,
            flips: 0,
        };
        let first = mesher.make_triangle([0, 1, 2], [None, Some(1), None]);
        let second = mesher.make_triangle([0, 2, 3], [None, None, Some(0)]);
        mesher.triangles.push(first);
        mesher.triangles.push(second);
        mesher.legalize(vec![(0, 1)]);
        debug!(flips = mesher.flips, "Seeded quadrilateral");
        mesher
    }

    fn position(&self, vertex: usize) -> &Point2<f64> {
        &self.vertices[vertex].source
    }

    fn make_triangle(&self, vertices: [usize; 3], neighbors: [Option<usize>; 3]) -> TinTriangle {
        TinTriangle::new(
            vertices,
            neighbors,
            [
                self.position(vertices[0]),
                self.position(vertices[1]),
                self.position(vertices[2]),
            ],
        )
    }

    fn insert(&mut self, index: usize, vertex: Correspondence2) -> TinResult<()> {
        let p = vertex.source;
        let duplicate = self
            .vertices
            .iter()
            .any(|v| (v.source - p).norm() <= self.length_tolerance);
        if duplicate {
            return Err(TinError::DuplicateVertex {
                index,
                x: p.x,
                y: p.y,
            });
        }

        let Some((triangle, location)) = self.locate(&p) else {
            return Err(TinError::VertexOutsideBoundary {
                index,
                x: p.x,
                y: p.y,
            });
        };

        let new_vertex = self.vertices.len();
        self.vertices.push(vertex);
        match location {
            Location::Inside => self.split_inside(triangle, new_vertex),
            Location::Edge(edge) => self.split_edge(triangle, edge, new_vertex),
            Location::Vertex(_) => {
                self.vertices.pop();
                return Err(TinError::DuplicateVertex {
                    index,
                    x: p.x,
                    y: p.y,
                });
            }
        }
        Ok(())
    }

    /// First triangle (in arena order) containing `p`, with its location.
    fn locate(&self, p: &Point2<f64>) -> Option<(usize, Location)> {
        if !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        self.triangles
            .iter()
            .enumerate()
            .find_map(|(t, tri)| self.classify(tri, p).map(|location| (t, location)))
    }

    fn classify(&self, tri: &TinTriangle, p: &Point2<f64>) -> Option<Location> {
        let [a, b, c] = tri.vertices().map(|v| *self.position(v));
        let turns = [orient2d(&b, &c, p), orient2d(&c, &a, p), orient2d(&a, &b, p)];
        let tol = self.area_tolerance;
        if turns.iter().any(|&o| o < -tol) {
            return None;
        }
        let mut on_edges = (0..3).filter(|&i| turns[i].abs() <= tol);
        match (on_edges.next(), on_edges.next()) {
            (None, _) => Some(Location::Inside),
            (Some(edge), None) => Some(Location::Edge(edge)),
            // On two edges at once means at their shared vertex
            (Some(e0), Some(e1)) => Some(Location::Vertex(3 - e0 - e1)),
        }
    }

    fn set_neighbor_link(&mut self, triangle: Option<usize>, old: usize, new: usize) {
        if let Some(t) = triangle {
            self.triangles[t].replace_neighbor(old, new);
        }
    }

    /// Splits triangle `t` into three around an interior vertex `v`.
    fn split_inside(&mut self, t: usize, v: usize) {
        let tri = self.triangles[t];
        let [a, b, c] = tri.vertices();
        let [na, nb, nc] = tri.neighbors();
        let t1 = self.triangles.len();
        let t2 = t1 + 1;

        self.triangles[t] = self.make_triangle([v, b, c], [na, Some(t1), Some(t2)]);
        let first = self.make_triangle([v, c, a], [nb, Some(t2), Some(t)]);
        let second = self.make_triangle([v, a, b], [nc, Some(t), Some(t1)]);
        self.triangles.push(first);
        self.triangles.push(second);
        self.set_neighbor_link(nb, t, t1);
        self.set_neighbor_link(nc, t, t2);

        self.legalize(vec![(t, v), (t1, v), (t2, v)]);
    }

    /// Splits the triangle(s) sharing the edge opposite local vertex `edge`
    /// of triangle `t`, at vertex `v` lying on that edge.
    fn split_edge(&mut self, t: usize, edge: usize, v: usize) {
        let tri = self.triangles[t];
        let a = tri.vertices()[edge];
        let b = tri.vertices()[(edge + 1) % 3];
        let c = tri.vertices()[(edge + 2) % 3];
        let across = tri.neighbors()[edge];
        let nb = tri.neighbors()[(edge + 1) % 3];
        let nc = tri.neighbors()[(edge + 2) % 3];

        let t1 = self.triangles.len();
        let n1 = t1 + 1;
        let mut pending = vec![(t, v), (t1, v)];

        match across {
            Some(n) => {
                let other = self.triangles[n];
                // `across` always links back to `t`
                let j = other.neighbor_index(t).unwrap_or(0);
                let d = other.vertices()[j];
                let nn1 = other.neighbors()[(j + 1) % 3];
                let nn2 = other.neighbors()[(j + 2) % 3];

                self.triangles[t] = self.make_triangle([a, b, v], [Some(n1), Some(t1), nc]);
                let left = self.make_triangle([a, v, c], [Some(n), nb, Some(t)]);
                self.triangles.push(left);
                self.triangles[n] = self.make_triangle([d, c, v], [Some(t1), Some(n1), nn2]);
                let right = self.make_triangle([d, v, b], [Some(t), nn1, Some(n)]);
                self.triangles.push(right);
                self.set_neighbor_link(nb, t, t1);
                self.set_neighbor_link(nn1, n, n1);
                pending.push((n, v));
                pending.push((n1, v));
            }
            None => {
                self.triangles[t] = self.make_triangle([a, b, v], [None, Some(t1), nc]);
                let left = self.make_triangle([a, v, c], [None, nb, Some(t)]);
                self.triangles.push(left);
                self.set_neighbor_link(nb, t, t1);
            }
        }

        self.legalize(pending);
    }

    /// Flips edges opposite the given apex vertices until all are locally
    /// Delaunay.
    fn legalize(&mut self, mut pending: Vec<(usize, usize)>) {
        while let Some((t, p)) = pending.pop() {
            let tri = self.triangles[t];
            let Some(i) = tri.local_index(p) else {
                continue;
            };
            let Some(n) = tri.neighbors()[i] else {
                continue;
            };
            let other = self.triangles[n];
            let Some(j) = other.neighbor_index(t) else {
                continue;
            };
            let d = other.vertices()[j];
            if !tri
                .circumcircle()
                .contains_strictly(self.position(d), self.area_tolerance)
            {
                continue;
            }

            let q = tri.vertices()[(i + 1) % 3];
            let r = tri.vertices()[(i + 2) % 3];
            // Only flip convex pairs
            let (pp, pq, pr, pd) = (
                self.position(p),
                self.position(q),
                self.position(r),
                self.position(d),
            );
            if orient2d(pp, pq, pd) <= self.area_tolerance
                || orient2d(pp, pd, pr) <= self.area_tolerance
            {
                continue;
            }

            let qd = other.neighbors()[(j + 1) % 3];
            let dr = other.neighbors()[(j + 2) % 3];
            let pq_side = tri.neighbors()[(i + 2) % 3];
            let rp_side = tri.neighbors()[(i + 1) % 3];

            self.triangles[t] = self.make_triangle([p, q, d], [qd, Some(n), pq_side]);
            self.triangles[n] = self.make_triangle([p, d, r], [dr, rp_side, Some(t)]);
            self.set_neighbor_link(qd, n, t);
            self.set_neighbor_link(rp_side, t, n);
            self.flips += 1;

            pending.push((t, p));
            pending.push((n, p));
        }
    }
}
