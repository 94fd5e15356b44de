//! Property-based tests for triangulation invariants.
//!
//! Run with: cargo test -p georef-tin -- proptest

use georef_tin::{TinParams, orient2d, triangulate};
use georef_types::{Correspondence2, Point2, Quadrilateral};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Interior points strictly inside the 1000 x 1000 square, de-duplicated.
fn arb_interior(max: usize) -> impl Strategy<Value = Vec<Correspondence2>> {
    prop::collection::vec((1.0..999.0f64, 1.0..999.0f64), 0..max).prop_map(|points| {
        let mut kept: Vec<Correspondence2> = Vec::new();
        for (x, y) in points {
            let p = Point2::new(x, y);
            if kept.iter().all(|c| (c.source - p).norm() > 1e-3) {
                kept.push(Correspondence2::new(p, Point2::new(2.0 * x, y + 5.0)));
            }
        }
        kept
    })
}

fn square() -> Quadrilateral {
    Quadrilateral::from_source_and_target([
        ([0.0, 0.0], [0.0, 5.0]),
        ([1000.0, 0.0], [2000.0, 5.0]),
        ([1000.0, 1000.0], [2000.0, 1005.0]),
        ([0.0, 1000.0], [0.0, 1005.0]),
    ])
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proptest_mesh_is_delaunay(interior in arb_interior(40)) {
        let tin = triangulate(&square(), &interior, &TinParams::default()).unwrap();
        let violations = tin.delaunay_violations(1e-9);
        prop_assert!(violations.is_empty(), "violations: {:?}", violations);
    }

    #[test]
    fn proptest_triangle_count(interior in arb_interior(40)) {
        let tin = triangulate(&square(), &interior, &TinParams::default()).unwrap();
        // 2n - h - 2 with only the four corners on the hull
        prop_assert_eq!(tin.triangle_count(), 2 * tin.vertex_count() - 4 - 2);
    }

    #[test]
    fn proptest_triangles_tile_the_square(interior in arb_interior(40)) {
        let tin = triangulate(&square(), &interior, &TinParams::default()).unwrap();
        let mut area = 0.0;
        for t in 0..tin.triangle_count() {
            let [a, b, c] = tin.source_triangle(t).unwrap();
            let twice = orient2d(&a, &b, &c);
            prop_assert!(twice > 0.0);
            area += twice * 0.5;
        }
        prop_assert!((area - 1.0e6).abs() < 1e-3);
    }

    #[test]
    fn proptest_every_vertex_is_locatable(interior in arb_interior(30)) {
        let tin = triangulate(&square(), &interior, &TinParams::default()).unwrap();
        for vertex in tin.vertices() {
            let t = tin.locate(&vertex.source);
            prop_assert!(t.is_some());
        }
    }

    #[test]
    fn proptest_outside_points_are_rejected(x in 1000.5..2000.0f64, y in -500.0..1500.0f64) {
        let interior = vec![Correspondence2::new(Point2::new(x, y), Point2::new(x, y))];
        let result = triangulate(&square(), &interior, &TinParams::default());
        prop_assert!(result.is_err());
    }
}
