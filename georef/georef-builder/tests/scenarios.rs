//! End-to-end fits of every family on known geometry.
//!
//! Run with: cargo test -p georef-builder --test scenarios

use approx::assert_relative_eq;
use georef_builder::{
    AdvancedAffineBuilder, AffineBuilder, AffineDecomposition, AffineParameter, AffineTransform2,
    BursaWolfBuilder,
    BursaWolfParameters, BursaWolfTransform, CoordinateTransform, Correspondence2,
    Correspondence3, EstimationError, ProjectiveBuilder, Quadrilateral, RubberSheetBuilder,
    SimilarityBuilder, TransformBuilder, TransformFamily,
};
use nalgebra::{Matrix2, Matrix3, Point2, Point3, Rotation3, Vector2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// Helpers
// =============================================================================

fn affine() -> AffineTransform2 {
    AffineTransform2::new(
        Matrix2::new(0.98, -0.11, 0.09, 1.03),
        Vector2::new(1200.0, -340.0),
    )
}

fn pairs_through(map: &AffineTransform2, sources: &[(f64, f64)]) -> Vec<Correspondence2> {
    sources
        .iter()
        .map(|&(x, y)| {
            let s = Point2::new(x, y);
            Correspondence2::new(s, map.apply(&s))
        })
        .collect()
}

/// Twenty distinct points scattered inside (0, 1000)².
fn scattered_sources() -> Vec<(f64, f64)> {
    (0..20_u32)
        .map(|i| {
            (
                40.0 + 46.0 * f64::from(i),
                60.0 + f64::from((i * 373) % 880),
            )
        })
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn scenario_a_bursa_wolf_pure_x_rotation() {
    let angle = 0.05;
    let rotation = Rotation3::from_axis_angle(&nalgebra::Vector3::x_axis(), angle);
    let sources = [
        Point3::new(6_378_137.0, 0.0, 0.0),
        Point3::new(0.0, 6_378_137.0, 0.0),
        Point3::new(0.0, 0.0, 6_356_752.0),
    ];
    let pairs: Vec<_> = sources
        .iter()
        .map(|s| Correspondence3::new(*s, rotation * s))
        .collect();

    let builder = BursaWolfBuilder::new(pairs).unwrap();
    let params = builder.parameters().unwrap();

    assert!(params.dx.abs() < 1e-3);
    assert!(params.dy.abs() < 1e-3);
    assert!(params.dz.abs() < 1e-3);
    assert!((params.rx.abs() - angle).abs() < 1e-2);
    assert!(params.ry.abs() < 1e-2);
    assert!(params.rz.abs() < 1e-2);
    assert!(builder.error_statistics().unwrap().rms() < 1e-5);
}

#[test]
fn scenario_b_affine_three_points() {
    let map = affine();
    let pairs = pairs_through(&map, &[(10.0, 20.0), (500.0, 40.0), (250.0, 800.0)]);
    let builder = AffineBuilder::new(pairs.clone()).unwrap();
    let transform = builder.transform().unwrap();

    for pair in &pairs {
        let mapped = transform.transform_point(&pair.source).unwrap();
        assert!((mapped - pair.target).norm() < 1e-5);
    }
}

#[test]
fn scenario_c_rubber_sheet_reproduces_interior() {
    let map = affine();
    let corners = [(0.0, 0.0), (1000.0, 0.0), (1000.0, 1000.0), (0.0, 1000.0)]
        .map(|(x, y)| {
            let s = Point2::new(x, y);
            let t = map.apply(&s);
            ([x, y], [t.x, t.y])
        });
    let quad = Quadrilateral::from_source_and_target(corners);
    let interior = pairs_through(&map, &scattered_sources());

    let builder = RubberSheetBuilder::new(interior.clone(), quad).unwrap();
    let transform = builder.transform().unwrap();

    let mut sum_sq = 0.0;
    for pair in &interior {
        let mapped = transform.transform_point(&pair.source).unwrap();
        sum_sq += (mapped - pair.target).norm_squared();
    }
    assert!((sum_sq / 20.0).sqrt() < 1e-5);
    assert!(builder.error_statistics().unwrap().rms() < 1e-5);

    // The corners share the interior's affine relation, so it holds everywhere
    let query = Point2::new(333.0, 777.0);
    let mapped = transform.transform_point(&query).unwrap();
    assert_relative_eq!(mapped, map.apply(&query), epsilon = 1e-6);
}

#[test]
fn scenario_d_two_points_insufficient() {
    let pairs = pairs_through(&affine(), &[(0.0, 0.0), (1.0, 1.0)]);
    assert_eq!(
        AffineBuilder::new(pairs).unwrap_err(),
        EstimationError::InsufficientData {
            family: TransformFamily::Affine,
            required: 3,
            provided: 2,
        }
    );
}

#[test]
fn scenario_e_weights_without_accuracy() {
    let pairs = pairs_through(&affine(), &[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)]);
    let builder = AffineBuilder::new(pairs).unwrap().include_weights(true);
    assert_eq!(
        builder.transform().unwrap_err(),
        EstimationError::MissingWeight { index: 0 }
    );
    assert!(matches!(
        builder.error_statistics(),
        Err(EstimationError::MissingWeight { .. })
    ));
}

// =============================================================================
// Properties across families
// =============================================================================

#[test]
fn exact_fit_at_minimum_point_count() {
    let map = affine();
    let affine_pairs = pairs_through(&map, &[(0.0, 0.0), (100.0, 0.0), (0.0, 100.0)]);
    let affine_rms = AffineBuilder::new(affine_pairs.clone())
        .unwrap()
        .error_statistics()
        .unwrap()
        .rms();
    assert!(affine_rms < 1e-5);

    // Three points fit a similarity exactly only if they came from one
    let similarity = AffineTransform2::new(
        Matrix2::new(0.8, -0.6, 0.6, 0.8) * 2.0,
        Vector2::new(5.0, 6.0),
    );
    let similarity_rms = SimilarityBuilder::new(pairs_through(
        &similarity,
        &[(0.0, 0.0), (100.0, 0.0), (30.0, 70.0)],
    ))
    .unwrap()
    .error_statistics()
    .unwrap()
    .rms();
    assert!(similarity_rms < 1e-5);

    let homography = Matrix3::new(1.1, 0.05, 10.0, -0.02, 0.95, 20.0, 1e-4, -2e-4, 1.0);
    let projective_pairs: Vec<_> = [(0.0, 0.0), (500.0, 0.0), (500.0, 400.0), (0.0, 400.0)]
        .iter()
        .map(|&(x, y)| {
            let h = homography * nalgebra::Vector3::new(x, y, 1.0);
            Correspondence2::from_coords(x, y, h.x / h.z, h.y / h.z)
        })
        .collect();
    let projective_rms = ProjectiveBuilder::new(projective_pairs)
        .unwrap()
        .error_statistics()
        .unwrap()
        .rms();
    assert!(projective_rms < 1e-5);

    let truth = BursaWolfTransform::new(BursaWolfParameters {
        dx: 50.0,
        dy: -20.0,
        dz: 10.0,
        rx: 1e-5,
        ry: -2e-5,
        rz: 3e-5,
        ppm: 2.0,
    });
    let bursa_pairs: Vec<_> = [
        [4_000_000.0, 300_000.0, 4_900_000.0],
        [4_010_000.0, 310_000.0, 4_890_000.0],
        [3_995_000.0, 320_000.0, 4_905_000.0],
    ]
    .iter()
    .map(|s| {
        let p = Point3::from(*s);
        Correspondence3::new(p, truth.apply(&p))
    })
    .collect();
    let bursa_rms = BursaWolfBuilder::new(bursa_pairs)
        .unwrap()
        .error_statistics()
        .unwrap()
        .rms();
    assert!(bursa_rms < 1e-5);
}

#[test]
fn rms_grows_with_injected_noise() {
    let map = affine();
    let clean = pairs_through(&map, &scattered_sources());
    let mut rng = StdRng::seed_from_u64(42);
    let directions: Vec<Vector2<f64>> = clean
        .iter()
        .map(|_| Vector2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect();

    let mut previous = -1.0;
    for sigma in [0.0, 0.01, 0.1, 1.0, 10.0] {
        let noisy: Vec<_> = clean
            .iter()
            .zip(&directions)
            .map(|(c, d)| Correspondence2::new(c.source, c.target + d * sigma))
            .collect();
        let rms = AffineBuilder::new(noisy)
            .unwrap()
            .error_statistics()
            .unwrap()
            .rms();
        if sigma == 0.0 {
            assert!(rms < 1e-6, "noise-free overdetermined fit has rms {rms}");
        }
        assert!(rms > previous, "rms {rms} did not grow at sigma {sigma}");
        previous = rms;
    }
}

#[test]
fn round_trip_through_inverse() {
    let map = affine();
    let pairs = pairs_through(&map, &scattered_sources());
    let transform = AffineBuilder::new(pairs.clone())
        .unwrap()
        .transform()
        .unwrap();
    let inverse = transform.inverse().unwrap();

    let targets: Vec<_> = pairs.iter().map(|c| c.target).collect();
    let back = inverse.transform_points(&targets).unwrap();
    for (b, c) in back.iter().zip(&pairs) {
        assert_relative_eq!(*b, c.source, epsilon = 1e-6);
    }
}

#[test]
fn collinear_input_is_degenerate() {
    let line: Vec<_> = (0..6)
        .map(|i| {
            let t = f64::from(i) * 10.0;
            Correspondence2::from_coords(t, 2.0 * t, t + 1.0, t - 1.0)
        })
        .collect();

    assert!(matches!(
        AffineBuilder::new(line.clone()).unwrap().transform(),
        Err(EstimationError::DegenerateGeometry(_))
    ));
    assert!(matches!(
        ProjectiveBuilder::new(line).unwrap().transform(),
        Err(EstimationError::DegenerateGeometry(_))
    ));
}

#[test]
fn advanced_affine_skew_pinned() {
    let skewed = AffineTransform2::new(Matrix2::new(1.0, 0.2, 0.0, 1.0), Vector2::new(3.0, 4.0));
    let pairs = pairs_through(&skewed, &scattered_sources());

    let free = AdvancedAffineBuilder::new(pairs.clone()).unwrap();
    let raw = AffineBuilder::new(pairs.clone()).unwrap().transform().unwrap();
    assert_relative_eq!(free.transform().unwrap().linear, raw.linear, epsilon = 1e-9);
    assert!(free.decomposition().unwrap().skew.abs() > 0.1);

    let pinned = free.with_constraint(AffineParameter::Skew, 0.0);
    let decomposition = pinned.decomposition().unwrap();
    assert_eq!(decomposition.skew, 0.0);
    assert!(pinned.error_statistics().unwrap().rms().is_finite());
}

/// 5×4 grid at 250 m spacing from `origin`, mapped through `truth`.
fn map_grid(origin: (f64, f64), truth: &AffineDecomposition) -> Vec<Correspondence2> {
    let affine = truth.to_affine();
    let mut pairs = Vec::new();
    for i in 0..5 {
        for j in 0..4 {
            let s = Point2::new(
                origin.0 + f64::from(i) * 250.0,
                origin.1 + f64::from(j) * 250.0,
            );
            pairs.push(Correspondence2::new(s, affine.apply(&s)));
        }
    }
    pairs
}

#[test]
fn advanced_affine_skew_pinned_on_projected_coordinates() {
    for skew in [0.05, 0.1, 0.8] {
        let truth = AffineDecomposition {
            rotation: 0.4,
            scale_x: 1.0,
            scale_y: 1.3,
            skew,
            translation: Vector2::new(1000.0, -2000.0),
        };
        let near = AdvancedAffineBuilder::new(map_grid((0.0, 0.0), &truth))
            .unwrap()
            .with_constraint(AffineParameter::Skew, 0.0);
        let far = AdvancedAffineBuilder::new(map_grid((500_000.0, 4_000_000.0), &truth))
            .unwrap()
            .with_constraint(AffineParameter::Skew, 0.0);

        let expected = near.decomposition().unwrap();
        let fitted = far.decomposition().unwrap();
        assert_eq!(fitted.skew, 0.0);
        assert_relative_eq!(fitted.rotation, expected.rotation, epsilon = 1e-8);
        assert_relative_eq!(fitted.scale_x, expected.scale_x, epsilon = 1e-8);
        assert_relative_eq!(fitted.scale_y, expected.scale_y, epsilon = 1e-8);
        assert_relative_eq!(
            far.error_statistics().unwrap().rms(),
            near.error_statistics().unwrap().rms(),
            epsilon = 1e-5
        );
    }
}

#[test]
fn advanced_affine_pinned_translation_keeps_caller_units() {
    let truth = AffineDecomposition {
        rotation: 0.4,
        scale_x: 1.0,
        scale_y: 1.3,
        skew: 0.1,
        translation: Vector2::new(1000.0, -2000.0),
    };
    let builder = AdvancedAffineBuilder::new(map_grid((500_000.0, 4_000_000.0), &truth))
        .unwrap()
        .with_constraint(AffineParameter::Skew, 0.1)
        .with_constraint(AffineParameter::TranslationX, 1000.0);

    let fitted = builder.decomposition().unwrap();
    assert_eq!(fitted.translation.x, 1000.0);
    assert_relative_eq!(fitted.translation.y, -2000.0, epsilon = 1e-4);
    assert_relative_eq!(fitted.rotation, 0.4, epsilon = 1e-9);
    assert_relative_eq!(fitted.scale_y, 1.3, epsilon = 1e-9);
    assert!(builder.error_statistics().unwrap().rms() < 1e-5);
}

#[test]
fn rubber_sheet_rejects_points_outside_hull() {
    let quad = Quadrilateral::from_source_and_target([
        ([0.0, 0.0], [0.0, 0.0]),
        ([100.0, 0.0], [100.0, 0.0]),
        ([100.0, 50.0], [100.0, 50.0]),
        ([0.0, 100.0], [0.0, 100.0]),
    ]);
    let transform = RubberSheetBuilder::new(Vec::new(), quad)
        .unwrap()
        .transform()
        .unwrap();

    // Above the slanted top edge but inside the bounding box
    assert_eq!(
        transform.transform_point(&Point2::new(90.0, 90.0)),
        Err(EstimationError::EvaluationOutOfDomain { x: 90.0, y: 90.0 })
    );
    assert!(transform.transform_point(&Point2::new(90.0, 40.0)).is_ok());
}

#[test]
fn weighted_fit_honours_accuracy() {
    let map = affine();
    let mut pairs = pairs_through(&map, &scattered_sources());
    for pair in &mut pairs {
        pair.accuracy = Some(0.01);
    }
    pairs[0].target.x += 50.0;
    pairs[0].accuracy = Some(1000.0);

    let weighted = AffineBuilder::new(pairs.clone())
        .unwrap()
        .include_weights(true)
        .transform()
        .unwrap();
    let query = Point2::new(500.0, 500.0);
    assert!((weighted.apply(&query) - map.apply(&query)).norm() < 1e-4);

    let unweighted = AffineBuilder::new(pairs).unwrap().transform().unwrap();
    assert!((unweighted.apply(&query) - map.apply(&query)).norm() > 0.1);
}
