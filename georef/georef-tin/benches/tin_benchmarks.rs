//! Benchmarks for triangulation.
//!
//! Run with: cargo bench -p georef-tin

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use georef_tin::{TinParams, triangulate};
use georef_types::{Correspondence2, Point2, Quadrilateral};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

fn square() -> Quadrilateral {
    Quadrilateral::from_source_and_target([
        ([0.0, 0.0], [0.0, 0.0]),
        ([1000.0, 0.0], [1000.0, 0.0]),
        ([1000.0, 1000.0], [1000.0, 1000.0]),
        ([0.0, 1000.0], [0.0, 1000.0]),
    ])
}

fn random_interior(count: usize) -> Vec<Correspondence2> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            let p = Point2::new(rng.gen_range(1.0..999.0), rng.gen_range(1.0..999.0));
            Correspondence2::new(p, p)
        })
        .collect()
}

fn bench_triangulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("triangulate");
    let quad = square();
    let params = TinParams::default();

    for count in [10_usize, 100, 500] {
        let interior = random_interior(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &interior, |b, interior| {
            b.iter(|| triangulate(black_box(&quad), black_box(interior), &params));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_triangulate);
criterion_main!(benches);
