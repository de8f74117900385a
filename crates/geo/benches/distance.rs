//! Benchmarks for geo crate distance calculations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use taskroute_geo::{distance, polyline, rank_by_distance, Coordinate};

fn create_positions(count: usize) -> Vec<(usize, Coordinate)> {
    (0..count)
        .map(|i| {
            // Spread points over Metro Manila
            let lat = 14.4 + (i as f64 * 0.001) % 0.4;
            let lng = 120.9 + (i as f64 * 0.0013) % 0.3;
            (i, Coordinate::new(lat, lng))
        })
        .collect()
}

fn bench_single_distance(c: &mut Criterion) {
    let origin = Coordinate::new(14.5547, 121.0244);
    let destination = Coordinate::new(14.5509, 121.0503);

    c.bench_function("distance_single", |b| {
        b.iter(|| distance(black_box(Some(origin)), black_box(Some(destination))))
    });
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_by_distance");
    let target = Coordinate::new(14.5547, 121.0244);

    for size in [10, 100, 1000, 10000].iter() {
        let positions = create_positions(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| rank_by_distance(black_box(target), black_box(&positions), Some(10)))
        });
    }

    group.finish();
}

fn bench_polyline(c: &mut Criterion) {
    let encoded = "_p~iF~ps|U_ulLnnqC_mqNvxq`@".to_string();
    c.bench_function("polyline_decode", |b| {
        b.iter(|| polyline::decode(black_box(&encoded)))
    });
}

criterion_group!(benches, bench_single_distance, bench_rank, bench_polyline);
criterion_main!(benches);
