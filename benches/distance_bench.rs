use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use geofacet::distance::{GeoPoint, distance, format_distance, rating_to_stars};

fn generate_test_points(count: usize) -> Vec<GeoPoint> {
    let mut points = Vec::with_capacity(count);
    for i in 0..count {
        let lat = 40.5 + (i as f64 * 0.37).sin() * 0.4;
        let lng = -74.0 + (i as f64 * 0.11).cos() * 0.5;
        points.push(GeoPoint { lat, lng });
    }
    points
}

fn bench_distance(c: &mut Criterion) {
    let points = generate_test_points(101);
    let origin = points[0];
    let targets = &points[1..101];

    let mut group = c.benchmark_group("geo");

    group.bench_function("haversine", |b| {
        b.iter(|| {
            for target in targets {
                let _ = black_box(distance(black_box(origin), black_box(*target)));
            }
        })
    });

    group.bench_function("haversine_and_format", |b| {
        b.iter(|| {
            for target in targets {
                let _ = black_box(format_distance(distance(black_box(origin), *target)));
            }
        })
    });

    group.finish();
}

fn bench_stars(c: &mut Criterion) {
    let ratings: Vec<f64> = (0..=50).map(|i| i as f64 / 10.0).collect();

    c.bench_function("rating_to_stars", |b| {
        b.iter(|| {
            for rating in &ratings {
                let _ = black_box(rating_to_stars(black_box(*rating)));
            }
        })
    });
}

criterion_group!(benches, bench_distance, bench_stars);
criterion_main!(benches);
