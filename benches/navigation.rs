//! Performance benchmarks for the per-fix navigation path.
//!
//! Run with: `cargo bench --bench navigation`
//!
//! Every geolocation fix runs polyline-sized work (closest vertex scan,
//! bearing fusion), so these measure that cost against route length.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spotnav::synthetic::{DriveScenario, RoutePattern, RouteScenario};
use spotnav::{
    fuse_bearing, polyline, BearingConfig, BearingInputs, GpsPoint, Route, RouteProgressTracker,
};

fn make_route(length_m: f64) -> Route {
    RouteScenario {
        origin: GpsPoint::new(48.137, 11.575),
        length_m,
        pattern: RoutePattern::Winding,
        step_every_m: 400.0,
        seed: 11,
    }
    .generate()
    .expect("synthetic route")
}

fn bench_polyline(c: &mut Criterion) {
    let mut group = c.benchmark_group("polyline");

    for length_km in [1.0, 10.0, 50.0] {
        let route = make_route(length_km * 1000.0);
        let encoded = polyline::encode(route.geometry(), 6);

        group.bench_with_input(
            BenchmarkId::new("decode", format!("{}km", length_km)),
            &encoded,
            |b, encoded| b.iter(|| polyline::decode(black_box(encoded), 6)),
        );
    }

    group.finish();
}

fn bench_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker");

    for length_km in [1.0, 10.0, 50.0] {
        let route = make_route(length_km * 1000.0);
        let fixes = DriveScenario::default().fixes(&route);

        group.bench_with_input(
            BenchmarkId::new("drive", format!("{}km", length_km)),
            &fixes,
            |b, fixes| {
                b.iter(|| {
                    let mut tracker = RouteProgressTracker::new();
                    for fix in fixes {
                        black_box(tracker.update_route(&route, &fix.point));
                    }
                })
            },
        );
    }

    group.finish();
}

fn bench_bearing(c: &mut Criterion) {
    let route = make_route(5_000.0);
    let config = BearingConfig::default();
    let prev = route.geometry()[10];
    let current = route.geometry()[11];

    c.bench_function("fuse_bearing", |b| {
        b.iter(|| {
            let inputs = BearingInputs {
                prev_fix: Some(&prev),
                current_fix: &current,
                route_geometry: route.geometry(),
                closest_index: Some(11),
                device_heading: Some(90.0),
                speed_mps: Some(8.0),
                last_bearing: 0.0,
            };
            fuse_bearing(black_box(&inputs), &config)
        })
    });
}

criterion_group!(benches, bench_polyline, bench_tracker, bench_bearing);
criterion_main!(benches);
