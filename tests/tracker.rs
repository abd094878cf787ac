//! Tests for route progress tracking

use spotnav::tracker::{closest_vertex, step_for_index};
use spotnav::{GpsPoint, Route, RouteProgressTracker};

fn three_point_route() -> Route {
    Route::new(
        vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 1.0),
            GpsPoint::new(0.0, 2.0),
        ],
        vec!["Head east".to_string(), "Continue to destination".to_string()],
    )
    .unwrap()
}

#[test]
fn test_step_does_not_regress_on_backward_fix() {
    let route = three_point_route();
    let mut tracker = RouteProgressTracker::new();

    let progress = tracker
        .update_route(&route, &GpsPoint::new(0.0, 1.0))
        .unwrap();
    assert_eq!(progress.closest_index, 1);
    assert_eq!(progress.step_index, 1);

    // Drifted back toward the start: raw match is vertex 0, step stays
    let progress = tracker
        .update_route(&route, &GpsPoint::new(0.0, 0.4))
        .unwrap();
    assert_eq!(progress.closest_index, 0);
    assert_eq!(progress.step_index, 1);
    assert_eq!(tracker.state().current_step_index, 1);
    assert_eq!(tracker.state().last_matched_index, 1);
}

#[test]
fn test_step_monotonic_over_noisy_drive() {
    let route = three_point_route();
    let mut tracker = RouteProgressTracker::new();
    let fixes = [0.0, 0.3, 0.2, 0.9, 0.6, 1.2, 1.1, 1.9, 1.4, 2.0];

    let mut last_step = 0;
    let mut last_matched = 0;
    for lng in fixes {
        tracker.update_route(&route, &GpsPoint::new(0.0001, lng));
        let state = tracker.state();
        assert!(state.current_step_index >= last_step);
        assert!(state.last_matched_index >= last_matched);
        last_step = state.current_step_index;
        last_matched = state.last_matched_index;
    }
    assert_eq!(last_step, 1);
    assert_eq!(last_matched, 2);
}

#[test]
fn test_invalid_inputs_leave_state_untouched() {
    let route = three_point_route();
    let mut tracker = RouteProgressTracker::new();
    tracker.update_route(&route, &GpsPoint::new(0.0, 1.0));
    let before = tracker.state();

    assert!(tracker
        .update_route(&route, &GpsPoint::new(f64::NAN, 1.0))
        .is_none());
    assert!(tracker
        .update(&[GpsPoint::new(0.0, 0.0)], 2, &GpsPoint::new(0.0, 0.0))
        .is_none());
    assert_eq!(tracker.state(), before);
}

#[test]
fn test_reset_returns_to_start() {
    let route = three_point_route();
    let mut tracker = RouteProgressTracker::new();
    tracker.update_route(&route, &GpsPoint::new(0.0, 2.0));
    tracker.reset();
    assert_eq!(tracker.state().current_step_index, 0);
    assert_eq!(tracker.state().last_matched_index, 0);
}

#[test]
fn test_zero_steps_stays_on_step_zero() {
    let geometry = three_point_route().geometry().to_vec();
    let mut tracker = RouteProgressTracker::new();
    let progress = tracker
        .update(&geometry, 0, &GpsPoint::new(0.0, 2.0))
        .unwrap();
    assert_eq!(progress.step_index, 0);
    assert_eq!(progress.closest_index, 2);
}

#[test]
fn test_step_for_index_clamps_to_last_step() {
    assert_eq!(step_for_index(0, 3, 2), 0);
    assert_eq!(step_for_index(1, 3, 2), 1);
    assert_eq!(step_for_index(2, 3, 2), 1);
    assert_eq!(step_for_index(9, 10, 4), 3);
    assert_eq!(step_for_index(5, 1, 4), 0);
}

#[test]
fn test_closest_vertex_prefers_first_on_tie() {
    let geometry = vec![
        GpsPoint::new(0.0, 0.0),
        GpsPoint::new(0.0, 2.0),
        GpsPoint::new(0.0, 0.0),
    ];
    let (index, distance) = closest_vertex(&geometry, &GpsPoint::new(0.0, 0.0)).unwrap();
    assert_eq!(index, 0);
    assert_eq!(distance, 0.0);
    assert!(closest_vertex(&[], &GpsPoint::new(0.0, 0.0)).is_none());
}

#[test]
fn test_distance_to_route() {
    let route = three_point_route();
    let mut tracker = RouteProgressTracker::new();
    // 0.01 degrees north of vertex 1, roughly 1.1 km
    let progress = tracker
        .update_route(&route, &GpsPoint::new(0.01, 1.0))
        .unwrap();
    assert_eq!(progress.closest_index, 1);
    assert!((progress.distance_to_route_m - 1112.0).abs() < 5.0);
}
