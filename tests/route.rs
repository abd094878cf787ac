//! Tests for the route model

use spotnav::route::{calculate_route_distance, cumulative_distances};
use spotnav::{polyline, GpsPoint, NavError, Route};

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn equator_route() -> Route {
    Route::new(
        vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 0.01),
            GpsPoint::new(0.0, 0.02),
        ],
        vec!["Head east".to_string(), "Arrive".to_string()],
    )
    .unwrap()
}

#[test]
fn test_route_requires_two_points() {
    let result = Route::new(vec![GpsPoint::new(1.0, 1.0)], vec![]);
    assert!(matches!(
        result,
        Err(NavError::InsufficientPoints {
            point_count: 1,
            minimum_required: 2
        })
    ));
}

#[test]
fn test_route_drops_invalid_points() {
    let result = Route::new(
        vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(f64::NAN, 0.0),
            GpsPoint::new(91.0, 0.0),
        ],
        vec![],
    );
    assert!(result.is_err());

    let route = Route::new(
        vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(f64::NAN, 0.0),
            GpsPoint::new(0.0, 0.01),
        ],
        vec![],
    )
    .unwrap();
    assert_eq!(route.geometry().len(), 2);
}

#[test]
fn test_route_distances() {
    let route = equator_route();
    // 0.01 degrees of longitude at the equator is about 1112 m
    assert!(approx_eq(route.total_distance_m(), 2224.0, 5.0));
    assert!(approx_eq(route.distance_at_index(1), 1112.0, 3.0));
    assert!(approx_eq(route.remaining_distance_m(1), 1112.0, 3.0));
    assert_eq!(route.remaining_distance_m(2), 0.0);
    // Out of range clamps to the end
    assert_eq!(route.remaining_distance_m(99), 0.0);

    assert!(approx_eq(
        calculate_route_distance(route.geometry()),
        route.total_distance_m(),
        1e-9
    ));
    assert_eq!(cumulative_distances(route.geometry()).len(), 3);
}

#[test]
fn test_route_steps() {
    let route = equator_route();
    assert_eq!(route.step_count(), 2);
    assert_eq!(route.step(0), Some("Head east"));
    assert_eq!(route.step(2), None);
}

#[test]
fn test_route_bounds() {
    let route = equator_route();
    let bounds = route.bounds().unwrap();
    assert_eq!(bounds.min_lng, 0.0);
    assert_eq!(bounds.max_lng, 0.02);
    assert_eq!(bounds.min_lat, 0.0);
    assert_eq!(bounds.max_lat, 0.0);
    assert!(bounds.contains(&GpsPoint::new(0.0, 0.015)));
}

#[test]
fn test_point_at_distance() {
    let route = equator_route();
    assert_eq!(route.point_at_distance(0.0), GpsPoint::new(0.0, 0.0));
    assert_eq!(route.point_at_distance(-5.0), GpsPoint::new(0.0, 0.0));
    assert_eq!(route.point_at_distance(1e9), GpsPoint::new(0.0, 0.02));

    let halfway = route.point_at_distance(route.total_distance_m() / 2.0);
    assert!(approx_eq(halfway.longitude, 0.01, 1e-6));
}

#[test]
fn test_route_from_encoded() {
    let points = vec![GpsPoint::new(52.5, 13.4), GpsPoint::new(52.51, 13.41)];
    let encoded = polyline::encode(&points, 6);
    let route = Route::from_encoded(&encoded, 6, vec!["Go".to_string()]).unwrap();
    assert_eq!(route.geometry().len(), 2);
    assert!(Route::from_encoded("", 6, vec![]).is_err());
}
