//! Tests for geo_utils module

use spotnav::geo_utils::*;
use spotnav::{Bounds, GpsPoint};

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Angles compared through their wrapped difference, so 359.99 ~ 0.
fn angle_eq(a: f64, b: f64, epsilon: f64) -> bool {
    ((a - b + 540.0) % 360.0 - 180.0).abs() < epsilon
}

#[test]
fn test_haversine_distance_same_point() {
    let p = GpsPoint::new(51.5074, -0.1278);
    assert_eq!(haversine_distance(&p, &p), 0.0);
}

#[test]
fn test_haversine_distance_known_value() {
    // London to Paris is approximately 344 km
    let london = GpsPoint::new(51.5074, -0.1278);
    let paris = GpsPoint::new(48.8566, 2.3522);
    let dist = haversine_distance(&london, &paris);
    assert!(approx_eq(dist, 343_560.0, 5000.0)); // Within 5km
}

#[test]
fn test_bearing_cardinal_directions() {
    let origin = GpsPoint::new(0.0, 0.0);
    assert!(approx_eq(bearing_between(&origin, &GpsPoint::new(1.0, 0.0)), 0.0, 1e-9));
    assert!(approx_eq(bearing_between(&origin, &GpsPoint::new(0.0, 1.0)), 90.0, 1e-9));
    assert!(approx_eq(bearing_between(&origin, &GpsPoint::new(-1.0, 0.0)), 180.0, 1e-9));
    assert!(approx_eq(bearing_between(&origin, &GpsPoint::new(0.0, -1.0)), 270.0, 1e-9));
}

#[test]
fn test_normalize_bearing() {
    assert_eq!(normalize_bearing(0.0), 0.0);
    assert_eq!(normalize_bearing(360.0), 0.0);
    assert_eq!(normalize_bearing(-90.0), 270.0);
    assert_eq!(normalize_bearing(725.0), 5.0);
    assert!(normalize_bearing(-1e-15) < 360.0);
}

#[test]
fn test_destination_point_distance_and_bearing() {
    let origin = GpsPoint::new(47.37, 8.55);
    for bearing in [0.0, 45.0, 137.5, 270.0] {
        let dest = destination_point(&origin, bearing, 250.0);
        assert!(approx_eq(haversine_distance(&origin, &dest), 250.0, 1e-6));
        assert!(angle_eq(bearing_between(&origin, &dest), bearing, 0.01));
    }
}

#[test]
fn test_destination_point_wraps_longitude() {
    let dest = destination_point(&GpsPoint::new(0.0, 179.9999), 90.0, 1000.0);
    assert!(dest.longitude < -179.0);
    assert!(dest.is_valid());
}

#[test]
fn test_wrap_longitude() {
    assert_eq!(wrap_longitude(0.0), 0.0);
    assert!(approx_eq(wrap_longitude(359.9), -0.1, 1e-9));
    assert!(approx_eq(wrap_longitude(-359.9), 0.1, 1e-9));
    assert_eq!(wrap_longitude(180.0), -180.0);
}

#[test]
fn test_local_projection_across_antimeridian() {
    let origin = GpsPoint::new(-16.5, 179.9995);
    let projection = LocalProjection::new(origin);
    let across = GpsPoint::new(-16.5, -179.9995);

    let [east, north] = projection.project(&across);
    assert!(east > 0.0);
    assert!(approx_eq(north, 0.0, 1e-9));
    assert!(approx_eq(east, haversine_distance(&origin, &across), 0.5));

    let back = projection.unproject([east, north]);
    assert!(approx_eq(back.longitude, across.longitude, 1e-9));
}

#[test]
fn test_meters_to_degrees() {
    assert!(approx_eq(meters_to_degrees(METERS_PER_DEG_LAT, 0.0), 1.0, 1e-9));
    assert!(approx_eq(meters_to_degrees(METERS_PER_DEG_LAT, 60.0), 2.0, 1e-6));
    assert_eq!(meters_to_degrees(100.0, 90.0), 0.0);
}

#[test]
fn test_local_projection_round_trip() {
    let projection = LocalProjection::new(GpsPoint::new(52.52, 13.405));
    let point = GpsPoint::new(52.521, 13.407);
    let [east, north] = projection.project(&point);
    assert!(east > 0.0 && north > 0.0);
    assert!(approx_eq((east * east + north * north).sqrt(), haversine_distance(&GpsPoint::new(52.52, 13.405), &point), 0.5));

    let back = projection.unproject([east, north]);
    assert!(approx_eq(back.latitude, point.latitude, 1e-9));
    assert!(approx_eq(back.longitude, point.longitude, 1e-9));
}

#[test]
fn test_bounds_from_points() {
    let track = vec![
        GpsPoint::new(51.50, -0.13),
        GpsPoint::new(51.51, -0.12),
        GpsPoint::new(51.505, -0.125),
    ];
    let bounds = Bounds::from_points(&track).unwrap();
    assert_eq!(bounds.min_lat, 51.50);
    assert_eq!(bounds.max_lat, 51.51);
    assert_eq!(bounds.min_lng, -0.13);
    assert_eq!(bounds.max_lng, -0.12);
    assert!(approx_eq(bounds.center().latitude, 51.505, 1e-9));
    assert!(Bounds::from_points(&[]).is_none());
}

#[test]
fn test_gps_point_validity() {
    assert!(GpsPoint::new(0.0, 0.0).is_valid());
    assert!(GpsPoint::new(-90.0, 180.0).is_valid());
    assert!(!GpsPoint::new(90.1, 0.0).is_valid());
    assert!(!GpsPoint::new(0.0, -180.5).is_valid());
    assert!(!GpsPoint::new(f64::INFINITY, 0.0).is_valid());
}
