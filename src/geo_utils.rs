//! Geographic utilities on a spherical earth.
//!
//! Great-circle math comes from `geo`'s haversine algorithms; this module
//! adapts them to [`GpsPoint`] and keeps bearings in `[0, 360)`.

use geo::{HaversineBearing, HaversineDestination, HaversineDistance, Point};

use crate::GpsPoint;

/// Meters per degree of latitude (approximately constant).
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

fn to_point(p: &GpsPoint) -> Point<f64> {
    Point::new(p.longitude, p.latitude)
}

/// Great-circle distance in meters between two points (haversine).
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    to_point(p1).haversine_distance(&to_point(p2))
}

/// Initial great-circle bearing from `from` to `to`, clockwise from true
/// north, in `[0, 360)`.
pub fn bearing_between(from: &GpsPoint, to: &GpsPoint) -> f64 {
    normalize_bearing(to_point(from).haversine_bearing(to_point(to)))
}

/// Normalize any angle in degrees into `[0, 360)`.
pub fn normalize_bearing(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Wrap a longitude difference into `[-180, 180)`.
pub fn wrap_longitude(degrees: f64) -> f64 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

/// Point reached by travelling `distance_m` from `origin` along the
/// great circle with initial bearing `bearing_deg`.
pub fn destination_point(origin: &GpsPoint, bearing_deg: f64, distance_m: f64) -> GpsPoint {
    let dest = to_point(origin).haversine_destination(bearing_deg, distance_m);
    GpsPoint::new(dest.y(), wrap_longitude(dest.x()))
}

/// Convert a distance in meters to degrees of longitude at a latitude.
///
/// At the equator this equals degrees of latitude; it grows toward the poles.
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let meters_per_deg_lng = METERS_PER_DEG_LAT * latitude.to_radians().cos();
    if meters_per_deg_lng.abs() < 1e-10 {
        return 0.0;
    }
    meters / meters_per_deg_lng
}

/// Equirectangular projection around an origin, in meters.
///
/// Good enough for neighbourhood-sized areas; used to index nearby
/// markers in a metric plane.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    origin: GpsPoint,
    meters_per_deg_lng: f64,
}

impl LocalProjection {
    /// Create a projection centered on `origin`.
    pub fn new(origin: GpsPoint) -> Self {
        Self {
            origin,
            meters_per_deg_lng: METERS_PER_DEG_LAT * origin.latitude.to_radians().cos(),
        }
    }

    /// Project a point to `[east_m, north_m]` relative to the origin.
    pub fn project(&self, point: &GpsPoint) -> [f64; 2] {
        [
            wrap_longitude(point.longitude - self.origin.longitude) * self.meters_per_deg_lng,
            (point.latitude - self.origin.latitude) * METERS_PER_DEG_LAT,
        ]
    }

    /// Inverse of [`LocalProjection::project`].
    pub fn unproject(&self, xy: [f64; 2]) -> GpsPoint {
        let lng = if self.meters_per_deg_lng.abs() < 1e-10 {
            self.origin.longitude
        } else {
            wrap_longitude(self.origin.longitude + xy[0] / self.meters_per_deg_lng)
        };
        GpsPoint::new(self.origin.latitude + xy[1] / METERS_PER_DEG_LAT, lng)
    }
}
