//! Immutable route model.
//!
//! A [`Route`] is created once per successful directions fetch and never
//! mutated afterwards. The tracker traverses its geometry; the renderer
//! draws it; the animator walks along it.

use geo::{BoundingRect, Coord, LineString};
use serde::Serialize;

use crate::error::{OptionExt, Result};
use crate::geo_utils::haversine_distance;
use crate::{polyline, Bounds, GpsPoint};

/// Minimum number of valid geometry points for a usable route.
pub const MIN_ROUTE_POINTS: usize = 2;

/// A driving route with its instruction steps.
///
/// Steps partition the geometry by arc length: step `i` covers the
/// fraction `[i / n, (i + 1) / n)` of the vertex sequence.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    geometry: Vec<GpsPoint>,
    steps: Vec<String>,
    /// Cumulative distance from the first vertex to each vertex, in meters
    #[serde(skip)]
    cumulative: Vec<f64>,
}

impl Route {
    /// Build a route from raw geometry and instruction texts.
    ///
    /// Invalid coordinates are dropped. Fails with
    /// [`crate::NavError::InsufficientPoints`] if fewer than two valid
    /// points remain.
    pub fn new(geometry: Vec<GpsPoint>, steps: Vec<String>) -> Result<Self> {
        let raw_count = geometry.len();
        let geometry: Vec<GpsPoint> = geometry.into_iter().filter(|p| p.is_valid()).collect();

        if geometry.len() < MIN_ROUTE_POINTS {
            return None::<Self>.ok_or_insufficient_points(raw_count, MIN_ROUTE_POINTS);
        }

        let cumulative = cumulative_distances(&geometry);
        Ok(Self {
            geometry,
            steps,
            cumulative,
        })
    }

    /// Decode an encoded polyline and build a route from it.
    pub fn from_encoded(encoded: &str, precision: u32, steps: Vec<String>) -> Result<Self> {
        Self::new(polyline::decode(encoded, precision), steps)
    }

    /// Route vertices in travel order.
    pub fn geometry(&self) -> &[GpsPoint] {
        &self.geometry
    }

    /// Instruction texts in travel order.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Number of instruction steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Instruction text for a step, if it exists.
    pub fn step(&self, index: usize) -> Option<&str> {
        self.steps.get(index).map(String::as_str)
    }

    /// Total route length in meters.
    pub fn total_distance_m(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Distance from the first vertex to vertex `index`, in meters.
    pub fn distance_at_index(&self, index: usize) -> f64 {
        self.cumulative
            .get(index)
            .or(self.cumulative.last())
            .copied()
            .unwrap_or(0.0)
    }

    /// Remaining distance in meters from vertex `index` to the destination.
    pub fn remaining_distance_m(&self, index: usize) -> f64 {
        (self.total_distance_m() - self.distance_at_index(index)).max(0.0)
    }

    /// Geometry as a `geo` line string (x = longitude, y = latitude).
    pub fn line_string(&self) -> LineString<f64> {
        LineString::new(
            self.geometry
                .iter()
                .map(|p| Coord {
                    x: p.longitude,
                    y: p.latitude,
                })
                .collect(),
        )
    }

    /// Bounding box used to fit the camera to the route.
    pub fn bounds(&self) -> Option<Bounds> {
        self.line_string().bounding_rect().map(|rect| Bounds {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lng: rect.min().x,
            max_lng: rect.max().x,
        })
    }

    /// Point at a given distance along the route, interpolated between
    /// vertices and clamped to the route ends.
    pub fn point_at_distance(&self, distance_m: f64) -> GpsPoint {
        point_at_distance(&self.geometry, &self.cumulative, distance_m)
    }
}

/// Calculate the total distance of a polyline in meters.
pub fn calculate_route_distance(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Calculate cumulative distances along a route.
/// Returns a vector where dist[i] is the distance from start to point i.
pub fn cumulative_distances(points: &[GpsPoint]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(points.len());
    if points.is_empty() {
        return distances;
    }
    distances.push(0.0);

    for i in 1..points.len() {
        let prev_dist = distances[i - 1];
        let segment_dist = haversine_distance(&points[i - 1], &points[i]);
        distances.push(prev_dist + segment_dist);
    }

    distances
}

/// Find the point at a specific distance along the route.
/// Interpolates between points if the exact distance falls between two points.
fn point_at_distance(points: &[GpsPoint], cumulative: &[f64], target_dist: f64) -> GpsPoint {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return GpsPoint::new(0.0, 0.0);
    };
    if target_dist.is_nan() || target_dist <= 0.0 {
        return *first;
    }

    let total_dist = cumulative.last().copied().unwrap_or(0.0);
    if target_dist >= total_dist {
        return *last;
    }

    // First vertex strictly beyond the target; the segment starts one before it
    let upper = cumulative.partition_point(|d| *d <= target_dist);
    let idx = upper.saturating_sub(1);

    if idx + 1 >= points.len() {
        return *last;
    }

    let seg_start_dist = cumulative[idx];
    let seg_length = cumulative[idx + 1] - seg_start_dist;

    if seg_length < 0.001 {
        return points[idx];
    }

    let ratio = (target_dist - seg_start_dist) / seg_length;
    let p1 = &points[idx];
    let p2 = &points[idx + 1];

    GpsPoint::new(
        p1.latitude + ratio * (p2.latitude - p1.latitude),
        p1.longitude + ratio * (p2.longitude - p1.longitude),
    )
}
