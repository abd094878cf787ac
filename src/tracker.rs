//! Route progress tracking.
//!
//! Maps a live position onto the route by closest-vertex matching and
//! derives the current instruction step from it. The externally visible
//! step index never moves backward within a session, which absorbs GPS
//! noise that would otherwise make guidance jump back a step.

use log::debug;

use crate::geo_utils::haversine_distance;
use crate::route::MIN_ROUTE_POINTS;
use crate::{GpsPoint, Route};

/// Mutable progress state owned by a single tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerState {
    /// Highest closest-vertex index matched so far
    pub last_matched_index: usize,
    /// Current instruction step, never decreasing
    pub current_step_index: usize,
}

/// Result of matching one fix against the route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteProgress {
    /// Index of the route vertex nearest to the fix
    pub closest_index: usize,
    /// Step index after the monotonicity rule was applied
    pub step_index: usize,
    /// Distance from the fix to the nearest vertex in meters
    pub distance_to_route_m: f64,
}

/// Tracks progress along one route.
///
/// Reset it whenever the route is replaced.
#[derive(Debug, Default)]
pub struct RouteProgressTracker {
    state: TrackerState,
}

impl RouteProgressTracker {
    /// Create a tracker at the start of a route.
    pub fn new() -> Self {
        Self {
            state: TrackerState::default(),
        }
    }

    /// Current tracker state.
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Reset to the start of a (new) route.
    pub fn reset(&mut self) {
        self.state = TrackerState::default();
    }

    /// Match a position against a route.
    pub fn update_route(&mut self, route: &Route, position: &GpsPoint) -> Option<RouteProgress> {
        self.update(route.geometry(), route.step_count(), position)
    }

    /// Match a position against raw route geometry with `step_count` steps.
    ///
    /// Returns `None` (and leaves the state untouched) if the geometry has
    /// fewer than two points or the position is not a valid coordinate.
    pub fn update(
        &mut self,
        geometry: &[GpsPoint],
        step_count: usize,
        position: &GpsPoint,
    ) -> Option<RouteProgress> {
        if geometry.len() < MIN_ROUTE_POINTS || !position.is_valid() {
            return None;
        }

        let (closest_index, distance_to_route_m) = closest_vertex(geometry, position)?;
        let candidate = step_for_index(closest_index, geometry.len(), step_count);

        if candidate < self.state.current_step_index {
            debug!(
                "Ignoring backward step {} (current {}), vertex {}",
                candidate, self.state.current_step_index, closest_index
            );
        } else {
            self.state.current_step_index = candidate;
        }
        self.state.last_matched_index = self.state.last_matched_index.max(closest_index);

        Some(RouteProgress {
            closest_index,
            step_index: self.state.current_step_index,
            distance_to_route_m,
        })
    }
}

/// Linear scan for the vertex nearest to `position`.
///
/// Ties keep the earliest vertex.
pub fn closest_vertex(geometry: &[GpsPoint], position: &GpsPoint) -> Option<(usize, f64)> {
    geometry
        .iter()
        .enumerate()
        .map(|(i, p)| (i, haversine_distance(p, position)))
        .fold(None, |best, (i, dist)| match best {
            Some((_, best_dist)) if best_dist <= dist => best,
            _ => Some((i, dist)),
        })
}

/// Map a vertex index to a step index by its fraction of the geometry.
///
/// `floor(closest / (len - 1) * step_count)`, clamped to the last step.
pub fn step_for_index(closest_index: usize, point_count: usize, step_count: usize) -> usize {
    if step_count == 0 || point_count < MIN_ROUTE_POINTS {
        return 0;
    }
    let ratio = closest_index as f64 / (point_count - 1) as f64;
    let step = (ratio * step_count as f64).floor() as usize;
    step.min(step_count - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_for_index_bounds() {
        assert_eq!(step_for_index(0, 3, 2), 0);
        assert_eq!(step_for_index(1, 3, 2), 1);
        assert_eq!(step_for_index(2, 3, 2), 1);
        assert_eq!(step_for_index(5, 11, 0), 0);
    }

    #[test]
    fn test_closest_vertex_prefers_first_on_tie() {
        let geometry = vec![GpsPoint::new(0.0, 1.0), GpsPoint::new(0.0, -1.0)];
        let (idx, _) = closest_vertex(&geometry, &GpsPoint::new(0.0, 0.0)).unwrap();
        assert_eq!(idx, 0);
    }
}
