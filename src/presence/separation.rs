//! Greedy pairwise separation of presence markers.
//!
//! Markers are placed one at a time. A new marker that lands closer than
//! the minimum separation to an already placed one is pushed away from
//! it along a uid-derived direction, to exactly the minimum distance (plus
//! a small margin). Already placed markers never move. This is a single
//! greedy pass, not a relaxation: dense clusters of three or more
//! coincident users may still end up closer than the minimum once the
//! push budget is spent.

use log::warn;
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::geo_utils::{destination_point, haversine_distance, LocalProjection};
use crate::GpsPoint;

use super::jitter::push_bearing;

/// Pushes tried for one marker before giving up.
pub const MAX_PUSH_ATTEMPTS: usize = 8;

/// Pushed markers land this factor beyond the minimum separation.
const PUSH_MARGIN: f64 = 1.001;

/// Candidate lookup radius relative to the minimum separation; covers the
/// error of the planar projection.
const CANDIDATE_SLACK: f64 = 1.5;

type PlacedPoint = GeomWithData<[f64; 2], GpsPoint>;

/// R-tree of placed markers in a local metric plane.
#[derive(Debug)]
pub struct SeparationIndex {
    projection: LocalProjection,
    tree: RTree<PlacedPoint>,
    min_separation_m: f64,
}

impl SeparationIndex {
    /// Create an empty index projected around `origin` (usually the viewer).
    pub fn new(origin: GpsPoint, min_separation_m: f64) -> Self {
        Self {
            projection: LocalProjection::new(origin),
            tree: RTree::new(),
            min_separation_m,
        }
    }

    /// Record a marker as placed.
    pub fn insert(&mut self, point: GpsPoint) {
        let xy = self.projection.project(&point);
        self.tree.insert(GeomWithData::new(xy, point));
    }

    /// Number of placed markers.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if nothing has been placed yet.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Nearest placed marker closer than the minimum separation, if any.
    pub fn conflict(&self, point: &GpsPoint) -> Option<GpsPoint> {
        if self.min_separation_m <= 0.0 {
            return None;
        }
        let xy = self.projection.project(point);
        let radius = self.min_separation_m * CANDIDATE_SLACK;

        self.tree
            .locate_within_distance(xy, radius * radius)
            .map(|placed| (placed.data, haversine_distance(&placed.data, point)))
            .filter(|(_, dist)| *dist < self.min_separation_m)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(placed, _)| placed)
    }

    /// Move `candidate` until it clears every placed marker, or the push
    /// budget runs out.
    pub fn resolve(&self, uid: &str, candidate: GpsPoint) -> GpsPoint {
        let mut point = candidate;
        for attempt in 0..MAX_PUSH_ATTEMPTS {
            let Some(anchor) = self.conflict(&point) else {
                return point;
            };
            point = destination_point(
                &anchor,
                push_bearing(uid, attempt),
                self.min_separation_m * PUSH_MARGIN,
            );
        }

        if self.conflict(&point).is_some() {
            warn!(
                "Could not separate marker for '{}' after {} pushes",
                uid, MAX_PUSH_ATTEMPTS
            );
        }
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_across_antimeridian() {
        let viewer = GpsPoint::new(-17.0, 179.9999);
        let mut index = SeparationIndex::new(viewer, 25.0);
        index.insert(GpsPoint::new(-17.0, 179.99995));

        // About 10 m east, on the other side of the date line
        let across = GpsPoint::new(-17.0, -179.99996);
        assert!(index.conflict(&across).is_some());

        let resolved = index.resolve("bob", across);
        assert!(haversine_distance(&resolved, &GpsPoint::new(-17.0, 179.99995)) >= 25.0);
    }
}
