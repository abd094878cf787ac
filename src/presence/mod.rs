//! # Presence Placement Engine
//!
//! Turns the live feed of nearby users into display markers:
//!
//! 1. Filter by distance to the viewer, rank nearest first, cap the count
//! 2. Displace each newly visible user by a deterministic uid-derived jitter
//! 3. Push new markers away from already placed ones (greedy, one pass)
//! 4. Keep the display position of users who stay visible
//!
//! Users who drop out of the visible set are evicted entirely; if they
//! come back their jitter is recomputed, which reproduces the same offset.
//!
//! ## Architecture
//!
//! - `PresenceStore` - uid-keyed record arena
//! - `SeparationIndex` - R-tree of placed markers for the separation pass
//! - `jitter` - hash-derived offsets and icon assignment

pub mod jitter;
pub mod separation;
pub mod store;

pub use separation::SeparationIndex;
pub use store::{PresenceRecord, PresenceStore};

use std::collections::{HashMap, HashSet};

use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_distance;
use crate::GpsPoint;

/// Configuration for presence placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Users farther than this from the viewer are not shown.
    /// Default: 5.0 km
    pub max_distance_km: f64,

    /// Maximum number of markers shown at once (nearest win).
    /// Default: 20
    pub max_visible: usize,

    /// Full jitter radius; actual displacement is 40-100% of it.
    /// Default: 40.0 meters
    pub jitter_radius_m: f64,

    /// Minimum distance between any two displayed markers.
    /// Default: 25.0 meters
    pub min_separation_m: f64,

    /// Number of vehicle icon variants to spread users over.
    /// Default: 6
    pub icon_count: usize,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            max_distance_km: 5.0,
            max_visible: 20,
            jitter_radius_m: 40.0,
            min_separation_m: 25.0,
            icon_count: 6,
        }
    }
}

/// One user's entry in a feed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPresence {
    pub uid: String,
    pub position: GpsPoint,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Unix timestamp in milliseconds
    #[serde(default)]
    pub last_seen_at: Option<i64>,
}

impl RawPresence {
    /// Create a feed entry with only a uid and position.
    pub fn new(uid: impl Into<String>, position: GpsPoint) -> Self {
        Self {
            uid: uid.into(),
            position,
            display_name: None,
            last_seen_at: None,
        }
    }
}

/// A marker ready for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceMarker {
    pub uid: String,
    pub position: GpsPoint,
    pub icon_index: usize,
    pub display_name: Option<String>,
    pub distance_m: f64,
    pub last_seen_at: Option<i64>,
}

impl From<&PresenceRecord> for PresenceMarker {
    fn from(record: &PresenceRecord) -> Self {
        Self {
            uid: record.uid.clone(),
            position: record.display_position,
            icon_index: record.icon_index,
            display_name: record.display_name.clone(),
            distance_m: record.distance_m,
            last_seen_at: record.last_seen_at,
        }
    }
}

/// Presence placement engine.
///
/// Owns the display positions of all visible users. The feed is treated
/// as a full snapshot on every tick; the engine does its own diffing.
#[derive(Debug)]
pub struct PresenceEngine {
    store: PresenceStore,
    config: PresenceConfig,
}

impl Default for PresenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceEngine {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(PresenceConfig::default())
    }

    /// Create an engine with custom configuration.
    pub fn with_config(config: PresenceConfig) -> Self {
        Self {
            store: PresenceStore::new(),
            config,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    /// Place a feed snapshot using the configured distance and cap.
    pub fn place(&mut self, snapshot: &[RawPresence], viewer: &GpsPoint) -> Vec<PresenceMarker> {
        let (max_distance_km, max_visible) = (self.config.max_distance_km, self.config.max_visible);
        self.place_with(snapshot, viewer, max_distance_km, max_visible)
    }

    /// Place a feed snapshot with an explicit distance window and cap.
    ///
    /// Returns the visible markers, nearest first. An invalid viewer
    /// position leaves the current placement untouched.
    pub fn place_with(
        &mut self,
        snapshot: &[RawPresence],
        viewer: &GpsPoint,
        max_distance_km: f64,
        max_visible: usize,
    ) -> Vec<PresenceMarker> {
        if !viewer.is_valid() {
            debug!("Skipping presence placement for invalid viewer position");
            return self.markers();
        }

        let ranked = rank_snapshot(snapshot, viewer, max_distance_km * 1000.0, max_visible);

        let visible: HashSet<&str> = ranked.iter().map(|(raw, _)| raw.uid.as_str()).collect();
        let evicted = self.store.retain_visible(&visible);
        if !evicted.is_empty() {
            debug!("Evicted {} presence records: {:?}", evicted.len(), evicted);
        }

        // Users who stay visible are placed first and never move
        let mut index = SeparationIndex::new(*viewer, self.config.min_separation_m);
        for (raw, distance_m) in &ranked {
            if let Some(record) = self.store.get_mut(&raw.uid) {
                record.raw_position = raw.position;
                record.distance_m = *distance_m;
                record.last_seen_at = raw.last_seen_at.or(record.last_seen_at);
                if raw.display_name.is_some() {
                    record.display_name = raw.display_name.clone();
                }
                index.insert(record.display_position);
            }
        }

        let mut placed_new = 0;
        for (raw, distance_m) in &ranked {
            if self.store.contains(&raw.uid) {
                continue;
            }
            let jittered = jitter::apply_jitter(&raw.position, &raw.uid, self.config.jitter_radius_m);
            let display_position = index.resolve(&raw.uid, jittered);
            index.insert(display_position);

            self.store.insert(PresenceRecord {
                uid: raw.uid.clone(),
                raw_position: raw.position,
                display_position,
                last_seen_at: raw.last_seen_at,
                display_name: raw.display_name.clone(),
                icon_index: jitter::icon_index(&raw.uid, self.config.icon_count),
                distance_m: *distance_m,
            });
            placed_new += 1;
        }

        debug!(
            "Presence tick: {} in snapshot, {} visible, {} newly placed",
            snapshot.len(),
            ranked.len(),
            placed_new
        );

        ranked
            .iter()
            .filter_map(|(raw, _)| self.store.get(&raw.uid))
            .map(PresenceMarker::from)
            .collect()
    }

    /// Visible markers, nearest first.
    pub fn markers(&self) -> Vec<PresenceMarker> {
        let mut markers: Vec<PresenceMarker> = self.store.values().map(PresenceMarker::from).collect();
        markers.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m).then_with(|| a.uid.cmp(&b.uid)));
        markers
    }

    /// Display position per visible uid.
    pub fn display_positions(&self) -> HashMap<String, GpsPoint> {
        self.store
            .values()
            .map(|r| (r.uid.clone(), r.display_position))
            .collect()
    }

    /// Record for a visible uid.
    pub fn record(&self, uid: &str) -> Option<&PresenceRecord> {
        self.store.get(uid)
    }

    /// Number of visible users.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if no user is visible.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Forget every user.
    pub fn clear(&mut self) {
        self.store.clear();
    }
}

/// Deduplicate, measure, filter, sort and cap a snapshot.
///
/// Duplicate uids keep the last entry; entries with an empty uid or an
/// invalid coordinate are skipped. Ties in distance are broken by uid so
/// the ranking is deterministic.
fn rank_snapshot<'a>(
    snapshot: &'a [RawPresence],
    viewer: &GpsPoint,
    max_distance_m: f64,
    max_visible: usize,
) -> Vec<(&'a RawPresence, f64)> {
    let mut latest: HashMap<&str, &RawPresence> = HashMap::with_capacity(snapshot.len());
    for raw in snapshot {
        if raw.uid.is_empty() || !raw.position.is_valid() {
            continue;
        }
        latest.insert(raw.uid.as_str(), raw);
    }
    let candidates: Vec<&RawPresence> = latest.into_values().collect();

    let mut ranked: Vec<(&RawPresence, f64)> = measure(&candidates, viewer)
        .into_iter()
        .filter(|(_, dist)| *dist <= max_distance_m)
        .collect();

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.uid.cmp(&b.0.uid)));
    ranked.truncate(max_visible);
    ranked
}

#[cfg(feature = "parallel")]
fn measure<'a>(candidates: &[&'a RawPresence], viewer: &GpsPoint) -> Vec<(&'a RawPresence, f64)> {
    candidates
        .par_iter()
        .map(|raw| (*raw, haversine_distance(viewer, &raw.position)))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn measure<'a>(candidates: &[&'a RawPresence], viewer: &GpsPoint) -> Vec<(&'a RawPresence, f64)> {
    candidates
        .iter()
        .map(|raw| (*raw, haversine_distance(viewer, &raw.position)))
        .collect()
}
