//! Presence record arena keyed by uid.
//!
//! One record holds everything the map keeps about another user: raw
//! position from the feed, obfuscated display position, icon and profile
//! data. Evicting a user is a single remove.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::GpsPoint;

/// Display state of one visible user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceRecord {
    pub uid: String,
    /// Ground-truth coordinate from the feed; never rendered
    #[serde(skip)]
    pub raw_position: GpsPoint,
    /// Obfuscated coordinate, stable for as long as the user stays visible
    pub display_position: GpsPoint,
    /// Unix timestamp in milliseconds of the last feed update
    pub last_seen_at: Option<i64>,
    pub display_name: Option<String>,
    pub icon_index: usize,
    /// Distance from the viewer to the raw position, in meters
    pub distance_m: f64,
}

/// Storage for presence records.
#[derive(Debug, Default)]
pub struct PresenceStore {
    records: HashMap<String, PresenceRecord>,
}

impl PresenceStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Insert or replace a record.
    pub fn insert(&mut self, record: PresenceRecord) {
        self.records.insert(record.uid.clone(), record);
    }

    /// Get a record by uid.
    pub fn get(&self, uid: &str) -> Option<&PresenceRecord> {
        self.records.get(uid)
    }

    /// Get a mutable record by uid.
    pub fn get_mut(&mut self, uid: &str) -> Option<&mut PresenceRecord> {
        self.records.get_mut(uid)
    }

    /// Check if a uid has a record.
    pub fn contains(&self, uid: &str) -> bool {
        self.records.contains_key(uid)
    }

    /// Remove a record, returning it if it existed.
    pub fn remove(&mut self, uid: &str) -> Option<PresenceRecord> {
        self.records.remove(uid)
    }

    /// Remove every record whose uid is not in `visible`.
    ///
    /// Returns the evicted uids.
    pub fn retain_visible(&mut self, visible: &HashSet<&str>) -> Vec<String> {
        let evicted: Vec<String> = self
            .records
            .keys()
            .filter(|uid| !visible.contains(uid.as_str()))
            .cloned()
            .collect();
        for uid in &evicted {
            self.records.remove(uid);
        }
        evicted
    }

    /// Clear all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Get all records.
    pub fn values(&self) -> impl Iterator<Item = &PresenceRecord> {
        self.records.values()
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
