//! # Spot Navigator
//!
//! Navigation and presence engine for a parking spot swapping map.
//!
//! This library provides:
//! - Polyline decoding of directions geometry
//! - Route progress tracking with monotonic step advancement
//! - Bearing fusion from route, compass and movement signals
//! - Privacy-preserving presence placement for nearby users
//! - Rate-limited rain effect lookups
//! - De-duplicated voice instructions
//! - An event-driven navigation session and its tokio driver
//!
//! ## Features
//!
//! - **`parallel`** - Rank presence records in parallel with rayon
//! - **`http`** - HTTP clients for the directions and weather providers
//! - **`cli`** - The `spotnav-cli` debug tool
//!
//! ## Quick Start
//!
//! ```rust
//! use spotnav::{GpsPoint, Route, RouteProgressTracker};
//!
//! let route = Route::new(
//!     vec![
//!         GpsPoint::new(0.0, 0.0),
//!         GpsPoint::new(1.0, 0.0),
//!         GpsPoint::new(2.0, 0.0),
//!     ],
//!     vec!["Head north".to_string(), "Arrive".to_string()],
//! )
//! .unwrap();
//!
//! let mut tracker = RouteProgressTracker::new();
//! let progress = tracker.update_route(&route, &GpsPoint::new(1.0, 0.0)).unwrap();
//! assert_eq!(progress.closest_index, 1);
//! assert_eq!(progress.step_index, 1);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{NavError, OptionExt, Result};

// Geographic utilities (distance, bearing, projection)
pub mod geo_utils;

// Compact route geometry codec
pub mod polyline;

// Immutable route model
pub mod route;
pub use route::Route;

// Closest-point matching and step advancement
pub mod tracker;
pub use tracker::{RouteProgress, RouteProgressTracker, TrackerState};

// Camera/vehicle heading
pub mod bearing;
pub use bearing::{fuse_bearing, BearingConfig, BearingInputs, BearingSource, FusedBearing, VehiclePose};

// Nearby user markers
pub mod presence;
pub use presence::{PresenceConfig, PresenceEngine, PresenceMarker, PresenceRecord, RawPresence};

// Rain effect cache
pub mod weather;
pub use weather::{RainEffect, WeatherCache, WeatherConfig, WeatherProvider, WeatherReport};

// Spoken instructions
pub mod voice;
pub use voice::{Announcement, SpeechSynthesizer, Voice, VoiceAnnouncer};

// Directions provider boundary
pub mod directions;
pub use directions::{DirectionsProvider, DirectionsRequest, DirectionsResponse};

// Decorative route dots
pub mod animation;
pub use animation::{AnimationConfig, DotAnimator};

// Navigation session and event driver
pub mod session;
pub use session::{DriverEvent, DriverHandle, NavigationDriver, NavigationSession, RenderUpdate};

// Deterministic test data
pub mod synthetic;

// HTTP providers
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{MapboxDirections, OpenMeteoWeather};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use spotnav::GpsPoint;
/// let point = GpsPoint::new(52.5200, 13.4050); // Berlin
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box for a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Check whether a point lies inside the bounds (inclusive).
    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// One geolocation callback payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub point: GpsPoint,
    /// Device-reported heading in degrees, if the platform has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
    /// Ground speed in m/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
    /// Unix timestamp in milliseconds
    #[serde(default)]
    pub timestamp_ms: i64,
}

impl GeoFix {
    /// Create a fix with only a position.
    pub fn at(point: GpsPoint) -> Self {
        Self {
            point,
            heading_deg: None,
            speed_mps: None,
            timestamp_ms: 0,
        }
    }

    /// Attach a device heading.
    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self
    }

    /// Attach a ground speed.
    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the whole navigation engine.
///
/// Every field has a default, so a JSON override only needs the values
/// that differ:
///
/// ```
/// use spotnav::NavigationConfig;
///
/// let config = NavigationConfig::from_json_str(r#"{"presence": {"max_visible": 8}}"#).unwrap();
/// assert_eq!(config.presence.max_visible, 8);
/// assert_eq!(config.polyline_precision, 6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Precision of the directions provider's encoded geometry.
    /// Default: 6 (polyline6)
    pub polyline_precision: u32,

    /// Language tag for directions and speech when none is set.
    /// Default: "en"
    pub default_language: String,

    pub bearing: BearingConfig,
    pub presence: PresenceConfig,
    pub weather: WeatherConfig,
    pub animation: AnimationConfig,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            polyline_precision: 6,
            default_language: "en".to_string(),
            bearing: BearingConfig::default(),
            presence: PresenceConfig::default(),
            weather: WeatherConfig::default(),
            animation: AnimationConfig::default(),
        }
    }
}

impl NavigationConfig {
    /// Parse a configuration from JSON, filling missing values with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| NavError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.polyline_precision == 0 || self.polyline_precision > 10 {
            return Err(NavError::InvalidConfig(format!(
                "polyline_precision must be in 1..=10, got {}",
                self.polyline_precision
            )));
        }
        if self.presence.max_distance_km <= 0.0 || !self.presence.max_distance_km.is_finite() {
            return Err(NavError::InvalidConfig(
                "presence.max_distance_km must be positive".to_string(),
            ));
        }
        if self.presence.jitter_radius_m < 0.0 || self.presence.min_separation_m < 0.0 {
            return Err(NavError::InvalidConfig(
                "presence distances must not be negative".to_string(),
            ));
        }
        if self.weather.ttl_secs == 0 {
            return Err(NavError::InvalidConfig(
                "weather.ttl_secs must be positive".to_string(),
            ));
        }
        if self.animation.spacing_m <= 0.0 {
            return Err(NavError::InvalidConfig(
                "animation.spacing_m must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
