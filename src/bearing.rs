//! Bearing fusion.
//!
//! Produces a stable camera/vehicle heading from several noisy signals,
//! taken in strict priority order:
//!
//! 1. The route line at the matched vertex (rail-locks the camera to the road)
//! 2. The device heading, unless the vehicle is nearly stationary
//! 3. The movement bearing between consecutive fixes, if they are far enough apart
//! 4. The last known bearing, so the camera never snaps while stopped

use serde::{Deserialize, Serialize};

use crate::geo_utils::{bearing_between, haversine_distance, normalize_bearing};
use crate::GpsPoint;

/// Thresholds for the lower-priority bearing sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BearingConfig {
    /// Device heading is trusted only above this speed (m/s) or when the
    /// speed is unknown.
    /// Default: 1.0
    pub min_heading_speed_mps: f64,

    /// Consecutive fixes closer than this (meters) are treated as jitter.
    /// Default: 3.0
    pub min_movement_m: f64,
}

impl Default for BearingConfig {
    fn default() -> Self {
        Self {
            min_heading_speed_mps: 1.0,
            min_movement_m: 3.0,
        }
    }
}

/// Which signal produced a fused bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BearingSource {
    RouteLine,
    DeviceHeading,
    Movement,
    LastKnown,
}

/// Output of [`fuse_bearing`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FusedBearing {
    /// Degrees clockwise from true north, in `[0, 360)`
    pub bearing_deg: f64,
    pub source: BearingSource,
}

/// Inputs for one bearing decision.
#[derive(Debug, Clone, Copy)]
pub struct BearingInputs<'a> {
    pub prev_fix: Option<&'a GpsPoint>,
    pub current_fix: &'a GpsPoint,
    pub route_geometry: &'a [GpsPoint],
    /// Closest vertex from the tracker for this same fix
    pub closest_index: Option<usize>,
    pub device_heading: Option<f64>,
    pub speed_mps: Option<f64>,
    pub last_bearing: f64,
}

/// Vehicle state recomputed on every fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehiclePose {
    pub position: GpsPoint,
    pub bearing_deg: f64,
    pub speed_mps: Option<f64>,
    pub heading_deg: Option<f64>,
}

/// Fuse the available signals into one bearing.
///
/// This is a pure function: identical inputs always give identical output.
pub fn fuse_bearing(inputs: &BearingInputs<'_>, config: &BearingConfig) -> FusedBearing {
    if let Some(bearing_deg) = route_line_bearing(inputs.route_geometry, inputs.closest_index) {
        return FusedBearing {
            bearing_deg,
            source: BearingSource::RouteLine,
        };
    }

    if let Some(heading) = inputs.device_heading.filter(|h| h.is_finite()) {
        let moving = match inputs.speed_mps {
            Some(speed) if speed.is_finite() => speed > config.min_heading_speed_mps,
            _ => true,
        };
        if moving {
            return FusedBearing {
                bearing_deg: normalize_bearing(heading),
                source: BearingSource::DeviceHeading,
            };
        }
    }

    if let Some(prev) = inputs.prev_fix {
        if prev.is_valid()
            && inputs.current_fix.is_valid()
            && haversine_distance(prev, inputs.current_fix) > config.min_movement_m
        {
            return FusedBearing {
                bearing_deg: bearing_between(prev, inputs.current_fix),
                source: BearingSource::Movement,
            };
        }
    }

    FusedBearing {
        bearing_deg: normalize_bearing(inputs.last_bearing),
        source: BearingSource::LastKnown,
    }
}

/// Bearing of the route segment leaving the matched vertex.
///
/// At the last vertex the final segment is used instead. Returns `None`
/// without a match, with fewer than two vertices, or when the segment has
/// zero length.
pub fn route_line_bearing(geometry: &[GpsPoint], closest_index: Option<usize>) -> Option<f64> {
    let index = closest_index?;
    if geometry.len() < 2 || index >= geometry.len() {
        return None;
    }

    let (from, to) = if index + 1 < geometry.len() {
        (&geometry[index], &geometry[index + 1])
    } else {
        (&geometry[geometry.len() - 2], &geometry[geometry.len() - 1])
    };

    if from == to {
        return None;
    }
    Some(bearing_between(from, to))
}
