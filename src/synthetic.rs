//! Synthetic navigation data for tests, benchmarks and the CLI.
//!
//! Everything is driven by a seeded `StdRng`, so the same seed always
//! produces the same route, fix stream and crowd.
//!
//! # Example
//!
//! ```rust
//! use spotnav::synthetic::{RoutePattern, RouteScenario};
//! use spotnav::GpsPoint;
//!
//! let scenario = RouteScenario {
//!     origin: GpsPoint::new(52.52, 13.40),
//!     length_m: 2_000.0,
//!     pattern: RoutePattern::Winding,
//!     step_every_m: 250.0,
//!     seed: 7,
//! };
//! let route = scenario.generate().unwrap();
//! assert!(route.step_count() >= 2);
//! ```

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::geo_utils::{
    bearing_between, destination_point, meters_to_degrees, normalize_bearing, METERS_PER_DEG_LAT,
};
use crate::presence::RawPresence;
use crate::{GeoFix, GpsPoint, Route};

/// Distance between generated route vertices.
const POINT_SPACING_M: f64 = 20.0;

// ============================================================================
// Routes
// ============================================================================

/// Shape of a generated route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePattern {
    /// Nearly straight with minor drift.
    Straight,
    /// City driving: frequent gentle turns and the occasional corner.
    Winding,
}

/// Parameters for a synthetic route.
#[derive(Debug, Clone)]
pub struct RouteScenario {
    pub origin: GpsPoint,
    pub length_m: f64,
    pub pattern: RoutePattern,
    /// One instruction per this many meters of route.
    pub step_every_m: f64,
    pub seed: u64,
}

impl RouteScenario {
    /// Generate the route geometry and instruction texts.
    pub fn generate(&self) -> Result<Route> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let geometry = generate_geometry(&self.origin, self.length_m, self.pattern, &mut rng);

        let step_count = if self.step_every_m > 0.0 {
            ((self.length_m / self.step_every_m).ceil() as usize).max(1)
        } else {
            1
        };
        let mut steps: Vec<String> = (0..step_count)
            .map(|i| match i % 3 {
                0 => format!("Continue straight for {:.0} m", self.step_every_m),
                1 => "Turn left".to_string(),
                _ => "Turn right".to_string(),
            })
            .collect();
        if let Some(last) = steps.last_mut() {
            *last = "You have arrived at your spot".to_string();
        }

        Route::new(geometry, steps)
    }
}

fn generate_geometry(
    origin: &GpsPoint,
    length_m: f64,
    pattern: RoutePattern,
    rng: &mut StdRng,
) -> Vec<GpsPoint> {
    let num_points = (length_m / POINT_SPACING_M).ceil().max(1.0) as usize;
    let mut points = Vec::with_capacity(num_points + 1);
    let mut heading: f64 = rng.gen_range(0.0..360.0);
    let mut current = *origin;
    points.push(current);

    for _ in 0..num_points {
        heading += match pattern {
            RoutePattern::Straight => rng.gen_range(-1.0..1.0),
            RoutePattern::Winding => {
                // Mostly gentle, sometimes a right-angle corner
                if rng.gen_bool(0.05) {
                    if rng.r#gen() { 90.0 } else { -90.0 }
                } else {
                    rng.gen_range(-8.0..8.0)
                }
            }
        };
        current = destination_point(&current, heading, POINT_SPACING_M);
        points.push(current);
    }

    points
}

// ============================================================================
// Fix streams
// ============================================================================

/// Parameters for a simulated drive along a route.
#[derive(Debug, Clone)]
pub struct DriveScenario {
    pub speed_mps: f64,
    /// Seconds between fixes.
    pub interval_s: f64,
    /// Standard deviation of position noise.
    pub noise_sigma_m: f64,
    /// Whether fixes carry a device heading.
    pub with_heading: bool,
    pub seed: u64,
}

impl Default for DriveScenario {
    fn default() -> Self {
        Self {
            speed_mps: 10.0,
            interval_s: 1.0,
            noise_sigma_m: 4.0,
            with_heading: true,
            seed: 42,
        }
    }
}

impl DriveScenario {
    /// Fixes from the start to the end of `route`.
    pub fn fixes(&self, route: &Route) -> Vec<GeoFix> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let step_m = (self.speed_mps * self.interval_s).max(1.0);
        let total = route.total_distance_m();
        let count = (total / step_m).floor() as usize + 1;

        let mut fixes = Vec::with_capacity(count);
        for i in 0..count {
            let along = (i as f64 * step_m).min(total);
            let truth = route.point_at_distance(along);
            let ahead = route.point_at_distance((along + 1.0).min(total));
            let point = add_noise(&truth, self.noise_sigma_m, &mut rng);

            let mut fix = GeoFix::at(point).with_speed(self.speed_mps);
            fix.timestamp_ms = (i as f64 * self.interval_s * 1000.0) as i64;
            if self.with_heading {
                let jitter: f64 = rng.gen_range(-5.0..5.0);
                let heading = bearing_between(&truth, &ahead) + jitter;
                fix = fix.with_heading(normalize_bearing(heading));
            }
            fixes.push(fix);
        }
        fixes
    }
}

/// Gaussian position noise via Box-Muller.
fn add_noise(point: &GpsPoint, sigma_m: f64, rng: &mut StdRng) -> GpsPoint {
    if sigma_m <= 0.0 {
        return *point;
    }
    let u1: f64 = rng.gen_range(0.0001..1.0);
    let u2: f64 = rng.r#gen();
    let r = (-2.0 * u1.ln()).sqrt() * sigma_m;
    let theta = 2.0 * PI * u2;

    GpsPoint::new(
        point.latitude + r * theta.sin() / METERS_PER_DEG_LAT,
        point.longitude + meters_to_degrees(r * theta.cos(), point.latitude),
    )
}

// ============================================================================
// Presence crowds
// ============================================================================

/// Parameters for a crowd of nearby users.
#[derive(Debug, Clone)]
pub struct CrowdScenario {
    pub center: GpsPoint,
    pub count: usize,
    /// Users are scattered uniformly over a disc of this radius.
    pub radius_m: f64,
    /// Fraction of users placed at exactly the same spot as someone else.
    pub duplicate_fraction: f64,
    pub seed: u64,
}

impl CrowdScenario {
    /// One presence snapshot.
    pub fn snapshot(&self) -> Vec<RawPresence> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut crowd: Vec<RawPresence> = Vec::with_capacity(self.count);

        for i in 0..self.count {
            let position = match crowd.last() {
                Some(previous) if rng.gen_bool(self.duplicate_fraction.clamp(0.0, 1.0)) => {
                    previous.position
                }
                _ => {
                    let bearing: f64 = rng.gen_range(0.0..360.0);
                    let distance = self.radius_m * rng.r#gen::<f64>().sqrt();
                    destination_point(&self.center, bearing, distance)
                }
            };
            let mut raw = RawPresence::new(format!("user-{:04}", i), position);
            raw.display_name = Some(format!("Driver {}", i));
            raw.last_seen_at = Some(1_700_000_000_000 + i as i64 * 1000);
            crowd.push(raw);
        }
        crowd
    }
}
