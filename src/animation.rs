//! Decorative dots moving along the route line.
//!
//! Purely cosmetic: a frame can be computed for any elapsed time, so
//! dropped animation frames never affect guidance.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{GpsPoint, Route};

/// Configuration for the route-dot animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Distance between consecutive dots.
    /// Default: 30.0 meters
    pub spacing_m: f64,

    /// How fast the dots travel along the route.
    /// Default: 12.0 m/s
    pub speed_mps: f64,

    /// Upper bound on dots per frame for very long routes.
    /// Default: 400
    pub max_dots: usize,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            spacing_m: 30.0,
            speed_mps: 12.0,
            max_dots: 400,
        }
    }
}

/// Computes dot positions for a frame.
#[derive(Debug, Clone)]
pub struct DotAnimator {
    config: AnimationConfig,
}

impl DotAnimator {
    pub fn new(config: AnimationConfig) -> Self {
        Self { config }
    }

    /// Dot positions at `elapsed` since the animation started.
    ///
    /// Dots sit every `spacing_m` along the route, shifted forward by
    /// `elapsed * speed` modulo the spacing.
    pub fn frame(&self, route: &Route, elapsed: Duration) -> Vec<GpsPoint> {
        let spacing = self.config.spacing_m;
        let total = route.total_distance_m();
        if spacing <= 0.0 || total <= 0.0 {
            return Vec::new();
        }

        let phase = (elapsed.as_secs_f64() * self.config.speed_mps).rem_euclid(spacing);
        let count = ((total - phase) / spacing).floor() as usize + 1;

        (0..count.min(self.config.max_dots))
            .map(|i| route.point_at_distance(phase + i as f64 * spacing))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::haversine_distance;

    fn route() -> Route {
        // About 1112 m along the equator
        Route::new(
            vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 0.01)],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_frame_spacing() {
        let animator = DotAnimator::new(AnimationConfig::default());
        let dots = animator.frame(&route(), Duration::ZERO);

        assert_eq!(dots[0], GpsPoint::new(0.0, 0.0));
        assert_eq!(dots.len(), 38);
        let gap = haversine_distance(&dots[0], &dots[1]);
        assert!((gap - 30.0).abs() < 0.1);
    }

    #[test]
    fn test_frame_moves_and_wraps() {
        let animator = DotAnimator::new(AnimationConfig::default());
        let route = route();

        // 12 m/s for one second
        let moved = animator.frame(&route, Duration::from_secs(1));
        assert!((haversine_distance(&route.geometry()[0], &moved[0]) - 12.0).abs() < 0.1);

        // A full spacing later the pattern repeats
        let start = animator.frame(&route, Duration::ZERO);
        let wrapped = animator.frame(&route, Duration::from_millis(2500));
        assert!(haversine_distance(&start[0], &wrapped[0]) < 1e-6);
    }

    #[test]
    fn test_frame_respects_max_dots() {
        let animator = DotAnimator::new(AnimationConfig {
            max_dots: 5,
            ..AnimationConfig::default()
        });
        assert_eq!(animator.frame(&route(), Duration::ZERO).len(), 5);

        let degenerate = DotAnimator::new(AnimationConfig {
            spacing_m: 0.0,
            ..AnimationConfig::default()
        });
        assert!(degenerate.frame(&route(), Duration::ZERO).is_empty());
    }
}
