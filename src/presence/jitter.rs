//! Deterministic per-user jitter.
//!
//! Every user gets a stable pseudo-random offset derived from a hash of
//! their uid, so the exact coordinate is never plotted while the marker
//! stays put from one refresh to the next.
//!
//! The seed is a 32-bit signed string hash (`hash = hash * 31 + code_unit`,
//! wrapping, over UTF-16 code units); its absolute value seeds the offset
//! angle (`seed % 360` degrees) and the radius fraction
//! (`0.4 + (seed % 1000) / 1000 * 0.6`).

use crate::geo_utils::{destination_point, normalize_bearing};
use crate::GpsPoint;

/// Smallest fraction of the jitter radius a marker is displaced by.
pub const MIN_RADIUS_FRACTION: f64 = 0.4;

/// Span added on top of [`MIN_RADIUS_FRACTION`].
pub const RADIUS_FRACTION_SPAN: f64 = 0.6;

/// Angle added per push attempt so repeated pushes fan out.
const GOLDEN_ANGLE_DEG: f64 = 137.507_764_050_037_85;

/// Offset applied to one user's raw coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterOffset {
    /// Direction of the displacement, degrees clockwise from north
    pub bearing_deg: f64,
    /// Fraction of the jitter radius, in `[0.4, 1.0)`
    pub fraction: f64,
    /// Displacement in meters
    pub distance_m: f64,
}

/// 32-bit signed string hash of a uid.
pub fn uid_hash(uid: &str) -> i32 {
    uid.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Absolute value of [`uid_hash`], used as the jitter seed.
pub fn uid_seed(uid: &str) -> u32 {
    uid_hash(uid).unsigned_abs()
}

/// Stable offset for a uid at a given jitter radius.
pub fn jitter_offset(uid: &str, radius_m: f64) -> JitterOffset {
    let seed = uid_seed(uid);
    let bearing_deg = (seed % 360) as f64;
    let fraction = MIN_RADIUS_FRACTION + (seed % 1000) as f64 / 1000.0 * RADIUS_FRACTION_SPAN;

    JitterOffset {
        bearing_deg,
        fraction,
        distance_m: radius_m * fraction,
    }
}

/// Displace a raw coordinate by the uid's jitter offset.
pub fn apply_jitter(raw: &GpsPoint, uid: &str, radius_m: f64) -> GpsPoint {
    let offset = jitter_offset(uid, radius_m);
    destination_point(raw, offset.bearing_deg, offset.distance_m)
}

/// Direction used for the `attempt`-th separation push of a uid.
pub fn push_bearing(uid: &str, attempt: usize) -> f64 {
    let base = (uid_seed(uid) % 360) as f64;
    normalize_bearing(base + attempt as f64 * GOLDEN_ANGLE_DEG)
}

/// Icon variant for a uid among `icon_count` variants.
pub fn icon_index(uid: &str, icon_count: usize) -> usize {
    if icon_count == 0 {
        return 0;
    }
    uid_seed(uid) as usize % icon_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_matches_string_hash() {
        assert_eq!(uid_hash(""), 0);
        assert_eq!(uid_hash("a"), 97);
        assert_eq!(uid_hash("ab"), 97 * 31 + 98);
        // Overflows wrap like 32-bit integer arithmetic
        assert_eq!(uid_hash("polygenelubricants"), i32::MIN);
        assert_eq!(uid_seed("polygenelubricants"), 2_147_483_648);
    }

    #[test]
    fn test_offset_fraction_range() {
        for uid in ["a", "user-1", "ZZZZZZZZ", "ünïcødé", "polygenelubricants"] {
            let offset = jitter_offset(uid, 50.0);
            assert!(offset.fraction >= MIN_RADIUS_FRACTION);
            assert!(offset.fraction < 1.0);
            assert!(offset.bearing_deg >= 0.0 && offset.bearing_deg < 360.0);
        }
    }
}
