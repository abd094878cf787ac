//! Encoded polyline codec.
//!
//! Implements the signed-delta polyline format used by directions
//! providers: every coordinate is stored as the difference to the
//! previous one, scaled by `10^precision`, zig-zag encoded and written as
//! 5-bit chunks offset by 63 with `0x20` as the continuation bit.
//! Latitude comes before longitude in each pair.

use crate::GpsPoint;

/// Precision used by polyline6 geometries.
pub const DEFAULT_PRECISION: u32 = 6;

const CHUNK_OFFSET: u8 = 63;
/// Highest byte an encoder emits (`'~'`).
const CHUNK_MAX: u8 = 126;
const CONTINUATION_BIT: i64 = 0x20;
const CHUNK_MASK: i64 = 0x1f;

/// Decode an encoded polyline into GPS points.
///
/// An empty string yields an empty vector. Malformed input is not an
/// error: decoding stops at the first value that cannot be completed and
/// returns the points decoded up to that point. Callers should treat an
/// implausibly short result as a failed fetch.
///
/// # Example
/// ```
/// use spotnav::polyline::decode;
///
/// let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@", 5);
/// assert_eq!(points.len(), 3);
/// assert!((points[0].latitude - 38.5).abs() < 1e-9);
/// assert!((points[0].longitude + 120.2).abs() < 1e-9);
/// ```
pub fn decode(encoded: &str, precision: u32) -> Vec<GpsPoint> {
    let factor = 10f64.powi(precision as i32);
    let bytes = encoded.as_bytes();

    let mut points = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        let Some((dlat, next)) = read_value(bytes, index) else {
            break;
        };
        let Some((dlng, next)) = read_value(bytes, next) else {
            break;
        };
        index = next;

        lat = lat.wrapping_add(dlat);
        lng = lng.wrapping_add(dlng);
        points.push(GpsPoint::new(lat as f64 / factor, lng as f64 / factor));
    }

    points
}

/// Read one zig-zag encoded value starting at `start`.
///
/// Returns the value and the index just past it, or `None` if the input
/// ends mid-value or contains a byte outside the polyline alphabet.
fn read_value(bytes: &[u8], start: usize) -> Option<(i64, usize)> {
    let mut result: i64 = 0;
    let mut shift = 0u32;
    let mut index = start;

    loop {
        let byte = *bytes.get(index)?;
        if !(CHUNK_OFFSET..=CHUNK_MAX).contains(&byte) || shift > 60 {
            return None;
        }
        let chunk = (byte - CHUNK_OFFSET) as i64;
        index += 1;

        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;

        if chunk & CONTINUATION_BIT == 0 {
            break;
        }
    }

    let value = if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    };
    Some((value, index))
}

/// Encode GPS points as a polyline at the given precision.
///
/// This is the reference encoder matching [`decode`].
pub fn encode(points: &[GpsPoint], precision: u32) -> String {
    let factor = 10f64.powi(precision as i32);
    let mut out = String::with_capacity(points.len() * 8);

    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for point in points {
        let lat = (point.latitude * factor).round() as i64;
        let lng = (point.longitude * factor).round() as i64;

        write_value(lat - prev_lat, &mut out);
        write_value(lng - prev_lng, &mut out);

        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn write_value(delta: i64, out: &mut String) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };

    while value >= CONTINUATION_BIT {
        let chunk = (CONTINUATION_BIT | (value & CHUNK_MASK)) as u8 + CHUNK_OFFSET;
        out.push(chunk as char);
        value >>= 5;
    }
    out.push((value as u8 + CHUNK_OFFSET) as char);
}
