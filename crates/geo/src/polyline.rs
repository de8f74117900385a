//! Encoded polyline decoding.
//!
//! Directions providers return route geometry in the "encoded polyline
//! algorithm format": zig-zag encoded deltas, 5-bit chunks offset by 63.

use crate::{Coordinate, GeoError, Result};

/// Precision used by Google-style overview polylines.
pub const DEFAULT_PRECISION: u32 = 5;

/// Decodes an encoded polyline at [`DEFAULT_PRECISION`].
///
/// ```
/// use taskroute_geo::polyline;
///
/// let path = polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
/// assert_eq!(path.len(), 3);
/// assert!((path[0].latitude - 38.5).abs() < 1e-9);
/// ```
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>> {
    decode_with_precision(encoded, DEFAULT_PRECISION)
}

/// Decodes an encoded polyline with an explicit decimal precision.
pub fn decode_with_precision(encoded: &str, precision: u32) -> Result<Vec<Coordinate>> {
    let factor = 10f64.powi(precision as i32);
    let bytes = encoded.as_bytes();
    let mut path = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        lat += next_delta(bytes, &mut index)?;
        lng += next_delta(bytes, &mut index)?;

        let coord = Coordinate::new(lat as f64 / factor, lng as f64 / factor);
        if !coord.is_valid() {
            return Err(GeoError::InvalidPolyline {
                position: index,
                reason: "decoded coordinate out of range",
            });
        }
        path.push(coord);
    }

    Ok(path)
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(GeoError::InvalidPolyline {
                position: *index,
                reason: "truncated value",
            });
        };
        let chunk = i64::from(byte) - 63;
        if !(0..0x40).contains(&chunk) {
            return Err(GeoError::InvalidPolyline {
                position: *index,
                reason: "character outside encoding alphabet",
            });
        }
        *index += 1;

        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
        if shift > 60 {
            return Err(GeoError::InvalidPolyline {
                position: *index,
                reason: "value too long",
            });
        }
    }

    Ok(if result & 1 == 1 { !(result >> 1) } else { result >> 1 })
}
