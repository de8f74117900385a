//! Haversine distance calculation.
//!
//! Great-circle distance on a sphere of mean earth radius. Accurate to well
//! under a metre for the short hops used by arrival and jitter checks, which
//! is all the tracking engine needs.

use crate::Coordinate;

/// Earth's mean radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth's mean radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance in meters between two optional coordinates.
///
/// Returns `f64::INFINITY` when either side is absent or not a valid
/// coordinate, so callers can compare against thresholds without special
/// casing missing positions. Never panics.
///
/// ```
/// use taskroute_geo::{distance, Coordinate};
///
/// let a = Coordinate::new(14.5547, 121.0244);
/// assert_eq!(distance(Some(a), Some(a)), 0.0);
/// assert_eq!(distance(None, Some(a)), f64::INFINITY);
/// ```
#[inline]
pub fn distance(a: Option<Coordinate>, b: Option<Coordinate>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if a.is_valid() && b.is_valid() => haversine_distance_meters(&a, &b),
        _ => f64::INFINITY,
    }
}

/// Calculates the great-circle distance between two coordinates in kilometers.
#[inline]
pub fn haversine_distance(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine_distance_with_radius(from, to, EARTH_RADIUS_KM)
}

/// Calculates the great-circle distance between two coordinates in meters.
#[inline]
pub fn haversine_distance_meters(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine_distance_with_radius(from, to, EARTH_RADIUS_M)
}

#[inline]
fn haversine_distance_with_radius(from: &Coordinate, to: &Coordinate, radius: f64) -> f64 {
    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // Clamp guards against a creeping past 1.0 for antipodal points.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().atan2((1.0 - a).max(0.0).sqrt());

    radius * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MAKATI: Coordinate = Coordinate { latitude: 14.5547, longitude: 121.0244 };
    const QUEZON_CITY: Coordinate = Coordinate { latitude: 14.6760, longitude: 121.0437 };
    const BERLIN: Coordinate = Coordinate { latitude: 52.5200, longitude: 13.4050 };
    const PARIS: Coordinate = Coordinate { latitude: 48.8566, longitude: 2.3522 };

    #[test]
    fn test_berlin_to_paris() {
        let km = haversine_distance(&BERLIN, &PARIS);
        assert!((km - 878.0).abs() < 5.0, "Berlin-Paris: {km}");
    }

    #[test]
    fn test_makati_to_quezon_city() {
        let meters = haversine_distance_meters(&MAKATI, &QUEZON_CITY);
        assert!((meters - 13_640.0).abs() < 150.0, "Makati-QC: {meters}");
    }

    #[test]
    fn test_absent_side_is_infinite() {
        assert_eq!(distance(Some(MAKATI), None), f64::INFINITY);
        assert_eq!(distance(None, Some(MAKATI)), f64::INFINITY);
        assert_eq!(distance(None, None), f64::INFINITY);
    }

    #[test]
    fn test_invalid_side_is_infinite() {
        let bad = Coordinate::new(f64::NAN, 121.0);
        assert_eq!(distance(Some(MAKATI), Some(bad)), f64::INFINITY);
    }

    #[test]
    fn test_short_hop_resolution() {
        // ~11 m north: one ten-thousandth of a degree of latitude.
        let nudged = Coordinate::new(MAKATI.latitude + 0.0001, MAKATI.longitude);
        let meters = distance(Some(MAKATI), Some(nudged));
        assert!((meters - 11.1).abs() < 0.2, "short hop: {meters}");
    }

    #[test]
    fn test_antipodal_points_do_not_nan() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 180.0);
        let meters = distance(Some(a), Some(b));
        assert!(meters.is_finite());
        assert!((meters - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }

    fn coordinate() -> impl Strategy<Value = Coordinate> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lng)| Coordinate::new(lat, lng))
    }

    proptest! {
        #[test]
        fn prop_distance_to_self_is_zero(a in coordinate()) {
            prop_assert_eq!(distance(Some(a), Some(a)), 0.0);
        }

        #[test]
        fn prop_distance_is_symmetric(a in coordinate(), b in coordinate()) {
            let d1 = distance(Some(a), Some(b));
            let d2 = distance(Some(b), Some(a));
            prop_assert!((d1 - d2).abs() < 1e-6);
        }

        #[test]
        fn prop_distance_is_bounded(a in coordinate(), b in coordinate()) {
            let d = distance(Some(a), Some(b));
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_M + 1.0);
        }
    }
}
