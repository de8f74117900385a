//! Geospatial utilities for TaskRoute live tracking.
//!
//! This crate provides:
//! - Haversine distance on a spherical earth (mean radius 6,371 km)
//! - A null-tolerant distance estimator used for arrival and jitter checks
//! - Ranking of tracked positions by distance to a target
//! - Decoding of encoded route polylines returned by directions providers
//!
//! # Example
//!
//! ```
//! use taskroute_geo::{distance, Coordinate};
//!
//! let makati = Coordinate::new(14.5547, 121.0244);
//! let bgc = Coordinate::new(14.5509, 121.0503);
//!
//! let meters = distance(Some(makati), Some(bgc));
//! assert!((meters - 2_820.0).abs() < 50.0);
//! assert!(distance(Some(makati), None).is_infinite());
//! ```

pub mod batch;
mod error;
mod haversine;
pub mod polyline;

pub use batch::{rank_by_distance, Ranked};
pub use error::{GeoError, GeoErrorCode, Result};
pub use haversine::{distance, haversine_distance, haversine_distance_meters, EARTH_RADIUS_KM, EARTH_RADIUS_M};

use std::fmt;

/// A geographic coordinate with latitude and longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    #[serde(alias = "lat")]
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    #[serde(alias = "lng")]
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Creates a coordinate, rejecting non-finite or out-of-range values.
    pub fn checked(latitude: f64, longitude: f64) -> Result<Self> {
        let coord = Self::new(latitude, longitude);
        if coord.is_valid() {
            Ok(coord)
        } else {
            Err(GeoError::InvalidCoordinate(format!("({latitude}, {longitude})")))
        }
    }

    /// Returns true if both components are finite and within range.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    #[inline]
    pub(crate) fn to_radians(self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(0.0, 0.0).is_valid());
        assert!(Coordinate::new(90.0, 180.0).is_valid());
        assert!(Coordinate::new(-90.0, -180.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_checked_rejects_out_of_range() {
        assert!(Coordinate::checked(14.55, 121.02).is_ok());
        let err = Coordinate::checked(120.0, 0.0).unwrap_err();
        assert_eq!(err.code(), GeoErrorCode::InvalidCoordinate);
    }

    #[test]
    fn test_display_is_provider_friendly() {
        let coord = Coordinate::new(14.5547, 121.0244);
        assert_eq!(coord.to_string(), "14.554700,121.024400");
    }

    #[test]
    fn test_deserialize_short_field_names() {
        let coord: Coordinate = serde_json::from_str(r#"{"lat": 1.5, "lng": 2.5}"#).unwrap();
        assert_eq!(coord, Coordinate::new(1.5, 2.5));
    }
}
