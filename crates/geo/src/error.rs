//! Error types for the geo crate.

use thiserror::Error;

/// Result type alias for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors that can occur during geo operations.
#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    /// Invalid coordinate values
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Encoded polyline could not be decoded
    #[error("Invalid polyline at byte {position}: {reason}")]
    InvalidPolyline {
        /// Byte offset where decoding failed
        position: usize,
        /// What went wrong
        reason: &'static str,
    },
}

/// Error code for integration with taskroute-core error handling.
/// Range: 10xxx for geo errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorCode {
    /// Invalid coordinate values
    InvalidCoordinate = 10001,
    /// Malformed encoded polyline
    InvalidPolyline = 10002,
}

impl GeoError {
    /// Returns the error code for this error.
    pub fn code(&self) -> GeoErrorCode {
        match self {
            GeoError::InvalidCoordinate(_) => GeoErrorCode::InvalidCoordinate,
            GeoError::InvalidPolyline { .. } => GeoErrorCode::InvalidPolyline,
        }
    }
}
