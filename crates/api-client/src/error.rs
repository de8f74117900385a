//! Error types for the API client

use thiserror::Error;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API client errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream returned an error response
    #[error("API error ({status}): {message}")]
    ApiResponse {
        /// HTTP status code
        status: u16,
        /// Error message from the upstream
        message: String,
    },

    /// Circuit breaker is open
    #[error("Circuit breaker for {0} is open - service temporarily unavailable")]
    CircuitOpen(&'static str),

    /// Local request budget exhausted
    #[error("Rate limited by local budget for {0}")]
    RateLimited(&'static str),

    /// Directions key missing from configuration
    #[error("No directions API key configured")]
    MissingApiKey,

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an API response error
    pub fn api_response(status: u16, message: impl Into<String>) -> Self {
        Self::ApiResponse {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            Self::ApiResponse { status, .. } => *status >= 500 || *status == 429,
            Self::CircuitOpen(_)
            | Self::RateLimited(_)
            | Self::Config(_)
            | Self::MissingApiKey
            | Self::Json(_)
            | Self::InvalidUrl(_) => false,
        }
    }

    /// Check if this is a 404
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiResponse { status: 404, .. })
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiResponse { status, .. } if (400..500).contains(status))
    }

    /// Check if the request was refused locally before reaching the network
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::CircuitOpen(_) | Self::RateLimited(_))
    }
}
