//! Configuration for the TaskRoute API client
//!
//! Built from the shared [`Settings`] so the CLI, the engine and the client
//! agree on URLs, keys and budgets.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use taskroute_core::config::{Config, Settings};
use taskroute_core::rate_limit::RateLimitConfig;
use taskroute_core::retry::RetryConfig;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL
    pub base_url: String,
    /// Bearer token for the backend
    pub token: Option<String>,
    /// Request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Retry policy for backend calls
    pub retry: RetryConfig,
    /// Request budget for backend calls
    pub rate_limit: RateLimitConfig,
    /// Directions provider
    pub directions: DirectionsConfig,
}

/// Directions provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsConfig {
    /// Directions endpoint
    pub url: String,
    /// Provider API key
    pub api_key: Option<String>,
    /// Travel mode (`driving`, `walking`, ...)
    pub mode: String,
    /// Retry policy for provider calls
    pub retry: RetryConfig,
    /// Request budget for provider calls
    pub rate_limit: RateLimitConfig,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl ClientConfig {
    /// Build from loaded settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.api.base_url.clone(),
            token: settings.api.token.clone(),
            timeout: settings.api.timeout(),
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::per_minute(600),
            directions: DirectionsConfig {
                url: settings.routing.provider_url.clone(),
                api_key: settings.routing.api_key.clone(),
                mode: settings.routing.mode.clone(),
                // A failed route is retried by the next qualifying movement.
                retry: RetryConfig::no_retry(),
                rate_limit: RateLimitConfig::per_minute(settings.routing.max_requests_per_minute),
            },
        }
    }

    /// Discover the configuration file and environment, then build
    pub fn from_env() -> ApiResult<Self> {
        let config = Config::load(None).map_err(|e| ApiError::config(e.to_string()))?;
        Ok(Self::from_settings(&config.settings))
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set the bearer token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set retry config
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Builder-style method to set the directions key
    #[must_use]
    pub fn with_directions_key(mut self, key: impl Into<String>) -> Self {
        self.directions.api_key = Some(key.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        for (field, url) in [("base_url", &self.base_url), ("directions.url", &self.directions.url)] {
            if url.is_empty() {
                return Err(ApiError::config(format!("{field} cannot be empty")));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ApiError::config(format!("{field} must start with http:// or https://")));
            }
        }

        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert!(config.directions.url.contains("directions/json"));
        assert_eq!(config.directions.mode, "driving");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.directions.retry.max_attempts, 1);
    }

    #[test]
    fn test_from_settings_carries_routing_budget() {
        let mut settings = Settings::default();
        settings.routing.max_requests_per_minute = 12;
        settings.routing.api_key = Some("k".to_string());

        let config = ClientConfig::from_settings(&settings);
        assert_eq!(config.directions.rate_limit.max_requests, 12);
        assert_eq!(config.directions.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = ClientConfig::default()
            .with_base_url("https://ops.example.com")
            .with_token("t0k3n")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, "https://ops.example.com");
        assert_eq!(config.token.as_deref(), Some("t0k3n"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_validation() {
        assert!(ClientConfig::default().validate().is_ok());
        assert!(ClientConfig::default().with_base_url("").validate().is_err());
        assert!(ClientConfig::default().with_base_url("ftp://x").validate().is_err());
    }
}
