//! Configuration schema definitions
//!
//! One section per upstream plus telemetry. Every field has a default so an
//! empty or partial file is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub feed: FeedSettings,

    #[serde(default)]
    pub routing: RoutingSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

/// REST snapshot API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Backend base URL
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer token for the backend
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            token: None,
        }
    }
}

impl ApiSettings {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Push feed connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSettings {
    /// WebSocket URL of the location feed
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Delay before reconnecting after an unexpected close
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl FeedSettings {
    /// Reconnect delay as a duration
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

fn default_feed_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

/// Route recomputation and the directions provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingSettings {
    /// Quiet period before a route request goes out
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Movement below this many meters reuses the cached route
    #[serde(default = "default_hysteresis_m")]
    pub hysteresis_m: f64,

    /// Closer than this many meters to the destination counts as arrived
    #[serde(default = "default_arrival_m")]
    pub arrival_m: f64,

    /// Directions endpoint
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// Directions API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Travel mode passed to the provider
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Provider request budget
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            hysteresis_m: default_hysteresis_m(),
            arrival_m: default_arrival_m(),
            provider_url: default_provider_url(),
            api_key: None,
            mode: default_mode(),
            max_requests_per_minute: default_max_requests_per_minute(),
        }
    }
}

impl RoutingSettings {
    /// Debounce window as a duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_hysteresis_m() -> f64 {
    20.0
}

fn default_arrival_m() -> f64 {
    10.0
}

fn default_provider_url() -> String {
    "https://maps.googleapis.com/maps/api/directions/json".to_string()
}

fn default_mode() -> String {
    "driving".to_string()
}

fn default_max_requests_per_minute() -> u32 {
    60
}

/// Logging output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySettings {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
