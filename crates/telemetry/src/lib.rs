//! Telemetry for TaskRoute tools
//!
//! - Structured logging with `tracing` (compact text or JSON lines)
//! - A session id for correlating one tracker run's logs
//! - Process-wide counters and latency histograms for the tracking engine

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Global metrics registry
static METRICS: Lazy<MetricsRegistry> = Lazy::new(MetricsRegistry::new);

/// Global session ID for correlating logs
static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Counter names shared between the engine and the CLI.
pub mod names {
    /// Feed messages received
    pub const FEED_MESSAGES: &str = "feed.messages";
    /// Feed messages dropped as malformed or unknown
    pub const FEED_DROPPED: &str = "feed.dropped";
    /// Reconnect timers armed
    pub const FEED_RECONNECTS: &str = "feed.reconnects";
    /// Requests sent to the directions provider
    pub const ROUTE_REQUESTS: &str = "route.requests";
    /// Provider requests that failed or were declined
    pub const ROUTE_FAILURES: &str = "route.failures";
    /// Provider responses discarded because the selection moved on
    pub const ROUTE_STALE: &str = "route.stale";
    /// Provider round-trip latency, milliseconds
    pub const ROUTE_LATENCY_MS: &str = "route.latency_ms";
}

/// Initialize with custom configuration
///
/// `RUST_LOG` takes precedence over `config.log_level`.
pub fn init_with_config(config: TelemetryConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let result = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(config.show_target).with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(config.show_target).with_writer(std::io::stderr).compact())
            .try_init()
    };

    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {e}"))?;

    tracing::info!(
        session_id = %session_id(),
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry initialized"
    );

    Ok(())
}

/// Get the current session ID
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json: bool,
    pub show_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            show_target: false,
        }
    }
}

/// Metrics registry for counters and histograms
pub struct MetricsRegistry {
    counters: RwLock<HashMap<String, AtomicU64>>,
    histograms: RwLock<HashMap<String, Vec<f64>>>,
    started_at: DateTime<Utc>,
}

impl MetricsRegistry {
    fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
            started_at: Utc::now(),
        }
    }

    /// Increment a counter
    pub fn increment(&self, name: &str) {
        self.increment_by(name, 1);
    }

    /// Increment a counter by a specific amount
    pub fn increment_by(&self, name: &str, value: u64) {
        {
            let counters = self.counters.read().unwrap_or_else(|e| e.into_inner());
            if let Some(counter) = counters.get(name) {
                counter.fetch_add(value, Ordering::Relaxed);
                return;
            }
        }
        let mut counters = self.counters.write().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(value, Ordering::Relaxed);
    }

    /// Current value of a counter (0 if never incremented)
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.read().unwrap_or_else(|e| e.into_inner());
        counters.get(name).map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Record a histogram value
    pub fn histogram(&self, name: &str, value: f64) {
        let mut histograms = self.histograms.write().unwrap_or_else(|e| e.into_inner());
        histograms.entry(name.to_string()).or_default().push(value);
    }

    /// Export metrics as JSON
    pub fn export_json(&self) -> serde_json::Value {
        let counters = self.counters.read().unwrap_or_else(|e| e.into_inner());
        let histograms = self.histograms.read().unwrap_or_else(|e| e.into_inner());

        let counter_values: HashMap<&str, u64> = counters
            .iter()
            .map(|(k, v)| (k.as_str(), v.load(Ordering::Relaxed)))
            .collect();

        let histogram_stats: HashMap<&str, HistogramStats> = histograms
            .iter()
            .map(|(k, v)| (k.as_str(), HistogramStats::from_values(v)))
            .collect();

        serde_json::json!({
            "session_id": session_id(),
            "started_at": self.started_at.to_rfc3339(),
            "counters": counter_values,
            "histograms": histogram_stats,
        })
    }
}

/// Histogram statistics
#[derive(Debug, Serialize)]
pub struct HistogramStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
}

impl HistogramStats {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                count: 0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                p50: 0.0,
                p95: 0.0,
            };
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();

        Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sum / count as f64,
            p50: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
        }
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Get the global metrics registry
pub fn metrics() -> &'static MetricsRegistry {
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counter() {
        let registry = MetricsRegistry::new();
        registry.increment(names::FEED_MESSAGES);
        registry.increment(names::FEED_MESSAGES);
        registry.increment_by(names::FEED_MESSAGES, 3);

        assert_eq!(registry.counter(names::FEED_MESSAGES), 5);
        assert_eq!(registry.counter(names::FEED_DROPPED), 0);
    }

    #[test]
    fn test_histogram_stats() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let stats = HistogramStats::from_values(&values);

        assert_eq!(stats.count, 10);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 10.0);
        assert_eq!(stats.mean, 5.5);
    }

    #[test]
    fn test_export_json_shape() {
        let registry = MetricsRegistry::new();
        registry.increment(names::ROUTE_REQUESTS);
        registry.histogram(names::ROUTE_LATENCY_MS, 120.0);

        let json = registry.export_json();
        assert_eq!(json["counters"][names::ROUTE_REQUESTS], 1);
        assert_eq!(json["histograms"][names::ROUTE_LATENCY_MS]["count"], 1);
    }

    #[test]
    fn test_session_id() {
        let id = session_id();
        assert!(Uuid::parse_str(id).is_ok());
    }
}
