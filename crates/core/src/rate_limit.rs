//! Rate limiting for upstream calls
//!
//! Token buckets keyed by upstream name. The directions provider bills per
//! request and throttles bursts, so route requests draw from a bucket before
//! they go out.
//!
//! # Example
//!
//! ```rust
//! use taskroute_core::rate_limit::{RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig::per_minute(60));
//!
//! if limiter.try_acquire("directions") {
//!     // send the request
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests replenished per window
    pub max_requests: u32,
    /// Replenish window
    pub window: Duration,
    /// Extra tokens available for short bursts
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_minute(100)
    }
}

impl RateLimitConfig {
    /// Per-second rate limit
    #[must_use]
    pub fn per_second(max: u32) -> Self {
        Self {
            max_requests: max,
            window: Duration::from_secs(1),
            burst: max / 2,
        }
    }

    /// Per-minute rate limit
    #[must_use]
    pub fn per_minute(max: u32) -> Self {
        Self {
            max_requests: max,
            window: Duration::from_secs(60),
            burst: max / 4,
        }
    }

    /// No burst allowance
    #[must_use]
    pub fn strict(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            burst: 0,
        }
    }

    fn capacity(&self) -> f64 {
        f64::from(self.max_requests.saturating_add(self.burst))
    }

    fn refill_per_sec(&self) -> f64 {
        let secs = self.window.as_secs_f64();
        if secs > 0.0 {
            f64::from(self.max_requests) / secs
        } else {
            f64::INFINITY
        }
    }
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(config: &RateLimitConfig) -> Self {
        Self {
            tokens: config.capacity(),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, config: &RateLimitConfig) {
        let now = Instant::now();
        let gained = now.duration_since(self.last_refill).as_secs_f64() * config.refill_per_sec();
        self.tokens = (self.tokens + gained).min(config.capacity());
        self.last_refill = now;
    }
}

/// Keyed token-bucket rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: RwLock<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    /// Create a new rate limiter; every key starts with a full bucket
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    fn with_bucket<T>(&self, key: &str, f: impl FnOnce(&mut TokenBucket, &RateLimitConfig) -> T) -> T {
        // Bucket counters stay meaningful even if a holder panicked.
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::full(&self.config));
        bucket.refill(&self.config);
        f(bucket, &self.config)
    }

    /// Take one token for `key` if available
    #[must_use]
    pub fn try_acquire(&self, key: &str) -> bool {
        self.with_bucket(key, |bucket, _| {
            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                true
            } else {
                false
            }
        })
    }

    /// Whole tokens currently available for `key`
    #[must_use]
    pub fn available(&self, key: &str) -> u32 {
        self.with_bucket(key, |bucket, _| bucket.tokens.floor() as u32)
    }

    /// Time until one token is available for `key`
    #[must_use]
    pub fn time_until_available(&self, key: &str) -> Duration {
        self.with_bucket(key, |bucket, config| {
            if bucket.tokens >= 1.0 {
                Duration::ZERO
            } else {
                Duration::from_secs_f64((1.0 - bucket.tokens) / config.refill_per_sec())
            }
        })
    }

    /// Status snapshot for `key`
    #[must_use]
    pub fn status(&self, key: &str) -> RateLimitStatus {
        RateLimitStatus {
            available: self.available(key),
            max: self.config.max_requests.saturating_add(self.config.burst),
            retry_in: self.time_until_available(key),
        }
    }

    /// Forget the bucket for `key`
    pub fn reset(&self, key: &str) {
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        buckets.remove(key);
    }
}

/// Rate limit status
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    /// Available tokens
    pub available: u32,
    /// Bucket capacity
    pub max: u32,
    /// Time until the next token
    pub retry_in: Duration,
}
