//! Retry logic with exponential backoff
//!
//! Provides the resilience primitives used in front of upstream HTTP calls:
//! - Exponential backoff with jitter
//! - Named retry policies (`quick`, `patient`, `no_retry`)
//! - Circuit breaker so a dead upstream fails fast
//!
//! # Example
//!
//! ```rust,no_run
//! use taskroute_core::retry::{retry_async, RetryConfig};
//!
//! # async fn demo() {
//! let outcome = retry_async(&RetryConfig::quick(), |_attempt| async {
//!     Ok::<_, std::io::Error>("fetched")
//! }, |_err| true).await;
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::hash_map::RandomState;
use std::future::Future;
use std::hash::{BuildHasher, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add up to 25% random jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Short delays, for local development backends
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Longer delays, for production backends
    pub fn patient() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// A single attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Delay to wait before `attempt` (0-based; attempt 0 never waits)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        let secs = if self.jitter {
            capped * (1.0 + jitter_fraction() * 0.25)
        } else {
            capped
        };

        Duration::from_secs_f64(secs)
    }
}

/// Pseudo-random fraction in `[0, 1)` from the std hasher seed.
fn jitter_fraction() -> f64 {
    let mut hasher = RandomState::new().build_hasher();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    hasher.write_u128(nanos);
    (hasher.finish() % 1000) as f64 / 1000.0
}

/// Runs `operation` until it succeeds, the error is not retryable, or the
/// attempt budget is spent. Returns the last error on failure.
///
/// `operation` receives the 0-based attempt number.
pub async fn retry_async<F, Fut, T, E, R>(config: &RetryConfig, mut operation: F, is_retryable: R) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            tokio::time::sleep(config.delay_for_attempt(attempt)).await;
        }

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < attempts && is_retryable(&err) => attempt += 1,
            Err(err) => return Err(err),
        }
    }
}

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected until the reset timeout passes
    Open,
    /// A trial request is allowed through
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Successes in half-open before closing
    pub success_threshold: u32,
    /// Time to stay open before allowing a trial request
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: u32,
    successes: u32,
    opened_at: Option<Instant>,
}

/// Circuit breaker for failing fast against a dead upstream
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new, closed circuit breaker
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                opened_at: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        // A poisoned breaker still holds consistent counters.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Whether a request may be attempted now
    pub fn can_execute(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner.opened_at.map_or(Duration::MAX, |t| t.elapsed());
                if elapsed >= self.config.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful request
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.failures = 0;
        if inner.state == CircuitState::HalfOpen {
            inner.successes += 1;
            if inner.successes >= self.config.success_threshold {
                inner.state = CircuitState::Closed;
                inner.opened_at = None;
            }
        }
    }

    /// Record a failed request
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failures += 1;
        let trip = match inner.state {
            CircuitState::Closed => inner.failures >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };
        if trip {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    /// Force the breaker closed
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.successes = 0;
        inner.opened_at = None;
    }
}
