//! Core utilities for TaskRoute tools
//!
//! This crate provides shared functionality used by the API client, the
//! tracking engine and the CLI:
//!
//! - **Error handling**: Coded errors with context and recovery suggestions
//! - **Configuration**: TOML-based configuration with discovery and validation
//! - **Retry**: Backoff policies and a circuit breaker for flaky upstreams
//! - **Rate limiting**: Token buckets keyed per upstream
//!
//! # Example
//!
//! ```rust,no_run
//! use taskroute_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid configuration");
//! println!("feed: {}", config.settings.feed.url);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod retry;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, Settings};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::rate_limit::{RateLimitConfig, RateLimiter};
    pub use crate::retry::{retry_async, CircuitBreaker, RetryConfig};
}
