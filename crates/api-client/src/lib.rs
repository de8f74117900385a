//! HTTP client for the TaskRoute backend and the directions provider
//!
//! This crate provides one resilient client for:
//! - the REST snapshot API (in-progress tasks, latest position per task)
//! - the external directions provider used for route recomputation
//!
//! # Features
//!
//! - **Settings-based configuration**: URLs, token and key from the shared TOML/env settings
//! - **Retry with exponential backoff**: Automatic retry for transient backend failures
//! - **Circuit breaker**: One per upstream, so an outage fails fast
//! - **Rate limiting**: A per-minute budget for the billed directions provider
//! - **Request correlation**: Every request carries an `X-Request-ID`
//!
//! # Example
//!
//! ```rust,no_run
//! use taskroute_api_client::TaskRouteClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TaskRouteClient::new()?;
//!
//!     for task in client.tasks().list_in_progress().await? {
//!         let latest = client.locations().latest(task.id).await?;
//!         println!("{} -> {:?}", task.title, latest.map(|l| (l.latitude, l.longitude)));
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;

pub use client::TaskRouteClient;
pub use config::{ClientConfig, DirectionsConfig};
pub use error::{ApiError, ApiResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::TaskRouteClient;
    pub use crate::config::{ClientConfig, DirectionsConfig};
    pub use crate::endpoints::{
        DirectionsApi, DirectionsRequest, DirectionsResponse, LocationRecord, LocationsApi, TaskRecord, TaskStatus,
        TasksApi,
    };
    pub use crate::error::{ApiError, ApiResult};
}
