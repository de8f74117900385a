//! Live task tracking for TaskRoute
//!
//! Keeps a registry of in-progress tasks and their last known positions fed
//! by a push connection, and recomputes the route of the selected task with
//! debounce and movement hysteresis.
//!
//! - [`registry`]: active tasks and positions
//! - [`feed`]: the push connection state machine and message decoding
//! - [`scheduler`]: when to ask the routing provider for a new route
//! - [`selection`]: the selected task and the composed view
//! - [`engine`]: the actor that wires them together
//!
//! # Example
//!
//! ```rust,no_run
//! use taskroute_api_client::{ClientConfig, TaskRouteClient};
//! use taskroute_core::config::Config;
//! use taskroute_tracking::{EngineConfig, EngineDeps, TrackingEngine};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load(None)?;
//! let client = TaskRouteClient::with_config(ClientConfig::from_settings(&config.settings))?;
//! let deps = EngineDeps::connect(client, config.settings.feed.url.clone());
//!
//! let mut engine = TrackingEngine::start(deps, EngineConfig::from_settings(&config.settings));
//! engine.select(Some(42)).await?;
//! println!("{:?}", engine.view().route_status);
//! engine.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod event;
pub mod feed;
pub mod model;
pub mod provider;
pub mod registry;
pub mod scheduler;
pub mod selection;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{EngineConfig, EngineDeps, TrackingEngine};
pub use error::{TrackingError, TrackingResult};
pub use event::{parse_message, RemovalReason, TrackingEvent};
pub use feed::{CloseKind, FeedConfig, FeedConnection, FeedSignal, FeedState};
pub use model::{Destination, Position, Route, Task, TaskId};
pub use provider::{DirectionsProvider, RouteOutcome, RouteRequest, RoutingProvider};
pub use registry::{LocationRegistry, RegistryChange, RegistrySnapshot};
pub use scheduler::{RouteInput, RouteScheduler, RouteStatus, SchedulerConfig};
pub use selection::{Selection, TrackingView};
pub use snapshot::{load_snapshot, RestSnapshot, SnapshotSource};
