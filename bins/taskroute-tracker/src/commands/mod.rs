//! CLI command implementations

pub mod nearest;
pub mod snapshot;
pub mod watch;

use anyhow::{Context, Result};
use taskroute_api_client::{ClientConfig, TaskRouteClient};
use taskroute_core::config::Settings;
use taskroute_tracking::{load_snapshot, LocationRegistry, RestSnapshot};

/// API client for the configured backend and directions provider
pub fn client(settings: &Settings) -> Result<TaskRouteClient> {
    TaskRouteClient::with_config(ClientConfig::from_settings(settings)).context("Creating API client")
}

/// Registry seeded once from the REST snapshot
pub async fn load_registry(settings: &Settings) -> Result<LocationRegistry> {
    let source = RestSnapshot::new(client(settings)?);
    let seed = load_snapshot(&source)
        .await
        .map_err(taskroute_core::Error::from)
        .with_context(|| format!("Loading tasks from {}", settings.api.base_url))?;

    let mut registry = LocationRegistry::new();
    registry.seed(seed.tasks);
    for position in seed.positions {
        registry.on_position_update(position);
    }
    Ok(registry)
}
