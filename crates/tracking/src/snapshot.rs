//! Initial REST snapshot
//!
//! One call for the in-progress tasks, then one best-effort position lookup
//! per task, issued concurrently.

use crate::error::TrackingResult;
use crate::model::{Position, Task, TaskId};
use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use taskroute_api_client::TaskRouteClient;
use taskroute_geo::Coordinate;
use tracing::{debug, warn};

/// Where the startup state comes from
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Tasks currently in progress
    async fn active_tasks(&self) -> TrackingResult<Vec<Task>>;

    /// Last recorded position; `None` when there is none yet
    async fn latest_position(&self, task_id: TaskId) -> TrackingResult<Option<Position>>;
}

/// Snapshot from the backend REST API
#[derive(Clone)]
pub struct RestSnapshot {
    client: TaskRouteClient,
}

impl RestSnapshot {
    pub fn new(client: TaskRouteClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SnapshotSource for RestSnapshot {
    async fn active_tasks(&self) -> TrackingResult<Vec<Task>> {
        let records = self.client.tasks().list_in_progress().await?;

        let tasks = records
            .into_iter()
            .filter_map(|record| {
                let id = record.id;
                match Task::try_from(record) {
                    Ok(task) => Some(task),
                    Err(e) => {
                        warn!(task_id = id, error = %e, "Skipping task from snapshot");
                        None
                    }
                }
            })
            .collect();
        Ok(tasks)
    }

    async fn latest_position(&self, task_id: TaskId) -> TrackingResult<Option<Position>> {
        let Some(record) = self.client.locations().latest(task_id).await? else {
            return Ok(None);
        };

        Ok(Some(Position {
            task_id,
            coordinate: Coordinate::checked(record.latitude, record.longitude)?,
            user_id: record.user_id,
            user_name: None,
            received_at: Utc::now(),
        }))
    }
}

/// Loaded startup state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Seed {
    pub tasks: Vec<Task>,
    pub positions: Vec<Position>,
}

/// Load tasks, then their positions
///
/// Fails only if the task list cannot be loaded. A failed position lookup is
/// logged and treated as "no position".
pub async fn load_snapshot(source: &dyn SnapshotSource) -> TrackingResult<Seed> {
    let tasks = source.active_tasks().await?;

    let lookups = tasks.iter().map(|task| source.latest_position(task.id));
    let results = join_all(lookups).await;

    let mut positions = Vec::new();
    for (task, result) in tasks.iter().zip(results) {
        match result {
            Ok(Some(position)) => positions.push(position),
            Ok(None) => debug!(task_id = task.id, "No recorded position"),
            Err(e) => warn!(task_id = task.id, error = %e, "Position lookup failed"),
        }
    }

    debug!(tasks = tasks.len(), positions = positions.len(), "Snapshot loaded");
    Ok(Seed { tasks, positions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackingError;
    use crate::testing::{task, StaticSnapshot};

    #[tokio::test]
    async fn test_positions_are_best_effort() {
        let here = Coordinate::new(14.55, 121.02);
        let source = StaticSnapshot::new(vec![task(1, "a", here), task(2, "b", here), task(3, "c", here)])
            .with_position(Position::new(1, here))
            .with_failing_position(2);

        let seed = load_snapshot(&source).await.unwrap();
        assert_eq!(seed.tasks.len(), 3);
        assert_eq!(seed.positions.len(), 1);
        assert_eq!(seed.positions[0].task_id, 1);
    }

    #[tokio::test]
    async fn test_task_list_failure_is_an_error() {
        let source = StaticSnapshot::unavailable();
        let err = load_snapshot(&source).await.unwrap_err();
        assert!(matches!(err, TrackingError::Transport(_)));
    }
}
