//! Push feed message decoding
//!
//! Messages are JSON objects with an `event` discriminator. Task-carrying
//! events may hold the task either as an object or as a JSON-encoded string;
//! both are normalized here so nothing downstream sees the string form.

use crate::error::{TrackingError, TrackingResult};
use crate::model::{Position, Task, TaskId};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use taskroute_api_client::endpoints::TaskRecord;
use taskroute_geo::Coordinate;

/// Decoded feed event
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    /// `task_started`: insert or replace, move to the front
    TaskStarted(Task),
    /// `task_created` / `task_updated` for a task that is in progress:
    /// replace in place, or insert at the front if new
    TaskChanged(Task),
    /// The task stopped being tracked
    TaskRemoved {
        task_id: TaskId,
        reason: RemovalReason,
    },
    /// `location_update`
    PositionUpdate(Position),
}

/// Why a task left the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Completed,
    Deleted,
    /// Updated into a state other than in progress
    LeftProgress,
}

const KNOWN_EVENTS: &[&str] = &[
    "task_started",
    "task_created",
    "task_updated",
    "task_completed",
    "task_deleted",
    "location_update",
];

#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WireEvent {
    TaskStarted {
        task: TaskPayload,
    },
    TaskCreated {
        task: TaskPayload,
    },
    TaskUpdated {
        task: TaskPayload,
    },
    TaskCompleted {
        task_id: TaskId,
    },
    TaskDeleted {
        task_id: TaskId,
    },
    LocationUpdate {
        task_id: TaskId,
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        user_id: Option<i64>,
        #[serde(default)]
        user_name: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TaskPayload {
    Object(TaskRecord),
    Encoded(String),
}

impl TaskPayload {
    fn into_task(self) -> TrackingResult<Task> {
        let record = match self {
            Self::Object(record) => record,
            Self::Encoded(text) => serde_json::from_str::<TaskRecord>(&text)
                .map_err(|e| TrackingError::MalformedEvent(format!("task payload: {e}")))?,
        };
        Task::try_from(record)
    }
}

/// Decode one text message
///
/// Unknown event names yield [`TrackingError::UnknownEvent`]; anything that
/// fails to decode or validate yields a malformed-event or invalid-task error.
/// Either way the message is a whole-event failure with no partial result.
pub fn parse_message(text: &str) -> TrackingResult<TrackingEvent> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| TrackingError::MalformedEvent(format!("not JSON: {e}")))?;

    let name = value
        .get("event")
        .and_then(Value::as_str)
        .ok_or_else(|| TrackingError::MalformedEvent("missing `event` field".to_string()))?;
    if !KNOWN_EVENTS.contains(&name) {
        return Err(TrackingError::UnknownEvent(name.to_string()));
    }

    let wire: WireEvent =
        serde_json::from_value(value).map_err(|e| TrackingError::MalformedEvent(e.to_string()))?;

    match wire {
        WireEvent::TaskStarted { task } => Ok(TrackingEvent::TaskStarted(task.into_task()?)),
        WireEvent::TaskCreated { task } | WireEvent::TaskUpdated { task } => {
            let task = task.into_task()?;
            if task.is_in_progress() {
                Ok(TrackingEvent::TaskChanged(task))
            } else {
                Ok(TrackingEvent::TaskRemoved {
                    task_id: task.id,
                    reason: RemovalReason::LeftProgress,
                })
            }
        }
        WireEvent::TaskCompleted { task_id } => Ok(TrackingEvent::TaskRemoved {
            task_id,
            reason: RemovalReason::Completed,
        }),
        WireEvent::TaskDeleted { task_id } => Ok(TrackingEvent::TaskRemoved {
            task_id,
            reason: RemovalReason::Deleted,
        }),
        WireEvent::LocationUpdate {
            task_id,
            latitude,
            longitude,
            user_id,
            user_name,
        } => Ok(TrackingEvent::PositionUpdate(Position {
            task_id,
            coordinate: Coordinate::checked(latitude, longitude)?,
            user_id,
            user_name,
            received_at: Utc::now(),
        })),
    }
}
