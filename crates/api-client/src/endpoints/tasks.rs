//! Task listing endpoints
//!
//! The same task record shape is broadcast on the push feed, so the wire
//! types here are shared with the feed parser.

use crate::client::TaskRouteClient;
use crate::error::ApiResult;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Tasks API interface
#[derive(Clone)]
pub struct TasksApi {
    client: TaskRouteClient,
}

impl TasksApi {
    /// Create a new tasks API interface
    pub(crate) fn new(client: TaskRouteClient) -> Self {
        Self { client }
    }

    /// List tasks, optionally filtered by status
    ///
    /// GET /tasks/?status=...
    pub async fn list(&self, status: Option<TaskStatus>) -> ApiResult<Vec<TaskRecord>> {
        let path = match status {
            Some(status) => format!("tasks/?status={}", status.as_str()),
            None => "tasks/".to_string(),
        };
        self.client.get(&path).await
    }

    /// List tasks currently in progress
    pub async fn list_in_progress(&self) -> ApiResult<Vec<TaskRecord>> {
        self.list(Some(TaskStatus::InProgress)).await
    }
}

/// Task status as stored by the backend
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Queued,
    InProgress,
    Completed,
    Cancelled,
    Declined,
    /// Anything this client does not know about
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Queued => "QUEUED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Declined => "DECLINED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stop of a multi-destination task
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationRecord {
    pub sequence: u32,
    #[serde(default)]
    pub location_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Task as returned by the backend and carried by feed events
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: i64,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub assigned_user_name: Option<String>,
    #[serde(default)]
    pub is_multi_destination: bool,
    #[serde(default, deserialize_with = "destinations_from_list_or_string")]
    pub destinations: Option<Vec<DestinationRecord>>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Some producers store the stop list as a JSON-encoded string; accept both
/// shapes. An unparseable string is treated as no stops.
fn destinations_from_list_or_string<'de, D>(deserializer: D) -> Result<Option<Vec<DestinationRecord>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        List(Vec<DestinationRecord>),
        Encoded(String),
    }

    match Option::<Shape>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Shape::List(list)) => Ok(Some(list)),
        Some(Shape::Encoded(text)) => Ok(Some(serde_json::from_str(&text).unwrap_or_default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_destination_task() {
        let json = r#"{
            "id": 12,
            "title": "Deliver parts",
            "status": "IN_PROGRESS",
            "assigned_to": 4,
            "assigned_user_name": "Dana",
            "location_name": "Warehouse",
            "latitude": 14.5547,
            "longitude": 121.0244,
            "priority": "high"
        }"#;

        let task: TaskRecord = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, 12);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(!task.is_multi_destination);
        assert!(task.destinations.is_none());
        assert_eq!(task.latitude, Some(14.5547));
    }

    #[test]
    fn test_destinations_as_encoded_string() {
        let json = r#"{
            "id": 3,
            "title": "Loop",
            "status": "IN_PROGRESS",
            "is_multi_destination": true,
            "destinations": "[{\"sequence\": 2, \"location_name\": \"B\", \"latitude\": 1.0, \"longitude\": 2.0}, {\"sequence\": 1, \"location_name\": \"A\", \"latitude\": 3.0, \"longitude\": 4.0}]"
        }"#;

        let task: TaskRecord = serde_json::from_str(json).unwrap();
        let stops = task.destinations.unwrap();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].sequence, 2);
    }

    #[test]
    fn test_garbled_destination_string_is_empty() {
        let json = r#"{"id": 3, "title": "x", "status": "IN_PROGRESS", "destinations": "not json"}"#;
        let task: TaskRecord = serde_json::from_str(json).unwrap();
        assert_eq!(task.destinations, Some(Vec::new()));
    }

    #[test]
    fn test_unknown_status_tolerated() {
        let json = r#"{"id": 1, "title": "x", "status": "ARCHIVED", "destinations": null}"#;
        let task: TaskRecord = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TaskStatus::Unknown);
        assert!(task.destinations.is_none());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(TaskStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(
            serde_json::to_string(&TaskStatus::Cancelled).unwrap(),
            "\"CANCELLED\""
        );
    }
}
