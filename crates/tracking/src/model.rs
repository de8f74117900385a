//! Tracked tasks, positions and routes

use crate::error::{TrackingError, TrackingResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use taskroute_api_client::endpoints::{TaskRecord, TaskStatus};
use taskroute_geo::Coordinate;

/// Task identifier as issued by the backend
pub type TaskId = i64;

/// One stop of a task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Destination {
    /// 1-based visiting order
    pub sequence: u32,
    /// Display label
    pub label: Option<String>,
    /// Where the stop is
    pub coordinate: Coordinate,
}

/// A task being tracked
///
/// Always has at least one destination, ordered by sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub assignee: Option<String>,
    pub status: TaskStatus,
    destinations: Vec<Destination>,
}

impl Task {
    /// Build a task; stops are sorted by sequence, an empty list is rejected
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        status: TaskStatus,
        mut destinations: Vec<Destination>,
    ) -> TrackingResult<Self> {
        if destinations.is_empty() {
            return Err(TrackingError::invalid_task(id, "task has no destination"));
        }
        if let Some(bad) = destinations.iter().find(|d| !d.coordinate.is_valid()) {
            return Err(TrackingError::invalid_task(
                id,
                format!("destination {} has invalid coordinate {}", bad.sequence, bad.coordinate),
            ));
        }
        destinations.sort_by_key(|d| d.sequence);

        Ok(Self {
            id,
            title: title.into(),
            assignee: None,
            status,
            destinations,
        })
    }

    /// Builder-style assignee
    #[must_use]
    pub fn with_assignee(mut self, name: impl Into<String>) -> Self {
        self.assignee = Some(name.into());
        self
    }

    /// Stops in visiting order
    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// Whether this task is in the in-progress state
    pub fn is_in_progress(&self) -> bool {
        self.status == TaskStatus::InProgress
    }

    /// More than one stop
    pub fn is_multi_stop(&self) -> bool {
        self.destinations.len() > 1
    }

    /// Where the route ends: the last stop
    pub fn final_destination(&self) -> Coordinate {
        // Non-empty by construction.
        self.destinations[self.destinations.len() - 1].coordinate
    }

    /// Stops strictly between the first and the last, only for tasks with
    /// three or more stops
    pub fn waypoints(&self) -> Vec<Coordinate> {
        let n = self.destinations.len();
        if n < 3 {
            return Vec::new();
        }
        self.destinations[1..n - 1].iter().map(|d| d.coordinate).collect()
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = TrackingError;

    /// A non-empty stop list wins; otherwise the single-destination fields
    /// are used.
    fn try_from(record: TaskRecord) -> TrackingResult<Self> {
        let stops: Vec<Destination> = record
            .destinations
            .unwrap_or_default()
            .into_iter()
            .map(|d| Destination {
                sequence: d.sequence,
                label: d.location_name,
                coordinate: Coordinate::new(d.latitude, d.longitude),
            })
            .collect();

        let destinations = if !stops.is_empty() {
            stops
        } else {
            match (record.latitude, record.longitude) {
                (Some(latitude), Some(longitude)) => vec![Destination {
                    sequence: 1,
                    label: record.location_name,
                    coordinate: Coordinate::new(latitude, longitude),
                }],
                _ => Vec::new(),
            }
        };

        let task = Task::new(record.id, record.title, record.status, destinations)?;
        Ok(match record.assigned_user_name {
            Some(name) => task.with_assignee(name),
            None => task,
        })
    }
}

/// Last known location of whoever performs a task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub task_id: TaskId,
    pub coordinate: Coordinate,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    /// When this process learned about the position
    pub received_at: DateTime<Utc>,
}

impl Position {
    /// Position received now, without reporter details
    pub fn new(task_id: TaskId, coordinate: Coordinate) -> Self {
        Self {
            task_id,
            coordinate,
            user_id: None,
            user_name: None,
            received_at: Utc::now(),
        }
    }
}

/// A computed route and the origin it was computed from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub origin: Coordinate,
    /// Overview path, origin to final stop
    pub path: Vec<Coordinate>,
    pub distance_m: u64,
    pub duration_s: u64,
}
