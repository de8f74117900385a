//! Location registry: the active task set and last known positions
//!
//! The registry is the only owner of task and position state. Every
//! operation is all-or-nothing and reports what changed so the selection
//! and route scheduler can react.

use crate::event::{RemovalReason, TrackingEvent};
use crate::model::{Position, Task, TaskId};
use serde::Serialize;
use std::collections::HashMap;
use taskroute_geo::{rank_by_distance, Coordinate, Ranked};
use tracing::debug;

/// Positions kept for ids with no tracked task
pub const MAX_UNTRACKED_POSITIONS: usize = 256;

/// What an operation changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    /// Active set replaced wholesale
    Reseeded,
    /// Task inserted or replaced
    TaskUpserted(TaskId),
    /// Task and its position removed
    TaskRemoved(TaskId),
    /// Position stored; `active` is false for ids with no task yet
    PositionMoved { task_id: TaskId, active: bool },
}

/// Read-only copy of the registry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrySnapshot {
    /// Active tasks, most recently started first
    pub tasks: Vec<Task>,
    /// Positions of active tasks only
    pub positions: HashMap<TaskId, Position>,
}

/// Active tasks and positions
#[derive(Debug, Default)]
pub struct LocationRegistry {
    tasks: Vec<Task>,
    positions: HashMap<TaskId, Position>,
}

impl LocationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active set; tasks not in progress are skipped
    ///
    /// Positions of seeded tasks are kept, so a feed update that beat the
    /// snapshot is not lost. Positions of anything else are dropped.
    pub fn seed(&mut self, tasks: impl IntoIterator<Item = Task>) -> RegistryChange {
        self.tasks.clear();
        for task in tasks {
            if !task.is_in_progress() {
                debug!(task_id = task.id, status = %task.status, "Skipping task that is not in progress");
                continue;
            }
            match self.index_of(task.id) {
                Some(i) => self.tasks[i] = task,
                None => self.tasks.push(task),
            }
        }

        let tasks = &self.tasks;
        self.positions.retain(|id, _| tasks.iter().any(|t| t.id == *id));
        RegistryChange::Reseeded
    }

    /// Insert or replace by id and move to the front
    pub fn on_task_started(&mut self, task: Task) -> RegistryChange {
        let id = task.id;
        if let Some(i) = self.index_of(id) {
            self.tasks.remove(i);
        }
        self.tasks.insert(0, task);
        RegistryChange::TaskUpserted(id)
    }

    /// Replace in place, or insert at the front if unknown
    pub fn on_task_changed(&mut self, task: Task) -> RegistryChange {
        let id = task.id;
        match self.index_of(id) {
            Some(i) => self.tasks[i] = task,
            None => self.tasks.insert(0, task),
        }
        RegistryChange::TaskUpserted(id)
    }

    /// Remove the task and its position; `None` if the id was not active
    pub fn on_task_removed(&mut self, task_id: TaskId) -> Option<RegistryChange> {
        self.positions.remove(&task_id);
        let i = self.index_of(task_id)?;
        self.tasks.remove(i);
        Some(RegistryChange::TaskRemoved(task_id))
    }

    /// Store the position, last write wins
    pub fn on_position_update(&mut self, position: Position) -> RegistryChange {
        let task_id = position.task_id;
        self.positions.insert(task_id, position);

        let active = self.is_active(task_id);
        if !active {
            self.evict_untracked(task_id);
        }
        RegistryChange::PositionMoved { task_id, active }
    }

    /// Apply a decoded feed event
    pub fn apply(&mut self, event: TrackingEvent) -> Option<RegistryChange> {
        match event {
            TrackingEvent::TaskStarted(task) => Some(self.on_task_started(task)),
            TrackingEvent::TaskChanged(task) => Some(self.on_task_changed(task)),
            TrackingEvent::TaskRemoved { task_id, reason } => {
                let change = self.on_task_removed(task_id);
                if change.is_none() && reason != RemovalReason::LeftProgress {
                    debug!(task_id, ?reason, "Removal for a task that was not tracked");
                }
                change
            }
            TrackingEvent::PositionUpdate(position) => Some(self.on_position_update(position)),
        }
    }

    /// Whether a task with this id is tracked
    pub fn is_active(&self, task_id: TaskId) -> bool {
        self.index_of(task_id).is_some()
    }

    /// Tracked task by id
    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Position of an active task
    pub fn position(&self, task_id: TaskId) -> Option<&Position> {
        if self.is_active(task_id) {
            self.positions.get(&task_id)
        } else {
            None
        }
    }

    /// Number of active tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// No active tasks
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Copy of the active state
    pub fn snapshot(&self) -> RegistrySnapshot {
        let positions = self
            .positions
            .iter()
            .filter(|(id, _)| self.is_active(**id))
            .map(|(id, p)| (*id, p.clone()))
            .collect();

        RegistrySnapshot {
            tasks: self.tasks.clone(),
            positions,
        }
    }

    /// Active tasks with a known position, closest to `target` first
    pub fn nearest(&self, target: Coordinate, limit: Option<usize>) -> Vec<Ranked<TaskId>> {
        let located: Vec<(TaskId, Coordinate)> = self
            .tasks
            .iter()
            .filter_map(|t| self.positions.get(&t.id).map(|p| (t.id, p.coordinate)))
            .collect();
        rank_by_distance(target, &located, limit)
    }

    /// Oldest positions of untracked ids go first; `keep` is never evicted
    fn evict_untracked(&mut self, keep: TaskId) {
        let mut untracked: Vec<_> = self
            .positions
            .values()
            .filter(|p| !self.is_active(p.task_id))
            .map(|p| (p.received_at, p.task_id))
            .collect();
        if untracked.len() <= MAX_UNTRACKED_POSITIONS {
            return;
        }

        untracked.sort();
        let excess = untracked.len() - MAX_UNTRACKED_POSITIONS;
        let evicted: Vec<TaskId> = untracked
            .into_iter()
            .map(|(_, id)| id)
            .filter(|id| *id != keep)
            .take(excess)
            .collect();
        debug!(count = evicted.len(), "Dropping positions of untracked tasks");
        for id in evicted {
            self.positions.remove(&id);
        }
    }

    fn index_of(&self, task_id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == task_id)
    }
}
