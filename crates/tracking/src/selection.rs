//! Selection and the view handed to the presentation layer

use crate::model::{Position, Route, Task, TaskId};
use crate::registry::{LocationRegistry, RegistryChange};
use crate::scheduler::{RouteInput, RouteScheduler, RouteStatus};
use serde::Serialize;
use std::collections::HashMap;

/// Everything the rendering surface gets
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackingView {
    /// Push feed is up
    pub connected: bool,
    /// Active tasks, most recently started first
    pub tasks: Vec<Task>,
    /// Last known positions of active tasks
    pub positions: HashMap<TaskId, Position>,
    pub selected: Option<TaskId>,
    /// Route for the selected task, if one is available
    pub route: Option<Route>,
    pub route_status: RouteStatus,
}

/// How a registry change affects the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEffect {
    /// Unrelated to the selected task
    Unaffected,
    /// The selected task is gone and the selection was cleared
    Cleared,
    /// Route inputs of the selected task may have changed
    Reevaluate,
}

/// The task currently selected for routing, by id only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<TaskId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<TaskId> {
        self.selected
    }

    /// Change the selection; returns false if it was already `task_id`
    pub fn select(&mut self, task_id: Option<TaskId>) -> bool {
        if self.selected == task_id {
            return false;
        }
        self.selected = task_id;
        true
    }

    /// Follow a registry change; never leaves the selection on a removed id
    pub fn on_registry_change(&mut self, change: RegistryChange, registry: &LocationRegistry) -> SelectionEffect {
        let Some(selected) = self.selected else {
            return SelectionEffect::Unaffected;
        };

        match change {
            RegistryChange::Reseeded if !registry.is_active(selected) => self.clear(),
            RegistryChange::Reseeded => SelectionEffect::Reevaluate,
            RegistryChange::TaskRemoved(id) if id == selected => self.clear(),
            RegistryChange::TaskUpserted(id) if id == selected => SelectionEffect::Reevaluate,
            RegistryChange::PositionMoved { task_id, active: true } if task_id == selected => {
                SelectionEffect::Reevaluate
            }
            _ => SelectionEffect::Unaffected,
        }
    }

    /// Scheduler inputs for the selected task
    pub fn route_input(&self, registry: &LocationRegistry) -> Option<RouteInput> {
        let task = registry.task(self.selected?)?;
        Some(RouteInput {
            origin: registry.position(task.id).map(|p| p.coordinate),
            destination: task.final_destination(),
            waypoints: task.waypoints(),
        })
    }

    /// Compose the presentation view
    pub fn compose(&self, registry: &LocationRegistry, scheduler: &RouteScheduler, connected: bool) -> TrackingView {
        let snapshot = registry.snapshot();
        TrackingView {
            connected,
            tasks: snapshot.tasks,
            positions: snapshot.positions,
            selected: self.selected,
            route: scheduler.route().cloned(),
            route_status: scheduler.status(),
        }
    }

    fn clear(&mut self) -> SelectionEffect {
        self.selected = None;
        SelectionEffect::Cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Destination, Position};
    use crate::testing::{north, task};
    use taskroute_api_client::endpoints::TaskStatus;
    use taskroute_geo::Coordinate;

    const DEST: Coordinate = Coordinate {
        latitude: 14.5547,
        longitude: 121.0244,
    };

    fn registry_with(ids: &[TaskId]) -> LocationRegistry {
        let mut registry = LocationRegistry::new();
        registry.seed(ids.iter().map(|id| task(*id, "t", DEST)));
        registry
    }

    #[test]
    fn test_select_same_id_is_noop() {
        let mut selection = Selection::new();
        assert!(selection.select(Some(1)));
        assert!(!selection.select(Some(1)));
        assert!(selection.select(None));
    }

    #[test]
    fn test_removal_of_selected_clears() {
        let mut registry = registry_with(&[1, 2]);
        let mut selection = Selection::new();
        selection.select(Some(1));

        let change = registry.on_task_removed(2).unwrap();
        assert_eq!(selection.on_registry_change(change, &registry), SelectionEffect::Unaffected);
        assert_eq!(selection.selected(), Some(1));

        let change = registry.on_task_removed(1).unwrap();
        assert_eq!(selection.on_registry_change(change, &registry), SelectionEffect::Cleared);
        assert_eq!(selection.selected(), None);
    }

    #[test]
    fn test_reseed_without_selected_clears() {
        let mut registry = registry_with(&[1]);
        let mut selection = Selection::new();
        selection.select(Some(1));

        let change = registry.seed(vec![task(2, "other", DEST)]);
        assert_eq!(selection.on_registry_change(change, &registry), SelectionEffect::Cleared);
    }

    #[test]
    fn test_position_of_selected_reevaluates() {
        let mut registry = registry_with(&[1, 2]);
        let mut selection = Selection::new();
        selection.select(Some(1));

        let change = registry.on_position_update(Position::new(2, DEST));
        assert_eq!(selection.on_registry_change(change, &registry), SelectionEffect::Unaffected);

        let change = registry.on_position_update(Position::new(1, DEST));
        assert_eq!(selection.on_registry_change(change, &registry), SelectionEffect::Reevaluate);
    }

    #[test]
    fn test_route_input_for_multi_stop_task() {
        let stops: Vec<Destination> = (1..=4)
            .map(|seq| Destination {
                sequence: seq,
                label: None,
                coordinate: north(DEST, f64::from(seq) * 100.0),
            })
            .collect();
        let mut registry = LocationRegistry::new();
        registry.seed(vec![Task::new(5, "rounds", TaskStatus::InProgress, stops).unwrap()]);
        registry.on_position_update(Position::new(5, DEST));

        let mut selection = Selection::new();
        selection.select(Some(5));
        let input = selection.route_input(&registry).unwrap();

        assert_eq!(input.origin, Some(DEST));
        assert_eq!(input.destination, north(DEST, 400.0));
        assert_eq!(input.waypoints, vec![north(DEST, 200.0), north(DEST, 300.0)]);
    }

    #[test]
    fn test_route_input_without_position() {
        let registry = registry_with(&[1]);
        let mut selection = Selection::new();
        assert!(selection.route_input(&registry).is_none());

        selection.select(Some(1));
        assert_eq!(selection.route_input(&registry).unwrap().origin, None);
    }
}
