//! Endpoint-specific API implementations
//!
//! Each module provides a typed interface for one set of upstream endpoints.
//!
//! | Module | Upstream | Description |
//! |--------|----------|-------------|
//! | `tasks` | `GET /tasks/` | Task listing, filtered by status |
//! | `locations` | `GET /locations/{task_id}/latest` | Last recorded position of a task |
//! | `directions` | Google Directions JSON | Route between an origin and a destination |

pub mod directions;
pub mod locations;
pub mod tasks;

pub use directions::{DirectionsApi, DirectionsRequest, DirectionsResponse};
pub use locations::{LocationRecord, LocationsApi};
pub use tasks::{DestinationRecord, TaskRecord, TaskStatus, TasksApi};
