//! Location history endpoints

use crate::client::TaskRouteClient;
use crate::error::ApiResult;
use serde::{Deserialize, Serialize};

/// Locations API interface
#[derive(Clone)]
pub struct LocationsApi {
    client: TaskRouteClient,
}

impl LocationsApi {
    /// Create a new locations API interface
    pub(crate) fn new(client: TaskRouteClient) -> Self {
        Self { client }
    }

    /// Most recent recorded position for a task
    ///
    /// GET /locations/{task_id}/latest
    ///
    /// The backend answers 404 both for unknown tasks and for tasks with no
    /// history yet; either way there is no position, which is `Ok(None)`.
    pub async fn latest(&self, task_id: i64) -> ApiResult<Option<LocationRecord>> {
        match self.client.get(&format!("locations/{task_id}/latest")).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// One location log entry
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub task_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    /// ISO-8601 timestamp as sent by the backend
    #[serde(default)]
    pub recorded_at: Option<String>,
}
