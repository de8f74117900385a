//! Directions provider (Google Directions JSON API)
//!
//! A reply with any status other than `OK` is a legitimate answer, not a
//! transport error: the caller decides what "no route" means.

use crate::client::TaskRouteClient;
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use taskroute_geo::{polyline, Coordinate, GeoError};

/// Status string for a successful reply
pub const STATUS_OK: &str = "OK";

/// Directions API interface
#[derive(Clone)]
pub struct DirectionsApi {
    client: TaskRouteClient,
}

impl DirectionsApi {
    /// Create a new directions API interface
    pub(crate) fn new(client: TaskRouteClient) -> Self {
        Self { client }
    }

    /// Request a route from `origin` to `destination` through `waypoints`
    pub async fn route(&self, request: &DirectionsRequest) -> ApiResult<DirectionsResponse> {
        let settings = &self.client.config().directions;
        let key = settings.api_key.as_deref().ok_or(ApiError::MissingApiKey)?;

        let mut query = vec![
            ("origin", request.origin.to_string()),
            ("destination", request.destination.to_string()),
            ("mode", settings.mode.clone()),
            ("key", key.to_string()),
        ];
        if let Some(waypoints) = request.waypoints_param() {
            query.push(("waypoints", waypoints));
        }

        self.client.get_directions(&query).await
    }
}

/// Route query
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsRequest {
    /// Start of the route
    pub origin: Coordinate,
    /// Final stop
    pub destination: Coordinate,
    /// Intermediate stops, in visiting order
    pub waypoints: Vec<Coordinate>,
}

impl DirectionsRequest {
    /// Pipe-separated waypoint list, if any
    fn waypoints_param(&self) -> Option<String> {
        if self.waypoints.is_empty() {
            return None;
        }
        let joined = self
            .waypoints
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("|");
        Some(joined)
    }
}

/// Directions reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsResponse {
    /// `OK`, `ZERO_RESULTS`, `NOT_FOUND`, `OVER_QUERY_LIMIT`, `REQUEST_DENIED`, ...
    pub status: String,
    /// Candidate routes, best first
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
    /// Provider explanation for non-OK statuses
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DirectionsResponse {
    /// Whether the provider produced a route
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK && !self.routes.is_empty()
    }

    /// Best route, only for an `OK` reply
    #[must_use]
    pub fn best_route(&self) -> Option<&DirectionsRoute> {
        if self.status == STATUS_OK {
            self.routes.first()
        } else {
            None
        }
    }
}

/// One candidate route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsRoute {
    /// Simplified path of the whole route
    pub overview_polyline: EncodedPolyline,
    /// One leg per consecutive pair of stops
    #[serde(default)]
    pub legs: Vec<DirectionsLeg>,
    /// Short description, e.g. the main road
    #[serde(default)]
    pub summary: Option<String>,
}

impl DirectionsRoute {
    /// Decoded overview path
    pub fn path(&self) -> Result<Vec<Coordinate>, GeoError> {
        polyline::decode(&self.overview_polyline.points)
    }

    /// Total distance in meters across legs
    #[must_use]
    pub fn distance_m(&self) -> u64 {
        self.legs.iter().filter_map(|leg| leg.distance.as_ref()).map(|d| d.value).sum()
    }

    /// Total duration in seconds across legs
    #[must_use]
    pub fn duration_s(&self) -> u64 {
        self.legs.iter().filter_map(|leg| leg.duration.as_ref()).map(|d| d.value).sum()
    }
}

/// Encoded polyline wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedPolyline {
    /// Encoded points, precision 5
    pub points: String,
}

/// One leg of a route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsLeg {
    #[serde(default)]
    #[allow(missing_docs)]
    pub distance: Option<TextValue>,
    #[serde(default)]
    #[allow(missing_docs)]
    pub duration: Option<TextValue>,
}

/// A measured value with its display text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextValue {
    /// Meters or seconds
    pub value: u64,
    /// Display text, e.g. "3.4 km"
    #[serde(default)]
    pub text: String,
}
