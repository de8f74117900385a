//! Routing provider seam
//!
//! The scheduler only sees [`RoutingProvider`]; the directions client is one
//! implementation, tests supply their own.

use crate::error::{TrackingError, TrackingResult};
use crate::model::Route;
use async_trait::async_trait;
use taskroute_api_client::endpoints::DirectionsRequest;
use taskroute_api_client::TaskRouteClient;
use taskroute_geo::Coordinate;
use tracing::debug;

/// Route query for the provider
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub waypoints: Vec<Coordinate>,
}

/// Provider answer
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// A route was produced
    Found(Route),
    /// The provider answered but produced no route (`ZERO_RESULTS`, ...)
    Declined { status: String },
}

/// Something that computes routes
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Compute a route. `Err` means the provider could not be reached or
    /// refused the request locally; `Declined` means it answered "no".
    async fn route(&self, request: &RouteRequest) -> TrackingResult<RouteOutcome>;
}

/// Routing through the directions API client
#[derive(Clone)]
pub struct DirectionsProvider {
    client: TaskRouteClient,
}

impl DirectionsProvider {
    /// Wrap a configured client
    pub fn new(client: TaskRouteClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RoutingProvider for DirectionsProvider {
    async fn route(&self, request: &RouteRequest) -> TrackingResult<RouteOutcome> {
        let reply = self
            .client
            .directions()
            .route(&DirectionsRequest {
                origin: request.origin,
                destination: request.destination,
                waypoints: request.waypoints.clone(),
            })
            .await?;

        let Some(best) = reply.best_route() else {
            debug!(status = %reply.status, message = ?reply.error_message, "Directions declined");
            return Ok(RouteOutcome::Declined { status: reply.status.clone() });
        };

        // A corrupt polyline is a provider fault, not a "no route" answer.
        let path = best.path().map_err(TrackingError::from)?;

        Ok(RouteOutcome::Found(Route {
            origin: request.origin,
            path,
            distance_m: best.distance_m(),
            duration_s: best.duration_s(),
        }))
    }
}
