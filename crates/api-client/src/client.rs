//! Main API client implementation

use crate::config::ClientConfig;
use crate::endpoints::{DirectionsApi, LocationsApi, TasksApi};
use crate::error::{ApiError, ApiResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use taskroute_core::rate_limit::{RateLimitConfig, RateLimiter};
use taskroute_core::retry::{retry_async, CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// One upstream with its own breaker and budget, so a dead directions
/// provider never blocks snapshot calls and vice versa.
#[derive(Debug)]
pub(crate) struct Upstream {
    name: &'static str,
    /// Send the bearer token (backend only)
    authorized: bool,
    breaker: CircuitBreaker,
    limiter: RateLimiter,
    retry: RetryConfig,
}

impl Upstream {
    fn new(name: &'static str, authorized: bool, retry: RetryConfig, rate_limit: RateLimitConfig) -> Self {
        Self {
            name,
            authorized,
            breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
            limiter: RateLimiter::new(rate_limit),
            retry,
        }
    }
}

/// TaskRoute API client with built-in resilience patterns
///
/// This client wraps `reqwest` and adds:
/// - Retry with exponential backoff for transient failures
/// - A circuit breaker per upstream
/// - Local rate limiting per upstream
/// - Request correlation IDs for tracing
#[derive(Clone)]
pub struct TaskRouteClient {
    inner: Client,
    config: Arc<ClientConfig>,
    backend: Arc<Upstream>,
    directions: Arc<Upstream>,
}

impl TaskRouteClient {
    /// Create a new client from discovered configuration
    pub fn new() -> ApiResult<Self> {
        let config = ClientConfig::from_env()?;
        Self::with_config(config)
    }

    /// Create a new client with specific configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("taskroute-api-client/", env!("CARGO_PKG_VERSION"))),
        );

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(ApiError::Request)?;

        let backend = Arc::new(Upstream::new("backend", true, config.retry.clone(), config.rate_limit.clone()));
        let directions = Arc::new(Upstream::new(
            "directions",
            false,
            config.directions.retry.clone(),
            config.directions.rate_limit.clone(),
        ));

        Ok(Self {
            inner,
            config: Arc::new(config),
            backend,
            directions,
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Backend circuit breaker state
    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.backend.breaker.state()
    }

    /// Directions circuit breaker state
    #[must_use]
    pub fn directions_circuit_state(&self) -> CircuitState {
        self.directions.breaker.state()
    }

    /// Reset both circuit breakers
    pub fn reset_circuits(&self) {
        self.backend.breaker.reset();
        self.directions.breaker.reset();
    }

    // -------------------------------------------------------------------------
    // Endpoint API accessors
    // -------------------------------------------------------------------------

    /// Access task listing endpoints
    #[must_use]
    pub fn tasks(&self) -> TasksApi {
        TasksApi::new(self.clone())
    }

    /// Access location endpoints
    #[must_use]
    pub fn locations(&self) -> LocationsApi {
        LocationsApi::new(self.clone())
    }

    /// Access the directions provider
    #[must_use]
    pub fn directions(&self) -> DirectionsApi {
        DirectionsApi::new(self.clone())
    }

    // -------------------------------------------------------------------------
    // Low-level HTTP methods with resilience
    // -------------------------------------------------------------------------

    /// GET a backend path, relative to the base URL
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.backend_url(path)?;
        self.execute(&self.backend, url).await
    }

    /// GET the directions endpoint with the given query
    pub(crate) async fn get_directions<T: DeserializeOwned>(&self, query: &[(&str, String)]) -> ApiResult<T> {
        let url = Url::parse_with_params(&self.config.directions.url, query)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        self.execute(&self.directions, url).await
    }

    fn backend_url(&self, path: &str) -> ApiResult<Url> {
        let joined = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{joined}: {e}")))
    }

    /// Circuit check, budget check, then the request with retry
    async fn execute<T: DeserializeOwned>(&self, upstream: &Upstream, url: Url) -> ApiResult<T> {
        let request_id = Uuid::new_v4().to_string();

        if !upstream.breaker.can_execute() {
            warn!(request_id = %request_id, upstream = upstream.name, "Circuit breaker is open, rejecting request");
            return Err(ApiError::CircuitOpen(upstream.name));
        }

        if !upstream.limiter.try_acquire(upstream.name) {
            warn!(
                request_id = %request_id,
                upstream = upstream.name,
                retry_in_ms = upstream.limiter.time_until_available(upstream.name).as_millis(),
                "Rate limited"
            );
            return Err(ApiError::RateLimited(upstream.name));
        }

        let start = Instant::now();
        let id = request_id.as_str();
        let result = retry_async(
            &upstream.retry,
            move |attempt| {
                let url = url.clone();
                let request_id = id;
                async move {
                    if attempt > 0 {
                        debug!(request_id = %request_id, attempt, upstream = upstream.name, "Retrying request");
                    }
                    let outcome = self.execute_single_request(upstream, request_id, url).await;
                    // A 4xx still proves the upstream is alive.
                    match &outcome {
                        Err(e) if !e.is_client_error() => upstream.breaker.record_failure(),
                        _ => upstream.breaker.record_success(),
                    }
                    outcome
                }
            },
            ApiError::is_retryable,
        )
        .await;

        match &result {
            Ok(_) => debug!(
                request_id = %request_id,
                upstream = upstream.name,
                elapsed_ms = start.elapsed().as_millis(),
                "Request succeeded"
            ),
            Err(e) => debug!(request_id = %request_id, upstream = upstream.name, error = %e, "Request failed"),
        }

        result
    }

    /// Execute a single request without retry
    async fn execute_single_request<T: DeserializeOwned>(
        &self,
        upstream: &Upstream,
        request_id: &str,
        url: Url,
    ) -> ApiResult<T> {
        let mut request = self.inner.get(url).header(X_REQUEST_ID, request_id);

        if upstream.authorized {
            if let Some(ref token) = self.config.token {
                request = request.header(AUTHORIZATION, format!("Bearer {token}"));
            }
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle HTTP response and deserialize
    async fn handle_response<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(ApiError::Request)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(ApiError::api_response(status.as_u16(), message))
        }
    }
}
