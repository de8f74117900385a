//! Route scheduler for the selected task
//!
//! Layers debounce, hysteresis and stale-response handling over the pure
//! [`decide`] function. Timers and provider calls run as spawned tasks that
//! report back through [`SchedulerSignal`]s; the owner feeds those signals to
//! [`RouteScheduler::handle`] on its own loop, so all state changes happen in
//! one place and in order.
//!
//! Guarantees:
//! - a new qualifying input replaces the pending debounce timer
//! - at most one provider request is outstanding
//! - a response whose ticket is no longer current is discarded

mod decision;

pub use decision::{decide, Decision, Thresholds};

use crate::error::TrackingResult;
use crate::model::Route;
use crate::provider::{RouteOutcome, RouteRequest, RoutingProvider};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use taskroute_geo::Coordinate;
use taskroute_telemetry::{metrics, names};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Scheduler tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    /// Quiet period before a request goes out
    pub debounce: Duration,
    pub thresholds: Thresholds,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            thresholds: Thresholds::default(),
        }
    }
}

/// Completion notices from scheduler-spawned tasks
#[derive(Debug)]
pub enum SchedulerSignal {
    /// The debounce timer with this ticket fired
    DebounceElapsed { ticket: u64 },
    /// The provider request with this ticket finished
    RouteSettled {
        ticket: u64,
        result: TrackingResult<RouteOutcome>,
    },
}

/// Route state as shown to the viewer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    /// Nothing selected, or no position yet
    #[default]
    Idle,
    /// A request is scheduled or outstanding
    Pending,
    /// A route is available
    Ready,
    /// The position is at the destination
    Arrived,
    /// The provider failed or declined; no route currently available
    Unavailable,
}

/// Inputs for one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct RouteInput {
    /// Current position of the selected task, if known
    pub origin: Option<Coordinate>,
    /// Final stop
    pub destination: Coordinate,
    /// Intermediate stops
    pub waypoints: Vec<Coordinate>,
}

impl RouteInput {
    /// Same destination and intermediate stops
    pub fn same_target(&self, other: &RouteInput) -> bool {
        self.destination == other.destination && self.waypoints == other.waypoints
    }
}

#[derive(Debug)]
struct PendingTimer {
    ticket: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
struct InFlight {
    ticket: u64,
    origin: Coordinate,
    handle: JoinHandle<()>,
}

/// Debounced route recomputation for one selection at a time
pub struct RouteScheduler {
    provider: Arc<dyn RoutingProvider>,
    config: SchedulerConfig,
    signals: mpsc::UnboundedSender<SchedulerSignal>,
    next_ticket: u64,
    last_origin: Option<Coordinate>,
    last_route: Option<Route>,
    status: RouteStatus,
    latest: Option<RouteInput>,
    timer: Option<PendingTimer>,
    in_flight: Option<InFlight>,
    /// The timer fired while a request was outstanding
    deferred: bool,
}

impl RouteScheduler {
    /// Create a scheduler and the receiver its signals arrive on
    pub fn new(
        provider: Arc<dyn RoutingProvider>,
        config: SchedulerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SchedulerSignal>) {
        let (signals, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            provider,
            config,
            signals,
            next_ticket: 0,
            last_origin: None,
            last_route: None,
            status: RouteStatus::Idle,
            latest: None,
            timer: None,
            in_flight: None,
            deferred: false,
        };
        (scheduler, rx)
    }

    /// Cached route, if any
    pub fn route(&self) -> Option<&Route> {
        self.last_route.as_ref()
    }

    /// Current route status
    pub fn status(&self) -> RouteStatus {
        self.status
    }

    /// Origin of the last route attempt that got an answer
    pub fn last_origin(&self) -> Option<Coordinate> {
        self.last_origin
    }

    /// A debounce timer is armed
    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// A provider request is outstanding
    pub fn is_request_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Forget everything: pending timer, outstanding request, cached route
    /// and last origin. Used when the selection changes and on teardown.
    pub fn reset(&mut self) {
        self.cancel_debounce();
        self.abandon_request();
        self.last_origin = None;
        self.last_route = None;
        self.latest = None;
        self.status = RouteStatus::Idle;
    }

    /// Cancel the pending debounce timer, if any
    pub fn cancel_debounce(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }

    /// Run the decision for new inputs; `None` means nothing is selected
    pub fn evaluate(&mut self, input: Option<RouteInput>) {
        let Some(input) = input else {
            self.reset();
            return;
        };

        // The cache and any outstanding request belong to the previous target.
        if self.latest.as_ref().is_some_and(|latest| !latest.same_target(&input)) {
            debug!(destination = %input.destination, "Route target changed, dropping cached route");
            self.abandon_request();
            self.last_route = None;
            self.last_origin = None;
        }

        let decision = decide(
            input.origin,
            input.destination,
            self.last_origin,
            self.last_route.is_some(),
            &self.config.thresholds,
        );
        debug!(?decision, origin = ?input.origin, "Route decision");

        match decision {
            Decision::NoPosition => {
                self.cancel_debounce();
                self.abandon_request();
                self.last_route = None;
                self.last_origin = None;
                self.status = RouteStatus::Idle;
            }
            Decision::Arrived => {
                self.cancel_debounce();
                self.abandon_request();
                self.last_route = None;
                self.last_origin = input.origin;
                self.status = RouteStatus::Arrived;
            }
            Decision::Reuse => {
                self.cancel_debounce();
                self.status = RouteStatus::Ready;
            }
            Decision::Recompute => self.restart_debounce(),
        }

        self.latest = Some(input);
    }

    /// Apply a signal from a spawned timer or request
    pub fn handle(&mut self, signal: SchedulerSignal) {
        match signal {
            SchedulerSignal::DebounceElapsed { ticket } => self.on_debounce_elapsed(ticket),
            SchedulerSignal::RouteSettled { ticket, result } => self.on_route_settled(ticket, result),
        }
    }

    fn on_debounce_elapsed(&mut self, ticket: u64) {
        if self.timer.as_ref().map(|t| t.ticket) != Some(ticket) {
            return;
        }
        self.timer = None;

        if self.in_flight.is_some() {
            debug!("Request outstanding, deferring the next one until it settles");
            self.deferred = true;
            return;
        }

        let Some(input) = self.latest.clone() else {
            return;
        };
        self.dispatch(input);
    }

    fn on_route_settled(&mut self, ticket: u64, result: TrackingResult<RouteOutcome>) {
        if self.in_flight.as_ref().map(|f| f.ticket) != Some(ticket) {
            metrics().increment(names::ROUTE_STALE);
            debug!(ticket, "Discarding stale route response");
            return;
        }
        let Some(request) = self.in_flight.take() else {
            return;
        };

        match result {
            Ok(RouteOutcome::Found(route)) => {
                debug!(
                    distance_m = route.distance_m,
                    duration_s = route.duration_s,
                    points = route.path.len(),
                    "Route updated"
                );
                self.last_route = Some(route);
                self.last_origin = Some(request.origin);
                self.status = RouteStatus::Ready;
            }
            Ok(RouteOutcome::Declined { status }) => {
                metrics().increment(names::ROUTE_FAILURES);
                warn!(%status, "Provider returned no route");
                self.last_route = None;
                self.last_origin = Some(request.origin);
                self.status = RouteStatus::Unavailable;
            }
            Err(e) => {
                metrics().increment(names::ROUTE_FAILURES);
                warn!(error = %e, "Route request failed");
                self.last_route = None;
                self.status = RouteStatus::Unavailable;
            }
        }

        // Inputs that arrived while the request was out were judged against
        // the previous cache; judge the newest one again.
        let moved = self
            .latest
            .as_ref()
            .is_some_and(|latest| latest.origin != Some(request.origin));
        if std::mem::take(&mut self.deferred) || moved {
            let latest = self.latest.clone();
            self.evaluate(latest);
        }
    }

    fn restart_debounce(&mut self) {
        self.cancel_debounce();

        let ticket = self.take_ticket();
        let signals = self.signals.clone();
        let delay = self.config.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = signals.send(SchedulerSignal::DebounceElapsed { ticket });
        });

        self.timer = Some(PendingTimer { ticket, handle });
        self.status = RouteStatus::Pending;
    }

    fn dispatch(&mut self, input: RouteInput) {
        let Some(origin) = input.origin else {
            return;
        };
        let request = RouteRequest {
            origin,
            destination: input.destination,
            waypoints: input.waypoints,
        };

        let ticket = self.take_ticket();
        let provider = Arc::clone(&self.provider);
        let signals = self.signals.clone();

        metrics().increment(names::ROUTE_REQUESTS);
        debug!(ticket, origin = %request.origin, destination = %request.destination, "Requesting route");

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let result = provider.route(&request).await;
            metrics().histogram(names::ROUTE_LATENCY_MS, started.elapsed().as_secs_f64() * 1_000.0);
            let _ = signals.send(SchedulerSignal::RouteSettled { ticket, result });
        });

        self.in_flight = Some(InFlight { ticket, origin, handle });
        self.status = RouteStatus::Pending;
    }

    /// Drop the outstanding request; a reply already queued will be stale
    fn abandon_request(&mut self) {
        if let Some(request) = self.in_flight.take() {
            request.handle.abort();
        }
        self.deferred = false;
    }

    fn take_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }
}

impl Drop for RouteScheduler {
    fn drop(&mut self) {
        self.cancel_debounce();
        self.abandon_request();
    }
}
