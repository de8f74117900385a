//! Tracking engine
//!
//! One actor task owns the registry, the selection, the route scheduler and
//! the feed connection. Feed signals, scheduler signals and caller commands
//! are handled one at a time on that task, so no state is shared between
//! handlers. The composed [`TrackingView`] is published on a watch channel
//! after every handled message.

use crate::error::{TrackingError, TrackingResult};
use crate::feed::{FeedConfig, FeedConnection, FeedSignal, FeedTransport, WsTransport};
use crate::model::TaskId;
use crate::provider::{DirectionsProvider, RoutingProvider};
use crate::registry::{LocationRegistry, RegistryChange};
use crate::scheduler::{RouteScheduler, SchedulerConfig, SchedulerSignal, Thresholds};
use crate::selection::{Selection, SelectionEffect, TrackingView};
use crate::snapshot::{load_snapshot, RestSnapshot, SnapshotSource};
use std::sync::Arc;
use taskroute_api_client::TaskRouteClient;
use taskroute_core::config::Settings;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Engine tuning
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineConfig {
    pub feed: FeedConfig,
    pub scheduler: SchedulerConfig,
}

impl EngineConfig {
    /// Build from loaded settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            feed: FeedConfig {
                reconnect_delay: settings.feed.reconnect_delay(),
            },
            scheduler: SchedulerConfig {
                debounce: settings.routing.debounce(),
                thresholds: Thresholds {
                    arrival_m: settings.routing.arrival_m,
                    hysteresis_m: settings.routing.hysteresis_m,
                },
            },
        }
    }
}

/// External collaborators
pub struct EngineDeps {
    pub transport: Arc<dyn FeedTransport>,
    pub provider: Arc<dyn RoutingProvider>,
    /// Startup state; `None` starts empty
    pub snapshot: Option<Arc<dyn SnapshotSource>>,
}

impl EngineDeps {
    /// WebSocket feed plus the backend and directions APIs behind `client`
    pub fn connect(client: TaskRouteClient, feed_url: impl Into<String>) -> Self {
        Self {
            transport: Arc::new(WsTransport::new(feed_url)),
            provider: Arc::new(DirectionsProvider::new(client.clone())),
            snapshot: Some(Arc::new(RestSnapshot::new(client))),
        }
    }
}

enum Command {
    Select(Option<TaskId>, oneshot::Sender<TrackingResult<()>>),
    Stop,
}

/// Handle to a running engine
///
/// Dropping the handle stops the engine as well; [`TrackingEngine::stop`]
/// additionally waits for teardown to finish.
pub struct TrackingEngine {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<TrackingView>,
    actor: Option<JoinHandle<()>>,
}

impl TrackingEngine {
    /// Seed from the snapshot, open the feed and start processing.
    /// Must be called inside a tokio runtime.
    pub fn start(deps: EngineDeps, config: EngineConfig) -> Self {
        let (feed, feed_rx) = FeedConnection::new(deps.transport, config.feed);
        let (scheduler, route_rx) = RouteScheduler::new(deps.provider, config.scheduler);
        let (view_tx, view) = watch::channel(TrackingView::default());
        let (commands, command_rx) = mpsc::unbounded_channel();

        let actor = Actor {
            registry: LocationRegistry::new(),
            selection: Selection::new(),
            scheduler,
            feed,
            connected: false,
            view: view_tx,
        };
        let handle = tokio::spawn(actor.run(deps.snapshot, feed_rx, route_rx, command_rx));

        Self {
            commands,
            view,
            actor: Some(handle),
        }
    }

    /// Latest published view
    pub fn view(&self) -> TrackingView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every view change
    pub fn subscribe(&self) -> watch::Receiver<TrackingView> {
        self.view.clone()
    }

    /// Select a task for routing, or clear the selection with `None`
    ///
    /// Fails with [`TrackingError::UnknownTask`] if the id is not tracked.
    pub async fn select(&self, task_id: Option<TaskId>) -> TrackingResult<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Select(task_id, reply))
            .map_err(|_| TrackingError::EngineStopped)?;
        response.await.map_err(|_| TrackingError::EngineStopped)?
    }

    /// Tear down and wait for it to finish. Idempotent.
    pub async fn stop(&mut self) {
        let Some(actor) = self.actor.take() else {
            return;
        };
        let _ = self.commands.send(Command::Stop);
        if let Err(e) = actor.await {
            warn!(error = %e, "Tracking engine task ended abnormally");
        }
    }
}

struct Actor {
    registry: LocationRegistry,
    selection: Selection,
    scheduler: RouteScheduler,
    feed: FeedConnection,
    connected: bool,
    view: watch::Sender<TrackingView>,
}

impl Actor {
    async fn run(
        mut self,
        snapshot: Option<Arc<dyn SnapshotSource>>,
        mut feed_rx: mpsc::UnboundedReceiver<FeedSignal>,
        mut route_rx: mpsc::UnboundedReceiver<SchedulerSignal>,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        if let Some(source) = snapshot {
            self.seed(source.as_ref()).await;
        }
        self.feed.start().await;
        self.publish();

        loop {
            tokio::select! {
                Some(signal) = feed_rx.recv() => self.on_feed_signal(signal),
                Some(signal) = route_rx.recv() => self.scheduler.handle(signal),
                command = commands.recv() => match command {
                    Some(Command::Select(task_id, reply)) => {
                        let result = self.on_select(task_id);
                        self.publish();
                        let _ = reply.send(result);
                    }
                    Some(Command::Stop) | None => break,
                },
            }
            self.publish();
        }

        self.teardown().await;
    }

    async fn seed(&mut self, source: &dyn SnapshotSource) {
        match load_snapshot(source).await {
            Ok(seed) => {
                let change = self.registry.seed(seed.tasks);
                for position in seed.positions {
                    self.registry.on_position_update(position);
                }
                self.on_registry_change(change);
                info!(tasks = self.registry.len(), "Seeded from snapshot");
            }
            Err(e) => warn!(error = %e, "Snapshot unavailable, starting empty"),
        }
    }

    fn on_feed_signal(&mut self, signal: FeedSignal) {
        match signal {
            FeedSignal::Connected(connected) => self.connected = connected,
            FeedSignal::Event(event) => {
                if let Some(change) = self.registry.apply(event) {
                    self.on_registry_change(change);
                }
            }
        }
    }

    fn on_registry_change(&mut self, change: RegistryChange) {
        match self.selection.on_registry_change(change, &self.registry) {
            SelectionEffect::Unaffected => {}
            SelectionEffect::Cleared => {
                info!(?change, "Selected task is no longer tracked, clearing selection");
                self.scheduler.reset();
            }
            SelectionEffect::Reevaluate => self.reevaluate(),
        }
    }

    fn on_select(&mut self, task_id: Option<TaskId>) -> TrackingResult<()> {
        if let Some(id) = task_id {
            if !self.registry.is_active(id) {
                return Err(TrackingError::UnknownTask(id));
            }
        }
        if !self.selection.select(task_id) {
            return Ok(());
        }

        debug!(?task_id, "Selection changed");
        self.scheduler.reset();
        self.reevaluate();
        Ok(())
    }

    fn reevaluate(&mut self) {
        let input = self.selection.route_input(&self.registry);
        self.scheduler.evaluate(input);
    }

    fn publish(&self) {
        let next = self.selection.compose(&self.registry, &self.scheduler, self.connected);
        self.view.send_if_modified(|view| {
            if *view == next {
                return false;
            }
            *view = next;
            true
        });
    }

    async fn teardown(&mut self) {
        self.scheduler.cancel_debounce();
        self.feed.stop().await;
        self.scheduler.reset();
        self.connected = false;
        self.publish();
        info!("Tracking engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Frame, NORMAL_CLOSURE};
    use crate::model::Position;
    use crate::scheduler::RouteStatus;
    use crate::testing::{north, task, MockProvider, MockTransport, StaticSnapshot};
    use std::time::Duration;
    use taskroute_geo::Coordinate;

    const DEST_A: Coordinate = Coordinate {
        latitude: 14.5547,
        longitude: 121.0244,
    };
    const DEST_B: Coordinate = Coordinate {
        latitude: 14.5995,
        longitude: 120.9842,
    };

    fn location(task_id: TaskId, at: Coordinate) -> Frame {
        Frame::Text(format!(
            r#"{{"event": "location_update", "task_id": {task_id}, "latitude": {}, "longitude": {}}}"#,
            at.latitude, at.longitude
        ))
    }

    async fn wait_until(engine: &TrackingEngine, predicate: impl FnMut(&TrackingView) -> bool) -> TrackingView {
        let mut view = engine.subscribe();
        let current = view.wait_for(predicate).await.unwrap().clone();
        current
    }

    struct Harness {
        engine: TrackingEngine,
        transport: Arc<MockTransport>,
        provider: Arc<MockProvider>,
        frames: mpsc::UnboundedSender<TrackingResult<Frame>>,
    }

    async fn harness(snapshot: StaticSnapshot) -> Harness {
        let transport = MockTransport::new();
        let frames = transport.accept();
        let provider = MockProvider::found();
        let engine = TrackingEngine::start(
            EngineDeps {
                transport: transport.clone(),
                provider: provider.clone(),
                snapshot: Some(Arc::new(snapshot)),
            },
            EngineConfig::default(),
        );
        wait_until(&engine, |v| v.connected).await;
        Harness {
            engine,
            transport,
            provider,
            frames,
        }
    }

    fn two_tasks() -> StaticSnapshot {
        StaticSnapshot::new(vec![task(1, "A", DEST_A), task(2, "B", DEST_B)])
            .with_position(Position::new(1, north(DEST_A, 1_000.0)))
            .with_position(Position::new(2, north(DEST_B, 1_000.0)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_view() {
        let mut h = harness(two_tasks()).await;
        let view = h.engine.view();
        assert_eq!(view.tasks.len(), 2);
        assert_eq!(view.positions.len(), 2);
        assert_eq!(view.route_status, RouteStatus::Idle);
        h.engine.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_snapshot_starts_empty() {
        let mut h = harness(StaticSnapshot::unavailable()).await;
        assert!(h.engine.view().tasks.is_empty());

        h.frames
            .send(Ok(Frame::Text(
                r#"{"event": "task_started", "task": {"id": 3, "title": "late", "status": "IN_PROGRESS", "latitude": 14.5, "longitude": 121.0}}"#
                    .to_string(),
            )))
            .unwrap();
        let view = wait_until(&h.engine, |v| !v.tasks.is_empty()).await;
        assert_eq!(view.tasks[0].id, 3);
        h.engine.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_selecting_routes_and_following_movement() {
        let mut h = harness(two_tasks()).await;

        h.engine.select(Some(1)).await.unwrap();
        let view = wait_until(&h.engine, |v| v.route_status == RouteStatus::Ready).await;
        assert_eq!(view.selected, Some(1));
        assert_eq!(view.route.unwrap().origin, north(DEST_A, 1_000.0));

        // Jitter reuses, real movement recomputes.
        h.frames.send(Ok(location(1, north(DEST_A, 990.0)))).unwrap();
        h.frames.send(Ok(location(1, north(DEST_A, 900.0)))).unwrap();
        let view = wait_until(&h.engine, |v| {
            v.route.as_ref().map(|r| r.origin) == Some(north(DEST_A, 900.0))
        })
        .await;
        assert_eq!(view.route_status, RouteStatus::Ready);
        assert_eq!(h.provider.calls().len(), 2);

        h.frames.send(Ok(location(1, north(DEST_A, 3.0)))).unwrap();
        let view = wait_until(&h.engine, |v| v.route_status == RouteStatus::Arrived).await;
        assert!(view.route.is_none());

        h.engine.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_updated_destination_recomputes_route() {
        let mut h = harness(two_tasks()).await;
        h.engine.select(Some(1)).await.unwrap();
        wait_until(&h.engine, |v| v.route_status == RouteStatus::Ready).await;

        let moved = north(DEST_A, 5_000.0);
        h.frames
            .send(Ok(Frame::Text(format!(
                r#"{{"event": "task_updated", "task": {{"id": 1, "title": "A", "status": "IN_PROGRESS", "latitude": {}, "longitude": {}}}}}"#,
                moved.latitude, moved.longitude
            ))))
            .unwrap();
        wait_until(&h.engine, |v| v.route_status == RouteStatus::Pending).await;
        let view = wait_until(&h.engine, |v| v.route_status == RouteStatus::Ready).await;

        let calls = h.provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].destination, moved);
        assert_eq!(calls[1].origin, north(DEST_A, 1_000.0));
        assert!(view.route.is_some());

        h.engine.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_removing_selected_task_clears_selection() {
        let mut h = harness(two_tasks()).await;
        h.engine.select(Some(1)).await.unwrap();
        wait_until(&h.engine, |v| v.route_status == RouteStatus::Ready).await;

        h.frames
            .send(Ok(Frame::Text(r#"{"event": "task_completed", "task_id": 1}"#.to_string())))
            .unwrap();
        let view = wait_until(&h.engine, |v| v.tasks.len() == 1).await;
        assert_eq!(view.selected, None);
        assert!(view.route.is_none());
        assert_eq!(view.route_status, RouteStatus::Idle);
        assert!(!view.positions.contains_key(&1));

        h.engine.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reselect_recomputes_from_scratch() {
        let mut h = harness(two_tasks()).await;

        h.engine.select(Some(1)).await.unwrap();
        wait_until(&h.engine, |v| v.selected == Some(1) && v.route_status == RouteStatus::Ready).await;
        h.engine.select(Some(2)).await.unwrap();
        wait_until(&h.engine, |v| v.selected == Some(2) && v.route_status == RouteStatus::Ready).await;

        h.engine.select(Some(1)).await.unwrap();
        assert_eq!(h.engine.view().route_status, RouteStatus::Pending);
        assert!(h.engine.view().route.is_none());
        let view = wait_until(&h.engine, |v| v.route_status == RouteStatus::Ready).await;

        let calls = h.provider.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], calls[2]);
        assert_eq!(view.route.unwrap().origin, north(DEST_A, 1_000.0));

        h.engine.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_unknown_task() {
        let mut h = harness(two_tasks()).await;
        let err = h.engine.select(Some(42)).await.unwrap_err();
        assert!(matches!(err, TrackingError::UnknownTask(42)));
        assert_eq!(h.engine.view().selected, None);
        h.engine.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_tears_down() {
        let mut h = harness(two_tasks()).await;
        h.engine.select(Some(1)).await.unwrap();

        h.engine.stop().await;
        let view = h.engine.view();
        assert!(!view.connected);
        assert!(view.route.is_none());
        assert_eq!(h.transport.closes(), vec![(NORMAL_CLOSURE, "tracking stopped".to_string())]);

        // Debounce timer was cancelled with the engine.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(h.provider.calls().is_empty());

        assert!(matches!(h.engine.select(None).await, Err(TrackingError::EngineStopped)));
        h.engine.stop().await;
    }
}
