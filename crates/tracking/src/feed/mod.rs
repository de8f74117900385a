//! Feed connection manager
//!
//! Owns at most one push connection at a time. A driver task runs the
//! connection state machine:
//!
//! ```text
//! Idle -> Connecting -> Open -> Closed(Intentional)
//!                         \--> Closed(Unexpected) -> Reconnecting -> Connecting -> ...
//! ```
//!
//! Decoded events and connectivity changes go out as [`FeedSignal`]s on an
//! unbounded channel, in arrival order. The raw state is also published on a
//! watch channel for callers that want to observe it.

pub mod transport;
pub mod ws;

pub use transport::{FeedSession, FeedTransport, Frame, NORMAL_CLOSURE};
pub use ws::WsTransport;

use crate::error::TrackingError;
use crate::event::{parse_message, TrackingEvent};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use taskroute_telemetry::{metrics, names};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long `stop()` waits for the close handshake before abandoning it
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const CLOSE_REASON: &str = "tracking stopped";

/// Why the connection closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseKind {
    /// Normal closure; no reconnect
    Intentional,
    /// Anything else; a reconnect follows
    Unexpected,
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    Idle,
    Connecting,
    Open,
    Closed(CloseKind),
    Reconnecting,
}

impl FeedState {
    /// The connection is up
    pub fn is_connected(self) -> bool {
        self == Self::Open
    }
}

/// Output of the connection manager
#[derive(Debug, Clone, PartialEq)]
pub enum FeedSignal {
    /// A decoded feed event
    Event(TrackingEvent),
    /// Connectivity changed
    Connected(bool),
}

/// Connection manager tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    /// Delay before reconnecting after an unexpected close
    pub reconnect_delay: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

struct FeedShared {
    state: watch::Sender<FeedState>,
    signals: mpsc::UnboundedSender<FeedSignal>,
}

impl FeedShared {
    fn transition(&self, next: FeedState) {
        let mut was_connected = false;
        let changed = self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            was_connected = state.is_connected();
            *state = next;
            true
        });
        if !changed {
            return;
        }

        debug!(state = ?next, "Feed state changed");
        if was_connected != next.is_connected() {
            let _ = self.signals.send(FeedSignal::Connected(next.is_connected()));
        }
    }

    fn deliver(&self, text: &str) {
        metrics().increment(names::FEED_MESSAGES);
        match parse_message(text) {
            Ok(event) => {
                let _ = self.signals.send(FeedSignal::Event(event));
            }
            Err(TrackingError::UnknownEvent(name)) => {
                debug!(event = %name, "Ignoring unhandled feed event");
            }
            Err(e) => {
                metrics().increment(names::FEED_DROPPED);
                warn!(error = %e, "Dropping feed message");
            }
        }
    }
}

struct Driver {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owner of the push connection
pub struct FeedConnection {
    transport: Arc<dyn FeedTransport>,
    config: FeedConfig,
    shared: Arc<FeedShared>,
    driver: Option<Driver>,
}

impl FeedConnection {
    /// Create an idle manager and the receiver its signals arrive on
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        config: FeedConfig,
    ) -> (Self, mpsc::UnboundedReceiver<FeedSignal>) {
        let (signals, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(FeedState::Idle);
        let connection = Self {
            transport,
            config,
            shared: Arc::new(FeedShared { state, signals }),
            driver: None,
        };
        (connection, rx)
    }

    /// Current state
    pub fn state(&self) -> FeedState {
        *self.shared.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<FeedState> {
        self.shared.state.subscribe()
    }

    /// Open the connection, closing any existing one first
    pub async fn start(&mut self) {
        self.shutdown_driver().await;
        self.shared.transition(FeedState::Connecting);

        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(drive(
            Arc::clone(&self.transport),
            Arc::clone(&self.shared),
            self.config.reconnect_delay,
            stop_rx,
        ));
        self.driver = Some(Driver { stop, handle });
    }

    /// Close the connection and cancel any pending reconnect. Idempotent.
    pub async fn stop(&mut self) {
        self.shutdown_driver().await;
        self.shared.transition(FeedState::Closed(CloseKind::Intentional));
    }

    async fn shutdown_driver(&mut self) {
        let Some(driver) = self.driver.take() else {
            return;
        };
        // The driver may already have finished on its own.
        let _ = driver.stop.send(());

        let mut handle = driver.handle;
        if tokio::time::timeout(CLOSE_TIMEOUT, &mut handle).await.is_err() {
            warn!("Feed did not close in time, abandoning connection");
            handle.abort();
        }
    }
}

impl Drop for FeedConnection {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.handle.abort();
        }
    }
}

enum SessionEnd {
    /// `stop()` was called
    Stopped,
    /// The peer closed with normal closure
    ClosedNormally,
    /// Error, abnormal close code or end of stream
    Dropped(String),
}

async fn drive(
    transport: Arc<dyn FeedTransport>,
    shared: Arc<FeedShared>,
    reconnect_delay: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        shared.transition(FeedState::Connecting);

        let connected = tokio::select! {
            _ = &mut stop => {
                shared.transition(FeedState::Closed(CloseKind::Intentional));
                return;
            }
            result = transport.connect() => result,
        };

        match connected {
            Ok(mut session) => {
                shared.transition(FeedState::Open);
                info!("Feed connected");

                match read_session(session.as_mut(), &shared, &mut stop).await {
                    SessionEnd::Stopped => {
                        if let Err(e) = session.close(NORMAL_CLOSURE, CLOSE_REASON).await {
                            debug!(error = %e, "Close handshake failed");
                        }
                        shared.transition(FeedState::Closed(CloseKind::Intentional));
                        info!("Feed closed");
                        return;
                    }
                    SessionEnd::ClosedNormally => {
                        shared.transition(FeedState::Closed(CloseKind::Intentional));
                        info!("Feed closed by server");
                        return;
                    }
                    SessionEnd::Dropped(reason) => {
                        warn!(%reason, "Feed closed unexpectedly");
                        shared.transition(FeedState::Closed(CloseKind::Unexpected));
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Feed connection failed");
                shared.transition(FeedState::Closed(CloseKind::Unexpected));
            }
        }

        shared.transition(FeedState::Reconnecting);
        metrics().increment(names::FEED_RECONNECTS);
        debug!(delay_ms = reconnect_delay.as_millis() as u64, "Reconnecting");

        tokio::select! {
            _ = &mut stop => {
                shared.transition(FeedState::Closed(CloseKind::Intentional));
                return;
            }
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }
}

async fn read_session(
    session: &mut dyn FeedSession,
    shared: &FeedShared,
    stop: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    loop {
        let frame = tokio::select! {
            _ = &mut *stop => return SessionEnd::Stopped,
            frame = session.next_frame() => frame,
        };

        match frame {
            None => return SessionEnd::Dropped("stream ended".to_string()),
            Some(Err(e)) => return SessionEnd::Dropped(e.to_string()),
            Some(Ok(Frame::Text(text))) => shared.deliver(&text),
            Some(Ok(Frame::Close(Some(NORMAL_CLOSURE)))) => return SessionEnd::ClosedNormally,
            Some(Ok(Frame::Close(code))) => {
                let code = code.map_or_else(|| "none".to_string(), |c| c.to_string());
                return SessionEnd::Dropped(format!("close code {code}"));
            }
            Some(Ok(Frame::Other)) => {}
        }
    }
}
