//! Scripted transport and provider for unit tests

use crate::error::{TrackingError, TrackingResult};
use crate::feed::{FeedSession, FeedTransport, Frame};
use crate::model::{Destination, Position, Route, Task, TaskId};
use crate::provider::{RouteOutcome, RouteRequest, RoutingProvider};
use crate::snapshot::SnapshotSource;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskroute_api_client::endpoints::TaskStatus;
use taskroute_geo::{distance, Coordinate};
use tokio::sync::mpsc;

/// Roughly `meters` north of `c`
pub(crate) fn north(c: Coordinate, meters: f64) -> Coordinate {
    Coordinate::new(c.latitude + meters / 111_195.0, c.longitude)
}

/// In-progress task with a single stop
pub(crate) fn task(id: TaskId, title: &str, destination: Coordinate) -> Task {
    Task::new(
        id,
        title,
        TaskStatus::InProgress,
        vec![Destination {
            sequence: 1,
            label: None,
            coordinate: destination,
        }],
    )
    .unwrap()
}

type FrameSender = mpsc::UnboundedSender<TrackingResult<Frame>>;

enum Scripted {
    Refuse,
    Accept(mpsc::UnboundedReceiver<TrackingResult<Frame>>),
}

/// Hands out scripted sessions in order; once the script runs out every
/// connection succeeds and stays open until closed
#[derive(Default)]
pub(crate) struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    connects: AtomicUsize,
    closes: Arc<Mutex<Vec<(u16, String)>>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a successful connection; frames sent here are delivered in order
    /// and dropping the sender ends the stream
    pub(crate) fn accept(&self) -> FrameSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script.lock().unwrap().push_back(Scripted::Accept(rx));
        tx
    }

    /// Queue a failed connection attempt
    pub(crate) fn refuse(&self) {
        self.script.lock().unwrap().push_back(Scripted::Refuse);
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> Vec<(u16, String)> {
        self.closes.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedTransport for MockTransport {
    async fn connect(&self) -> TrackingResult<Box<dyn FeedSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();

        let (frames, spare) = match next {
            Some(Scripted::Refuse) => return Err(TrackingError::Connect("connection refused".to_string())),
            Some(Scripted::Accept(frames)) => (frames, None),
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                (rx, Some(tx))
            }
        };

        Ok(Box::new(MockSession {
            frames,
            _spare: spare,
            closes: Arc::clone(&self.closes),
        }))
    }
}

struct MockSession {
    frames: mpsc::UnboundedReceiver<TrackingResult<Frame>>,
    _spare: Option<FrameSender>,
    closes: Arc<Mutex<Vec<(u16, String)>>>,
}

#[async_trait]
impl FeedSession for MockSession {
    async fn next_frame(&mut self) -> Option<TrackingResult<Frame>> {
        self.frames.recv().await
    }

    async fn close(&mut self, code: u16, reason: &str) -> TrackingResult<()> {
        self.closes.lock().unwrap().push((code, reason.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Answer {
    Found,
    Declined(String),
    Fail,
}

/// Routing provider with a fixed answer, optional latency and a call log
pub(crate) struct MockProvider {
    answer: Answer,
    latency_ms: AtomicU64,
    calls: Mutex<Vec<RouteRequest>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockProvider {
    fn with_answer(answer: Answer) -> Arc<Self> {
        Arc::new(Self {
            answer,
            latency_ms: AtomicU64::new(0),
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    /// Straight-line route through the waypoints
    pub(crate) fn found() -> Arc<Self> {
        Self::with_answer(Answer::Found)
    }

    pub(crate) fn declined(status: &str) -> Arc<Self> {
        Self::with_answer(Answer::Declined(status.to_string()))
    }

    /// Every call fails as if the provider were unreachable
    pub(crate) fn failing() -> Arc<Self> {
        Self::with_answer(Answer::Fail)
    }

    pub(crate) fn with_latency(self: Arc<Self>, latency: Duration) -> Arc<Self> {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
        self
    }

    pub(crate) fn calls(&self) -> Vec<RouteRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of overlapping calls seen
    pub(crate) fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingProvider for MockProvider {
    async fn route(&self, request: &RouteRequest) -> TrackingResult<RouteOutcome> {
        self.calls.lock().unwrap().push(request.clone());
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        match &self.answer {
            Answer::Found => {
                let mut path = vec![request.origin];
                path.extend(request.waypoints.iter().copied());
                path.push(request.destination);
                Ok(RouteOutcome::Found(Route {
                    origin: request.origin,
                    path,
                    distance_m: distance(Some(request.origin), Some(request.destination)) as u64,
                    duration_s: 60,
                }))
            }
            Answer::Declined(status) => Ok(RouteOutcome::Declined { status: status.clone() }),
            Answer::Fail => Err(TrackingError::Transport("provider unreachable".to_string())),
        }
    }
}

/// Snapshot source backed by fixed data
#[derive(Default)]
pub(crate) struct StaticSnapshot {
    tasks: Vec<Task>,
    positions: HashMap<TaskId, Position>,
    failing_positions: Vec<TaskId>,
    unavailable: bool,
}

impl StaticSnapshot {
    pub(crate) fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    /// Task listing fails
    pub(crate) fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub(crate) fn with_position(mut self, position: Position) -> Self {
        self.positions.insert(position.task_id, position);
        self
    }

    pub(crate) fn with_failing_position(mut self, task_id: TaskId) -> Self {
        self.failing_positions.push(task_id);
        self
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshot {
    async fn active_tasks(&self) -> TrackingResult<Vec<Task>> {
        if self.unavailable {
            return Err(TrackingError::Transport("backend unreachable".to_string()));
        }
        Ok(self.tasks.clone())
    }

    async fn latest_position(&self, task_id: TaskId) -> TrackingResult<Option<Position>> {
        if self.failing_positions.contains(&task_id) {
            return Err(TrackingError::Transport("backend unreachable".to_string()));
        }
        Ok(self.positions.get(&task_id).cloned())
    }
}
