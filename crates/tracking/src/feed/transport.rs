//! Transport seam for the push feed

use crate::error::TrackingResult;
use async_trait::async_trait;

/// WebSocket "normal closure" close code
pub const NORMAL_CLOSURE: u16 = 1000;

/// One inbound frame, reduced to what the connection manager acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text payload
    Text(String),
    /// Peer closed, with its close code if it sent one
    Close(Option<u16>),
    /// Binary, ping or pong; ignored
    Other,
}

/// An open feed connection
#[async_trait]
pub trait FeedSession: Send {
    /// Next frame; `None` once the stream has ended
    async fn next_frame(&mut self) -> Option<TrackingResult<Frame>>;

    /// Close the connection with a code and reason
    async fn close(&mut self, code: u16, reason: &str) -> TrackingResult<()>;
}

/// Opens feed connections
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Open one connection
    async fn connect(&self) -> TrackingResult<Box<dyn FeedSession>>;
}
