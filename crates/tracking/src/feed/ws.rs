//! WebSocket transport built on tokio-tungstenite

use super::transport::{FeedSession, FeedTransport, Frame};
use crate::error::{TrackingError, TrackingResult};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::borrow::Cow;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Connects to a `ws://` or `wss://` feed URL
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    /// Transport for the given feed URL
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Feed URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedTransport for WsTransport {
    async fn connect(&self) -> TrackingResult<Box<dyn FeedSession>> {
        let (stream, response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TrackingError::Connect(format!("{}: {e}", self.url)))?;
        debug!(url = %self.url, status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsSession { stream }))
    }
}

struct WsSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedSession for WsSession {
    async fn next_frame(&mut self) -> Option<TrackingResult<Frame>> {
        let message = match self.stream.next().await? {
            Ok(message) => message,
            Err(e) => return Some(Err(TrackingError::Transport(e.to_string()))),
        };

        let frame = match message {
            Message::Text(text) => Frame::Text(text),
            Message::Close(frame) => Frame::Close(frame.map(|f| u16::from(f.code))),
            _ => Frame::Other,
        };
        Some(Ok(frame))
    }

    async fn close(&mut self, code: u16, reason: &str) -> TrackingResult<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: Cow::Owned(reason.to_string()),
        };
        self.stream
            .close(Some(frame))
            .await
            .map_err(|e| TrackingError::Transport(e.to_string()))
    }
}
