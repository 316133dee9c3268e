//! The shared write half of a node connection.
//!
//! Two writers target the same socket: the collector loop (`ready` and
//! `node-pong` acknowledgements) and the relay's read-back task
//! (upstream replies). The write half therefore lives behind an async
//! lock, shared through [`FrameSink`].

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::SinkExt;
use futures::stream::SplitSink;
use tokio::sync::Mutex;

use crate::error::TransportError;

/// Destination for text frames headed to a connected node.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Write one text frame. A returned error means the connection is
    /// effectively dead for the caller.
    async fn send_frame(&self, frame: String) -> Result<(), TransportError>;
}

/// [`FrameSink`] over the write half of an accepted WebSocket.
pub struct ConnectionWriter {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl ConnectionWriter {
    /// Wrap a split write half.
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }
}

#[async_trait]
impl FrameSink for ConnectionWriter {
    async fn send_frame(&self, frame: String) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(frame.into()))
            .await
            .map_err(|err| TransportError(err.to_string()))
    }
}
