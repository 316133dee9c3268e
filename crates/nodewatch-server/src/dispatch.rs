//! Event dispatch: the session-manager seam and a tag-keyed handler
//! registry.
//!
//! The collector hands every authenticated, decoded frame (including
//! the `hello` itself, excluding only keepalives) to a
//! [`SessionManager`]. [`EventRouter`] is the standard implementation:
//! a map from frame tag to handler, with a log-and-drop default for
//! tags nothing has claimed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use nodewatch_core::Envelope;
use tracing::{debug, warn};

use crate::metrics::EVENTS_DISPATCHED_TOTAL;

/// Error surfaced by an event handler. Logged by the router and
/// swallowed; handler failures never reach the wire or the session.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives every business event from authenticated sessions.
///
/// Called concurrently from many connection tasks; implementations
/// must tolerate interleaved calls. Dispatch is fire-and-forget.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Handle one decoded frame from the named node. `node_id` may be
    /// empty when the node reported no name.
    async fn handle_message(&self, node_id: &str, envelope: Envelope);
}

/// Handles frames carrying one specific tag.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process one frame. Errors are logged by the router.
    async fn handle(&self, node_id: &str, envelope: &Envelope) -> Result<(), HandlerError>;
}

/// Tag-keyed handler registry with a log-and-drop default.
#[derive(Default)]
pub struct EventRouter {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl EventRouter {
    /// An empty router; every event falls through to the default case.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one tag, replacing any previous one.
    pub fn register(&mut self, tag: impl Into<String>, handler: impl EventHandler + 'static) {
        let _ = self.handlers.insert(tag.into(), Arc::new(handler));
    }

    /// Whether a handler is registered for `tag`.
    pub fn has_handler(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

#[async_trait]
impl SessionManager for EventRouter {
    async fn handle_message(&self, node_id: &str, envelope: Envelope) {
        let tag = envelope.tag().to_owned();
        counter!(EVENTS_DISPATCHED_TOTAL, "tag" => tag.clone()).increment(1);

        match self.handlers.get(tag.as_str()) {
            Some(handler) => {
                if let Err(err) = handler.handle(node_id, &envelope).await {
                    warn!(node = node_id, tag, %err, "event handler failed");
                }
            }
            None => {
                debug!(node = node_id, tag, "no handler for event, dropping");
            }
        }
    }
}
