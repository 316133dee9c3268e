//! Per-connection collector loop.
//!
//! Each accepted WebSocket gets one task running [`Collector::handle`]:
//! validate the mandatory `hello`, send `ready`, then decode frames,
//! answer keepalives, dispatch business events to the session manager,
//! and mirror raw traffic through the relay. Frame handling is
//! strictly sequential per connection, so per-node event order is the
//! arrival order.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::ws::{Message, WebSocket};
use futures::StreamExt;
use metrics::{counter, gauge};
use nodewatch_core::{Envelope, NodeInfo, PONG_FRAME, READY_FRAME};
use tracing::{debug, info, warn};

use crate::config::{CollectorConfig, RelayConfig};
use crate::connection::{ConnectionWriter, FrameSink};
use crate::dispatch::SessionManager;
use crate::error::AuthError;
use crate::metrics::{
    AUTH_FAILURES_TOTAL, DECODE_ERRORS_TOTAL, FRAMES_TOTAL, SESSIONS_ACTIVE,
    SESSIONS_CLOSED_TOTAL, SESSIONS_OPENED_TOTAL,
};
use crate::relay::Relay;
use crate::session::{Session, SessionState};

/// The keepalive tag, answered in-line and never dispatched or
/// mirrored.
const PING_TAG: &str = "node-ping";

/// Shared per-server state driving every node connection.
pub struct Collector {
    config: CollectorConfig,
    manager: Arc<dyn SessionManager>,
    active: AtomicUsize,
}

impl Collector {
    /// Build a collector dispatching into `manager`.
    pub fn new(config: CollectorConfig, manager: Arc<dyn SessionManager>) -> Self {
        Self {
            config,
            manager,
            active: AtomicUsize::new(0),
        }
    }

    /// Number of live sessions, for health reporting.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Drive one accepted connection to completion.
    pub async fn handle(&self, socket: WebSocket) {
        let (sink, mut stream) = socket.split();
        let writer: Arc<dyn FrameSink> = Arc::new(ConnectionWriter::new(sink));

        let mut session = Session::new();
        let mut relay: Option<Relay> = None;

        let _ = self.active.fetch_add(1, Ordering::Relaxed);
        counter!(SESSIONS_OPENED_TOTAL).increment(1);
        gauge!(SESSIONS_ACTIVE).increment(1.0);
        debug!(relay = self.config.relay.is_some(), "node connection opened");

        while let Some(received) = stream.next().await {
            let raw = match received {
                Ok(Message::Text(text)) => text.to_string(),
                Ok(Message::Close(_)) => {
                    debug!(node = session.node_id(), "node sent close frame");
                    break;
                }
                // The protocol is text-only; control frames are
                // handled by the transport.
                Ok(_) => continue,
                Err(err) => {
                    debug!(node = session.node_id(), %err, "failed to read frame");
                    break;
                }
            };

            match session.state() {
                SessionState::Unauthenticated => {
                    match self.authenticate(&raw, writer.as_ref()).await {
                        Ok((node_id, hello)) => {
                            info!(node = %node_id, "node authenticated");
                            session.authenticate(node_id);
                            if let Some(relay_config) = &self.config.relay {
                                let seed = relay_seed(&hello, &raw, relay_config);
                                relay = Some(Relay::spawn(
                                    relay_config.clone(),
                                    writer.clone(),
                                    seed,
                                ));
                            }
                            // The hello is a business event in its own
                            // right; handlers see it like any other.
                            self.manager.handle_message(session.node_id(), hello).await;
                        }
                        Err(err) => {
                            counter!(AUTH_FAILURES_TOTAL).increment(1);
                            warn!(%err, "closing connection, handshake rejected");
                            break;
                        }
                    }
                }
                SessionState::Authenticated => {
                    let envelope = match Envelope::decode(&raw) {
                        Ok(envelope) => envelope,
                        Err(err) => {
                            // Non-fatal after auth: drop the frame,
                            // keep the session.
                            counter!(DECODE_ERRORS_TOTAL).increment(1);
                            warn!(node = session.node_id(), %err, "dropping undecodable frame");
                            continue;
                        }
                    };
                    counter!(FRAMES_TOTAL, "tag" => envelope.tag().to_owned()).increment(1);

                    if envelope.tag() == PING_TAG {
                        if let Err(err) = writer.send_frame(PONG_FRAME.to_owned()).await {
                            warn!(node = session.node_id(), %err, "failed to write pong");
                            break;
                        }
                        continue;
                    }

                    if let Some(relay) = &relay {
                        relay.proxy(raw);
                    }
                    self.manager
                        .handle_message(session.node_id(), envelope)
                        .await;
                }
                SessionState::Closed => break,
            }
        }

        session.close();
        if let Some(relay) = &relay {
            relay.close();
        }
        let _ = self.active.fetch_sub(1, Ordering::Relaxed);
        counter!(SESSIONS_CLOSED_TOTAL).increment(1);
        gauge!(SESSIONS_ACTIVE).decrement(1.0);
        info!(node = session.node_id(), "session closed");
    }

    /// Validate the mandatory first frame and acknowledge with `ready`.
    ///
    /// Returns the node's self-reported name and the decoded hello.
    /// Any failure is fatal to the connection and leaves `ready`
    /// unsent.
    async fn authenticate(
        &self,
        raw: &str,
        writer: &dyn FrameSink,
    ) -> Result<(String, Envelope), AuthError> {
        let envelope = Envelope::decode(raw)?;
        if envelope.tag() != "hello" {
            return Err(AuthError::NotHello(envelope.tag().to_owned()));
        }

        let secret: String = envelope.decode_field("secret")?;
        if !self.config.secret.is_empty() && secret != self.config.secret {
            return Err(AuthError::SecretMismatch);
        }
        let info: NodeInfo = envelope.decode_field("info")?;

        writer.send_frame(READY_FRAME.to_owned()).await?;
        Ok((info.name, envelope))
    }
}

/// Build the relay's seed frame from the accepted hello.
///
/// With a distinct relay secret configured, the hello is deep-copied
/// and re-encoded with the secret swapped; the copy never aliases the
/// envelope local handlers see. Otherwise the raw frame is forwarded
/// byte-for-byte.
fn relay_seed(hello: &Envelope, raw: &str, config: &RelayConfig) -> String {
    if config.secret.is_empty() {
        return raw.to_owned();
    }
    let mut rewritten = hello.clone();
    match rewritten
        .set_field("secret", &config.secret)
        .and_then(|()| rewritten.encode())
    {
        Ok(frame) => frame,
        Err(err) => {
            warn!(%err, "failed to rewrite relay secret, forwarding hello unchanged");
            raw.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::TransportError;

    struct RecordingSink {
        frames: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                frames: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                frames: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn frames(&self) -> Vec<String> {
            self.frames.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send_frame(&self, frame: String) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError("write failed".into()));
            }
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }
    }

    struct NullManager;

    #[async_trait]
    impl SessionManager for NullManager {
        async fn handle_message(&self, _node_id: &str, _envelope: Envelope) {}
    }

    fn collector(secret: &str) -> Collector {
        let config = CollectorConfig {
            secret: secret.to_owned(),
            ..CollectorConfig::default()
        };
        Collector::new(config, Arc::new(NullManager))
    }

    #[tokio::test]
    async fn authenticate_accepts_matching_secret() {
        let collector = collector("pw");
        let sink = RecordingSink::new();
        let raw = r#"{"emit":["hello",{"secret":"pw","info":{"name":"node-1"}}]}"#;

        let (node_id, hello) = collector.authenticate(raw, &sink).await.unwrap();
        assert_eq!(node_id, "node-1");
        assert_eq!(hello.tag(), "hello");
        assert_eq!(sink.frames(), vec![READY_FRAME.to_owned()]);
    }

    #[tokio::test]
    async fn authenticate_rejects_wrong_secret_without_ready() {
        let collector = collector("pw");
        let sink = RecordingSink::new();
        let raw = r#"{"emit":["hello",{"secret":"nope","info":{"name":"node-1"}}]}"#;

        let err = collector.authenticate(raw, &sink).await.unwrap_err();
        assert!(matches!(err, AuthError::SecretMismatch));
        assert!(sink.frames().is_empty());
    }

    #[tokio::test]
    async fn empty_configured_secret_accepts_anything() {
        let collector = collector("");
        let sink = RecordingSink::new();
        let raw = r#"{"emit":["hello",{"secret":"whatever","info":{}}]}"#;

        let (node_id, _) = collector.authenticate(raw, &sink).await.unwrap();
        assert!(node_id.is_empty());
        assert_eq!(sink.frames().len(), 1);
    }

    #[tokio::test]
    async fn authenticate_rejects_non_hello() {
        let collector = collector("pw");
        let sink = RecordingSink::new();
        let raw = r#"{"emit":["stats",{"stats":{}}]}"#;

        let err = collector.authenticate(raw, &sink).await.unwrap_err();
        assert!(matches!(err, AuthError::NotHello(tag) if tag == "stats"));
        assert!(sink.frames().is_empty());
    }

    #[tokio::test]
    async fn authenticate_rejects_garbage_and_missing_fields() {
        let collector = collector("pw");
        let sink = RecordingSink::new();

        let err = collector.authenticate("not json", &sink).await.unwrap_err();
        assert!(matches!(err, AuthError::BadHello(_)));

        let err = collector
            .authenticate(r#"{"emit":["hello",{"info":{}}]}"#, &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::BadHello(_)));

        let err = collector
            .authenticate(r#"{"emit":["hello",{"secret":"pw"}]}"#, &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::BadHello(_)));

        assert!(sink.frames().is_empty());
    }

    #[tokio::test]
    async fn authenticate_surfaces_ready_write_failure() {
        let collector = collector("pw");
        let sink = RecordingSink::failing();
        let raw = r#"{"emit":["hello",{"secret":"pw","info":{}}]}"#;

        let err = collector.authenticate(raw, &sink).await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
    }

    #[test]
    fn relay_seed_forwards_raw_without_relay_secret() {
        let raw = r#"{"emit":["hello",{"secret":"pw","info":{"name":"n"}}]}"#;
        let hello = Envelope::decode(raw).unwrap();
        let config = RelayConfig::default();

        assert_eq!(relay_seed(&hello, raw, &config), raw);
    }

    #[test]
    fn relay_seed_swaps_secret_without_touching_original() {
        let raw = r#"{"emit":["hello",{"secret":"pw","info":{"name":"n"}}]}"#;
        let hello = Envelope::decode(raw).unwrap();
        let config = RelayConfig {
            secret: "relay-pw".to_owned(),
            ..RelayConfig::default()
        };

        let seed = Envelope::decode(&relay_seed(&hello, raw, &config)).unwrap();
        let secret: String = seed.decode_field("secret").unwrap();
        assert_eq!(secret, "relay-pw");
        let info: NodeInfo = seed.decode_field("info").unwrap();
        assert_eq!(info.name, "n");

        let original: String = hello.decode_field("secret").unwrap();
        assert_eq!(original, "pw");
    }

    #[test]
    fn active_sessions_starts_at_zero() {
        assert_eq!(collector("").active_sessions(), 0);
    }
}
