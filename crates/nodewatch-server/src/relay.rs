//! Best-effort mirror of collector traffic to an upstream observer.
//!
//! One relay serves one node session. The collector enqueues raw
//! frames; a background task owns the upstream connection and drains
//! the queue in arrival order. The primary session must never feel the
//! observer's health: enqueueing never blocks, a full queue drops the
//! newest frame, and a dead upstream is re-dialed forever on a fixed
//! interval. After every successful dial the seed handshake frame is
//! written before anything queued.
//!
//! Resilience is one-directional. An upstream read or write failure
//! triggers a re-dial; a failure writing an upstream reply back to the
//! node only ends the read-back task, because the node side owns that
//! connection's lifecycle.

use std::sync::Arc;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::connection::FrameSink;
use crate::metrics::{RELAY_DROPPED_TOTAL, RELAY_ENQUEUED_TOTAL, RELAY_RECONNECTS_TOTAL};

type Upstream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handle to a running relay, owned by the collector session.
///
/// Dropping the handle does not stop the relay; the collector calls
/// [`Relay::close`] when the node session ends.
pub struct Relay {
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Relay {
    /// Spawn the relay task set for one session.
    ///
    /// `seed` is the frame written upstream after every successful
    /// dial, before any queued traffic.
    pub fn spawn(config: RelayConfig, downstream: Arc<dyn FrameSink>, seed: String) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(config, downstream, seed, rx, cancel.clone()));
        Self { tx, cancel, task }
    }

    /// Enqueue one raw frame for mirroring.
    ///
    /// Never blocks and never reports failure to the caller: with the
    /// queue full or the relay closed, the frame is silently dropped.
    pub fn proxy(&self, frame: String) {
        match self.tx.try_send(frame) {
            Ok(()) => counter!(RELAY_ENQUEUED_TOTAL).increment(1),
            Err(_) => counter!(RELAY_DROPPED_TOTAL).increment(1),
        }
    }

    /// Stop every relay task. Idempotent, and safe to call before the
    /// first dial has succeeded.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Drive dial, seed, forward, and read-back until closed.
async fn run(
    config: RelayConfig,
    downstream: Arc<dyn FrameSink>,
    seed: String,
    mut queue: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    'connect: loop {
        let upstream = loop {
            if cancel.is_cancelled() {
                return;
            }
            match connect_async(config.upstream_addr.as_str()).await {
                Ok((upstream, _)) => break upstream,
                Err(err) => {
                    warn!(addr = %config.upstream_addr, %err, "failed to dial upstream");
                    tokio::select! {
                        () = cancel.cancelled() => return,
                        () = tokio::time::sleep(config.retry_interval()) => {}
                    }
                }
            }
        };
        debug!(addr = %config.upstream_addr, "relay connected");

        let (mut upstream_tx, upstream_rx) = upstream.split();

        // Seed failure is log-only; a dead link surfaces again on the
        // next queued write or on the read side.
        if let Err(err) = upstream_tx.send(Message::text(seed.clone())).await {
            warn!(%err, "failed to write seed handshake");
        }

        // Cancelled by the read-back task only on an upstream failure.
        let conn_closed = CancellationToken::new();
        drop(tokio::spawn(read_back(
            upstream_rx,
            downstream.clone(),
            conn_closed.clone(),
            cancel.clone(),
        )));

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = conn_closed.cancelled() => {
                    counter!(RELAY_RECONNECTS_TOTAL).increment(1);
                    continue 'connect;
                }
                frame = queue.recv() => {
                    let Some(frame) = frame else { return };
                    // The dequeued frame is lost if this write fails;
                    // frames still queued survive the re-dial.
                    if let Err(err) = send_frame(&mut upstream_tx, frame).await {
                        warn!(%err, "failed to mirror frame upstream");
                        counter!(RELAY_RECONNECTS_TOTAL).increment(1);
                        continue 'connect;
                    }
                }
            }
        }
    }
}

async fn send_frame(
    upstream_tx: &mut SplitSink<Upstream, Message>,
    frame: String,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    upstream_tx.send(Message::text(frame)).await
}

/// Forward upstream replies to the node until either side dies or the
/// relay is closed.
///
/// Cancels `conn_closed` only when the upstream read fails; a
/// downstream write failure ends this task without forcing a re-dial.
/// Exiting drops this connection's read half, so a closed relay
/// releases the upstream socket and the downstream writer.
async fn read_back(
    mut upstream: SplitStream<Upstream>,
    downstream: Arc<dyn FrameSink>,
    conn_closed: CancellationToken,
    cancel: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            () = cancel.cancelled() => return,
            received = upstream.next() => received,
        };
        match received {
            Some(Ok(Message::Text(text))) => {
                if let Err(err) = downstream.send_frame(text.to_string()).await {
                    debug!(%err, "node connection gone, stopping reply forwarding");
                    return;
                }
            }
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                conn_closed.cancel();
                return;
            }
            // Control and binary frames carry nothing we forward.
            Some(Ok(_)) => {}
        }
    }
}
