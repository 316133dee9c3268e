//! Collector and relay configuration.
//!
//! The server does not parse flags or files itself; the embedding
//! binary owns that and hands these structs in fully formed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the collector server.
///
/// No read or write deadline is applied to any socket. A peer that
/// hangs silently holds its task until the TCP connection drops;
/// operators who need tighter bounds should enforce idle timeouts at
/// the ingress in front of the collector.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind; 0 lets the OS pick.
    pub port: u16,
    /// Shared secret nodes must present in `hello`. Empty disables the
    /// check and any presented secret is accepted.
    pub secret: String,
    /// Upstream mirroring; `None` disables the relay entirely.
    pub relay: Option<RelayConfig>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 0,
            secret: String::new(),
            relay: None,
        }
    }
}

/// Configuration for the upstream mirroring relay.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Upstream observer WebSocket URL, e.g. `ws://host:3000/api`.
    pub upstream_addr: String,
    /// Secret substituted into the mirrored `hello`. Empty forwards
    /// the node's own secret unchanged.
    pub secret: String,
    /// Capacity of the bounded queue of frames awaiting mirroring.
    /// Frames arriving while it is full are dropped.
    pub queue_capacity: usize,
    /// Wait between upstream dial attempts, in milliseconds.
    pub retry_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            upstream_addr: String::new(),
            secret: String::new(),
            queue_capacity: 1000,
            retry_interval_ms: 1000,
        }
    }
}

impl RelayConfig {
    /// Dial retry interval as a [`Duration`].
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}
