//! # nodewatch
//!
//! Collector daemon binary — wires the event handlers into the
//! WebSocket collector server and runs it until interrupted.

#![deny(unsafe_code)]

mod handlers;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use nodewatch_server::config::{CollectorConfig, RelayConfig};
use nodewatch_server::server::CollectorServer;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// WebSocket node-stats collector.
#[derive(Parser, Debug)]
#[command(name = "nodewatch", about = "WebSocket node-stats collector")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Shared secret nodes must present (empty disables the check).
    #[arg(long, default_value = "")]
    secret: String,

    /// Upstream observer WebSocket URL to mirror traffic to
    /// (empty disables the relay).
    #[arg(long, default_value = "")]
    relay_addr: String,

    /// Distinct secret presented to the upstream observer
    /// (empty forwards each node's own secret).
    #[arg(long, default_value = "")]
    relay_secret: String,

    /// Capacity of each session's relay queue.
    #[arg(long, default_value = "1000")]
    relay_queue: usize,

    /// Interval between relay dial attempts, in milliseconds.
    #[arg(long, default_value = "1000")]
    relay_retry_ms: u64,

    /// Disable the /metrics endpoint.
    #[arg(long)]
    no_metrics: bool,
}

impl Cli {
    fn collector_config(&self) -> CollectorConfig {
        let relay = (!self.relay_addr.is_empty()).then(|| RelayConfig {
            upstream_addr: self.relay_addr.clone(),
            secret: self.relay_secret.clone(),
            queue_capacity: self.relay_queue,
            retry_interval_ms: self.relay_retry_ms,
        });
        CollectorConfig {
            host: self.host.clone(),
            port: self.port,
            secret: self.secret.clone(),
            relay,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let config = args.collector_config();
    if let Some(relay) = &config.relay {
        info!(upstream = %relay.upstream_addr, "relay enabled");
    }

    let manager = Arc::new(handlers::default_router());
    let mut server = CollectorServer::new(config, manager);
    if !args.no_metrics {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install metrics recorder")?;
        server = server.with_metrics(handle);
    }

    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", args.host, args.port))?;

    let shutdown = server.shutdown_token();
    drop(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
        }
        shutdown.cancel();
    }));

    server.serve(listener).await.context("server error")?;
    info!("shutdown complete");
    Ok(())
}
