//! HTTP/WebSocket server assembly.
//!
//! Routes: `/` upgrades to the node WebSocket protocol, `/health`
//! reports liveness and the live session count, `/metrics` renders
//! Prometheus text when a recorder handle is attached.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::collector::Collector;
use crate::config::CollectorConfig;
use crate::dispatch::SessionManager;

/// Shared state behind every route.
#[derive(Clone)]
struct AppState {
    collector: Arc<Collector>,
    started_at: Instant,
    metrics: Option<PrometheusHandle>,
}

/// Body of the `/health` response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves requests.
    pub status: &'static str,
    /// Seconds since the server was constructed.
    pub uptime_secs: u64,
    /// Node sessions currently live.
    pub active_sessions: usize,
}

/// The collector server: construct, optionally attach metrics, serve.
pub struct CollectorServer {
    state: AppState,
    shutdown: CancellationToken,
}

impl CollectorServer {
    /// Build a server dispatching node events into `manager`.
    pub fn new(config: CollectorConfig, manager: Arc<dyn SessionManager>) -> Self {
        Self {
            state: AppState {
                collector: Arc::new(Collector::new(config, manager)),
                started_at: Instant::now(),
                metrics: None,
            },
            shutdown: CancellationToken::new(),
        }
    }

    /// Attach an installed Prometheus recorder handle, enabling
    /// `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    /// Token that stops [`CollectorServer::serve`] when cancelled.
    /// Live sessions are allowed to drain.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The assembled router, also usable under a larger application.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on `listener` until the shutdown token fires.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, "collector listening");
        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move { state.collector.handle(socket).await })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        active_sessions: state.collector.active_sessions(),
    })
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use nodewatch_core::Envelope;
    use tower::ServiceExt;

    use super::*;
    use crate::dispatch::SessionManager;

    struct NullManager;

    #[async_trait]
    impl SessionManager for NullManager {
        async fn handle_message(&self, _node_id: &str, _envelope: Envelope) {}
    }

    fn server() -> CollectorServer {
        CollectorServer::new(CollectorConfig::default(), Arc::new(NullManager))
    }

    #[tokio::test]
    async fn health_reports_ok_and_zero_sessions() {
        let response = server()
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["active_sessions"], 0);
    }

    #[tokio::test]
    async fn metrics_disabled_without_recorder() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ws_route_rejects_plain_get() {
        let response = server()
            .router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
