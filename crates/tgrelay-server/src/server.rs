//! `RelayServer`: the axum HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::rpc::dispatch::Dispatcher;
use crate::rpc::types::{Envelope, ErrorKind, MethodCall, MethodResult};
use crate::shutdown::{self, DrainOutcome, ShutdownSignal};

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Call dispatcher.
    pub dispatcher: Arc<Dispatcher>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The bridge HTTP server.
pub struct RelayServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    shutdown: ShutdownSignal,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

/// A bound, running listener.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bound port.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl RelayServer {
    /// Create a server around a dispatcher.
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            shutdown: ShutdownSignal::new(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `/metrics` from this handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            dispatcher: Arc::clone(&self.dispatcher),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/api/call", post(call_handler))
            .route("/api/methods", get(methods_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// The listener's stop signal.
    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Bind and start serving in a background task.
    ///
    /// The task stops accepting connections when the shutdown signal fires
    /// and finishes once in-flight requests complete.
    pub async fn listen(&self) -> std::io::Result<ServerHandle> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        info!(%addr, "HTTP server listening");

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "HTTP server failed");
            }
        });

        Ok(ServerHandle { addr, task })
    }

    /// Stop accepting and wait up to the configured grace period for
    /// in-flight requests.
    pub async fn drain(&self, handle: ServerHandle) -> DrainOutcome {
        let outcome = shutdown::drain(&self.shutdown, handle.task, self.config.shutdown_grace).await;
        info!(?outcome, "HTTP server stopped");
        outcome
    }
}

/// POST /api/call
async fn call_handler(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Envelope>) {
    let result = match MethodCall::from_body(&body) {
        Ok(call) => state.dispatcher.dispatch(call).await,
        Err(e) => {
            warn!(error = %e, "undecodable request body");
            MethodResult::failure(ErrorKind::Execution, e.to_string())
        }
    };
    let (status, envelope) = result.into_response_parts();
    (status, Json(envelope))
}

/// GET /api/methods
async fn methods_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.dispatcher.registry().methods())
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.dispatcher.session().state(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> (StatusCode, String) {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, crate::metrics::render(handle)),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".into()),
    }
}
