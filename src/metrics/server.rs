//! Live `/metrics` and `/health` endpoints for a running extraction.

use crate::metrics::{HealthReport, MetricsRegistry};
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};

/// Errors from the metrics endpoint.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind metrics listener on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying failure.
        source: io::Error,
    },

    /// The server stopped while serving.
    #[error("metrics server stopped: {0}")]
    Serve(#[source] io::Error),
}

/// Configuration for the metrics endpoint.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
    /// Allow cross-origin scrapes from dashboards.
    pub enable_cors: bool,
    /// Rejected frames in a row before `/health` reports 503.
    pub max_consecutive_failures: u64,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 9090).into(),
            enable_cors: true,
            max_consecutive_failures: 3,
        }
    }
}

impl MetricsServerConfig {
    /// Creates a config listening on all interfaces at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
            ..Default::default()
        }
    }
}

struct ServerState {
    registry: MetricsRegistry,
    max_consecutive_failures: u64,
}

/// Serves a registry the extraction loop keeps updating.
///
/// The registry is shared with the caller through its clones, so no extra
/// locking is needed between the frame loop and request handlers.
pub struct MetricsServer {
    bind_addr: SocketAddr,
    enable_cors: bool,
    state: Arc<ServerState>,
}

impl MetricsServer {
    /// Creates a server over a clone of the extraction registry.
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self {
            bind_addr: config.bind_addr,
            enable_cors: config.enable_cors,
            state: Arc::new(ServerState {
                registry,
                max_consecutive_failures: config.max_consecutive_failures,
            }),
        }
    }

    /// Builds the router.
    pub fn router(&self) -> Router {
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(Arc::clone(&self.state));

        if !self.enable_cors {
            return app;
        }
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET])
                .allow_headers(Any),
        )
    }

    /// Serves until the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.bind_addr,
                source,
            })?;

        tracing::info!(addr = %self.bind_addr, "Serving extraction metrics");
        axum::serve(listener, app).await.map_err(ServerError::Serve)
    }
}

async fn metrics_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.registry.encode() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// 200 while frames keep getting extracted, 503 after a run of rejections.
async fn health_handler(State(state): State<Arc<ServerState>>) -> (StatusCode, Json<HealthReport>) {
    let report = state.registry.health(state.max_consecutive_failures);
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
