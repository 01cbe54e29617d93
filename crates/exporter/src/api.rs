//! HTTP API for health checks and Prometheus metrics

use crate::host::HostSampler;
use crate::metrics::ExporterMetrics;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use detector_lib::read_score;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Content type of the text exposition format
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Shared application state
pub struct AppState {
    sampler: Mutex<Box<dyn HostSampler>>,
    metrics: ExporterMetrics,
    score_file: PathBuf,
}

impl AppState {
    pub fn new(
        sampler: Box<dyn HostSampler>,
        metrics: ExporterMetrics,
        score_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sampler: Mutex::new(sampler),
            metrics,
            score_file: score_file.into(),
        }
    }
}

/// Liveness probe
async fn healthz() -> &'static str {
    "ok"
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.sampler.lock().await.sample();
    let score = read_score(&state.score_file);
    state.metrics.update(&snapshot, score);

    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(event = "encode_failed", error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server and run until SIGINT or SIGTERM
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(event = "server_started", addr = %addr, "Starting metrics exporter");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(event = "server_stopped", "Metrics exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(event = "shutdown", signal = "SIGINT", "Shutting down gracefully"),
        _ = terminate => info!(event = "shutdown", signal = "SIGTERM", "Shutting down gracefully"),
    }
}
