//! AIOps metrics exporter

use aiops_exporter::{serve, AppState, ExporterConfig, ExporterMetrics, HostProbe};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ExporterConfig::load()?;
    info!(
        event = "startup",
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        score_file = %config.score_file.display(),
        "Exporter configured"
    );

    let metrics = ExporterMetrics::new().context("Failed to register exporter metrics")?;
    let probe = HostProbe::new(&config.proc_root);
    let state = Arc::new(AppState::new(Box::new(probe), metrics, &config.score_file));

    serve(&config.addr(), state).await
}
