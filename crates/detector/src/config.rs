//! Detector configuration

use anyhow::{Context, Result};
use clap::ValueEnum;
use detector_lib::EngineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where samples are acquired from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Prometheus instant queries
    #[default]
    Prometheus,
    /// Scrape of the metrics exporter
    Exposition,
    /// Seeded generator, for local testing
    Synthetic,
}

/// Detector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Host label attached to structured records
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,

    #[serde(default = "default_score_file")]
    pub score_file: PathBuf,

    #[serde(default)]
    pub source: SourceKind,

    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,

    #[serde(default = "default_metrics_url")]
    pub metrics_url: String,

    /// Acquisition HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Chance that the synthetic source emits an anomalous sample
    #[serde(default = "default_synthetic_anomaly_rate")]
    pub synthetic_anomaly_rate: f64,

    /// Seed for the synthetic source; defaults to the current time
    #[serde(default)]
    pub synthetic_seed: Option<u64>,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_host() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn default_history_file() -> PathBuf {
    PathBuf::from("/opt/monitoring/aiops/metrics_history.csv")
}

fn default_score_file() -> PathBuf {
    PathBuf::from("/opt/monitoring/aiops/anomaly_score.txt")
}

fn default_prometheus_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_metrics_url() -> String {
    "http://localhost:8000/metrics".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_synthetic_anomaly_rate() -> f64 {
    0.05
}

impl DetectorConfig {
    /// Load configuration from an optional file and `AIOPS_*` environment variables
    ///
    /// Nested keys use `__`, e.g. `AIOPS_ENGINE__MAX_HISTORY=500`.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("AIOPS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read detector configuration")?;

        let config: DetectorConfig = config
            .try_deserialize()
            .context("Failed to parse detector configuration")?;

        config.engine.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Seed for the synthetic source
    pub fn synthetic_seed(&self) -> u64 {
        self.synthetic_seed
            .unwrap_or_else(|| chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0) as u64)
    }
}
