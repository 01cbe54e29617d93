//! Exporter configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Exporter configuration, read from `AIOPS_EXPORTER_*` variables
#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Score slot written by the detector
    #[serde(default = "default_score_file")]
    pub score_file: PathBuf,

    /// procfs mount used for socket counts
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_score_file() -> PathBuf {
    PathBuf::from("/opt/monitoring/aiops/anomaly_score.txt")
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

impl ExporterConfig {
    /// Load configuration from environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("AIOPS_EXPORTER")
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read exporter configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse exporter configuration")
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
