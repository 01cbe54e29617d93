//! AIOps anomaly detector
//!
//! Batch binary meant to be triggered externally (cron, systemd timer).
//! Each invocation acquires one host sample, appends it to the bounded
//! history and republishes the anomaly score.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{DetectorConfig, SourceKind};
use output::OutputFormat;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// AIOps anomaly detector
#[derive(Parser)]
#[command(name = "aiops-detector")]
#[command(author, version, about = "Isolation-forest anomaly scoring for host metrics", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON); AIOPS_* variables override it
    #[arg(long, short, env = "AIOPS_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Override the configured metric source
    #[arg(long, short, global = true)]
    pub source: Option<SourceKind>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Acquire one sample and run a detection cycle (default)
    Run,

    /// Append synthetic samples (80% normal, 20% anomalous) without scoring
    Generate {
        /// Number of samples to append
        #[arg(long, short = 'n', default_value_t = 50)]
        iterations: usize,
    },

    /// Show the newest history rows
    History {
        /// Number of rows to show
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,
    },

    /// Show the published anomaly score
    Score,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr so command output on stdout stays parseable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(event = "invocation_failed", error = %format!("{:#}", e), "Detector failed");
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let mut config = DetectorConfig::load(cli.config.as_deref())?;
    if let Some(source) = cli.source {
        config.source = source;
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run(&config, cli.format).await,
        Commands::Generate { iterations } => commands::generate(&config, iterations, cli.format),
        Commands::History { limit } => commands::history(&config, limit, cli.format),
        Commands::Score => commands::score(&config, cli.format),
    }
}
