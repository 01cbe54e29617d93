//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use detector_lib::{MetricSample, TrackedMetric, Verdict};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// One history row as shown by `history`
#[derive(Debug, Serialize, Tabled)]
pub struct HistoryRow {
    #[tabled(rename = "TIMESTAMP")]
    pub timestamp: String,
    #[tabled(rename = "CPU %")]
    pub cpu_usage: String,
    #[tabled(rename = "MEMORY %")]
    pub memory_usage: String,
    #[tabled(rename = "DISK %")]
    pub disk_usage: String,
    #[tabled(rename = "NET RX")]
    pub network_rx: String,
}

impl From<&MetricSample> for HistoryRow {
    fn from(sample: &MetricSample) -> Self {
        let cell = |metric| format_value(sample.get(metric));
        Self {
            timestamp: sample.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            cpu_usage: cell(TrackedMetric::CpuUsage),
            memory_usage: cell(TrackedMetric::MemoryUsage),
            disk_usage: cell(TrackedMetric::DiskUsage),
            network_rx: cell(TrackedMetric::NetworkRx),
        }
    }
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No samples recorded".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

fn format_value(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}", value)
    } else {
        "-".to_string()
    }
}

/// Color a score by verdict
pub fn color_score(score: &str, verdict: Verdict) -> String {
    match verdict {
        Verdict::Anomalous => score.red().bold().to_string(),
        Verdict::Normal => score.green().to_string(),
    }
}
