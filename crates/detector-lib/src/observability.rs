//! Structured logging for detector cycles
//!
//! Every completed cycle emits one `cycle_completed` record carrying the
//! timestamp, score and raw metric values; anomalous verdicts are repeated
//! at warn level.

use crate::models::{MetricSample, TrackedMetric};
use crate::publisher::Verdict;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Structured logger for detector events
#[derive(Clone)]
pub struct CycleLogger {
    host: String,
}

impl CycleLogger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Log the start of a scoring cycle
    pub fn log_cycle_started(&self, history_len: usize) {
        info!(
            event = "cycle_started",
            host = %self.host,
            history_len = history_len,
            "Starting anomaly detection"
        );
    }

    /// Log a cycle skipped because some metrics did not resolve
    pub fn log_cycle_skipped(&self, missing: &[TrackedMetric]) {
        let missing: Vec<&str> = missing.iter().map(|m| m.name()).collect();
        warn!(
            event = "cycle_skipped",
            host = %self.host,
            missing = ?missing,
            "Some metrics could not be collected, skipping this cycle"
        );
    }

    /// Log the audit record of a completed cycle and its verdict
    pub fn log_cycle_completed(
        &self,
        timestamp: DateTime<Utc>,
        score: f64,
        verdict: Verdict,
        sample: &MetricSample,
        scored_rows: usize,
    ) {
        info!(
            event = "cycle_completed",
            host = %self.host,
            timestamp = %timestamp.to_rfc3339(),
            anomaly_score = score,
            scored_rows = scored_rows,
            metrics = %sample.to_json(),
            "Anomaly detection completed"
        );

        match verdict {
            Verdict::Anomalous => {
                warn!(
                    event = "anomaly_detected",
                    host = %self.host,
                    anomaly_score = score,
                    "Anomaly detected (score={:.2})",
                    score
                );
            }
            Verdict::Normal => {
                info!(
                    event = "system_normal",
                    host = %self.host,
                    anomaly_score = score,
                    "System operating normally"
                );
            }
        }
    }

    /// Log synthetic samples appended to the history
    pub fn log_samples_generated(&self, appended: usize, history_len: usize) {
        info!(
            event = "samples_generated",
            host = %self.host,
            appended = appended,
            history_len = history_len,
            "Synthetic samples appended to history"
        );
    }
}
