//! Exporter scrape source
//!
//! Scrapes a text exposition endpoint and maps exporter series onto the
//! tracked metrics through a static table.

use super::{async_trait, SampleSource};
use crate::models::{MetricSample, TrackedMetric};
use crate::error::{DetectorError, Result};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// Exporter series carrying each tracked metric
pub fn exporter_series(metric: TrackedMetric) -> &'static str {
    match metric {
        TrackedMetric::CpuUsage => "cpu_usage_percent",
        TrackedMetric::MemoryUsage => "memory_usage_percent",
        TrackedMetric::DiskUsage => "disk_usage_percent",
        TrackedMetric::NetworkRx => "network_receive_bytes_per_second",
    }
}

/// Parse `name value` lines, skipping comments, blanks and unparsable values
///
/// Labels are kept as part of the series name.
pub fn parse_exposition(text: &str) -> HashMap<String, f64> {
    let mut series = HashMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Split after the label set, if any, so label values may contain spaces
        let split_at = match line.find('}') {
            Some(close) => close + 1,
            None => match line.find(char::is_whitespace) {
                Some(i) => i,
                None => continue,
            },
        };
        let (name, rest) = line.split_at(split_at);

        if let Some(Ok(value)) = rest.split_whitespace().next().map(str::parse::<f64>) {
            series.insert(name.trim().to_string(), value);
        }
    }

    series
}

/// Build a sample from parsed series; absent series stay NaN
pub fn sample_from_series(series: &HashMap<String, f64>) -> MetricSample {
    let mut sample = MetricSample::unresolved(chrono::Utc::now());
    for metric in TrackedMetric::ALL {
        if let Some(value) = series.get(exporter_series(metric)) {
            sample.set(metric, *value);
        }
    }
    sample
}

/// Source scraping the metrics exporter
pub struct ExpositionSource {
    client: reqwest::Client,
    metrics_url: String,
}

impl ExpositionSource {
    pub fn new(metrics_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DetectorError::Acquisition(format!("failed to build client: {}", e)))?;

        Ok(Self {
            client,
            metrics_url: metrics_url.into(),
        })
    }

    async fn scrape(&self) -> Result<String> {
        self.client
            .get(&self.metrics_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DetectorError::Acquisition(e.to_string()))?
            .text()
            .await
            .map_err(|e| DetectorError::Acquisition(e.to_string()))
    }
}

#[async_trait]
impl SampleSource for ExpositionSource {
    async fn get_sample(&self) -> MetricSample {
        match self.scrape().await {
            Ok(body) => {
                let sample = sample_from_series(&parse_exposition(&body));
                for metric in sample.missing_metrics() {
                    warn!(
                        metric = %metric,
                        series = exporter_series(metric),
                        "Series missing from exporter scrape"
                    );
                }
                sample
            }
            Err(e) => {
                warn!(url = %self.metrics_url, error = %e, "Exporter scrape failed");
                MetricSample::unresolved(chrono::Utc::now())
            }
        }
    }

    fn name(&self) -> &'static str {
        "exposition"
    }
}
