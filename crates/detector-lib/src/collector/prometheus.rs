//! Prometheus instant-query source
//!
//! Resolves each tracked metric with a fixed PromQL expression against
//! `<base_url>/api/v1/query` and reads `data.result[0].value[1]`.

use super::{async_trait, SampleSource};
use crate::error::{DetectorError, Result};
use crate::models::{MetricSample, TrackedMetric};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// PromQL expression for a tracked metric (node_exporter series)
pub fn promql_query(metric: TrackedMetric) -> &'static str {
    match metric {
        TrackedMetric::CpuUsage => {
            r#"100 - (avg by (instance) (rate(node_cpu_seconds_total{mode="idle"}[5m])) * 100)"#
        }
        TrackedMetric::MemoryUsage => {
            "(1 - (node_memory_MemAvailable_bytes / node_memory_MemTotal_bytes)) * 100"
        }
        TrackedMetric::DiskUsage => {
            r#"(1 - (node_filesystem_avail_bytes{mountpoint="/"} / node_filesystem_size_bytes{mountpoint="/"})) * 100"#
        }
        TrackedMetric::NetworkRx => "rate(node_network_receive_bytes_total[5m])",
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    result: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    value: (f64, String),
}

/// Extract the first instant-vector value from a query API response body
pub fn parse_query_response(body: &str) -> Result<f64> {
    let response: QueryResponse = serde_json::from_str(body)
        .map_err(|e| DetectorError::Acquisition(format!("invalid query response: {}", e)))?;

    if response.status != "success" {
        return Err(DetectorError::Acquisition(format!(
            "query failed: {}",
            response.error.unwrap_or(response.status)
        )));
    }

    let result = response
        .data
        .and_then(|d| d.result.into_iter().next())
        .ok_or_else(|| DetectorError::Acquisition("query returned no series".into()))?;

    result
        .value
        .1
        .parse::<f64>()
        .map_err(|e| DetectorError::Acquisition(format!("invalid sample value: {}", e)))
}

/// Source querying a Prometheus server
pub struct PrometheusSource {
    client: reqwest::Client,
    base_url: String,
}

impl PrometheusSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DetectorError::Acquisition(format!("failed to build client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn query(&self, query: &str) -> Result<f64> {
        let url = format!("{}/api/v1/query", self.base_url);
        let body = self
            .client
            .get(&url)
            .query(&[("query", query)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DetectorError::Acquisition(e.to_string()))?
            .text()
            .await
            .map_err(|e| DetectorError::Acquisition(e.to_string()))?;

        parse_query_response(&body)
    }
}

#[async_trait]
impl SampleSource for PrometheusSource {
    async fn get_sample(&self) -> MetricSample {
        let mut sample = MetricSample::unresolved(chrono::Utc::now());

        for metric in TrackedMetric::ALL {
            let query = promql_query(metric);
            match self.query(query).await {
                Ok(value) => sample.set(metric, value),
                Err(e) => {
                    warn!(metric = %metric, query = %query, error = %e, "Prometheus query failed");
                }
            }
        }

        sample
    }

    fn name(&self) -> &'static str {
        "prometheus"
    }
}
