//! Core data models for the detector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host metrics tracked by the detector, in feature-column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedMetric {
    CpuUsage,
    MemoryUsage,
    DiskUsage,
    NetworkRx,
}

impl TrackedMetric {
    /// Number of tracked metrics (feature columns)
    pub const COUNT: usize = 4;

    /// All tracked metrics in column order
    pub const ALL: [TrackedMetric; Self::COUNT] = [
        TrackedMetric::CpuUsage,
        TrackedMetric::MemoryUsage,
        TrackedMetric::DiskUsage,
        TrackedMetric::NetworkRx,
    ];

    /// Column name used in the history file and structured logs
    pub fn name(self) -> &'static str {
        match self {
            TrackedMetric::CpuUsage => "cpu_usage",
            TrackedMetric::MemoryUsage => "memory_usage",
            TrackedMetric::DiskUsage => "disk_usage",
            TrackedMetric::NetworkRx => "network_rx",
        }
    }

    /// Column index in a feature row
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl fmt::Display for TrackedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One timestamped observation of every tracked metric
///
/// Unresolved metrics are carried as NaN so that the admission guard of
/// the history window can reject the sample uniformly.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub values: [f64; TrackedMetric::COUNT],
}

impl MetricSample {
    pub fn new(timestamp: DateTime<Utc>, values: [f64; TrackedMetric::COUNT]) -> Self {
        Self { timestamp, values }
    }

    /// Sample captured now
    pub fn now(values: [f64; TrackedMetric::COUNT]) -> Self {
        Self::new(Utc::now(), values)
    }

    /// Sample with every metric unresolved
    pub fn unresolved(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, [f64::NAN; TrackedMetric::COUNT])
    }

    pub fn get(&self, metric: TrackedMetric) -> f64 {
        self.values[metric.index()]
    }

    pub fn set(&mut self, metric: TrackedMetric, value: f64) {
        self.values[metric.index()] = value;
    }

    /// True when every tracked value is a finite number
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Metrics whose value is missing or not finite
    pub fn missing_metrics(&self) -> Vec<TrackedMetric> {
        TrackedMetric::ALL
            .into_iter()
            .filter(|m| !self.get(*m).is_finite())
            .collect()
    }

    /// Metric values keyed by column name, for structured records
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = TrackedMetric::ALL
            .into_iter()
            .map(|m| (m.name().to_string(), serde_json::json!(self.get(m))))
            .collect();
        serde_json::Value::Object(map)
    }
}
