//! Metric acquisition
//!
//! Sources resolve one value per tracked metric. A metric that cannot be
//! resolved is reported as NaN rather than as an error, so the engine's
//! admission guard decides uniformly whether the cycle is skipped.

mod exposition;
mod prometheus;
mod synthetic;

#[cfg(test)]
mod tests;

pub use exposition::{exporter_series, parse_exposition, sample_from_series, ExpositionSource};
pub use prometheus::{parse_query_response, promql_query, PrometheusSource};
pub use synthetic::{SampleProfile, SyntheticSource};

use crate::models::MetricSample;

pub use async_trait::async_trait;

/// Trait for metric acquisition implementations
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Acquire one sample; unresolved metrics are NaN
    async fn get_sample(&self) -> MetricSample;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;
}
