//! Metrics exporter for the anomaly detector
//!
//! Serves host gauges and the detector's published anomaly score in the
//! Prometheus text exposition format.

pub mod api;
pub mod config;
pub mod host;
pub mod metrics;

pub use api::{create_router, serve, AppState};
pub use config::ExporterConfig;
pub use host::{HostProbe, HostSampler, HostSnapshot};
pub use metrics::ExporterMetrics;
