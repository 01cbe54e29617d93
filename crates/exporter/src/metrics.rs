//! Exported gauges
//!
//! Each exporter owns its registry so several instances can coexist in one
//! process.

use crate::host::HostSnapshot;
use prometheus::{Encoder, Gauge, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,
    load_1m: Gauge,
    load_5m: Gauge,
    load_15m: Gauge,
    cpu_usage_percent: Gauge,
    memory_usage_percent: Gauge,
    disk_usage_percent: Gauge,
    process_count: IntGauge,
    network_connections: IntGauge,
    network_rx_bytes_per_second: Gauge,
    anomaly_score: Gauge,
}

impl ExporterMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let gauge = |name: &str, help: &str| -> prometheus::Result<Gauge> {
            let gauge = Gauge::new(name, help)?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };
        let int_gauge = |name: &str, help: &str| -> prometheus::Result<IntGauge> {
            let gauge = IntGauge::new(name, help)?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };

        Ok(Self {
            load_1m: gauge("system_load_average_1m", "System load average over 1 minute")?,
            load_5m: gauge("system_load_average_5m", "System load average over 5 minutes")?,
            load_15m: gauge("system_load_average_15m", "System load average over 15 minutes")?,
            cpu_usage_percent: gauge("cpu_usage_percent", "CPU usage percent")?,
            memory_usage_percent: gauge("memory_usage_percent", "Memory usage percent")?,
            disk_usage_percent: gauge("disk_usage_percent", "Root filesystem usage percent")?,
            process_count: int_gauge("system_process_count", "Process count")?,
            network_connections: int_gauge(
                "system_network_connections",
                "Active network connections",
            )?,
            network_rx_bytes_per_second: gauge(
                "network_receive_bytes_per_second",
                "Bytes received per second across all interfaces",
            )?,
            anomaly_score: gauge("aiops_anomaly_score", "AIOps anomaly score (0-1)")?,
            registry,
        })
    }

    pub fn update(&self, snapshot: &HostSnapshot, anomaly_score: f64) {
        self.load_1m.set(snapshot.load_1m);
        self.load_5m.set(snapshot.load_5m);
        self.load_15m.set(snapshot.load_15m);
        self.cpu_usage_percent.set(snapshot.cpu_percent);
        self.memory_usage_percent.set(snapshot.memory_percent);
        self.disk_usage_percent.set(snapshot.disk_percent);
        self.process_count
            .set(i64::try_from(snapshot.process_count).unwrap_or(i64::MAX));
        self.network_connections
            .set(i64::try_from(snapshot.network_connections).unwrap_or(i64::MAX));
        self.network_rx_bytes_per_second
            .set(snapshot.network_rx_bytes_per_second);
        self.anomaly_score.set(anomaly_score);
    }

    /// Render the registry in text exposition format
    pub fn encode(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
