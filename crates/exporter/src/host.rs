//! Host sampling
//!
//! CPU usage and receive throughput are deltas since the previous sample,
//! so the probe is long-lived and sampled once per scrape.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use sysinfo::{Disks, Networks, System};

/// Socket tables counted for `system_network_connections`
const SOCKET_TABLES: [&str; 4] = ["tcp", "tcp6", "udp", "udp6"];

/// One reading of every exported host gauge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostSnapshot {
    pub load_1m: f64,
    pub load_5m: f64,
    pub load_15m: f64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub process_count: u64,
    pub network_rx_bytes_per_second: f64,
    pub network_connections: u64,
}

/// Source of host snapshots
pub trait HostSampler: Send {
    fn sample(&mut self) -> HostSnapshot;
}

/// Live probe backed by `sysinfo`
pub struct HostProbe {
    system: System,
    disks: Disks,
    networks: Networks,
    proc_net: PathBuf,
    last_rx: Option<(u64, Instant)>,
}

impl HostProbe {
    pub fn new(proc_root: impl AsRef<Path>) -> Self {
        let mut system = System::new();
        system.refresh_cpu();

        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            proc_net: proc_root.as_ref().join("net"),
            last_rx: None,
        }
    }

    fn total_received(&self) -> u64 {
        self.networks
            .iter()
            .map(|(_name, data)| data.total_received())
            .sum()
    }

    /// Bytes per second received across all interfaces since the last call
    fn receive_rate(&mut self) -> f64 {
        self.networks.refresh();
        let total = self.total_received();
        let now = Instant::now();

        let rate = match self.last_rx {
            Some((previous, at)) => {
                let elapsed = now.duration_since(at).as_secs_f64();
                if elapsed > 0.0 {
                    total.saturating_sub(previous) as f64 / elapsed
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        self.last_rx = Some((total, now));
        rate
    }

    fn root_disk_percent(&mut self) -> f64 {
        self.disks.refresh();
        self.disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == Path::new("/"))
            .map(|disk| used_percent(disk.total_space(), disk.available_space()))
            .unwrap_or(0.0)
    }
}

impl HostSampler for HostProbe {
    fn sample(&mut self) -> HostSnapshot {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.system.refresh_processes();

        let load = System::load_average();

        HostSnapshot {
            load_1m: load.one,
            load_5m: load.five,
            load_15m: load.fifteen,
            cpu_percent: self.system.global_cpu_info().cpu_usage() as f64,
            memory_percent: used_percent(
                self.system.total_memory(),
                self.system.available_memory(),
            ),
            disk_percent: self.root_disk_percent(),
            process_count: self.system.processes().len() as u64,
            network_rx_bytes_per_second: self.receive_rate(),
            network_connections: count_sockets(&self.proc_net),
        }
    }
}

/// `(1 - available / total) * 100`, or 0 for an empty total
pub fn used_percent(total: u64, available: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (1.0 - available.min(total) as f64 / total as f64) * 100.0
}

/// Number of sockets listed under `proc_net`; absent tables count as empty
pub fn count_sockets(proc_net: &Path) -> u64 {
    SOCKET_TABLES
        .iter()
        .filter_map(|table| fs::read_to_string(proc_net.join(table)).ok())
        .map(|content| {
            content
                .lines()
                .skip(1)
                .filter(|line| !line.trim().is_empty())
                .count() as u64
        })
        .sum()
}
