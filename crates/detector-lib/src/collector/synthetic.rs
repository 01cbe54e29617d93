//! Seeded synthetic samples
//!
//! Normal samples cluster around a moderate load profile; anomalous ones sit
//! near saturation. Every value is clamped to `[0, 100]`.

use super::{async_trait, SampleSource};
use crate::models::{MetricSample, TrackedMetric};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use tokio::sync::Mutex;

/// Share of a generated series drawn from the normal profile
const NORMAL_SHARE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleProfile {
    Normal,
    Anomalous,
}

impl SampleProfile {
    /// (mean, standard deviation) for a metric under this profile
    pub fn parameters(&self, metric: TrackedMetric) -> (f64, f64) {
        match (self, metric) {
            (SampleProfile::Normal, TrackedMetric::CpuUsage) => (30.0, 10.0),
            (SampleProfile::Normal, TrackedMetric::MemoryUsage) => (50.0, 15.0),
            (SampleProfile::Normal, TrackedMetric::DiskUsage) => (40.0, 10.0),
            (SampleProfile::Normal, TrackedMetric::NetworkRx) => (50.0, 20.0),
            (SampleProfile::Anomalous, TrackedMetric::CpuUsage) => (90.0, 5.0),
            (SampleProfile::Anomalous, TrackedMetric::MemoryUsage) => (95.0, 3.0),
            (SampleProfile::Anomalous, TrackedMetric::DiskUsage) => (85.0, 8.0),
            (SampleProfile::Anomalous, TrackedMetric::NetworkRx) => (200.0, 50.0),
        }
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> MetricSample {
        let mut sample = MetricSample::unresolved(chrono::Utc::now());
        for metric in TrackedMetric::ALL {
            let (mean, std_dev) = self.parameters(metric);
            let z: f64 = rng.sample(StandardNormal);
            sample.set(metric, (mean + std_dev * z).clamp(0.0, 100.0));
        }
        sample
    }
}

/// Generator standing in for a live host
pub struct SyntheticSource {
    rng: Mutex<ChaCha8Rng>,
    anomaly_rate: f64,
}

impl SyntheticSource {
    pub fn new(seed: u64, anomaly_rate: f64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            anomaly_rate: anomaly_rate.clamp(0.0, 1.0),
        }
    }

    pub fn anomaly_rate(&self) -> f64 {
        self.anomaly_rate
    }

    /// Profile of the `index`-th sample in a series of `count`
    pub fn series_profile(index: usize, count: usize) -> SampleProfile {
        if (index as f64) < count as f64 * NORMAL_SHARE {
            SampleProfile::Normal
        } else {
            SampleProfile::Anomalous
        }
    }

    /// Test series: the first 80% normal, the rest anomalous
    pub fn series(count: usize, seed: u64) -> Vec<MetricSample> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..count)
            .map(|i| Self::series_profile(i, count).draw(&mut rng))
            .collect()
    }
}

#[async_trait]
impl SampleSource for SyntheticSource {
    async fn get_sample(&self) -> MetricSample {
        let mut rng = self.rng.lock().await;
        let profile = if rng.gen_bool(self.anomaly_rate) {
            SampleProfile::Anomalous
        } else {
            SampleProfile::Normal
        };
        profile.draw(&mut *rng)
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
