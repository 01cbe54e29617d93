//! Engine configuration

use serde::Deserialize;
use std::time::Duration;

/// Immutable tuning for one engine instance
///
/// Deserialized from the `engine` section of the detector settings; every
/// field falls back to the documented default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of samples kept in the history window
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Minimum complete samples before the window is scored
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Expected fraction of outliers in a typical window
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    /// Seed for the isolation forest random source
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Scores strictly above this value are reported as anomalous
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold: f64,

    /// Number of trees in the ensemble
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    /// Upper bound on rows drawn for each tree
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    /// Decimal digits written to the score slot
    #[serde(default = "default_score_precision")]
    pub score_precision: usize,

    /// Age after which a history lock file is treated as abandoned
    #[serde(default = "default_lock_stale_secs")]
    pub lock_stale_secs: u64,
}

fn default_max_history() -> usize {
    200
}

fn default_min_samples() -> usize {
    10
}

fn default_contamination() -> f64 {
    0.1
}

fn default_seed() -> u64 {
    42
}

fn default_anomaly_threshold() -> f64 {
    0.5
}

fn default_n_estimators() -> usize {
    100
}

fn default_max_samples() -> usize {
    256
}

fn default_score_precision() -> usize {
    4
}

fn default_lock_stale_secs() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            min_samples: default_min_samples(),
            contamination: default_contamination(),
            seed: default_seed(),
            anomaly_threshold: default_anomaly_threshold(),
            n_estimators: default_n_estimators(),
            max_samples: default_max_samples(),
            score_precision: default_score_precision(),
            lock_stale_secs: default_lock_stale_secs(),
        }
    }
}

impl EngineConfig {
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.lock_stale_secs)
    }

    /// Reject settings the engine cannot operate with
    pub fn validate(&self) -> crate::Result<()> {
        use crate::DetectorError::InvalidConfig;

        if self.max_history == 0 {
            return Err(InvalidConfig("max_history must be positive".into()));
        }
        if self.min_samples < 2 {
            return Err(InvalidConfig("min_samples must be at least 2".into()));
        }
        if !(0.0..=0.5).contains(&self.contamination) || self.contamination == 0.0 {
            return Err(InvalidConfig(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        if self.n_estimators == 0 {
            return Err(InvalidConfig("n_estimators must be positive".into()));
        }
        if self.max_samples < 2 {
            return Err(InvalidConfig("max_samples must be at least 2".into()));
        }
        Ok(())
    }
}
