//! Anomaly scoring for host metric windows
//!
//! This module provides:
//! - Feature matrix extraction and standardization (zero mean, unit variance)
//! - A seeded isolation forest ensemble
//! - Contamination-calibrated outlier labelling and the window-level ratio

mod features;
mod isolation_forest;
mod scorer;

pub use features::{FeatureMatrix, StandardScaler};
pub use isolation_forest::{average_path_length, IsolationForest, IsolationTree};
pub use scorer::{AnomalyScorer, ScoreBreakdown};
