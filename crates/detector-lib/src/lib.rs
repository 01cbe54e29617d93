//! Detector library for host anomaly scoring
//!
//! This crate provides the core functionality for:
//! - Bounded, CSV-persisted history of host metric samples
//! - Feature standardization and isolation-forest outlier scoring
//! - Publishing the anomaly score to a durable slot
//! - Metric acquisition from Prometheus, exporters or a synthetic generator

pub mod anomaly;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod models;
pub mod observability;
pub mod publisher;

pub use config::EngineConfig;
pub use engine::{AnomalyEngine, CycleOutcome, CycleReport};
pub use error::{DetectorError, Result};
pub use models::*;
pub use observability::CycleLogger;
pub use publisher::{read_score, ScoreSlot, Verdict};
