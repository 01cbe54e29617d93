//! Error types for the detector library

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DetectorError>;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed history file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid timestamp {value:?} in history file")]
    Timestamp { value: String },

    #[error("history is locked by another writer ({path})")]
    Locked { path: PathBuf },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("metric acquisition failed: {0}")]
    Acquisition(String),
}

impl DetectorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DetectorError::Io {
            path: path.into(),
            source,
        }
    }
}
