//! Score publication
//!
//! The anomaly score is written as a fixed-precision decimal string to a
//! single-value file that the metrics exporter republishes as a gauge.

use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Human-readable classification of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Normal,
    Anomalous,
}

impl Verdict {
    /// Scores strictly above `threshold` are anomalous
    pub fn classify(score: f64, threshold: f64) -> Self {
        if score > threshold {
            Verdict::Anomalous
        } else {
            Verdict::Normal
        }
    }

    pub fn is_anomalous(&self) -> bool {
        matches!(self, Verdict::Anomalous)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Normal => write!(f, "normal"),
            Verdict::Anomalous => write!(f, "anomalous"),
        }
    }
}

/// Round to `digits` decimal places
pub fn round_score(score: f64, digits: usize) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (score * factor).round() / factor
}

/// Durable single-value slot holding the latest score
#[derive(Debug, Clone)]
pub struct ScoreSlot {
    path: PathBuf,
    precision: usize,
}

impl ScoreSlot {
    pub fn new(path: impl Into<PathBuf>, precision: usize) -> Self {
        Self {
            path: path.into(),
            precision,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Text written for `score`, e.g. `0.0500`
    pub fn render(&self, score: f64) -> String {
        format!(
            "{:.*}",
            self.precision,
            round_score(score, self.precision)
        )
    }

    /// Atomically overwrite the slot; returns the text written
    pub fn write(&self, score: f64) -> Result<String> {
        let text = self.render(score);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DetectorError::io(parent, e))?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| DetectorError::io(&temp_path, e))?;
        file.write_all(text.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| DetectorError::io(&temp_path, e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| DetectorError::io(&self.path, e))?;

        debug!(path = %self.path.display(), score = %text, "Score published");
        Ok(text)
    }

    pub fn read(&self) -> f64 {
        read_score(&self.path)
    }
}

/// Read a published score; absent, unparsable or non-finite slots read as 0.0
pub fn read_score(path: impl AsRef<Path>) -> f64 {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| content.trim().parse::<f64>().ok())
        .filter(|score| score.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_threshold_boundary() {
        assert_eq!(Verdict::classify(0.5, 0.5), Verdict::Normal);
        assert_eq!(Verdict::classify(0.5000001, 0.5), Verdict::Anomalous);
        assert_eq!(Verdict::classify(0.0, 0.5), Verdict::Normal);
        assert_eq!(Verdict::classify(1.0, 0.5), Verdict::Anomalous);
    }

    #[test]
    fn test_render_rounds_to_precision() {
        let slot = ScoreSlot::new("unused", 4);
        assert_eq!(slot.render(0.05), "0.0500");
        assert_eq!(slot.render(0.123456), "0.1235");
        assert_eq!(slot.render(0.0), "0.0000");
        assert_eq!(slot.render(1.0), "1.0000");
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let slot = ScoreSlot::new(dir.path().join("aiops").join("anomaly_score.txt"), 4);

        assert_eq!(slot.write(0.1).unwrap(), "0.1000");
        assert_eq!(std::fs::read_to_string(slot.path()).unwrap(), "0.1000");
        assert_eq!(slot.read(), 0.1);

        slot.write(0.25).unwrap();
        assert_eq!(slot.read(), 0.25);
    }

    #[test]
    fn test_read_defaults_to_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("anomaly_score.txt");
        assert_eq!(read_score(&path), 0.0);

        std::fs::write(&path, "not-a-number").unwrap();
        assert_eq!(read_score(&path), 0.0);

        std::fs::write(&path, "NaN").unwrap();
        assert_eq!(read_score(&path), 0.0);

        std::fs::write(&path, " 0.3 \n").unwrap();
        assert_eq!(read_score(&path), 0.3);
    }

    #[test]
    fn test_write_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let slot = ScoreSlot::new(blocker.join("score.txt"), 4);
        assert!(slot.write(0.5).is_err());
    }
}
