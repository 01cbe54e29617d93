//! CSV persistence for the history window
//!
//! The whole window is rewritten on every persist via a temp file and a
//! rename, so readers never observe a partially written history.

use super::HistoryWindow;
use crate::error::{DetectorError, Result};
use crate::models::{MetricSample, TrackedMetric};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Header row of the history file
pub const HISTORY_HEADER: [&str; TrackedMetric::COUNT + 1] = [
    "cpu_usage",
    "memory_usage",
    "disk_usage",
    "network_rx",
    "timestamp",
];

const TIMESTAMP_COLUMN: &str = "timestamp";

/// Durable history location
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Take the single-writer lock guarding load → append → persist
    pub fn lock(&self, stale_after: Duration) -> Result<HistoryLock> {
        HistoryLock::acquire(self.lock_path(), stale_after)
    }

    /// Load the stored window, or an empty one when no history exists yet
    pub fn load(&self, capacity: usize) -> Result<HistoryWindow> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No history file, starting empty window");
                return Ok(HistoryWindow::new(capacity));
            }
            Err(e) => return Err(DetectorError::io(&self.path, e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader.headers().map_err(|e| self.csv_error(e))?.clone();
        let metric_columns =
            TrackedMetric::ALL.map(|m| headers.iter().position(|h| h == m.name()));
        let timestamp_column = headers.iter().position(|h| h == TIMESTAMP_COLUMN);

        for (metric, column) in TrackedMetric::ALL.iter().zip(metric_columns.iter()) {
            if column.is_none() {
                warn!(path = %self.path.display(), metric = %metric, "History file lacks metric column");
            }
        }

        let mut samples = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| self.csv_error(e))?;

            let values = metric_columns.map(|column| {
                column
                    .and_then(|i| record.get(i))
                    .map(parse_value)
                    .unwrap_or(f64::NAN)
            });
            let raw_ts = timestamp_column.and_then(|i| record.get(i)).unwrap_or("");
            let timestamp = parse_timestamp(raw_ts)?;

            samples.push(MetricSample::new(timestamp, values));
        }

        let stored = samples.len();
        let window = HistoryWindow::from_samples(samples, capacity);
        if stored > window.len() {
            info!(
                path = %self.path.display(),
                stored,
                kept = window.len(),
                "History file exceeded capacity, kept newest samples"
            );
        }
        Ok(window)
    }

    /// Overwrite the stored history with the full window
    pub fn persist(&self, window: &HistoryWindow) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DetectorError::io(parent, e))?;
        }

        let temp_path = self.path.with_extension("tmp");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| DetectorError::io(&temp_path, e))?;

        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(HISTORY_HEADER)
            .map_err(|e| self.csv_error(e))?;

        for sample in window.iter() {
            let mut row: Vec<String> = sample.values.iter().map(|v| v.to_string()).collect();
            row.push(sample.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true));
            writer.write_record(&row).map_err(|e| self.csv_error(e))?;
        }

        let file = writer
            .into_inner()
            .map_err(|e| DetectorError::io(&temp_path, e.into_error()))?;
        file.sync_all()
            .map_err(|e| DetectorError::io(&temp_path, e))?;

        fs::rename(&temp_path, &self.path).map_err(|e| DetectorError::io(&self.path, e))?;

        debug!(path = %self.path.display(), entries = window.len(), "History persisted");
        Ok(())
    }

    fn csv_error(&self, source: csv::Error) -> DetectorError {
        DetectorError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

/// Empty or unparsable cells load as NaN and are excluded from scoring
fn parse_value(raw: &str) -> f64 {
    raw.parse::<f64>().unwrap_or(f64::NAN)
}

/// Accepts RFC 3339 and the naive `YYYY-MM-DD HH:MM:SS[.f]` layout (read as UTC)
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DetectorError::Timestamp {
            value: raw.to_string(),
        })
}

/// Advisory lock file; removed when dropped
#[derive(Debug)]
pub struct HistoryLock {
    path: PathBuf,
}

impl HistoryLock {
    fn acquire(path: PathBuf, stale_after: Duration) -> Result<Self> {
        match Self::create(&path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !Self::is_stale(&path, stale_after) {
                    return Err(DetectorError::Locked { path });
                }
                warn!(path = %path.display(), "Taking over abandoned history lock");
                fs::remove_file(&path).map_err(|e| DetectorError::io(&path, e))?;
                Self::create(&path).map_err(|e| match e.kind() {
                    ErrorKind::AlreadyExists => DetectorError::Locked { path: path.clone() },
                    _ => DetectorError::io(&path, e),
                })
            }
            Err(e) => Err(DetectorError::io(&path, e)),
        }
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn is_stale(path: &Path, stale_after: Duration) -> bool {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .map(|age| age >= stale_after)
            .unwrap_or(false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for HistoryLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release history lock");
        }
    }
}
