//! Detection cycle orchestration
//!
//! One cycle runs load → append → persist → score → publish under the
//! history lock. The window is persisted before scoring, so a failure while
//! scoring or publishing leaves the appended sample in place without an
//! updated score.

use crate::anomaly::{AnomalyScorer, FeatureMatrix, ScoreBreakdown};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::history::{Admission, HistoryStore, HistoryWindow};
use crate::models::{MetricSample, TrackedMetric};
use crate::observability::CycleLogger;
use crate::publisher::{ScoreSlot, Verdict};
use chrono::{DateTime, Utc};

/// Summary of a completed cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    /// Unrounded outlier fraction
    pub score: f64,
    /// Text written to the score slot
    pub published: String,
    pub verdict: Verdict,
    pub sample: MetricSample,
    pub history_len: usize,
    pub evicted: usize,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// Sample had unresolved metrics; nothing was appended or scored
    Skipped { missing: Vec<TrackedMetric> },
    Completed(CycleReport),
}

/// Result of appending a batch of samples without scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendSummary {
    pub appended: usize,
    pub rejected: usize,
    pub history_len: usize,
}

/// Single-owner engine over one history file and one score slot
pub struct AnomalyEngine {
    config: EngineConfig,
    store: HistoryStore,
    slot: ScoreSlot,
    scorer: AnomalyScorer,
    logger: CycleLogger,
}

impl AnomalyEngine {
    pub fn new(
        config: EngineConfig,
        store: HistoryStore,
        slot: ScoreSlot,
        logger: CycleLogger,
    ) -> Result<Self> {
        config.validate()?;
        let scorer = AnomalyScorer::from_config(&config);
        Ok(Self {
            config,
            store,
            slot,
            scorer,
            logger,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn slot(&self) -> &ScoreSlot {
        &self.slot
    }

    /// Current persisted window
    pub fn load_history(&self) -> Result<HistoryWindow> {
        self.store.load(self.config.max_history)
    }

    /// Outlier fraction of the complete samples in `window`
    pub fn detect_anomalies(&self, window: &HistoryWindow) -> f64 {
        self.scorer.score_window(window)
    }

    /// Run one detection cycle for a freshly acquired sample
    pub fn run_cycle(&self, sample: MetricSample) -> Result<CycleOutcome> {
        let _lock = self.store.lock(self.config.lock_stale_after())?;
        let mut window = self.load_history()?;
        self.logger.log_cycle_started(window.len());

        let evicted = match window.append(sample.clone()) {
            Admission::Admitted { evicted } => evicted,
            Admission::Rejected { missing } => {
                self.logger.log_cycle_skipped(&missing);
                return Ok(CycleOutcome::Skipped { missing });
            }
        };

        self.store.persist(&window)?;

        let breakdown = self.scorer.evaluate(&FeatureMatrix::from_window(&window));
        let score = breakdown.ratio;
        let published = self.slot.write(score)?;
        let verdict = Verdict::classify(score, self.config.anomaly_threshold);

        let timestamp = Utc::now();
        self.logger
            .log_cycle_completed(timestamp, score, verdict, &sample, breakdown.rows);

        Ok(CycleOutcome::Completed(CycleReport {
            timestamp,
            score,
            published,
            verdict,
            sample,
            history_len: window.len(),
            evicted,
            breakdown,
        }))
    }

    /// Append samples to the history without scoring (used to seed test data)
    pub fn append_samples(
        &self,
        samples: impl IntoIterator<Item = MetricSample>,
    ) -> Result<AppendSummary> {
        let _lock = self.store.lock(self.config.lock_stale_after())?;
        let mut window = self.load_history()?;

        let mut appended = 0;
        let mut rejected = 0;
        for sample in samples {
            if window.append(sample).is_admitted() {
                appended += 1;
            } else {
                rejected += 1;
            }
        }

        self.store.persist(&window)?;
        self.logger.log_samples_generated(appended, window.len());

        Ok(AppendSummary {
            appended,
            rejected,
            history_len: window.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine(dir: &TempDir, config: EngineConfig) -> AnomalyEngine {
        AnomalyEngine::new(
            config,
            HistoryStore::new(dir.path().join("metrics_history.csv")),
            ScoreSlot::new(dir.path().join("anomaly_score.txt"), 4),
            CycleLogger::new("test-host"),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let result = AnomalyEngine::new(
            EngineConfig::default().with_max_history(0),
            HistoryStore::new(dir.path().join("h.csv")),
            ScoreSlot::new(dir.path().join("s.txt"), 4),
            CycleLogger::new("test-host"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_skipped_cycle_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, EngineConfig::default());

        let mut sample = MetricSample::now([30.0, 50.0, 40.0, 50.0]);
        sample.set(TrackedMetric::NetworkRx, f64::NAN);

        match engine.run_cycle(sample).unwrap() {
            CycleOutcome::Skipped { missing } => {
                assert_eq!(missing, vec![TrackedMetric::NetworkRx])
            }
            other => panic!("expected skip, got {:?}", other),
        }
        assert!(!engine.store().path().exists());
        assert!(!engine.slot().path().exists());
    }

    #[test]
    fn test_first_cycles_publish_zero() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, EngineConfig::default());

        for i in 0..3 {
            let outcome = engine
                .run_cycle(MetricSample::now([30.0 + i as f64, 50.0, 40.0, 50.0]))
                .unwrap();
            let CycleOutcome::Completed(report) = outcome else {
                panic!("cycle should complete");
            };
            assert_eq!(report.score, 0.0);
            assert_eq!(report.published, "0.0000");
            assert_eq!(report.verdict, Verdict::Normal);
            assert_eq!(report.history_len, i + 1);
        }
        assert_eq!(engine.slot().read(), 0.0);
    }

    #[test]
    fn test_cycle_over_seeded_history_flags_outliers() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, EngineConfig::default());

        engine
            .append_samples(crate::collector::SyntheticSource::series(50, 42))
            .unwrap();
        let outcome = engine
            .run_cycle(MetricSample::now([97.0, 99.0, 95.0, 100.0]))
            .unwrap();
        let CycleOutcome::Completed(report) = outcome else {
            panic!("cycle should complete");
        };

        assert_eq!(report.history_len, 51);
        assert_eq!(report.breakdown.rows, 51);
        assert!(report.score > 0.0 && report.score <= 0.5);
        assert_eq!(report.verdict, Verdict::Normal);

        let window = engine.load_history().unwrap();
        assert_eq!(engine.detect_anomalies(&window), report.score);
        assert_eq!(engine.slot().read(), report.published.parse::<f64>().unwrap());
    }

    #[test]
    fn test_lock_released_after_cycle() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, EngineConfig::default());

        engine
            .run_cycle(MetricSample::now([30.0, 50.0, 40.0, 50.0]))
            .unwrap();
        assert!(engine
            .store()
            .lock(engine.config().lock_stale_after())
            .is_ok());
    }

    #[test]
    fn test_append_samples_counts_rejections() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, EngineConfig::default().with_max_history(5));

        let mut samples: Vec<MetricSample> = (0..8)
            .map(|i| MetricSample::now([i as f64, 1.0, 2.0, 3.0]))
            .collect();
        samples[1].values[0] = f64::NAN;

        let summary = engine.append_samples(samples).unwrap();
        assert_eq!(
            summary,
            AppendSummary {
                appended: 7,
                rejected: 1,
                history_len: 5,
            }
        );
        assert_eq!(engine.load_history().unwrap().len(), 5);
    }
}
