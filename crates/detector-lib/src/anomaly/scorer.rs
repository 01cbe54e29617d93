//! Window-level anomaly scoring
//!
//! Fits an isolation forest on the standardized feature matrix, labels the
//! rows whose score lies above the `(1 - contamination)` quantile, and
//! reports the outlier fraction.

use super::{FeatureMatrix, IsolationForest, StandardScaler};
use crate::config::EngineConfig;
use crate::history::HistoryWindow;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Details of one scoring run
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    /// Rows in the feature matrix
    pub rows: usize,
    /// Rows labelled as outliers
    pub outliers: usize,
    /// Outlier fraction in [0, 1]; 0.0 when there was not enough data
    pub ratio: f64,
    /// Score cut-off used for labelling, absent when scoring was skipped
    pub threshold: Option<f64>,
    /// Per-row isolation scores, in matrix order
    pub row_scores: Vec<f64>,
}

impl ScoreBreakdown {
    fn insufficient(rows: usize) -> Self {
        Self {
            rows,
            outliers: 0,
            ratio: 0.0,
            threshold: None,
            row_scores: Vec::new(),
        }
    }

    /// True when the matrix was too small to score
    pub fn is_insufficient(&self) -> bool {
        self.threshold.is_none()
    }
}

/// Contamination-calibrated isolation forest scorer
#[derive(Debug, Clone)]
pub struct AnomalyScorer {
    pub contamination: f64,
    pub min_samples: usize,
    pub n_estimators: usize,
    pub max_samples: usize,
    pub seed: u64,
}

impl AnomalyScorer {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            contamination: config.contamination,
            min_samples: config.min_samples,
            n_estimators: config.n_estimators,
            max_samples: config.max_samples,
            seed: config.seed,
        }
    }

    /// Outlier fraction of the complete samples in `window`
    pub fn score_window(&self, window: &HistoryWindow) -> f64 {
        self.evaluate(&FeatureMatrix::from_window(window)).ratio
    }

    /// Score a matrix with a generator seeded from the configured seed
    pub fn evaluate(&self, matrix: &FeatureMatrix) -> ScoreBreakdown {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.evaluate_with_rng(matrix, &mut rng)
    }

    /// Score a matrix drawing every random choice from `rng`
    pub fn evaluate_with_rng<R: Rng + ?Sized>(
        &self,
        matrix: &FeatureMatrix,
        rng: &mut R,
    ) -> ScoreBreakdown {
        let rows = matrix.n_rows();
        if rows < self.min_samples.max(2) {
            debug!(rows, min_samples = self.min_samples, "Insufficient history for scoring");
            return ScoreBreakdown::insufficient(rows);
        }

        let scaled = StandardScaler::fit_transform(matrix);
        let forest = IsolationForest::fit(&scaled, self.n_estimators, self.max_samples, rng);
        let row_scores = forest.score_samples(&scaled);

        let threshold = quantile(&row_scores, 1.0 - self.contamination);
        let outliers = count_outliers(&row_scores, threshold);

        debug!(
            rows,
            outliers,
            threshold,
            trees = forest.n_trees(),
            subsample = forest.subsample_size(),
            "Window scored"
        );

        ScoreBreakdown {
            rows,
            outliers,
            ratio: outliers as f64 / rows as f64,
            threshold: Some(threshold),
            row_scores,
        }
    }
}

/// Rows strictly above the threshold are outliers
///
/// When the threshold lands inside the tie group holding the maximum score,
/// that whole group is labelled instead, unless every row is tied.
fn count_outliers(scores: &[f64], threshold: f64) -> usize {
    let above = scores.iter().filter(|s| **s > threshold).count();
    if above > 0 {
        return above;
    }

    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    if max > min && max == threshold {
        scores.iter().filter(|s| **s == max).count()
    } else {
        0
    }
}

/// Quantile with linear interpolation between closest ranks
fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}
