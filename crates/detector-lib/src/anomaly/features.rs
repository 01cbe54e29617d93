//! Feature matrix extraction and standardization
//!
//! Only complete samples (every tracked metric finite) become rows; the
//! timestamp is dropped. Standardization parameters are fitted on the
//! current matrix each run and never persisted.

use crate::history::HistoryWindow;
use crate::models::TrackedMetric;

/// Relative spread below which a column is treated as constant
const CONSTANT_COLUMN_TOLERANCE: f64 = 1e-12;

/// One row per complete sample, one column per tracked metric
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<[f64; TrackedMetric::COUNT]>,
}

impl FeatureMatrix {
    pub fn from_rows(rows: Vec<[f64; TrackedMetric::COUNT]>) -> Self {
        Self { rows }
    }

    /// Project the complete samples of a window onto the metric columns
    pub fn from_window(window: &HistoryWindow) -> Self {
        let rows = window
            .iter()
            .filter(|s| s.is_complete())
            .map(|s| s.values)
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[[f64; TrackedMetric::COUNT]] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        TrackedMetric::COUNT
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |row| row[col])
    }
}

/// Per-column mean and population standard deviation
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub means: [f64; TrackedMetric::COUNT],
    pub std_devs: [f64; TrackedMetric::COUNT],
}

impl StandardScaler {
    /// Fit column statistics over all rows
    pub fn fit(matrix: &FeatureMatrix) -> Self {
        let mut means = [0.0; TrackedMetric::COUNT];
        let mut std_devs = [0.0; TrackedMetric::COUNT];

        let n = matrix.n_rows();
        if n == 0 {
            return Self { means, std_devs };
        }

        for col in 0..matrix.n_cols() {
            let mean = matrix.column(col).sum::<f64>() / n as f64;
            // Population variance (no Bessel correction), two-pass for stability
            let variance = matrix
                .column(col)
                .map(|v| (v - mean).powi(2))
                .sum::<f64>()
                / n as f64;

            means[col] = mean;
            std_devs[col] = variance.sqrt();
        }

        Self { means, std_devs }
    }

    /// Standardize rows; constant columns map to 0.0
    pub fn transform(&self, matrix: &FeatureMatrix) -> FeatureMatrix {
        let rows = matrix
            .rows()
            .iter()
            .map(|row| {
                let mut scaled = [0.0; TrackedMetric::COUNT];
                for (col, value) in row.iter().enumerate() {
                    let std_dev = self.std_devs[col];
                    let tolerance = CONSTANT_COLUMN_TOLERANCE * self.means[col].abs().max(1.0);
                    scaled[col] = if std_dev > tolerance {
                        (value - self.means[col]) / std_dev
                    } else {
                        0.0
                    };
                }
                scaled
            })
            .collect();
        FeatureMatrix::from_rows(rows)
    }

    pub fn fit_transform(matrix: &FeatureMatrix) -> FeatureMatrix {
        Self::fit(matrix).transform(matrix)
    }
}
