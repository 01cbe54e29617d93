//! Isolation forest ensemble
//!
//! Each tree is grown on a subsample by splitting on a random feature at a
//! random value inside that feature's observed range. Rows that are easy to
//! isolate end up with short paths; the per-row score is
//! `2^(-E[h(x)] / c(psi))`, so values close to 1 indicate outliers and
//! values well below 0.5 indicate inliers.

use super::FeatureMatrix;
use crate::models::TrackedMetric;
use rand::seq::index;
use rand::Rng;

type Row = [f64; TrackedMetric::COUNT];

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Expected path length of an unsuccessful BST search among `n` points
///
/// Used both to normalize depths and as the depth credit for rows left in
/// a leaf that was not split down to a singleton.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// One randomized partition tree, stored as a flat arena
#[derive(Debug, Clone)]
pub struct IsolationTree {
    nodes: Vec<Node>,
    root: usize,
}

impl IsolationTree {
    /// Grow a tree over the rows selected by `indices`
    pub fn fit<R: Rng + ?Sized>(
        rows: &[Row],
        indices: Vec<usize>,
        max_depth: usize,
        rng: &mut R,
    ) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(2 * indices.len()),
            root: 0,
        };
        tree.root = tree.grow(rows, indices, 0, max_depth, rng);
        tree
    }

    fn grow<R: Rng + ?Sized>(
        &mut self,
        rows: &[Row],
        indices: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> usize {
        if indices.len() <= 1 || depth >= max_depth {
            return self.push(Node::Leaf {
                size: indices.len(),
            });
        }

        // Only features that still vary inside this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..TrackedMetric::COUNT)
            .filter_map(|feature| {
                let (lo, hi) = indices.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &i| (lo.min(rows[i][feature]), hi.max(rows[i][feature])),
                );
                (hi > lo).then_some((feature, lo, hi))
            })
            .collect();

        if candidates.is_empty() {
            return self.push(Node::Leaf {
                size: indices.len(),
            });
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| rows[i][feature] < threshold);

        let left = self.grow(rows, left_rows, depth + 1, max_depth, rng);
        let right = self.grow(rows, right_rows, depth + 1, max_depth, rng);

        self.push(Node::Split {
            feature,
            threshold,
            left,
            right,
        })
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Isolation depth of `row`, including the expected depth of its leaf
    pub fn path_length(&self, row: &Row) -> f64 {
        let mut node = self.root;
        let mut depth = 0.0;
        loop {
            match self.nodes[node] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[feature] < threshold { left } else { right };
                    depth += 1.0;
                }
                Node::Leaf { size } => return depth + average_path_length(size),
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Ensemble of isolation trees fitted on one feature matrix
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    subsample_size: usize,
}

impl IsolationForest {
    /// Fit `n_estimators` trees, each on `min(max_samples, rows)` rows drawn without replacement
    pub fn fit<R: Rng + ?Sized>(
        matrix: &FeatureMatrix,
        n_estimators: usize,
        max_samples: usize,
        rng: &mut R,
    ) -> Self {
        let n_rows = matrix.n_rows();
        let subsample_size = max_samples.min(n_rows);
        let max_depth = (subsample_size.max(2) as f64).log2().ceil() as usize;

        let mut trees = Vec::with_capacity(n_estimators);
        if n_rows > 0 {
            for _ in 0..n_estimators {
                let indices = index::sample(rng, n_rows, subsample_size).into_vec();
                trees.push(IsolationTree::fit(matrix.rows(), indices, max_depth, rng));
            }
        }

        Self {
            trees,
            subsample_size,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn subsample_size(&self) -> usize {
        self.subsample_size
    }

    /// Mean isolation depth of `row` across the ensemble
    pub fn mean_path_length(&self, row: &Row) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Anomaly score in (0, 1]; higher means easier to isolate
    pub fn score(&self, row: &Row) -> f64 {
        let normalizer = average_path_length(self.subsample_size);
        if normalizer <= 0.0 {
            return 0.5;
        }
        2f64.powf(-self.mean_path_length(row) / normalizer)
    }

    pub fn score_samples(&self, matrix: &FeatureMatrix) -> Vec<f64> {
        matrix.rows().iter().map(|row| self.score(row)).collect()
    }
}
