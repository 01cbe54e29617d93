//! In-memory history window

use crate::models::{MetricSample, TrackedMetric};
use std::collections::VecDeque;

/// Result of offering a sample to the window
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Sample was appended; `evicted` oldest samples were dropped to stay within capacity
    Admitted { evicted: usize },
    /// Sample carried unresolved metrics and was not appended
    Rejected { missing: Vec<TrackedMetric> },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Ordered, capacity-bounded sequence of samples (oldest first)
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    samples: VecDeque<MetricSample>,
    capacity: usize,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Build a window from stored rows, keeping only the newest `capacity` entries
    ///
    /// Stored rows bypass the admission guard: incomplete rows stay in the
    /// window and are filtered out when the feature matrix is built.
    pub fn from_samples(samples: impl IntoIterator<Item = MetricSample>, capacity: usize) -> Self {
        let mut window = Self::new(capacity);
        window.samples.extend(samples);
        window.evict_overflow();
        window
    }

    /// Append a sample if every tracked metric resolved, evicting the oldest on overflow
    pub fn append(&mut self, sample: MetricSample) -> Admission {
        if !sample.is_complete() {
            return Admission::Rejected {
                missing: sample.missing_metrics(),
            };
        }

        self.samples.push_back(sample);
        let evicted = self.evict_overflow();
        Admission::Admitted { evicted }
    }

    fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0;
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &MetricSample> + ExactSizeIterator {
        self.samples.iter()
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.back()
    }

    /// Newest `limit` samples, oldest first
    pub fn tail(&self, limit: usize) -> Vec<&MetricSample> {
        let skip = self.samples.len().saturating_sub(limit);
        self.samples.iter().skip(skip).collect()
    }

    /// Number of samples with every metric finite
    pub fn complete_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_complete()).count()
    }
}
