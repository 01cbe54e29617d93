//! Bounded sample history
//!
//! This module provides:
//! - The in-memory history window with FIFO eviction and an admission guard
//! - CSV persistence with atomic full rewrites
//! - An advisory lock for the load → append → persist sequence

mod store;
mod window;

#[cfg(test)]
mod tests;

pub use store::{HistoryLock, HistoryStore, HISTORY_HEADER};
pub use window::{Admission, HistoryWindow};
