//! Persistence tests for the history store
//!
//! These tests run against temporary directories to cover the on-disk
//! format, round trips and the single-writer lock.

#[cfg(test)]
mod store_tests {
    use crate::history::{HistoryStore, HistoryWindow, HISTORY_HEADER};
    use crate::models::MetricSample;
    use crate::DetectorError;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample(i: i64) -> MetricSample {
        let ts = Utc.timestamp_opt(1_700_000_000 + i * 60, 123_456_000).unwrap();
        MetricSample::new(ts, [30.0 + i as f64 * 0.1, 50.25, 40.0, 1234.5])
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("metrics_history.csv"));

        let window = store.load(200).unwrap();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), 200);
    }

    #[test]
    fn test_persist_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("metrics_history.csv"));

        let window = HistoryWindow::from_samples((0..25).map(sample), 200);
        store.persist(&window).unwrap();

        let loaded = store.load(200).unwrap();
        assert_eq!(loaded, window);

        // A second persist of the loaded window leaves the file unchanged
        let before = std::fs::read_to_string(store.path()).unwrap();
        store.persist(&loaded).unwrap();
        let after = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_persist_writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("nested").join("history.csv"));

        let window = HistoryWindow::from_samples((0..3).map(sample), 200);
        store.persist(&window).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), HISTORY_HEADER.join(","));
        assert_eq!(lines.count(), 3);
        assert!(!dir.path().join("nested").join("history.tmp").exists());
    }

    #[test]
    fn test_load_truncates_to_capacity() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv"));

        let window = HistoryWindow::from_samples((0..30).map(sample), 200);
        store.persist(&window).unwrap();

        let loaded = store.load(10).unwrap();
        assert_eq!(loaded.len(), 10);
        assert_eq!(loaded.iter().next().unwrap(), &sample(20));
    }

    #[test]
    fn test_load_legacy_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        std::fs::write(
            &path,
            "cpu_usage,memory_usage,disk_usage,network_rx,timestamp\n\
             31.5,52.0,40.1,48.0,2024-03-01 10:00:00.123456\n\
             ,51.0,40.2,47.0,2024-03-01 10:05:00.000001\n\
             29.0,49.0,39.9,51.0,2024-03-01 10:10:00\n",
        )
        .unwrap();

        let window = HistoryStore::new(&path).load(200).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window.complete_count(), 2);

        let first = window.iter().next().unwrap();
        assert_eq!(first.values, [31.5, 52.0, 40.1, 48.0]);
        assert_eq!(
            first.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
                + chrono::Duration::microseconds(123_456)
        );
    }

    #[test]
    fn test_load_reordered_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        std::fs::write(
            &path,
            "timestamp,network_rx,disk_usage,memory_usage,cpu_usage\n\
             2024-03-01T10:00:00Z,4,3,2,1\n",
        )
        .unwrap();

        let window = HistoryStore::new(&path).load(200).unwrap();
        assert_eq!(window.latest().unwrap().values, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_load_rejects_bad_timestamp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        std::fs::write(
            &path,
            "cpu_usage,memory_usage,disk_usage,network_rx,timestamp\n1,2,3,4,yesterday\n",
        )
        .unwrap();

        let err = HistoryStore::new(&path).load(200).unwrap_err();
        assert!(matches!(err, DetectorError::Timestamp { .. }));
    }

    #[test]
    fn test_persist_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let store = HistoryStore::new(blocker.join("history.csv"));
        let window = HistoryWindow::from_samples((0..2).map(sample), 200);
        assert!(matches!(
            store.persist(&window),
            Err(DetectorError::Io { .. })
        ));
    }

    #[test]
    fn test_lock_is_exclusive_and_released() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv"));
        let stale_after = Duration::from_secs(300);

        let lock = store.lock(stale_after).unwrap();
        assert!(lock.path().exists());
        assert!(matches!(
            store.lock(stale_after),
            Err(DetectorError::Locked { .. })
        ));

        drop(lock);
        assert!(store.lock(stale_after).is_ok());
    }

    #[test]
    fn test_stale_lock_is_taken_over() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv"));

        let abandoned = store.lock(Duration::from_secs(300)).unwrap();
        std::mem::forget(abandoned);

        assert!(store.lock(Duration::ZERO).is_ok());
    }
}
