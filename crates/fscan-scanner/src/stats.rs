//! Scan statistics with atomic counters.
//!
//! This module provides [`ScanStats`] for counting what a scan visits and
//! [`StatsSnapshot`] for a point-in-time copy of those counts.
//!
//! # Thread Safety
//!
//! All counters use [`AtomicU64`] with [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. Statistics are informational and don't require strict ordering
//! guarantees; the snapshot taken after all walkers have finished is exact.
//!
//! # Examples
//!
//! ```
//! use fscan_scanner::ScanStats;
//!
//! let stats = ScanStats::new();
//! stats.increment_files();
//! stats.increment_matches();
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.files, 1);
//! assert_eq!(snapshot.matches, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for one scan.
///
/// Every walker of a scan increments the same instance.
#[derive(Debug, Default)]
pub struct ScanStats {
    /// Directories entered.
    directories: AtomicU64,
    /// Regular files evaluated against the predicate.
    files: AtomicU64,
    /// Files that passed every active filter.
    matches: AtomicU64,
    /// Entries that could not be accessed.
    errors: AtomicU64,
    /// Files excluded because their content could not be loaded.
    content_skipped: AtomicU64,
    /// Subtree tasks handed to the worker pool.
    tasks: AtomicU64,
}

impl ScanStats {
    /// Creates a new [`ScanStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the directories counter.
    #[inline]
    pub fn increment_directories(&self) {
        self.directories.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the files counter.
    #[inline]
    pub fn increment_files(&self) {
        self.files.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the matches counter.
    #[inline]
    pub fn increment_matches(&self) {
        self.matches.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the access error counter.
    #[inline]
    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the content-skipped counter.
    #[inline]
    pub fn increment_content_skipped(&self) {
        self.content_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the dispatched tasks counter.
    #[inline]
    pub fn increment_tasks(&self) {
        self.tasks.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            directories: self.directories.load(Ordering::Relaxed),
            files: self.files.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            content_skipped: self.content_skipped.load(Ordering::Relaxed),
            tasks: self.tasks.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of scan statistics.
///
/// Safe to store, serialize, and send between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Directories entered.
    pub directories: u64,
    /// Regular files evaluated.
    pub files: u64,
    /// Files that matched.
    pub matches: u64,
    /// Entries that could not be accessed.
    pub errors: u64,
    /// Files excluded because their content could not be loaded.
    pub content_skipped: u64,
    /// Subtree tasks dispatched to the worker pool.
    pub tasks: u64,
}

impl StatsSnapshot {
    /// Returns `true` if any entry was skipped because of an error.
    #[inline]
    #[must_use]
    pub const fn had_failures(&self) -> bool {
        self.errors > 0 || self.content_skipped > 0
    }

    /// Percentage of evaluated files that matched (0.0 when none were seen).
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Acceptable for statistics display
    pub fn match_percent(&self) -> f64 {
        if self.files == 0 {
            return 0.0;
        }
        (self.matches as f64 / self.files as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_stats_new() {
        let snap = ScanStats::new().snapshot();
        assert_eq!(snap, StatsSnapshot::default());
        assert!(!snap.had_failures());
    }

    #[test]
    fn test_scan_stats_increment() {
        let stats = ScanStats::new();
        stats.increment_directories();
        stats.increment_files();
        stats.increment_files();
        stats.increment_matches();
        stats.increment_errors();
        stats.increment_content_skipped();
        stats.increment_tasks();

        let snap = stats.snapshot();
        assert_eq!(snap.directories, 1);
        assert_eq!(snap.files, 2);
        assert_eq!(snap.matches, 1);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.content_skipped, 1);
        assert_eq!(snap.tasks, 1);
        assert!(snap.had_failures());
    }

    #[test]
    fn test_scan_stats_concurrent_increments() {
        let stats = ScanStats::new();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        stats.increment_files();
                    }
                });
            }
        });
        assert_eq!(stats.snapshot().files, 4000);
    }

    #[test]
    fn test_match_percent() {
        let snap = StatsSnapshot {
            files: 4,
            matches: 1,
            ..StatsSnapshot::default()
        };
        assert!((snap.match_percent() - 25.0).abs() < f64::EPSILON);
        assert!((StatsSnapshot::default().match_percent()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stats_snapshot_serialization() {
        let snap = StatsSnapshot {
            directories: 3,
            files: 10,
            matches: 2,
            errors: 1,
            content_skipped: 0,
            tasks: 2,
        };
        insta::assert_json_snapshot!(snap, @r#"
        {
          "directories": 3,
          "files": 10,
          "matches": 2,
          "errors": 1,
          "content_skipped": 0,
          "tasks": 2
        }
        "#);
    }
}
