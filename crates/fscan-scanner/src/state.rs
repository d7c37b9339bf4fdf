//! Per-scan shared state.
//!
//! A fresh [`ScanState`] is created for every scan call and shared by
//! reference between the coordinator and all of that scan's walkers. It
//! holds the compiled predicate, the result collector, the cancellation
//! flag, the registry of in-flight subtree tasks, and statistics.
//!
//! # Waiting
//!
//! [`TaskRegistry`] signals a condition variable whenever a task finishes,
//! the registry is cleared, or the scan is cancelled, so the coordinator
//! blocks until there is something to look at instead of polling.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use crate::predicate::MatchPredicate;
use crate::stats::ScanStats;

/// Identifier of a dispatched subtree task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// How a wait for dispatched tasks ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Every registered task finished.
    Idle,
    /// The scan was cancelled while tasks were still registered.
    Cancelled,
    /// The wait bound elapsed first.
    TimedOut,
}

/// Registry of in-flight subtree tasks, keyed by task id.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    inflight: Mutex<FxHashMap<TaskId, Utf8PathBuf>>,
    changed: Condvar,
    next_id: AtomicU64,
}

impl TaskRegistry {
    /// Registers a task walking `root` and returns its id.
    pub fn register(&self, root: &Utf8Path) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.inflight.lock().insert(id, root.to_owned());
        id
    }

    /// Marks a task as finished. Unknown ids are ignored.
    pub fn complete(&self, id: TaskId) {
        let mut inflight = self.inflight.lock();
        inflight.remove(&id);
        self.changed.notify_all();
    }

    /// Drops every registered task and wakes waiters.
    ///
    /// Returns how many tasks were still registered.
    pub fn clear(&self) -> usize {
        let mut inflight = self.inflight.lock();
        let dropped = inflight.len();
        inflight.clear();
        self.changed.notify_all();
        dropped
    }

    /// Returns the number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inflight.lock().len()
    }

    /// Returns `true` if no task is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inflight.lock().is_empty()
    }

    /// Returns the subtree roots of all registered tasks.
    #[must_use]
    pub fn pending_roots(&self) -> Vec<Utf8PathBuf> {
        self.inflight.lock().values().cloned().collect()
    }

    /// Blocks until the registry is empty, `cancelled` is set, or `timeout`
    /// elapses.
    pub fn wait_until_idle(&self, cancelled: &AtomicBool, timeout: Duration) -> WaitOutcome {
        let mut inflight = self.inflight.lock();
        self.changed.wait_while_for(
            &mut inflight,
            |tasks| !tasks.is_empty() && !cancelled.load(Ordering::Acquire),
            timeout,
        );

        if inflight.is_empty() {
            WaitOutcome::Idle
        } else if cancelled.load(Ordering::Acquire) {
            WaitOutcome::Cancelled
        } else {
            WaitOutcome::TimedOut
        }
    }
}

/// Mutable state of one scan, shared by its coordinator and walkers.
#[derive(Debug)]
pub struct ScanState {
    predicate: MatchPredicate,
    cancelled: AtomicBool,
    results: Mutex<Vec<Utf8PathBuf>>,
    tasks: TaskRegistry,
    stats: ScanStats,
}

impl ScanState {
    /// Creates the state for a scan using `predicate`.
    #[must_use]
    pub fn new(predicate: MatchPredicate) -> Self {
        Self {
            predicate,
            cancelled: AtomicBool::new(false),
            results: Mutex::new(Vec::new()),
            tasks: TaskRegistry::default(),
            stats: ScanStats::new(),
        }
    }

    /// Returns the compiled predicate.
    #[inline]
    #[must_use]
    pub const fn predicate(&self) -> &MatchPredicate {
        &self.predicate
    }

    /// Returns the task registry.
    #[inline]
    #[must_use]
    pub const fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    /// Returns the statistics counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Returns `true` once the scan has been cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Cancels the scan: sets the flag, then clears the task registry so
    /// the coordinator stops waiting. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.tasks.clear();
    }

    /// Appends a matching file to the collector.
    pub fn record_match(&self, path: Utf8PathBuf) {
        self.results.lock().push(path);
    }

    /// Returns the number of matches collected so far.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.results.lock().len()
    }

    /// Returns a copy of the collected matches sorted by their string form.
    ///
    /// This is plain lexical order, not `Path`'s component-wise order.
    #[must_use]
    pub fn sorted_results(&self) -> Vec<Utf8PathBuf> {
        let mut paths = self.results.lock().clone();
        paths.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
        paths
    }

    /// Waits for dispatched tasks; see [`TaskRegistry::wait_until_idle`].
    pub fn wait_for_tasks(&self, timeout: Duration) -> WaitOutcome {
        self.tasks.wait_until_idle(&self.cancelled, timeout)
    }
}
