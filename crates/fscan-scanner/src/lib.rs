//! Concurrent, cancellable directory scanner with a result cache.
//!
//! This crate finds files under a directory tree that satisfy a combination
//! of name, size, modification-time and content filters, walking the tree
//! on a worker pool and caching recent results.
//!
//! # Overview
//!
//! The main entry point is [`Scanner`], which combines:
//!
//! - [`MatchPredicate`]: the compiled filters of one request
//! - the directory walker: one pool task per top-level subdirectory
//! - [`ScanState`]: per-scan collector, cancellation flag and task registry
//! - [`ResultCache`]: time-bounded results keyed by [`QuerySignature`]
//! - [`ScanStats`]: atomic counters reported with every fresh scan
//!
//! # Example
//!
//! ```no_run
//! use fscan_core::{Config, ScanRequest};
//! use fscan_scanner::{ScanOutcome, Scanner};
//!
//! let scanner = Scanner::new(&Config::default());
//! let request = ScanRequest::new("./logs", "*.log").with_min_size(1024);
//!
//! match scanner.scan(&request)? {
//!     ScanOutcome::Completed(report) => println!("{} matches", report.paths.len()),
//!     ScanOutcome::Cached(paths) => println!("{} cached matches", paths.len()),
//!     ScanOutcome::Interrupted(report) => println!("partial: {}", report.paths.len()),
//! }
//! # Ok::<(), fscan_scanner::ScanError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! Scanner (coordinator, calling thread)
//!     │
//!     ├── ResultCache (FxHashMap + RwLock, TTL on read)
//!     │
//!     └── per scan: ScanState (shared by Arc)
//!             │
//!             ├── MatchPredicate (read-only)
//!             ├── root listing (calling thread, read_dir), sizes the pool
//!             │       │
//!             │       └── one rayon task per top-level directory
//!             │               │
//!             │               └── WalkBuilder (ignore crate, sequential)
//!             │
//!             └── TaskRegistry (Mutex + Condvar)
//! ```
//!
//! # Cancellation
//!
//! [`Scanner::interrupt`] sets the cancellation flag of every scan in
//! progress and clears the cache. Walkers observe the flag before each
//! entry, so an interrupted scan returns promptly with
//! [`ScanOutcome::Interrupted`] and whatever it had collected. Interrupted
//! results are never cached.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod cache;
mod error;
mod predicate;
mod state;
mod stats;
mod walker;

pub use cache::{QuerySignature, ResultCache};
pub use error::ScanError;
pub use predicate::{MatchPredicate, Verdict};
pub use state::{ScanState, TaskId, TaskRegistry, WaitOutcome};
pub use stats::{ScanStats, StatsSnapshot};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use fscan_core::{Config, RequestError, ScanConfig, ScanParams, ScanRequest};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Paths and statistics produced by a traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Matching files, absolute and sorted by their string form.
    pub paths: Vec<Utf8PathBuf>,
    /// Counters collected while walking.
    pub stats: StatsSnapshot,
}

impl ScanReport {
    fn empty() -> Self {
        Self {
            paths: Vec::new(),
            stats: StatsSnapshot::default(),
        }
    }
}

/// How a scan request was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The tree was walked to completion.
    Completed(ScanReport),
    /// A live cache entry answered the request without touching the
    /// filesystem.
    Cached(Vec<Utf8PathBuf>),
    /// The scan was cancelled; the report holds the partial result.
    Interrupted(ScanReport),
}

impl ScanOutcome {
    /// Returns the matching paths.
    #[must_use]
    pub fn paths(&self) -> &[Utf8PathBuf] {
        match self {
            Self::Completed(report) | Self::Interrupted(report) => &report.paths,
            Self::Cached(paths) => paths,
        }
    }

    /// Consumes the outcome and returns the matching paths.
    #[must_use]
    pub fn into_paths(self) -> Vec<Utf8PathBuf> {
        match self {
            Self::Completed(report) | Self::Interrupted(report) => report.paths,
            Self::Cached(paths) => paths,
        }
    }

    /// Returns `true` if the scan was cancelled before it finished.
    #[inline]
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }

    /// Returns `true` if the result came from the cache.
    #[inline]
    #[must_use]
    pub const fn is_from_cache(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

/// States of the scans currently in progress, so they can be interrupted.
#[derive(Debug, Default)]
struct ActiveScans {
    scans: Mutex<FxHashMap<u64, Arc<ScanState>>>,
    next_id: AtomicU64,
}

impl ActiveScans {
    fn register(&self, state: &Arc<ScanState>) -> ActiveGuard<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.scans.lock().insert(id, Arc::clone(state));
        ActiveGuard { active: self, id }
    }

    fn cancel_all(&self) -> usize {
        let scans = self.scans.lock();
        for state in scans.values() {
            state.cancel();
        }
        scans.len()
    }

    fn len(&self) -> usize {
        self.scans.lock().len()
    }
}

/// Unregisters a scan when its call returns.
struct ActiveGuard<'a> {
    active: &'a ActiveScans,
    id: u64,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.active.scans.lock().remove(&self.id);
    }
}

/// The scan coordinator.
///
/// Holds no per-scan state: every call to [`scan`](Self::scan) builds its
/// own [`ScanState`], so overlapping scans from several threads are
/// independent. They share only the [`ResultCache`].
///
/// # Cloning
///
/// `Scanner` is cheaply cloneable via internal `Arc` references. Clones
/// share the cache and the set of active scans, so an
/// [`interrupt`](Self::interrupt) on any clone reaches every scan.
///
/// # Examples
///
/// ```
/// use fscan_core::Config;
/// use fscan_scanner::Scanner;
///
/// let scanner = Scanner::new(&Config::default());
/// let background = scanner.clone();
///
/// background.interrupt();
/// assert!(scanner.cache().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Scanner {
    /// Scanner configuration.
    config: Arc<ScanConfig>,
    /// Result cache shared by all scans.
    cache: Arc<ResultCache>,
    /// Scans in progress.
    active: Arc<ActiveScans>,
}

impl Scanner {
    /// Creates a scanner from `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        info!(
            cache_ttl_ms = config.cache.ttl_ms,
            max_wait_ms = config.scan.max_wait_ms,
            "Creating scanner"
        );
        Self {
            config: Arc::new(config.scan.clone()),
            cache: Arc::new(ResultCache::new(config.cache.ttl())),
            active: Arc::new(ActiveScans::default()),
        }
    }

    /// Validates boundary parameters and scans.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidArgument`] if `params` are malformed,
    /// before any filesystem access. Otherwise see [`scan`](Self::scan).
    pub fn scan_params(&self, params: ScanParams) -> Result<ScanOutcome, ScanError> {
        let request = params.into_request()?;
        self.scan(&request)
    }

    /// Scans `request.root` and returns the sorted matching paths.
    ///
    /// A live cache entry for the same filters is returned without
    /// walking. A root that does not exist or is not a directory yields an
    /// empty result. Files and directories that cannot be read are logged
    /// and skipped.
    ///
    /// # Errors
    ///
    /// - [`ScanError::InvalidArgument`] if the root is empty or the mask
    ///   cannot be compiled
    /// - [`ScanError::NonUtf8Path`] if the absolute root is not UTF-8
    /// - [`ScanError::RootEnumeration`] if the root directory cannot be listed
    /// - [`ScanError::Pool`] if the worker pool cannot be built
    pub fn scan(&self, request: &ScanRequest) -> Result<ScanOutcome, ScanError> {
        let root = absolute_root(&request.root)?;
        let signature = QuerySignature::new(&root, request);

        if let Some(paths) = self.cache.lookup(&signature) {
            debug!(root = %root, mask = %request.mask, matches = paths.len(), "Cache hit");
            return Ok(ScanOutcome::Cached(paths));
        }

        let predicate = MatchPredicate::compile(request, &self.config)?;

        if !root.is_dir() {
            info!(root = %root, "Scan root is not a directory, nothing to scan");
            return Ok(ScanOutcome::Completed(ScanReport::empty()));
        }

        if request.has_inverted_bounds() {
            warn!(
                root = %root,
                min_size = ?request.min_size,
                max_size = ?request.max_size,
                "Inverted size or date bounds, no file can match"
            );
        }

        let threads = request.concurrency.resolve();
        info!(
            root = %root,
            mask = %request.mask,
            threads,
            content_filter = predicate.has_content_filter(),
            "Starting scan"
        );

        let state = Arc::new(ScanState::new(predicate));
        let _active = self.active.register(&state);
        self.run(&signature, &root, &state, threads)
    }

    /// Walks `root` with `state` on a pool of at most `threads` workers.
    fn run(
        &self,
        signature: &QuerySignature,
        root: &Utf8Path,
        state: &Arc<ScanState>,
        threads: usize,
    ) -> Result<ScanOutcome, ScanError> {
        let listing = match walker::list_root(state, root) {
            Ok(listing) => listing,
            Err(e) => {
                state.cancel();
                return Err(e);
            }
        };

        if threads > self.config.max_threads {
            warn!(
                requested = threads,
                max_threads = self.config.max_threads,
                "Requested concurrency exceeds the configured maximum, clamping"
            );
        }
        let workers = pool_size(threads, self.config.max_threads, listing.subtree_count());
        debug!(
            root = %root,
            subtrees = listing.subtree_count(),
            workers,
            "Building worker pool"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("fscan-walker-{i}"))
            .build()?;

        walker::walk_root(state, listing, &pool);

        match state.wait_for_tasks(self.config.max_wait()) {
            WaitOutcome::Idle | WaitOutcome::Cancelled => {}
            WaitOutcome::TimedOut => {
                let pending = state.tasks().pending_roots();
                warn!(
                    root = %root,
                    max_wait_ms = self.config.max_wait_ms,
                    pending = pending.len(),
                    first_pending = ?pending.first(),
                    "Timed out waiting for subtree tasks, cancelling"
                );
                state.cancel();
            }
        }
        drop(pool);

        let report = ScanReport {
            paths: state.sorted_results(),
            stats: state.stats().snapshot(),
        };

        if state.is_cancelled() {
            info!(root = %root, matches = report.paths.len(), "Scan interrupted");
            return Ok(ScanOutcome::Interrupted(report));
        }

        self.cache.store(signature.clone(), report.paths.clone());
        // An interrupt between the wait and the store must not leave the
        // partial result cached.
        if state.is_cancelled() {
            self.cache.remove(signature);
            info!(root = %root, matches = report.paths.len(), "Scan interrupted");
            return Ok(ScanOutcome::Interrupted(report));
        }

        if report.stats.had_failures() {
            warn!(
                root = %root,
                errors = report.stats.errors,
                content_skipped = report.stats.content_skipped,
                "Some entries could not be read"
            );
        }
        info!(
            root = %root,
            matches = report.paths.len(),
            files = report.stats.files,
            directories = report.stats.directories,
            match_percent = report.stats.match_percent(),
            "Scan complete"
        );
        Ok(ScanOutcome::Completed(report))
    }

    /// Cancels every scan in progress and clears the result cache.
    ///
    /// Returns immediately; interrupted scans return their partial results
    /// from their own threads. Idempotent.
    pub fn interrupt(&self) {
        let cancelled = self.active.cancel_all();
        self.cache.clear();
        info!(scans = cancelled, "Scan interrupt requested");
    }

    /// Returns the number of scans currently in progress across all clones.
    #[must_use]
    pub fn active_scans(&self) -> usize {
        self.active.len()
    }

    /// Returns the result cache.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Returns the scanner configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }
}

/// Number of workers for one scan: the request's concurrency, capped by
/// `max_threads` and by the number of subtrees there are to hand out.
fn pool_size(requested: usize, max_threads: usize, subtrees: usize) -> usize {
    requested.min(max_threads).min(subtrees).max(1)
}

/// Makes `root` absolute without touching the filesystem.
fn absolute_root(root: &Utf8Path) -> Result<Utf8PathBuf, ScanError> {
    if root.as_str().is_empty() {
        return Err(RequestError::EmptyPath.into());
    }
    let absolute =
        std::path::absolute(root).map_err(|source| ScanError::root_enumeration(root, source))?;
    Utf8PathBuf::try_from(absolute).map_err(|e| ScanError::NonUtf8Path(e.into_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/c.txt"), "c").unwrap();
        (dir, root)
    }

    fn state(request: &ScanRequest) -> Arc<ScanState> {
        let predicate = MatchPredicate::compile(request, &ScanConfig::default()).unwrap();
        Arc::new(ScanState::new(predicate))
    }

    #[test]
    fn test_scan_completes_and_caches() {
        let (_dir, root) = tree();
        let scanner = Scanner::new(&Config::default());
        let request = ScanRequest::new(root.clone(), "*.txt");

        let first = scanner.scan(&request).unwrap();
        assert!(matches!(first, ScanOutcome::Completed(_)));
        assert_eq!(first.paths(), [root.join("a.txt"), root.join("sub/c.txt")]);
        assert_eq!(scanner.cache().len(), 1);

        let second = scanner.scan(&request).unwrap();
        assert!(second.is_from_cache());
        assert_eq!(second.into_paths(), first.into_paths());
    }

    #[test]
    fn test_cancelled_state_is_interrupted_and_not_cached() {
        let (_dir, root) = tree();
        let scanner = Scanner::new(&Config::default());
        let request = ScanRequest::new(root.clone(), "*");
        let signature = QuerySignature::new(&root, &request);

        let state = state(&request);
        state.cancel();

        let outcome = scanner.run(&signature, &root, &state, 2).unwrap();
        assert!(outcome.is_interrupted());
        assert!(outcome.paths().is_empty());
        assert!(scanner.cache().is_empty());
    }

    #[test]
    fn test_wait_bound_cancels_and_skips_cache() {
        let (_dir, root) = tree();
        let mut config = Config::default();
        config.scan.max_wait_ms = 50;
        let scanner = Scanner::new(&config);
        let request = ScanRequest::new(root.clone(), "*");
        let signature = QuerySignature::new(&root, &request);

        // A task that never completes holds the wait open until the bound.
        let state = state(&request);
        let _stuck = state.tasks().register(&root.join("stuck"));

        let outcome = scanner.run(&signature, &root, &state, 2).unwrap();
        assert!(outcome.is_interrupted());
        assert!(state.is_cancelled());
        assert!(state.tasks().is_empty());
        assert!(scanner.cache().is_empty());
    }

    #[test]
    fn test_pool_size_is_clamped() {
        assert_eq!(pool_size(20_000, 256, 3), 3);
        assert_eq!(pool_size(20_000, 8, 100), 8);
        assert_eq!(pool_size(4, 256, 100), 4);
        assert_eq!(pool_size(4, 256, 0), 1);
    }

    #[test]
    fn test_interrupt_cancels_active_scans_and_clears_cache() {
        let (_dir, root) = tree();
        let scanner = Scanner::new(&Config::default());
        let request = ScanRequest::new(root.clone(), "*");
        scanner.scan(&request).unwrap();
        assert_eq!(scanner.cache().len(), 1);

        let state = state(&request);
        let guard = scanner.active.register(&state);
        scanner.clone().interrupt();
        assert!(state.is_cancelled());
        assert!(scanner.cache().is_empty());

        assert_eq!(scanner.active_scans(), 1);
        drop(guard);
        assert_eq!(scanner.active_scans(), 0);

        scanner.interrupt();
        assert!(scanner.cache().is_empty());
    }

    #[test]
    fn test_missing_root_is_empty_and_not_cached() {
        let dir = TempDir::new().unwrap();
        let missing = Utf8PathBuf::try_from(dir.path().join("missing")).unwrap();
        let scanner = Scanner::new(&Config::default());

        let outcome = scanner.scan(&ScanRequest::new(missing, "*")).unwrap();
        assert_eq!(outcome, ScanOutcome::Completed(ScanReport::empty()));
        assert!(scanner.cache().is_empty());
    }

    #[test]
    fn test_empty_root_is_invalid_argument() {
        let scanner = Scanner::new(&Config::default());
        let err = scanner.scan(&ScanRequest::new("", "*")).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_relative_root_is_made_absolute() {
        let root = absolute_root(Utf8Path::new("some/dir")).unwrap();
        assert!(root.is_absolute());
        assert!(root.ends_with("some/dir"));
    }

    #[test]
    fn test_inverted_bounds_yield_empty() {
        let (_dir, root) = tree();
        let scanner = Scanner::new(&Config::default());
        let request = ScanRequest::new(root, "*").with_min_size(10).with_max_size(1);

        let outcome = scanner.scan(&request).unwrap();
        assert!(!outcome.is_interrupted());
        assert!(outcome.paths().is_empty());
    }

    #[test]
    fn test_report_stats() {
        let (_dir, root) = tree();
        let scanner = Scanner::new(&Config::default());

        let ScanOutcome::Completed(report) = scanner.scan(&ScanRequest::new(root, "*.txt")).unwrap()
        else {
            panic!("expected a completed scan");
        };
        assert_eq!(report.stats.files, 2);
        assert_eq!(report.stats.matches, 2);
        assert_eq!(report.stats.directories, 2);
        assert_eq!(report.stats.tasks, 1);
    }
}
