//! Directory traversal with one level of fan-out.
//!
//! The root of a scan is listed on the calling thread first, so the caller
//! can size its pool to the number of subtrees. Files directly under the
//! root are evaluated inline; every immediate subdirectory is handed to
//! the worker pool as an independent task, and that task walks its whole
//! subtree sequentially. Concurrency is therefore bounded by the breadth of
//! the top level, however deep the tree goes.
//!
//! Subtree tasks use the `ignore` crate's walker with every filter turned
//! off, so hidden files and ignore files are not special, and symbolic
//! links are not followed.
//!
//! Every walker checks the scan's cancellation flag before each entry and
//! stops enumerating as soon as it is set.

use std::fmt;
use std::fs::{self, DirEntry, Metadata};
use std::path::PathBuf;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use rayon::ThreadPool;
use tracing::{debug, trace, warn};

use crate::error::ScanError;
use crate::predicate::Verdict;
use crate::state::{ScanState, TaskId};

/// The immediate contents of a scan root, split into subtrees and files.
#[derive(Debug)]
pub struct RootListing {
    root: Utf8PathBuf,
    subtrees: Vec<Utf8PathBuf>,
    files: Vec<(Utf8PathBuf, DirEntry)>,
}

impl RootListing {
    /// Number of top-level subdirectories, one task each.
    #[must_use]
    pub fn subtree_count(&self) -> usize {
        self.subtrees.len()
    }
}

/// Lists the scan root on the calling thread.
///
/// Stops early, with whatever was collected so far, if the scan is
/// cancelled.
///
/// # Errors
///
/// Returns [`ScanError::RootEnumeration`] if the root itself cannot be
/// listed. Failures on individual entries are logged and skipped.
pub fn list_root(state: &ScanState, root: &Utf8Path) -> Result<RootListing, ScanError> {
    let entries =
        fs::read_dir(root).map_err(|source| ScanError::root_enumeration(root, source))?;
    state.stats().increment_directories();

    let mut listing = RootListing {
        root: root.to_owned(),
        subtrees: Vec::new(),
        files: Vec::new(),
    };

    for entry in entries {
        if state.is_cancelled() {
            debug!(root = %root, "Root listing cancelled");
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root, error = %e, "Failed to read directory entry");
                state.stats().increment_errors();
                continue;
            }
        };

        let Some(path) = utf8_path(state, entry.path()) else {
            continue;
        };

        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to read file type");
                state.stats().increment_errors();
                continue;
            }
        };

        if file_type.is_dir() {
            listing.subtrees.push(path);
        } else if file_type.is_file() {
            listing.files.push((path, entry));
        }
    }

    Ok(listing)
}

/// Dispatches each subtree of `listing` to `pool`, then evaluates the
/// root's own files on the calling thread.
///
/// Returns once the listing is exhausted or the scan is cancelled;
/// dispatched tasks may still be running. Each one is registered in the
/// state's task registry before it is spawned.
pub fn walk_root(state: &Arc<ScanState>, listing: RootListing, pool: &ThreadPool) {
    let RootListing {
        root,
        subtrees,
        files,
    } = listing;

    for dir in subtrees {
        if state.is_cancelled() {
            debug!(root = %root, "Root walk cancelled");
            return;
        }
        dispatch_subtree(state, pool, dir);
    }

    for (path, entry) in files {
        if state.is_cancelled() {
            debug!(root = %root, "Root walk cancelled");
            return;
        }
        visit_file(state, path, || entry.metadata());
    }
}

/// Registers and spawns a task that walks `dir` to completion.
fn dispatch_subtree(state: &Arc<ScanState>, pool: &ThreadPool, dir: Utf8PathBuf) {
    let id = state.tasks().register(&dir);
    state.stats().increment_tasks();
    trace!(dir = %dir, "Dispatching subtree");

    let guard = TaskGuard {
        state: Arc::clone(state),
        id,
    };
    pool.spawn(move || {
        walk_subtree(&guard.state, &dir);
        drop(guard);
    });
}

/// Removes a task from the registry when the task ends, even by unwinding.
struct TaskGuard {
    state: Arc<ScanState>,
    id: TaskId,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.state.tasks().complete(self.id);
    }
}

/// Walks the subtree at `dir` sequentially.
pub fn walk_subtree(state: &ScanState, dir: &Utf8Path) {
    if state.is_cancelled() {
        return;
    }

    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .build();

    for result in walker {
        if state.is_cancelled() {
            debug!(dir = %dir, "Subtree walk cancelled");
            return;
        }

        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir, error = %e, "Failed to access entry");
                state.stats().increment_errors();
                continue;
            }
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            state.stats().increment_directories();
        } else if file_type.is_file() {
            let Some(path) = utf8_path(state, entry.path().to_owned()) else {
                continue;
            };
            visit_file(state, path, || entry.metadata());
        }
    }
}

/// Evaluates one regular file and records it on a match.
///
/// Metadata is only fetched once the name has matched.
fn visit_file<E, F>(state: &ScanState, path: Utf8PathBuf, metadata: F)
where
    E: fmt::Display,
    F: FnOnce() -> Result<Metadata, E>,
{
    state.stats().increment_files();

    let predicate = state.predicate();
    if !path.file_name().is_some_and(|name| predicate.matches_name(name)) {
        return;
    }

    let metadata = match metadata() {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(path = %path, error = %e, "Failed to read metadata");
            state.stats().increment_errors();
            return;
        }
    };

    match predicate.check_attributes(&path, &metadata) {
        Verdict::Match => {
            debug!(path = %path, "File matched");
            state.stats().increment_matches();
            state.record_match(path);
        }
        Verdict::NoMatch => {}
        Verdict::Unreadable => state.stats().increment_content_skipped(),
    }
}

fn utf8_path(state: &ScanState, path: PathBuf) -> Option<Utf8PathBuf> {
    match Utf8PathBuf::try_from(path) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(path = %e.as_path().display(), "Skipping non-UTF-8 path");
            state.stats().increment_errors();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::MatchPredicate;
    use crate::state::WaitOutcome;
    use fscan_core::{ScanConfig, ScanRequest};
    use std::time::Duration;
    use tempfile::TempDir;

    fn state(mask: &str) -> Arc<ScanState> {
        let predicate =
            MatchPredicate::compile(&ScanRequest::new("/d", mask), &ScanConfig::default()).unwrap();
        Arc::new(ScanState::new(predicate))
    }

    fn pool(threads: usize) -> ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap()
    }

    fn tree() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("b.log"), "b").unwrap();
        fs::create_dir_all(root.join("sub/deeper/deepest")).unwrap();
        fs::write(root.join("sub/c.txt"), "c").unwrap();
        fs::write(root.join("sub/deeper/deepest/d.TXT"), "d").unwrap();
        fs::create_dir(root.join("other")).unwrap();
        fs::write(root.join("other/.hidden.txt"), "e").unwrap();
        (dir, root)
    }

    #[test]
    fn test_walk_root_fans_out_one_level() {
        let (_dir, root) = tree();
        let state = state("*.txt");
        let pool = pool(2);

        let listing = list_root(&state, &root).unwrap();
        assert_eq!(listing.subtree_count(), 2);
        walk_root(&state, listing, &pool);
        assert_eq!(state.wait_for_tasks(Duration::from_secs(30)), WaitOutcome::Idle);

        let snap = state.stats().snapshot();
        assert_eq!(snap.tasks, 2);
        assert_eq!(snap.files, 5);
        assert_eq!(
            state.sorted_results(),
            vec![
                root.join("a.txt"),
                root.join("other/.hidden.txt"),
                root.join("sub/c.txt"),
                root.join("sub/deeper/deepest/d.TXT"),
            ]
        );
    }

    #[test]
    fn test_walk_root_missing_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = Utf8PathBuf::try_from(dir.path().join("missing")).unwrap();
        let err = list_root(&state("*"), &missing).unwrap_err();
        assert!(matches!(err, ScanError::RootEnumeration { .. }));
    }

    #[test]
    fn test_cancelled_walkers_visit_nothing() {
        let (_dir, root) = tree();
        let state = state("*");
        let listing = list_root(&state, &root).unwrap();
        state.cancel();

        walk_root(&state, listing, &pool(1));
        walk_subtree(&state, &root);
        assert_eq!(list_root(&state, &root).unwrap().subtree_count(), 0);

        let snap = state.stats().snapshot();
        assert_eq!(snap.files, 0);
        assert_eq!(snap.tasks, 0);
        assert_eq!(state.match_count(), 0);
    }

    #[test]
    fn test_walk_subtree_is_sequential_and_complete() {
        let (_dir, root) = tree();
        let state = state("*");

        walk_subtree(&state, &root.join("sub"));

        let snap = state.stats().snapshot();
        assert_eq!(snap.directories, 3);
        assert_eq!(snap.files, 2);
        assert_eq!(snap.tasks, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let (_dir, root) = tree();
        std::os::unix::fs::symlink(root.join("sub"), root.join("other/link")).unwrap();
        std::os::unix::fs::symlink(root.join("a.txt"), root.join("other/alias.txt")).unwrap();

        let state = state("*.txt");
        walk_subtree(&state, &root.join("other"));

        assert_eq!(state.sorted_results(), vec![root.join("other/.hidden.txt")]);
    }
}
