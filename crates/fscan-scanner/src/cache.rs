//! Time-bounded cache of scan results.
//!
//! This module provides [`ResultCache`], a thread-safe map from a
//! [`QuerySignature`] to the sorted paths a completed scan produced.
//!
//! # Access Pattern
//!
//! - **Never exposes references** into the map; lookups clone the paths
//! - **Short lock scopes**: no lock is held while a scan runs
//! - **Expiry on read**: an entry older than the TTL is treated as absent
//!   but not purged
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use camino::{Utf8Path, Utf8PathBuf};
//! use fscan_core::ScanRequest;
//! use fscan_scanner::{QuerySignature, ResultCache};
//!
//! let cache = ResultCache::new(Duration::from_secs(60));
//! let request = ScanRequest::new("/data", "*.txt");
//! let signature = QuerySignature::new(Utf8Path::new("/data"), &request);
//!
//! cache.store(signature.clone(), vec![Utf8PathBuf::from("/data/a.txt")]);
//! assert_eq!(cache.lookup(&signature).map(|paths| paths.len()), Some(1));
//! ```

use std::fmt::{self, Write as _};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use fscan_core::ScanRequest;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

/// Marker for a filter that is not set.
const ABSENT: &str = "~";

/// Separator between encoded fields.
const SEPARATOR: char = '|';

/// Canonical encoding of every filter of a request.
///
/// Each present field is written as `<byte length>:<value>`, so values that
/// contain the separator cannot collide with another field layout. Absent
/// fields are written as `~`. The mask is lowercased because name matching
/// ignores case. Concurrency does not affect the result and is not part of
/// the signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature(String);

impl QuerySignature {
    /// Builds the signature of `request` scanned at the absolute `root`.
    #[must_use]
    pub fn new(root: &Utf8Path, request: &ScanRequest) -> Self {
        let mut encoded = String::new();
        push_field(&mut encoded, Some(root.as_str()));
        push_field(&mut encoded, Some(&request.mask.to_lowercase()));
        push_field(&mut encoded, request.min_size.map(|n| n.to_string()).as_deref());
        push_field(&mut encoded, request.max_size.map(|n| n.to_string()).as_deref());
        push_field(
            &mut encoded,
            request.modified_after.map(|d| d.to_string()).as_deref(),
        );
        push_field(
            &mut encoded,
            request.modified_before.map(|d| d.to_string()).as_deref(),
        );
        push_field(&mut encoded, request.contains_text.as_deref());
        Self(encoded)
    }

    /// Returns the encoded signature.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn push_field(encoded: &mut String, value: Option<&str>) {
    if !encoded.is_empty() {
        encoded.push(SEPARATOR);
    }
    match value {
        // Writing to a String cannot fail.
        Some(value) => {
            let _ = write!(encoded, "{}:{value}", value.len());
        }
        None => encoded.push_str(ABSENT),
    }
}

/// A stored result set.
#[derive(Debug, Clone)]
struct CacheEntry {
    paths: Vec<Utf8PathBuf>,
    created: Instant,
}

/// A thread-safe result cache with a fixed TTL.
///
/// `ResultCache` is `Send` and `Sync`; concurrent scans share one instance
/// through the [`Scanner`](crate::Scanner).
#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    entries: RwLock<FxHashMap<QuerySignature, CacheEntry>>,
}

impl ResultCache {
    /// Creates an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Returns a clone of the paths stored under `signature`, unless the
    /// entry is missing or expired.
    #[must_use]
    pub fn lookup(&self, signature: &QuerySignature) -> Option<Vec<Utf8PathBuf>> {
        self.lookup_at(signature, Instant::now())
    }

    pub(crate) fn lookup_at(
        &self,
        signature: &QuerySignature,
        now: Instant,
    ) -> Option<Vec<Utf8PathBuf>> {
        let entries = self.entries.read();
        let entry = entries.get(signature)?;
        if now.saturating_duration_since(entry.created) < self.ttl {
            Some(entry.paths.clone())
        } else {
            debug!(signature = %signature, "Cache entry expired");
            None
        }
    }

    /// Stores `paths` under `signature`, replacing any previous entry.
    pub fn store(&self, signature: QuerySignature, paths: Vec<Utf8PathBuf>) {
        let entry = CacheEntry {
            paths,
            created: Instant::now(),
        };
        self.entries.write().insert(signature, entry);
    }

    /// Removes the entry stored under `signature`, if any.
    pub fn remove(&self, signature: &QuerySignature) -> bool {
        self.entries.write().remove(signature).is_some()
    }

    /// Invalidates every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let dropped = entries.len();
        entries.clear();
        info!(entries = dropped, "Cache cleared");
    }

    /// Returns the number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the entry lifetime.
    #[inline]
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fscan_core::DateBound;

    fn signature(request: &ScanRequest) -> QuerySignature {
        QuerySignature::new(&request.root, request)
    }

    fn paths(names: &[&str]) -> Vec<Utf8PathBuf> {
        names.iter().map(Utf8PathBuf::from).collect()
    }

    #[test]
    fn test_signature_encoding() {
        let request = ScanRequest::new("/data", "*.TXT")
            .with_min_size(1024)
            .with_modified_after(DateBound::parse("modified_after", "2024-01-31").unwrap())
            .with_contains_text("a|b");

        insta::assert_snapshot!(
            signature(&request).as_str(),
            @"5:/data|5:*.txt|4:1024|~|10:2024-01-31|~|3:a|b"
        );
    }

    #[test]
    fn test_signature_separator_in_values_is_unambiguous() {
        let a = ScanRequest::new("/d", "x").with_contains_text("|~");
        let b = ScanRequest::new("/d", "x|~").with_contains_text("~");
        assert_ne!(signature(&a), signature(&b));
    }

    #[test]
    fn test_signature_ignores_mask_case_and_concurrency() {
        let a = ScanRequest::new("/d", "*.TXT");
        let b = ScanRequest::new("/d", "*.txt")
            .with_concurrency(fscan_core::Concurrency::parse("3"));
        assert_eq!(signature(&a), signature(&b));
    }

    #[test]
    fn test_signature_distinguishes_every_filter() {
        let base = ScanRequest::new("/d", "*");
        let variants = [
            base.clone().with_min_size(0),
            base.clone().with_max_size(0),
            base.clone()
                .with_modified_after(DateBound::parse("modified_after", "2024-01-01").unwrap()),
            base.clone()
                .with_modified_before(DateBound::parse("modified_before", "2024-01-01").unwrap()),
            base.clone().with_contains_text("x"),
            ScanRequest::new("/e", "*"),
        ];
        for variant in &variants {
            assert_ne!(signature(&base), signature(variant));
        }
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let sig = signature(&ScanRequest::new("/d", "*"));
        assert!(cache.lookup(&sig).is_none());

        cache.store(sig.clone(), paths(&["/d/a", "/d/b"]));
        assert_eq!(cache.lookup(&sig), Some(paths(&["/d/a", "/d/b"])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entry_expires_at_ttl() {
        let cache = ResultCache::new(Duration::from_secs(10));
        let sig = signature(&ScanRequest::new("/d", "*"));
        cache.store(sig.clone(), paths(&["/d/a"]));

        let now = Instant::now();
        assert!(cache.lookup_at(&sig, now).is_some());
        assert!(cache.lookup_at(&sig, now + Duration::from_secs(10)).is_none());
        // Expired entries are not purged.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_ttl_never_hits() {
        let cache = ResultCache::new(Duration::ZERO);
        let sig = signature(&ScanRequest::new("/d", "*"));
        cache.store(sig.clone(), Vec::new());
        assert!(cache.lookup(&sig).is_none());
    }

    #[test]
    fn test_store_replaces() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let sig = signature(&ScanRequest::new("/d", "*"));
        cache.store(sig.clone(), paths(&["/d/a"]));
        cache.store(sig.clone(), paths(&["/d/b"]));
        assert_eq!(cache.lookup(&sig), Some(paths(&["/d/b"])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let a = signature(&ScanRequest::new("/d", "a"));
        let b = signature(&ScanRequest::new("/d", "b"));
        cache.store(a.clone(), Vec::new());
        cache.store(b.clone(), Vec::new());

        assert!(cache.remove(&a));
        assert!(!cache.remove(&a));
        assert!(cache.lookup(&b).is_some());

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.lookup(&b).is_none());
    }

    #[test]
    fn test_concurrent_store_and_lookup() {
        let cache = ResultCache::new(Duration::from_secs(60));
        std::thread::scope(|s| {
            for i in 0..8 {
                let cache = &cache;
                s.spawn(move || {
                    let sig = signature(&ScanRequest::new("/d", format!("m{i}")));
                    cache.store(sig.clone(), paths(&["/d/x"]));
                    assert!(cache.lookup(&sig).is_some());
                });
            }
        });
        assert_eq!(cache.len(), 8);
    }
}
