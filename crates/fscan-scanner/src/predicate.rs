//! File match predicates.
//!
//! [`MatchPredicate`] is the compiled, read-only form of a request's
//! filters. It is built once per scan and shared by every walker.
//!
//! A file matches when it passes the name, size, time and (if active)
//! content checks. The walker evaluates them cheapest first: the name is
//! tested before any metadata is fetched, and the content is read last.
//!
//! # Examples
//!
//! ```
//! use fscan_core::{ScanConfig, ScanRequest};
//! use fscan_scanner::MatchPredicate;
//!
//! let request = ScanRequest::new("/data", "report-??.CSV");
//! let predicate = MatchPredicate::compile(&request, &ScanConfig::default()).unwrap();
//!
//! assert!(predicate.matches_name("report-01.csv"));
//! assert!(!predicate.matches_name("report-001.csv"));
//! assert!(!predicate.matches_name("report-01xcsv"));
//! ```

use std::fs::{self, Metadata};
use std::time::SystemTime;

use camino::Utf8Path;
use fscan_core::{RequestError, ScanConfig, ScanRequest};
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Result of evaluating a file's attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every active filter passed.
    Match,
    /// At least one filter rejected the file.
    NoMatch,
    /// The content filter could not load the file; counted as a non-match.
    Unreadable,
}

/// Content filter settings.
#[derive(Debug, Clone)]
struct ContentFilter {
    needle: String,
    config: ScanConfig,
}

/// Compiled filters for one scan.
#[derive(Debug, Clone)]
pub struct MatchPredicate {
    name: Regex,
    min_size: Option<u64>,
    max_size: Option<u64>,
    modified_after: Option<SystemTime>,
    modified_before: Option<SystemTime>,
    content: Option<ContentFilter>,
}

impl MatchPredicate {
    /// Compiles the request's filters.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidMask`] if the translated mask exceeds
    /// the regex engine's limits.
    pub fn compile(request: &ScanRequest, config: &ScanConfig) -> Result<Self, RequestError> {
        let name = RegexBuilder::new(&mask_to_pattern(&request.mask))
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| RequestError::invalid_mask(&request.mask, e.to_string()))?;

        let content = request.contains_text.as_ref().map(|needle| ContentFilter {
            needle: needle.clone(),
            config: config.clone(),
        });

        Ok(Self {
            name,
            min_size: request.min_size,
            max_size: request.max_size,
            modified_after: request.modified_after.map(|b| b.instant()),
            modified_before: request.modified_before.map(|b| b.instant()),
            content,
        })
    }

    /// Tests a base file name against the mask.
    #[inline]
    #[must_use]
    pub fn matches_name(&self, file_name: &str) -> bool {
        self.name.is_match(file_name)
    }

    /// Tests a byte length against the size bounds.
    #[must_use]
    pub fn matches_size(&self, len: u64) -> bool {
        self.min_size.is_none_or(|min| len >= min) && self.max_size.is_none_or(|max| len <= max)
    }

    /// Tests a modification instant against the date bounds.
    #[must_use]
    pub fn matches_time(&self, modified: SystemTime) -> bool {
        self.modified_after.is_none_or(|after| modified >= after)
            && self.modified_before.is_none_or(|before| modified <= before)
    }

    /// Returns `true` if a time filter is active.
    #[inline]
    #[must_use]
    pub const fn has_time_filter(&self) -> bool {
        self.modified_after.is_some() || self.modified_before.is_some()
    }

    /// Returns `true` if a content filter is active.
    #[inline]
    #[must_use]
    pub const fn has_content_filter(&self) -> bool {
        self.content.is_some()
    }

    /// Evaluates size, time and content for a file whose name already matched.
    pub fn check_attributes(&self, path: &Utf8Path, metadata: &Metadata) -> Verdict {
        let len = metadata.len();
        if !self.matches_size(len) {
            return Verdict::NoMatch;
        }

        if self.has_time_filter() {
            match metadata.modified() {
                Ok(modified) if self.matches_time(modified) => {}
                Ok(_) => return Verdict::NoMatch,
                Err(e) => {
                    warn!(path = %path, error = %e, "Modification time unavailable");
                    return Verdict::NoMatch;
                }
            }
        }

        match &self.content {
            Some(filter) => filter.check(path, len),
            None => Verdict::Match,
        }
    }
}

impl ContentFilter {
    fn check(&self, path: &Utf8Path, len: u64) -> Verdict {
        let allowed = path
            .extension()
            .is_some_and(|ext| self.config.allows_content_extension(ext));
        if !allowed {
            return Verdict::NoMatch;
        }

        let limit = self.config.max_content_bytes;
        if len > limit {
            warn!(path = %path, len, limit, "File too large for content search");
            return Verdict::Unreadable;
        }

        match fs::read(path) {
            Ok(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) if text.contains(self.needle.as_str()) => Verdict::Match,
                Ok(_) => Verdict::NoMatch,
                Err(e) => {
                    warn!(path = %path, error = %e, "File is not valid UTF-8, skipping content search");
                    Verdict::Unreadable
                }
            },
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to read file for content search");
                Verdict::Unreadable
            }
        }
    }
}

/// Translates a wildcard mask into an anchored regex.
///
/// `*` becomes `.*`, `?` becomes `.`, every other character is literal.
fn mask_to_pattern(mask: &str) -> String {
    let mut pattern = String::with_capacity(mask.len() * 2 + 8);
    pattern.push_str("^(?:");
    let mut buf = [0u8; 4];
    for c in mask.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    pattern.push_str(")$");
    pattern
}
