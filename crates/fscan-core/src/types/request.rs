//! Scan request types.
//!
//! A request enters the system as [`ScanParams`], which mirrors what a
//! caller can express at the boundary (sizes in KiB, dates as strings, a
//! free-form thread spec). [`ScanParams::into_request`] validates it into a
//! [`ScanRequest`] without touching the filesystem.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use super::concurrency::Concurrency;
use super::date::DateBound;
use crate::error::RequestError;

/// Bytes per kibibyte, the unit size filters use at the boundary.
pub const KIB: u64 = 1024;

/// Raw scan parameters as received from a caller.
///
/// Absent and empty values both mean "no filter".
///
/// # Examples
///
/// ```
/// use fscan_core::ScanParams;
///
/// let params: ScanParams = serde_json::from_str(
///     r#"{"path": "/var/log", "mask": "*.log", "min_size_kb": 1}"#,
/// ).unwrap();
/// let request = params.into_request().unwrap();
/// assert_eq!(request.min_size, Some(1024));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParams {
    /// Directory to scan.
    pub path: String,
    /// Shell-style wildcard applied to file base names.
    pub mask: String,
    /// `auto` or a positive worker count.
    pub threads: Option<String>,
    /// Minimum file size in KiB, inclusive.
    pub min_size_kb: Option<u64>,
    /// Maximum file size in KiB, inclusive.
    pub max_size_kb: Option<u64>,
    /// Earliest modification day, `YYYY-MM-DD`.
    pub modified_after: Option<String>,
    /// Latest modification day, `YYYY-MM-DD`.
    pub modified_before: Option<String>,
    /// Literal text the file content must contain.
    pub contains_text: Option<String>,
}

impl ScanParams {
    /// Validates the parameters into a [`ScanRequest`].
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::EmptyPath`] for an empty path and
    /// [`RequestError::InvalidDate`] if either date is malformed. A bad
    /// thread spec is not an error.
    pub fn into_request(self) -> Result<ScanRequest, RequestError> {
        if self.path.trim().is_empty() {
            return Err(RequestError::EmptyPath);
        }

        let modified_after = non_blank(self.modified_after)
            .map(|raw| DateBound::parse("modified_after", &raw))
            .transpose()?;
        let modified_before = non_blank(self.modified_before)
            .map(|raw| DateBound::parse("modified_before", &raw))
            .transpose()?;

        Ok(ScanRequest {
            root: Utf8PathBuf::from(self.path),
            mask: self.mask,
            concurrency: self
                .threads
                .as_deref()
                .map_or(Concurrency::Auto, Concurrency::parse),
            min_size: self.min_size_kb.map(|kb| kb.saturating_mul(KIB)),
            max_size: self.max_size_kb.map(|kb| kb.saturating_mul(KIB)),
            modified_after,
            modified_before,
            contains_text: self.contains_text.filter(|text| !text.is_empty()),
        })
    }
}

/// Drops blank date strings; the content needle keeps its whitespace.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A validated scan request.
///
/// Sizes are in bytes. Bounds are applied independently; an inverted pair
/// (minimum above maximum) is accepted and simply matches nothing.
///
/// # Examples
///
/// ```
/// use fscan_core::{Concurrency, ScanRequest};
///
/// let request = ScanRequest::new("/srv/data", "*.csv")
///     .with_min_size(4096)
///     .with_contains_text("total")
///     .with_concurrency(Concurrency::parse("2"));
///
/// assert_eq!(request.min_size, Some(4096));
/// assert!(request.has_content_filter());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Directory to scan.
    pub root: Utf8PathBuf,
    /// Shell-style wildcard applied to file base names.
    pub mask: String,
    /// Worker concurrency.
    pub concurrency: Concurrency,
    /// Minimum size in bytes, inclusive.
    pub min_size: Option<u64>,
    /// Maximum size in bytes, inclusive.
    pub max_size: Option<u64>,
    /// Lower modification-time bound, inclusive.
    pub modified_after: Option<DateBound>,
    /// Upper modification-time bound, inclusive.
    pub modified_before: Option<DateBound>,
    /// Non-empty literal text the content must contain.
    pub contains_text: Option<String>,
}

impl ScanRequest {
    /// Creates a request with only a root and a mask.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, mask: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            mask: mask.into(),
            concurrency: Concurrency::Auto,
            min_size: None,
            max_size: None,
            modified_after: None,
            modified_before: None,
            contains_text: None,
        }
    }

    /// Sets the worker concurrency.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the minimum size in bytes.
    #[must_use]
    pub const fn with_min_size(mut self, bytes: u64) -> Self {
        self.min_size = Some(bytes);
        self
    }

    /// Sets the maximum size in bytes.
    #[must_use]
    pub const fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    /// Sets the lower modification-time bound.
    #[must_use]
    pub const fn with_modified_after(mut self, bound: DateBound) -> Self {
        self.modified_after = Some(bound);
        self
    }

    /// Sets the upper modification-time bound.
    #[must_use]
    pub const fn with_modified_before(mut self, bound: DateBound) -> Self {
        self.modified_before = Some(bound);
        self
    }

    /// Sets the content filter. Empty text leaves the filter inactive.
    #[must_use]
    pub fn with_contains_text(mut self, text: impl Into<String>) -> Self {
        self.contains_text = Some(text.into()).filter(|t| !t.is_empty());
        self
    }

    /// Returns `true` if a content filter is active.
    #[inline]
    #[must_use]
    pub const fn has_content_filter(&self) -> bool {
        self.contains_text.is_some()
    }

    /// Returns `true` if the size or date bounds can never both hold.
    #[must_use]
    pub fn has_inverted_bounds(&self) -> bool {
        let sizes = matches!((self.min_size, self.max_size), (Some(min), Some(max)) if min > max);
        let dates = matches!(
            (self.modified_after, self.modified_before),
            (Some(after), Some(before)) if after.instant() > before.instant()
        );
        sizes || dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(path: &str, mask: &str) -> ScanParams {
        ScanParams {
            path: path.to_owned(),
            mask: mask.to_owned(),
            ..ScanParams::default()
        }
    }

    #[test]
    fn test_into_request_converts_kib() {
        let request = ScanParams {
            min_size_kb: Some(1),
            max_size_kb: Some(10),
            ..params("/data", "*.log")
        }
        .into_request()
        .unwrap();

        assert_eq!(request.min_size, Some(1024));
        assert_eq!(request.max_size, Some(10 * 1024));
    }

    #[test]
    fn test_into_request_saturates_huge_sizes() {
        let request = ScanParams {
            max_size_kb: Some(u64::MAX),
            ..params("/data", "*")
        }
        .into_request()
        .unwrap();
        assert_eq!(request.max_size, Some(u64::MAX));
    }

    #[test]
    fn test_into_request_empty_values_are_absent() {
        let request = ScanParams {
            modified_after: Some(String::new()),
            modified_before: Some("  ".to_owned()),
            contains_text: Some(String::new()),
            ..params("/data", "*")
        }
        .into_request()
        .unwrap();

        assert!(request.modified_after.is_none());
        assert!(request.modified_before.is_none());
        assert!(!request.has_content_filter());
    }

    #[test]
    fn test_into_request_keeps_whitespace_needle() {
        let request = ScanParams {
            contains_text: Some(" ".to_owned()),
            ..params("/data", "*")
        }
        .into_request()
        .unwrap();

        assert_eq!(request.contains_text.as_deref(), Some(" "));
        assert_eq!(
            request,
            ScanRequest::new("/data", "*").with_contains_text(" ")
        );
    }

    #[test]
    fn test_into_request_rejects_bad_dates() {
        let after = ScanParams {
            modified_after: Some("not-a-date".to_owned()),
            ..params("/data", "*")
        };
        assert!(matches!(
            after.into_request(),
            Err(RequestError::InvalidDate { field: "modified_after", .. })
        ));

        let before = ScanParams {
            modified_before: Some("2024-99-01".to_owned()),
            ..params("/data", "*")
        };
        assert!(matches!(
            before.into_request(),
            Err(RequestError::InvalidDate { field: "modified_before", .. })
        ));
    }

    #[test]
    fn test_into_request_rejects_empty_path() {
        assert!(matches!(
            params("", "*").into_request(),
            Err(RequestError::EmptyPath)
        ));
    }

    #[test]
    fn test_into_request_thread_fallback() {
        let request = ScanParams {
            threads: Some("zero".to_owned()),
            ..params("/data", "*")
        }
        .into_request()
        .unwrap();
        assert_eq!(request.concurrency, Concurrency::Auto);
    }

    #[test]
    fn test_inverted_bounds() {
        assert!(!ScanRequest::new("/d", "*").has_inverted_bounds());
        assert!(
            ScanRequest::new("/d", "*")
                .with_min_size(10)
                .with_max_size(5)
                .has_inverted_bounds()
        );

        let after = DateBound::parse("modified_after", "2024-02-01").unwrap();
        let before = DateBound::parse("modified_before", "2024-01-01").unwrap();
        assert!(
            ScanRequest::new("/d", "*")
                .with_modified_after(after)
                .with_modified_before(before)
                .has_inverted_bounds()
        );
    }

    #[test]
    fn test_with_contains_text_ignores_empty() {
        assert!(!ScanRequest::new("/d", "*").with_contains_text("").has_content_filter());
        assert!(ScanRequest::new("/d", "*").with_contains_text("x").has_content_filter());
    }
}
