//! Error types for the fscan-core crate.
//!
//! This module provides two error types:
//!
//! - [`RequestError`] for scan requests that are rejected before any
//!   filesystem access takes place
//! - [`ConfigError`] for configuration loading and validation failures

use camino::Utf8PathBuf;

/// Errors raised while validating a scan request.
///
/// A request that fails validation is rejected as a whole. None of these
/// errors are produced after traversal has started.
///
/// # Examples
///
/// ```
/// use fscan_core::{DateBound, RequestError};
///
/// let err = DateBound::parse("modified_after", "not-a-date").unwrap_err();
/// assert!(matches!(err, RequestError::InvalidDate { .. }));
/// assert!(err.to_string().contains("not-a-date"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// A date filter is not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date for {field}: '{value}' (expected YYYY-MM-DD)")]
    InvalidDate {
        /// The request field holding the malformed date.
        field: &'static str,
        /// The raw value supplied by the caller.
        value: String,
        /// The underlying parse error.
        #[source]
        source: chrono::ParseError,
    },

    /// The file name mask could not be compiled.
    #[error("invalid file mask '{mask}': {reason}")]
    InvalidMask {
        /// The mask as supplied by the caller.
        mask: String,
        /// Explanation of why the mask was rejected.
        reason: String,
    },

    /// No scan path was supplied.
    #[error("scan path must not be empty")]
    EmptyPath,
}

impl RequestError {
    /// Creates a new [`RequestError::InvalidMask`] error.
    #[inline]
    pub fn invalid_mask(mask: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMask {
            mask: mask.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use fscan_core::ConfigError;
///
/// let error = ConfigError::InvalidOption {
///     option: "scan.max_wait_ms".to_owned(),
///     reason: "must be positive".to_owned(),
/// };
/// assert!(error.to_string().contains("max_wait_ms"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// The configuration file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}
