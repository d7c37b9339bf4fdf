//! Error types for the fscan-scanner crate.
//!
//! This module provides [`ScanError`], the error a scan reports to its
//! caller.
//!
//! # Error Recovery Strategy
//!
//! Only request-level and infrastructure-level failures become a
//! [`ScanError`]:
//!
//! - **Invalid argument** ([`ScanError::InvalidArgument`]): the request is
//!   rejected before any traversal starts
//! - **Infrastructure** ([`ScanError::RootEnumeration`], [`ScanError::Pool`],
//!   [`ScanError::NonUtf8Path`]): the scan cannot run at all
//!
//! A file or directory that cannot be read during the walk is logged and
//! skipped. An interrupted scan is not an error either; it returns a
//! partial result.
//!
//! # Examples
//!
//! ```
//! use fscan_core::RequestError;
//! use fscan_scanner::ScanError;
//!
//! let err = ScanError::from(RequestError::EmptyPath);
//! assert!(err.is_invalid_argument());
//! assert!(!err.is_infrastructure());
//! ```

use camino::Utf8PathBuf;
use fscan_core::RequestError;

/// Errors that abort a scan request.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The request failed validation.
    #[error(transparent)]
    InvalidArgument(#[from] RequestError),

    /// The scan root exists but could not be listed.
    #[error("failed to enumerate scan root {path}: {source}")]
    RootEnumeration {
        /// The scan root.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// The absolute scan root is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),
}

impl ScanError {
    /// Creates a new [`ScanError::RootEnumeration`] error.
    #[inline]
    pub fn root_enumeration(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::RootEnumeration {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the caller supplied a malformed request.
    #[inline]
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns `true` if the failure lies in the environment, not the request.
    #[inline]
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        !self.is_invalid_argument()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_root_enumeration() {
        let err = ScanError::root_enumeration(
            "/srv/data",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_infrastructure());
        assert!(err.to_string().contains("/srv/data"));
    }

    #[test]
    fn test_invalid_argument_is_transparent() {
        let err = ScanError::from(RequestError::invalid_mask("[", "bad"));
        assert!(err.is_invalid_argument());
        assert_eq!(err.to_string(), "invalid file mask '[': bad");
    }

    #[test]
    fn test_non_utf8_display() {
        let err = ScanError::NonUtf8Path(std::path::PathBuf::from("/tmp/x"));
        assert!(err.is_infrastructure());
        assert!(err.to_string().contains("/tmp/x"));
    }
}
