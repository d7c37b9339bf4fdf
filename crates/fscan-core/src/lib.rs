//! Core request types, configuration, and errors for fscan.
//!
//! This crate provides the foundational types shared by the scanner and the
//! command-line front end:
//!
//! - [`ScanParams`] - the raw, boundary-level form of a scan request
//! - [`ScanRequest`] - a validated request with sizes in bytes and parsed dates
//! - [`Concurrency`] - worker-count specification (`auto` or an explicit count)
//! - [`Config`] - cache and scanner configuration, loadable from JSON
//! - Error types for request validation and configuration loading

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{CacheConfig, Config, DEFAULT_CONTENT_EXTENSIONS, ScanConfig};
pub use error::{ConfigError, RequestError};
pub use types::{Concurrency, DateBound, KIB, ScanParams, ScanRequest};
