//! Request types for fscan.
//!
//! # Module Organization
//!
//! - [`concurrency`] - worker count specification
//! - [`date`] - whole-day modification-time bounds
//! - [`request`] - boundary parameters and validated scan requests
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use fscan_core::{Concurrency, DateBound, ScanParams, ScanRequest};
//! ```

mod concurrency;
mod date;
mod request;

pub use concurrency::Concurrency;
pub use date::DateBound;
pub use request::{KIB, ScanParams, ScanRequest};
