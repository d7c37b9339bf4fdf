//! Configuration structures for fscan.
//!
//! - [`CacheConfig`] - result cache settings (time-to-live)
//! - [`ScanConfig`] - scanner settings (wait bound, pool size cap, content filter limits)
//! - [`Config`] - root configuration combining both
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a configuration file only needs to name the
//! values it overrides.

use std::time::Duration;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File extensions whose contents may be searched by a content filter.
///
/// Files with any other extension never match while a content filter is
/// active.
pub const DEFAULT_CONTENT_EXTENSIONS: &[&str] = &[
    "txt", "log", "csv", "tsv", "json", "xml", "html", "htm", "md", "yml", "yaml", "toml", "ini",
    "cfg", "conf", "properties", "sql", "sh", "java", "kt", "py", "js", "ts", "rs", "go", "c",
    "h", "cpp", "hpp", "cs", "rb", "php", "css",
];

/// Configuration for the scan result cache.
///
/// # Examples
///
/// ```
/// use fscan_core::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::default();
/// assert_eq!(config.ttl(), Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a cached result stays valid, in milliseconds.
    ///
    /// Zero disables caching: every entry is already stale when stored.
    pub ttl_ms: u64,
}

impl CacheConfig {
    /// Returns the time-to-live as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_ms: 60_000 }
    }
}

/// Configuration for the directory scanner.
///
/// # Examples
///
/// ```
/// use fscan_core::ScanConfig;
///
/// let config = ScanConfig::default();
/// assert_eq!(config.max_wait_ms, 60_000);
/// assert!(config.allows_content_extension("TXT"));
/// assert!(!config.allows_content_extension("png"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Upper bound, in milliseconds, on how long a scan waits for its
    /// dispatched subtree tasks before giving up on them.
    pub max_wait_ms: u64,

    /// Largest worker pool a single scan may build, whatever concurrency
    /// the request asks for.
    pub max_threads: usize,

    /// Files larger than this are never loaded for a content search.
    pub max_content_bytes: u64,

    /// Extensions (without the dot, compared case-insensitively) eligible
    /// for content search.
    pub content_extensions: Vec<String>,
}

impl ScanConfig {
    /// Returns the wait bound as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Returns `true` if files with `extension` may be content-searched.
    #[must_use]
    pub fn allows_content_extension(&self, extension: &str) -> bool {
        self.content_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: 60_000,
            max_threads: 256,
            max_content_bytes: 16 * 1024 * 1024,
            content_extensions: DEFAULT_CONTENT_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_owned())
                .collect(),
        }
    }
}

/// Root configuration for fscan.
///
/// # Examples
///
/// ```
/// use fscan_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"cache": {"ttl_ms": 500}}"#).unwrap();
/// assert_eq!(config.cache.ttl_ms, 500);
/// assert_eq!(config.scan.max_wait_ms, 60_000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Result cache configuration.
    pub cache: CacheConfig,

    /// Scanner configuration.
    pub scan: ScanConfig,
}

impl Config {
    /// Loads and validates a configuration from a JSON file.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks option values that deserialize fine but cannot be honoured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.max_wait_ms == 0 {
            return Err(ConfigError::invalid_option(
                "scan.max_wait_ms",
                "must be greater than zero",
            ));
        }
        if self.scan.max_threads == 0 {
            return Err(ConfigError::invalid_option(
                "scan.max_threads",
                "must be greater than zero",
            ));
        }
        if self.scan.content_extensions.is_empty() {
            return Err(ConfigError::invalid_option(
                "scan.content_extensions",
                "at least one extension is required",
            ));
        }
        Ok(())
    }
}
