//! Worker concurrency specification.

use std::fmt;
use std::num::NonZeroUsize;

use tracing::warn;

/// How many worker threads a scan should use.
///
/// The boundary accepts either the literal `auto` or a positive integer.
/// Anything else is not an error: it falls back to [`Concurrency::Auto`]
/// with a logged warning.
///
/// # Examples
///
/// ```
/// use fscan_core::Concurrency;
///
/// assert_eq!(Concurrency::parse("auto"), Concurrency::Auto);
/// assert_eq!(Concurrency::parse("4").resolve(), 4);
/// assert_eq!(Concurrency::parse("-2"), Concurrency::Auto);
/// assert!(Concurrency::Auto.resolve() >= 1);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Concurrency {
    /// Use the host's available parallelism.
    #[default]
    Auto,
    /// Use exactly this many workers.
    Fixed(NonZeroUsize),
}

impl Concurrency {
    /// Parses a thread specification, falling back to `Auto` on bad input.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        if spec.is_empty() || spec.eq_ignore_ascii_case("auto") {
            return Self::Auto;
        }

        match spec.parse::<i64>() {
            Ok(n) => match usize::try_from(n).ok().and_then(NonZeroUsize::new) {
                Some(n) => Self::Fixed(n),
                None => {
                    warn!(threads = n, "Thread count must be positive, using available processors");
                    Self::Auto
                }
            },
            Err(_) => {
                warn!(threads = spec, "Unrecognised thread count, using available processors");
                Self::Auto
            }
        }
    }

    /// Resolves to a concrete worker count (always at least one).
    #[must_use]
    pub fn resolve(self) -> usize {
        match self {
            Self::Auto => std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            Self::Fixed(n) => n.get(),
        }
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Fixed(n) => write!(f, "{n}"),
        }
    }
}
