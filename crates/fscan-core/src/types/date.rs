//! Whole-day modification-time bounds.

use std::fmt;
use std::time::SystemTime;

use chrono::{Local, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::RequestError;

/// Date format accepted for modification-time filters.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar day used as a modification-time bound.
///
/// The bound is the instant at local midnight starting that day. Both the
/// lower and the upper bound compare inclusively against that instant.
///
/// # Examples
///
/// ```
/// use fscan_core::DateBound;
///
/// let bound = DateBound::parse("modified_after", "2024-06-15").unwrap();
/// assert_eq!(bound.to_string(), "2024-06-15");
///
/// assert!(DateBound::parse("modified_after", "2024-13-01").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateBound {
    date: NaiveDate,
    instant: SystemTime,
}

impl DateBound {
    /// Parses a strict `YYYY-MM-DD` date.
    ///
    /// `field` names the request field in the error message.
    pub fn parse(field: &'static str, raw: &str) -> Result<Self, RequestError> {
        let date = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|source| {
            RequestError::InvalidDate {
                field,
                value: raw.to_owned(),
                source,
            }
        })?;
        Ok(Self::from_date(date))
    }

    /// Creates a bound from an already-parsed date.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        let midnight = date.and_time(NaiveTime::MIN);
        // A DST gap can swallow local midnight; UTC midnight is the closest stand-in.
        let instant = Local
            .from_local_datetime(&midnight)
            .earliest()
            .map_or_else(|| Utc.from_utc_datetime(&midnight).into(), SystemTime::from);
        Self { date, instant }
    }

    /// Returns the calendar date.
    #[inline]
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the instant compared against file modification times.
    #[inline]
    #[must_use]
    pub const fn instant(&self) -> SystemTime {
        self.instant
    }
}

impl fmt::Display for DateBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format(DATE_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let bound = DateBound::parse("modified_before", "2023-01-31").unwrap();
        assert_eq!(bound.date(), NaiveDate::from_ymd_opt(2023, 1, 31).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = DateBound::parse("modified_before", "not-a-date").unwrap_err();
        match err {
            RequestError::InvalidDate { field, value, .. } => {
                assert_eq!(field, "modified_before");
                assert_eq!(value, "not-a-date");
            }
            other => panic!("expected InvalidDate, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_is_strict() {
        assert!(DateBound::parse("modified_after", "2024-02-30").is_err());
        assert!(DateBound::parse("modified_after", "2024/02/01").is_err());
        assert!(DateBound::parse("modified_after", "2024-02-01T00:00").is_err());
    }

    #[test]
    fn test_instants_are_ordered_by_date() {
        let earlier = DateBound::parse("modified_after", "2020-01-01").unwrap();
        let later = DateBound::parse("modified_after", "2020-01-02").unwrap();
        assert!(earlier.instant() < later.instant());
    }
}
