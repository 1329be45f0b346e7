//! Calendar bucketing for the analytics endpoints.
//!
//! Everything in here runs against one explicit reference time zone carried by a
//! [`Calendar`] value. The same calendar is used to build the chart x-axis and to label
//! the rows coming back from the storage engine, so the two always join on the same keys.
//!
//! # Example
//!
//! ```
//! use shared::time::{Calendar, Interval};
//!
//! let calendar = Calendar::new(chrono_tz::UTC);
//! let range = calendar
//!     .normalize_range(Some("2023-01-31"), Some("2023-03-01"))
//!     .unwrap();
//!
//! assert_eq!(
//!     calendar.axis(&range, Interval::Month),
//!     vec!["2023-01", "2023-02", "2023-03"]
//! );
//! ```

mod bucket;
mod label;
mod period;
mod range;

pub use label::label_date;
pub use period::PeriodKey;
pub use range::{parse_stored_timestamp, DateRange};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Default number of years a range reaches back when no `from` is given.
pub const DEFAULT_LOOKBACK_YEARS: u32 = 10;

/// Granularity of the buckets a range is split into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// One bucket per calendar day.
    Day,
    /// One bucket per ISO week (Monday to Sunday).
    Week,
    /// One bucket per calendar month.
    #[default]
    Month,
}

impl Interval {
    /// Returns the wire token for this interval.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(TimeError::UnknownInterval(s.to_string())),
        }
    }
}

/// Errors raised while interpreting calendar input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The date string matched none of the accepted formats.
    #[error("Invalid date '{0}': expected YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339")]
    InvalidDate(String),

    /// The time zone name is not in the IANA database.
    #[error("Unknown time zone '{0}'")]
    UnknownTimezone(String),

    /// The interval token is not one of day, week or month.
    #[error("Unknown interval '{0}': expected day, week or month")]
    UnknownInterval(String),
}

/// Calendar arithmetic pinned to a single reference time zone.
///
/// Range normalization, bucket generation and labeling all go through this type so a
/// deployment can never mix zones between the x-axis and the aggregated rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    zone: Tz,
    lookback_years: u32,
}

impl Calendar {
    /// Creates a calendar for the given reference zone with the default lookback.
    #[must_use]
    pub const fn new(zone: Tz) -> Self {
        Self {
            zone,
            lookback_years: DEFAULT_LOOKBACK_YEARS,
        }
    }

    /// Creates a calendar from an IANA zone name such as `America/Bogota`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::UnknownTimezone`] if the name is not a known zone.
    pub fn from_zone_name(name: &str) -> Result<Self, TimeError> {
        name.trim()
            .parse::<Tz>()
            .map(Self::new)
            .map_err(|_| TimeError::UnknownTimezone(name.to_string()))
    }

    /// Sets how many years the default range start reaches back.
    #[must_use]
    pub const fn with_lookback_years(mut self, years: u32) -> Self {
        self.lookback_years = years;
        self
    }

    /// Returns the reference time zone.
    #[must_use]
    pub const fn zone(&self) -> Tz {
        self.zone
    }

    /// Returns the configured lookback in years.
    #[must_use]
    pub const fn lookback_years(&self) -> u32 {
        self.lookback_years
    }

    /// Returns the calendar date of an instant in the reference zone.
    pub(crate) fn local_date<Z: TimeZone>(&self, instant: &DateTime<Z>) -> NaiveDate {
        instant.with_timezone(&self.zone).date_naive()
    }

    /// Returns the first instant of `date` in the reference zone.
    pub(crate) fn local_midnight(&self, date: NaiveDate) -> DateTime<Tz> {
        self.resolve_local(date.and_time(NaiveTime::MIN))
    }

    /// Maps a wall-clock time to an instant. Ambiguous times take the earlier
    /// instant; times skipped by a DST jump move forward to the end of the gap.
    pub(crate) fn resolve_local(&self, naive: NaiveDateTime) -> DateTime<Tz> {
        if let Some(instant) = self.zone.from_local_datetime(&naive).earliest() {
            return instant;
        }
        (1..=4)
            .find_map(|step| {
                self.zone
                    .from_local_datetime(&(naive + TimeDelta::minutes(30 * step)))
                    .earliest()
            })
            .unwrap_or_else(|| self.zone.from_utc_datetime(&naive))
    }
}
