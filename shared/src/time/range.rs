//! Range normalization and date parsing.

use super::{Calendar, TimeError};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Accepted wall-clock formats, tried in order after RFC 3339.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A closed `[start, end]` interval of instants.
///
/// A range whose `start` lies after its `end` is empty: it produces no buckets and
/// therefore an empty chart axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First instant of the range (inclusive).
    pub start: DateTime<Utc>,
    /// Last instant of the range (inclusive).
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a range from two instants.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Returns true if the range contains no instant at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Returns true if `instant` falls inside the range, bounds included.
    #[must_use]
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.start <= *instant && *instant <= self.end
    }
}

impl Calendar {
    /// Parses a request-supplied date or timestamp.
    ///
    /// RFC 3339 strings carry their own offset. Everything else (`YYYY-MM-DD`,
    /// `YYYY-MM-DD HH:MM[:SS]`, with `T` or a space) is read as wall-clock time in the
    /// reference zone; a bare date means local midnight.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::InvalidDate`] if the input matches none of the formats.
    pub fn parse_instant(&self, input: &str) -> Result<DateTime<Utc>, TimeError> {
        let trimmed = input.trim();
        if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(instant.with_timezone(&Utc));
        }
        parse_naive(trimmed)
            .map(|naive| self.resolve_local(naive).with_timezone(&Utc))
            .ok_or_else(|| TimeError::InvalidDate(input.to_string()))
    }

    /// Turns optional `from`/`to` strings into a concrete range, using the current time
    /// when `to` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::InvalidDate`] if either bound is present but unparseable.
    pub fn normalize_range(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<DateRange, TimeError> {
        self.normalize_range_at(from, to, Utc::now())
    }

    /// Same as [`Calendar::normalize_range`] with an explicit "now".
    ///
    /// When `from` is absent the range starts at local midnight on the first day of
    /// `to`'s month, `lookback_years` years earlier.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::InvalidDate`] if either bound is present but unparseable.
    pub fn normalize_range_at(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DateRange, TimeError> {
        let end = match to {
            Some(value) => self.parse_instant(value)?,
            None => now,
        };
        let start = match from {
            Some(value) => self.parse_instant(value)?,
            None => self.default_start(end),
        };
        Ok(DateRange::new(start, end))
    }

    fn default_start(&self, end: DateTime<Utc>) -> DateTime<Utc> {
        let local = self.local_date(&end);
        let years = i32::try_from(self.lookback_years).unwrap_or(i32::MAX);
        NaiveDate::from_ymd_opt(local.year().saturating_sub(years), local.month(), 1)
            .map_or(end, |date| self.local_midnight(date).with_timezone(&Utc))
    }
}

/// Parses a timestamp as stored in a document.
///
/// Stored values without an offset are UTC, which is how the storage engine reads them
/// when it converts strings to dates.
#[must_use]
pub fn parse_stored_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(instant.with_timezone(&Utc));
    }
    parse_naive(trimmed).map(|naive| naive.and_utc())
}

fn parse_naive(input: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}
