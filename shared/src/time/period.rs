//! Period keys as returned by grouped aggregations.

use super::{label_date, Calendar, Interval};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

/// Calendar components identifying one bucket.
///
/// Day and month buckets fill `year`, `month` and (for days) `day`. Week buckets carry
/// the ISO week-year in `year` and the ISO week number in `week`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    /// Calendar year, or ISO week-year for week buckets.
    pub year: i32,
    /// Month of the year (1-12).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    /// Day of the month (1-31).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    /// ISO week number (1-53).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
}

impl PeriodKey {
    /// Key of a month bucket.
    #[must_use]
    pub const fn month(year: i32, month: u32) -> Self {
        Self {
            year,
            month: Some(month),
            day: None,
            week: None,
        }
    }

    /// Key of a day bucket.
    #[must_use]
    pub const fn day(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month: Some(month),
            day: Some(day),
            week: None,
        }
    }

    /// Key of an ISO week bucket.
    #[must_use]
    pub const fn iso_week(year: i32, week: u32) -> Self {
        Self {
            year,
            month: None,
            day: None,
            week: Some(week),
        }
    }

    /// Builds the key of the bucket containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate, interval: Interval) -> Self {
        match interval {
            Interval::Day => Self::day(date.year(), date.month(), date.day()),
            Interval::Week => {
                let week = date.iso_week();
                Self::iso_week(week.year(), week.week())
            }
            Interval::Month => Self::month(date.year(), date.month()),
        }
    }

    /// Returns the first local date of the bucket, or `None` for impossible components.
    ///
    /// Week keys resolve to the Monday of the ISO week; missing month or day default to 1.
    #[must_use]
    pub fn to_date(&self) -> Option<NaiveDate> {
        match self.week {
            Some(week) => NaiveDate::from_isoywd_opt(self.year, week, Weekday::Mon),
            None => NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1)),
        }
    }

    /// Formats the key as the label of its bucket at the given interval.
    #[must_use]
    pub fn label(&self, interval: Interval) -> Option<String> {
        self.to_date().map(|date| label_date(date, interval))
    }
}

impl Calendar {
    /// Returns the period key of the bucket containing `instant`.
    #[must_use]
    pub fn period_key<Z: TimeZone>(&self, instant: &DateTime<Z>, interval: Interval) -> PeriodKey {
        PeriodKey::from_date(self.local_date(instant), interval)
    }
}
