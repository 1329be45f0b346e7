//! Canonical bucket labels.

use super::{Calendar, Interval};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone};

impl Calendar {
    /// Formats the bucket containing `instant`, read in the reference zone.
    #[must_use]
    pub fn label<Z: TimeZone>(&self, instant: &DateTime<Z>, interval: Interval) -> String {
        label_date(self.local_date(instant), interval)
    }
}

/// Formats a local calendar date as the label of the bucket containing it.
///
/// `YYYY-MM-DD` for days, `YYYY-Www` for ISO weeks (the year is the ISO week-year) and
/// `YYYY-MM` for months.
#[must_use]
pub fn label_date(date: NaiveDate, interval: Interval) -> String {
    match interval {
        Interval::Day => date.format("%Y-%m-%d").to_string(),
        Interval::Week => {
            let week = date.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        Interval::Month => date.format("%Y-%m").to_string(),
    }
}
