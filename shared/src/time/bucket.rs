//! Bucket generation.

use super::{Calendar, DateRange, Interval};
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

impl Calendar {
    /// Returns local midnight of the first day of the unit containing `instant`.
    ///
    /// Days start at midnight, weeks on Monday, months on the first.
    #[must_use]
    pub fn start_of_unit<Z: TimeZone>(&self, instant: &DateTime<Z>, interval: Interval) -> DateTime<Tz> {
        self.local_midnight(unit_start(self.local_date(instant), interval))
    }

    /// Splits a range into the ordered bucket starts that overlap it.
    ///
    /// The first bucket is the unit containing `range.start`, even when that unit began
    /// before it; every later unit start up to and including `range.end` follows.
    /// An empty range yields no buckets.
    #[must_use]
    pub fn buckets(&self, range: &DateRange, interval: Interval) -> Vec<DateTime<Tz>> {
        if range.is_empty() {
            return Vec::new();
        }

        let mut buckets = Vec::new();
        let mut cursor = Some(unit_start(self.local_date(&range.start), interval));
        while let Some(date) = cursor {
            let start = self.local_midnight(date);
            if start.with_timezone(&Utc) > range.end {
                break;
            }
            buckets.push(start);
            cursor = next_unit(date, interval);
        }
        buckets
    }

    /// Returns the label of every bucket in the range, in order.
    ///
    /// This is the x-axis a chart built over `range` uses.
    #[must_use]
    pub fn axis(&self, range: &DateRange, interval: Interval) -> Vec<String> {
        self.buckets(range, interval)
            .iter()
            .map(|bucket| self.label(bucket, interval))
            .collect()
    }
}

fn unit_start(date: NaiveDate, interval: Interval) -> NaiveDate {
    match interval {
        Interval::Day => date,
        Interval::Week => date
            .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
            .unwrap_or(date),
        Interval::Month => date.with_day(1).unwrap_or(date),
    }
}

fn next_unit(date: NaiveDate, interval: Interval) -> Option<NaiveDate> {
    match interval {
        Interval::Day => date.checked_add_days(Days::new(1)),
        Interval::Week => date.checked_add_days(Days::new(7)),
        Interval::Month => date.checked_add_months(Months::new(1)),
    }
}
