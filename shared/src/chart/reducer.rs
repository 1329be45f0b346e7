//! Reshapes aggregation rows into label-aligned chart series.

use super::{ChartSeries, Dataset};
use crate::time::{Calendar, DateRange, Interval, PeriodKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Label used for rows whose group key is missing or null.
pub const MISSING_GROUP_LABEL: &str = "N/A";

/// One aggregation row bucketed by period, optionally tagged with a group key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedRow {
    /// Series the row belongs to (for example a business id).
    pub group: Option<String>,
    /// Calendar bucket the row was grouped into.
    pub period: PeriodKey,
    /// Aggregated value.
    pub value: f64,
}

impl GroupedRow {
    /// Creates a row.
    #[must_use]
    pub fn new(group: Option<String>, period: PeriodKey, value: f64) -> Self {
        Self {
            group,
            period,
            value,
        }
    }
}

/// One aggregation row keyed by a group and a fixed category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    /// Series the row belongs to.
    pub group: String,
    /// Category label on the x-axis.
    pub category: String,
    /// Aggregated value.
    pub value: f64,
}

/// Renders a group key taken from a document as a series label.
///
/// Strings are used as-is, integral numbers lose their fraction, and null becomes
/// [`MISSING_GROUP_LABEL`].
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn key_label(value: &Value) -> String {
    match value {
        Value::Null => MISSING_GROUP_LABEL.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Builds one dataset per group, aligned to the axis of `range` at `interval`.
///
/// Datasets come out ordered by group key; rows without a group form a single
/// [`MISSING_GROUP_LABEL`] dataset. Buckets without a row are zero. A row whose period
/// does not map onto the axis is dropped, and a later row for the same group and bucket
/// replaces an earlier one.
#[must_use]
pub fn to_chart_series(
    calendar: &Calendar,
    rows: &[GroupedRow],
    range: &DateRange,
    interval: Interval,
) -> ChartSeries {
    let labels = calendar.axis(range, interval);
    let on_axis: HashSet<&str> = labels.iter().map(String::as_str).collect();

    let mut groups: BTreeMap<String, HashMap<String, f64>> = BTreeMap::new();
    let mut dropped = 0usize;
    for row in rows {
        let group = row
            .group
            .clone()
            .unwrap_or_else(|| MISSING_GROUP_LABEL.to_string());
        let values = groups.entry(group).or_default();
        match row.period.label(interval) {
            Some(label) if on_axis.contains(label.as_str()) => {
                values.insert(label, row.value);
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, interval = %interval, "Dropped rows outside the label axis");
    }

    let datasets = groups
        .into_iter()
        .map(|(group, values)| Dataset::new(group, align(&labels, &values)))
        .collect();

    ChartSeries { labels, datasets }
}

/// Builds a chart with exactly one dataset, whatever the rows' groups.
///
/// Rows for the same bucket overwrite each other, so callers pass ungrouped rows.
#[must_use]
pub fn to_single_series(
    calendar: &Calendar,
    rows: &[GroupedRow],
    range: &DateRange,
    interval: Interval,
    label: &str,
) -> ChartSeries {
    let labels = calendar.axis(range, interval);
    let values: HashMap<String, f64> = rows
        .iter()
        .filter_map(|row| row.period.label(interval).map(|l| (l, row.value)))
        .collect();

    let data = align(&labels, &values);
    ChartSeries::new(labels).with_dataset(Dataset::new(label, data))
}

/// Builds one dataset per group over a fixed category axis.
///
/// Rows whose category is not in `categories` are ignored.
#[must_use]
pub fn categorical_series(rows: &[CategoryRow], categories: &[String]) -> ChartSeries {
    let mut groups: BTreeMap<&str, HashMap<&str, f64>> = BTreeMap::new();
    for row in rows {
        groups
            .entry(row.group.as_str())
            .or_default()
            .insert(row.category.as_str(), row.value);
    }

    let datasets = groups
        .into_iter()
        .map(|(group, values)| {
            let data = categories
                .iter()
                .map(|c| values.get(c.as_str()).copied().unwrap_or(0.0))
                .collect();
            Dataset::new(group, data)
        })
        .collect();

    ChartSeries {
        labels: categories.to_vec(),
        datasets,
    }
}

/// Builds a single-dataset chart whose labels are the row keys, in input order.
#[must_use]
pub fn ranked_series<I>(rows: I, label: &str) -> ChartSeries
where
    I: IntoIterator<Item = (String, f64)>,
{
    let (labels, data): (Vec<String>, Vec<f64>) = rows.into_iter().unzip();
    ChartSeries::new(labels).with_dataset(Dataset::new(label, data))
}

fn align(labels: &[String], values: &HashMap<String, f64>) -> Vec<f64> {
    labels
        .iter()
        .map(|label| values.get(label).copied().unwrap_or(0.0))
        .collect()
}
