//! Aggregation specs shared by the storage backends.

use super::filter::Filter;
use crate::models::Collection;
use crate::time::{DateRange, Interval};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Reduction applied to the values of one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationOp {
    /// Number of documents.
    #[default]
    Count,
    /// Sum of the value field.
    Sum,
    /// Mean of the value field.
    Avg,
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
}

impl AggregationOp {
    /// All operators.
    pub const ALL: [Self; 5] = [Self::Count, Self::Sum, Self::Avg, Self::Min, Self::Max];

    /// Returns the wire token.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Returns true if the operator reads a value field.
    #[must_use]
    pub const fn needs_value_field(&self) -> bool {
        !matches!(self, Self::Count)
    }

    /// Resolves the operator actually run: without a value field everything is a count.
    #[must_use]
    pub fn effective(self, value_field: Option<&str>) -> Self {
        if value_field.is_some() {
            self
        } else {
            Self::Count
        }
    }

    /// Legend text for a series produced by this operator, e.g. `avg(stars)`. Without a
    /// value field the argument reads `count`.
    #[must_use]
    pub fn series_label(&self, value_field: Option<&str>) -> String {
        format!("{}({})", self.as_str(), value_field.unwrap_or("count"))
    }

    /// Folds numeric values. `count` is the number of documents in the group, which may
    /// exceed `values.len()` when some documents lack a numeric value.
    ///
    /// Returns `None` for value operators over a group without any numeric value.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fold(&self, values: &[f64], count: u64) -> Option<f64> {
        match self {
            Self::Count => Some(count as f64),
            Self::Sum => Some(values.iter().sum()),
            Self::Avg if values.is_empty() => None,
            Self::Avg => Some(values.iter().sum::<f64>() / values.len() as f64),
            Self::Min => values.iter().copied().reduce(f64::min),
            Self::Max => values.iter().copied().reduce(f64::max),
        }
    }
}

impl std::fmt::Display for AggregationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown operator '{s}': expected count, sum, avg, min or max"))
    }
}

/// Restricts documents to those whose date field falls in a range.
#[derive(Debug, Clone, PartialEq)]
pub struct DateWindow {
    /// Field holding the document timestamp.
    pub field: String,
    /// Inclusive range.
    pub range: DateRange,
}

/// Aggregation of one collection into calendar buckets.
///
/// Documents are kept when they match `filter` and their `date_field` parses to an instant
/// inside `range`. They are then grouped by the bucket of that instant in `zone` and,
/// when `group_field` is set, by that field too.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodAggregation {
    /// Source collection.
    pub collection: Collection,
    /// Field holding the document timestamp.
    pub date_field: String,
    /// Optional field splitting the output into series.
    pub group_field: Option<String>,
    /// Reduction applied per bucket.
    pub op: AggregationOp,
    /// Field the reduction reads; ignored for counts.
    pub value_field: Option<String>,
    /// Inclusive range of document timestamps.
    pub range: DateRange,
    /// Bucket size.
    pub interval: Interval,
    /// Zone the buckets are computed in.
    pub zone: Tz,
    /// Extra match conditions.
    pub filter: Filter,
}

impl PeriodAggregation {
    /// Creates a count-per-bucket aggregation.
    #[must_use]
    pub fn new(
        collection: Collection,
        date_field: impl Into<String>,
        range: DateRange,
        interval: Interval,
        zone: Tz,
    ) -> Self {
        Self {
            collection,
            date_field: date_field.into(),
            group_field: None,
            op: AggregationOp::Count,
            value_field: None,
            range,
            interval,
            zone,
            filter: Filter::new(),
        }
    }

    /// Sets the reduction and the field it reads.
    #[must_use]
    pub fn with_op(mut self, op: AggregationOp, value_field: Option<String>) -> Self {
        self.op = op.effective(value_field.as_deref());
        self.value_field = value_field.filter(|_| self.op.needs_value_field());
        self
    }

    /// Splits the output by a field.
    #[must_use]
    pub fn with_group_field(mut self, field: impl Into<String>) -> Self {
        self.group_field = Some(field.into());
        self
    }

    /// Sets the extra match conditions.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

/// Ordering of [`GroupAggregation`] results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupSort {
    /// Largest value first; ties by key.
    #[default]
    ValueDesc,
    /// By key, ascending.
    KeyAsc,
}

/// Aggregation of one collection by zero or more fields.
///
/// With no `group_by` fields the whole (filtered) collection forms one group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupAggregation {
    /// Source collection.
    pub collection: Collection,
    /// Fields whose values form the group key.
    pub group_by: Vec<String>,
    /// Reduction applied per group.
    pub op: AggregationOp,
    /// Field the reduction reads; ignored for counts.
    pub value_field: Option<String>,
    /// Match conditions.
    pub filter: Filter,
    /// Optional timestamp restriction.
    pub window: Option<DateWindow>,
    /// Result ordering.
    pub sort: GroupSort,
    /// Maximum number of groups returned.
    pub limit: Option<u64>,
}

impl GroupAggregation {
    /// Creates a count over the whole collection.
    #[must_use]
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            group_by: Vec::new(),
            op: AggregationOp::Count,
            value_field: None,
            filter: Filter::new(),
            window: None,
            sort: GroupSort::default(),
            limit: None,
        }
    }

    /// Adds a grouping field.
    #[must_use]
    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by.push(field.into());
        self
    }

    /// Sets the reduction and the field it reads.
    #[must_use]
    pub fn with_op(mut self, op: AggregationOp, value_field: Option<String>) -> Self {
        self.op = op.effective(value_field.as_deref());
        self.value_field = value_field.filter(|_| self.op.needs_value_field());
        self
    }

    /// Sets the match conditions.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Restricts documents to a timestamp range.
    #[must_use]
    pub fn with_window(mut self, field: impl Into<String>, range: DateRange) -> Self {
        self.window = Some(DateWindow {
            field: field.into(),
            range,
        });
        self
    }

    /// Sets the result ordering.
    #[must_use]
    pub fn with_sort(mut self, sort: GroupSort) -> Self {
        self.sort = sort;
        self
    }

    /// Caps the number of groups returned.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One group of a [`GroupAggregation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    /// Values of the `group_by` fields, in order; `null` where a document lacked one.
    pub key: Vec<Value>,
    /// Result of the reduction.
    pub value: f64,
    /// Documents in the group.
    pub count: u64,
}
