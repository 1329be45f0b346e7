//! Chart-ready series.
//!
//! Analytics endpoints answer with a [`ChartSeries`]: one label axis and any number of
//! datasets whose values line up with it index by index. The [`reducer`] functions turn
//! raw aggregation rows into that shape.

pub mod reducer;

pub use reducer::{
    categorical_series, key_label, ranked_series, to_chart_series, to_single_series,
    CategoryRow, GroupedRow, MISSING_GROUP_LABEL,
};

use serde::{Deserialize, Serialize};

/// A label axis with aligned datasets.
///
/// Every dataset holds exactly `labels.len()` values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    /// X-axis labels, in display order.
    pub labels: Vec<String>,
    /// Series plotted against the labels.
    pub datasets: Vec<Dataset>,
}

/// One named series of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Legend text for the series.
    pub label: String,
    /// One value per axis label.
    pub data: Vec<f64>,
}

impl ChartSeries {
    /// Creates a series with the given axis and no datasets.
    #[must_use]
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            datasets: Vec::new(),
        }
    }

    /// Appends a dataset.
    #[must_use]
    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.datasets.push(dataset);
        self
    }

    /// Returns true if every dataset is as long as the axis.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.datasets
            .iter()
            .all(|dataset| dataset.data.len() == self.labels.len())
    }
}

impl Dataset {
    /// Creates a dataset.
    #[must_use]
    pub fn new(label: impl Into<String>, data: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            data,
        }
    }
}
