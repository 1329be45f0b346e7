//! Bizlens Shared Library
//!
//! This crate contains the models, calendar bucketing, chart shaping and storage used
//! by the Bizlens API server and CLI.
//!
//! # Modules
//!
//! - [`time`] - Range normalization, bucket generation and labeling
//! - [`chart`] - Reduction of aggregation rows into label-aligned chart series
//! - [`models`] - Business, review, check-in, tip and user records
//! - [`storage`] - Document store trait with in-memory and MongoDB backends
//! - [`config`] - Analytics configuration
//!
//! # Example
//!
//! ```
//! use shared::chart::{to_chart_series, GroupedRow};
//! use shared::time::{Calendar, Interval, PeriodKey};
//!
//! let calendar = Calendar::new(chrono_tz::UTC);
//! let range = calendar
//!     .normalize_range(Some("2023-01-01"), Some("2023-03-31"))
//!     .unwrap();
//! let rows = vec![GroupedRow::new(Some("A".into()), PeriodKey::month(2023, 2), 4.0)];
//!
//! let chart = to_chart_series(&calendar, &rows, &range, Interval::Month);
//!
//! assert_eq!(chart.labels, vec!["2023-01", "2023-02", "2023-03"]);
//! assert_eq!(chart.datasets[0].data, vec![0.0, 4.0, 0.0]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod chart;
pub mod config;
pub mod models;
pub mod storage;
pub mod time;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use chrono_tz;
pub use serde;
pub use serde_json;
pub use validator;
