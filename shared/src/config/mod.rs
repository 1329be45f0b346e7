//! Configuration module for Bizlens.
//!
//! This module contains configuration structures shared by the server and the CLI.

pub mod analytics;

pub use analytics::{AnalyticsConfig, DEFAULT_TIMEZONE, MAX_LOOKBACK_YEARS};
