//! Analytics configuration.
//!
//! Holds the reference time zone and default lookback used by every bucketing and
//! labeling computation of a deployment.

use crate::time::{Calendar, DEFAULT_LOOKBACK_YEARS};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Zone used when none is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Bogota;

/// Largest accepted lookback.
pub const MAX_LOOKBACK_YEARS: u32 = 100;

/// Settings for the analytics endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Reference zone for buckets and labels.
    pub timezone: Tz,
    /// Years a range reaches back when no `from` is given.
    pub lookback_years: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            lookback_years: DEFAULT_LOOKBACK_YEARS,
        }
    }
}

impl AnalyticsConfig {
    /// Creates a configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::AnalyticsConfig;
    ///
    /// let config = AnalyticsConfig::new(chrono_tz::Europe::Madrid, 5);
    /// assert_eq!(config.calendar().lookback_years(), 5);
    /// ```
    #[must_use]
    pub fn new(timezone: Tz, lookback_years: u32) -> Self {
        Self {
            timezone,
            lookback_years,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookback is zero or exceeds [`MAX_LOOKBACK_YEARS`].
    pub fn validate(&self) -> Result<(), String> {
        if self.lookback_years == 0 {
            return Err("Lookback must be at least one year".to_string());
        }
        if self.lookback_years > MAX_LOOKBACK_YEARS {
            return Err(format!(
                "Lookback cannot exceed {MAX_LOOKBACK_YEARS} years"
            ));
        }
        Ok(())
    }

    /// Builds the calendar every analytics computation runs on.
    #[must_use]
    pub fn calendar(&self) -> Calendar {
        Calendar::new(self.timezone).with_lookback_years(self.lookback_years)
    }
}
