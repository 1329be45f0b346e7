//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{anyhow, Context, Result};
use shared::config::AnalyticsConfig;
use shared::time::Calendar;
use std::net::SocketAddr;
use std::str::FromStr;

/// Which document store backs the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local store, lost on restart.
    #[default]
    Memory,
    /// MongoDB, configured through [`crate::db::DatabaseConfig`].
    Mongo,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "mongo" | "mongodb" => Ok(Self::Mongo),
            other => Err(anyhow!("Unknown storage backend '{other}': expected memory or mongo")),
        }
    }
}

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `BIZLENS_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `BIZLENS_PORT`: The port to listen on (default: 4000)
/// - `BIZLENS_TIMEZONE`: Reference zone for buckets and labels (default: "America/Bogota")
/// - `BIZLENS_LOOKBACK_YEARS`: Default range lookback in years (default: 10)
/// - `BIZLENS_STORAGE`: `memory` or `mongo` (default: memory)
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Reference zone and lookback for the analytics endpoints.
    pub analytics: AnalyticsConfig,
    /// Storage backend.
    pub storage: StorageBackend,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `BIZLENS_PORT` or `BIZLENS_LOOKBACK_YEARS` is set but is not a number
    /// - `BIZLENS_TIMEZONE` is not an IANA zone name
    /// - `BIZLENS_STORAGE` names an unknown backend
    /// - the analytics settings are out of range
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let host = std::env::var("BIZLENS_HOST").unwrap_or(defaults.host);

        let port = std::env::var("BIZLENS_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("BIZLENS_PORT must be a port number")?
            .unwrap_or(defaults.port);

        let timezone = match std::env::var("BIZLENS_TIMEZONE") {
            Ok(name) => Calendar::from_zone_name(&name)?.zone(),
            Err(_) => defaults.analytics.timezone,
        };

        let lookback_years = std::env::var("BIZLENS_LOOKBACK_YEARS")
            .ok()
            .map(|y| y.parse::<u32>())
            .transpose()
            .context("BIZLENS_LOOKBACK_YEARS must be a whole number")?
            .unwrap_or(defaults.analytics.lookback_years);

        let storage = std::env::var("BIZLENS_STORAGE")
            .ok()
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or_default();

        let analytics = AnalyticsConfig::new(timezone, lookback_years);
        analytics.validate().map_err(|e| anyhow!(e))?;

        Ok(Self {
            host,
            port,
            analytics,
            storage,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port combination is not a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            analytics: AnalyticsConfig::default(),
            storage: StorageBackend::default(),
        }
    }
}
