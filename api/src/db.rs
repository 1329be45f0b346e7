//! Database connection module for MongoDB.
//!
//! This module provides the connection configuration and a thin client wrapper used when
//! the server runs with `BIZLENS_STORAGE=mongo`.

use anyhow::{Context, Result};
use mongodb::bson::doc;
use mongodb::Client;

/// Database configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// MongoDB connection string (e.g., <mongodb://localhost:27017>)
    pub uri: String,
    /// Database name to use
    pub database: String,
}

impl DatabaseConfig {
    /// Load database configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BIZLENS_MONGO_URI`: Connection string (default: <mongodb://localhost:27017>)
    /// - `BIZLENS_DB_NAME`: Database name (default: "bizlens")
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables cannot be read.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            uri: std::env::var("BIZLENS_MONGO_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database: std::env::var("BIZLENS_DB_NAME").unwrap_or_else(|_| "bizlens".to_string()),
        })
    }
}

/// Database client wrapper.
#[derive(Clone)]
pub struct Database {
    client: Client,
    name: String,
}

impl Database {
    /// Connects to MongoDB. The driver connects lazily, so this only fails on a malformed
    /// connection string; use [`Database::ping`] to check the server is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string cannot be parsed.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .context("Failed to create MongoDB client")?;

        Ok(Self {
            client,
            name: config.database.clone(),
        })
    }

    /// Returns a handle to the configured database.
    #[must_use]
    pub fn handle(&self) -> mongodb::Database {
        self.client.database(&self.name)
    }

    /// Test database connectivity by running the `ping` command.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached.
    pub async fn ping(&self) -> Result<()> {
        self.handle()
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to ping database")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_malformed_uri() {
        let config = DatabaseConfig {
            uri: "postgres://localhost".to_string(),
            database: "bizlens".to_string(),
        };

        assert!(Database::connect(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_handle_uses_configured_name() {
        let config = DatabaseConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "bizlens_test".to_string(),
        };

        let db = Database::connect(&config).await.unwrap();
        assert_eq!(db.handle().name(), "bizlens_test");
    }

    #[tokio::test]
    #[ignore = "requires running MongoDB"]
    async fn test_database_ping() {
        let config = DatabaseConfig::from_env().expect("Failed to load config");
        let db = Database::connect(&config).await.unwrap();

        let result = db.ping().await;
        assert!(
            result.is_ok(),
            "Database ping failed. Make sure MongoDB is running"
        );
    }
}
