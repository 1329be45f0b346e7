//! Bizlens API Server
//!
//! This crate provides the HTTP server for Bizlens: CRUD endpoints for businesses,
//! reviews, check-ins, tips and users, plus the analytics endpoints that feed the
//! decision-support dashboard.
//!
//! # Architecture
//!
//! The API server is built on Axum and Tokio, providing:
//! - REST CRUD endpoints under `/api/v1/{businesses,reviews,checkins,tips,users}`
//! - Chart-ready analytics under `/api/v1/{metrics,competitors,attributes}`
//! - A bulk JSON loader under `/api/v1/admin`
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
pub mod db;
mod error;
mod routes;
mod state;

pub use config::{Config, StorageBackend};
pub use error::{ApiError, ErrorResponse, ValidationErrorDetail};
pub use state::AppState;

use anyhow::{Context, Result};
use axum::Router;
use db::{Database, DatabaseConfig};
use shared::storage::{DocumentStore, InMemoryDocumentStore, MongoDocumentStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Runs the Bizlens API server.
///
/// This function initializes the server with configuration from environment variables
/// and starts listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The storage backend cannot be reached
/// - The server fails to bind to the configured address
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the Bizlens API server with the provided configuration.
///
/// # Errors
///
/// Returns an error if:
/// - The storage backend cannot be reached
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config) -> Result<()> {
    let addr = config.socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        timezone = %config.analytics.timezone.name(),
        storage = ?config.storage,
        "Bizlens API server starting"
    );

    let store = connect_store(config.storage).await?;
    let state = AppState::new(store, config.analytics.calendar());

    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn connect_store(backend: StorageBackend) -> Result<Arc<dyn DocumentStore>> {
    match backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(InMemoryDocumentStore::new_shared())
        }
        StorageBackend::Mongo => {
            let db_config = DatabaseConfig::from_env()?;
            let database = Database::connect(&db_config).await?;
            database.ping().await?;

            let store = MongoDocumentStore::new_shared(database.handle());
            store
                .ensure_indexes()
                .await
                .context("Failed to create unique indexes")?;

            tracing::info!(database = %db_config.database, "Connected to MongoDB");
            Ok(store)
        }
    }
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes(state.clone()))
        .merge(routes::resource_routes(state.clone()))
        .merge(routes::metrics_routes(state.clone()))
        .merge(routes::competitors_routes(state.clone()))
        .merge(routes::attributes_routes(state.clone()))
        .merge(routes::admin_routes(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
