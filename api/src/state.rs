//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use shared::config::AnalyticsConfig;
use shared::storage::{DocumentStore, InMemoryDocumentStore};
use shared::time::Calendar;
use std::sync::Arc;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The document storage backend.
    store: Arc<dyn DocumentStore>,
    /// Reference calendar for every analytics computation.
    calendar: Calendar,
}

impl AppState {
    /// Creates a new application state with the given store and calendar.
    pub fn new(store: Arc<dyn DocumentStore>, calendar: Calendar) -> Self {
        Self { store, calendar }
    }

    /// Creates a new application state with an in-memory store and the default
    /// analytics settings.
    ///
    /// This is useful for development and testing.
    #[must_use]
    pub fn with_in_memory_store() -> Self {
        Self::new(
            InMemoryDocumentStore::new_shared(),
            AnalyticsConfig::default().calendar(),
        )
    }

    /// Replaces the calendar.
    #[must_use]
    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Returns a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Returns the reference calendar.
    #[must_use]
    pub fn calendar(&self) -> Calendar {
        self.calendar
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_in_memory_store()
    }
}
