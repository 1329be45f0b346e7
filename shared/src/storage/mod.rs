//! Document storage.
//!
//! The [`DocumentStore`] trait is the only way the rest of the system touches persisted
//! records. Two implementations exist: [`InMemoryDocumentStore`] for development and tests,
//! and [`MongoDocumentStore`] for MongoDB deployments. Both evaluate the same
//! [`Filter`] language and the same aggregation specs, so handlers never know which one
//! they are talking to.
//!
//! Documents travel as `serde_json::Value` objects. Every stored document carries an `_id`
//! field holding a 24-character hex object id.

pub mod aggregation;
pub mod filter;
pub mod memory;
pub mod mongo;
mod pipeline;

pub use aggregation::{
    AggregationOp, DateWindow, GroupAggregation, GroupSort, GroupStats, PeriodAggregation,
};
pub use filter::{Filter, FilterError};
pub use memory::InMemoryDocumentStore;
pub use mongo::MongoDocumentStore;

use crate::chart::GroupedRow;
use crate::models::Collection;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Name of the identifier field on every document.
pub const ID_FIELD: &str = "_id";

/// Default page size for listings.
pub const DEFAULT_PAGE_LIMIT: u64 = 20;

/// Largest page size a listing may request.
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on document store")]
    LockError,

    /// The id is not a valid object id.
    #[error("Invalid id '{0}'")]
    InvalidId(String),

    /// A unique key is already taken.
    #[error("Duplicate key in {collection}: {detail}")]
    Duplicate {
        /// Collection the write targeted.
        collection: Collection,
        /// Which key collided.
        detail: String,
    },

    /// The document is not a JSON object or cannot be stored.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// A page request for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    /// Documents per page.
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    /// Creates a page request, replacing zero values with defaults and capping the limit.
    #[must_use]
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: if limit == 0 {
                DEFAULT_PAGE_LIMIT
            } else {
                limit.min(MAX_PAGE_LIMIT)
            },
        }
    }

    /// Number of documents to skip.
    #[must_use]
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Number of pages needed for `total` documents.
    #[must_use]
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

/// One page of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// The documents on this page.
    pub items: Vec<Value>,
    /// Total number of documents across all pages.
    pub total_count: u64,
}

/// Outcome of a bulk upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkWriteSummary {
    /// Documents that matched an existing one.
    pub matched: u64,
    /// Matched documents that actually changed.
    pub modified: u64,
    /// Documents inserted because nothing matched.
    pub upserted: u64,
}

/// Trait for document storage implementations.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns it with its assigned `_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if a unique key is taken, or a storage error.
    fn insert(&self, collection: Collection, document: Map<String, Value>)
        -> Result<Value, StoreError>;

    /// Looks up a document by `_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidId`] for malformed ids, or a storage error.
    fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError>;

    /// Lists documents ordered by `_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn find_page(&self, collection: Collection, page: PageRequest) -> Result<Page, StoreError>;

    /// Returns every document matching `filter`, restricted to the `projection` fields
    /// when it is non-empty. Projected results do not include `_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        projection: &[&str],
    ) -> Result<Vec<Value>, StoreError>;

    /// Replaces the document with the given `_id` and returns the stored result, or `None`
    /// if no document has that id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidId`], [`StoreError::Duplicate`] or a storage error.
    fn replace_by_id(
        &self,
        collection: Collection,
        id: &str,
        document: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError>;

    /// Deletes the document with the given `_id`. Returns true if one was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidId`] for malformed ids, or a storage error.
    fn delete_by_id(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;

    /// Counts documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;

    /// Upserts documents one by one, matching on `_id` when present and on the
    /// collection's natural key otherwise. Fields are merged into the matched document.
    ///
    /// Ids are checked for the whole batch before anything is written. The in-memory
    /// store applies the batch atomically; MongoDB keeps the documents written before a
    /// failing one (for example a duplicate key).
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails.
    fn upsert_many(
        &self,
        collection: Collection,
        documents: Vec<Map<String, Value>>,
    ) -> Result<BulkWriteSummary, StoreError>;

    /// Aggregates documents into calendar buckets, optionally split by a group field.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn aggregate_periods(&self, spec: &PeriodAggregation) -> Result<Vec<GroupedRow>, StoreError>;

    /// Aggregates documents by zero or more group fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn aggregate_groups(&self, spec: &GroupAggregation) -> Result<Vec<GroupStats>, StoreError>;
}

/// Generates a fresh object id as a hex string.
#[must_use]
pub fn new_object_id() -> String {
    ObjectId::new().to_hex()
}

/// Parses a hex object id.
///
/// # Errors
///
/// Returns [`StoreError::InvalidId`] if `id` is not 24 hex characters.
pub fn parse_object_id(id: &str) -> Result<ObjectId, StoreError> {
    ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_normalizes_values() {
        assert_eq!(PageRequest::new(0, 0), PageRequest::default());
        assert_eq!(PageRequest::new(3, 500).limit, MAX_PAGE_LIMIT);

        let page = PageRequest::new(3, 20);
        assert_eq!(page.skip(), 40);
        assert_eq!(page.total_pages(41), 3);
        assert_eq!(page.total_pages(0), 0);
    }

    #[test]
    fn test_object_ids() {
        let id = new_object_id();
        assert_eq!(id.len(), 24);
        assert!(parse_object_id(&id).is_ok());
        assert!(matches!(
            parse_object_id("not-an-id"),
            Err(StoreError::InvalidId(_))
        ));
    }
}
