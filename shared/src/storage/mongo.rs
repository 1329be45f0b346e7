//! MongoDB-backed document store.

use super::aggregation::{GroupAggregation, GroupStats, PeriodAggregation};
use super::filter::Filter;
use super::pipeline::{group_pipeline, parse_group_row, parse_period_row, period_pipeline, to_json};
use super::{
    parse_object_id, BulkWriteSummary, DocumentStore, Page, PageRequest, StoreError, ID_FIELD,
};
use crate::chart::GroupedRow;
use crate::models::Collection;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Database, IndexModel};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Server error code for unique index violations.
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB document store implementation.
///
/// Every collection maps to the MongoDB collection of the same stored name. Aggregation
/// specs are turned into pipelines and executed server-side.
///
/// The [`DocumentStore`] methods block the calling worker thread with
/// `tokio::task::block_in_place`, so they must run on a multi-threaded Tokio runtime.
#[derive(Debug, Clone)]
pub struct MongoDocumentStore {
    database: Database,
}

impl MongoDocumentStore {
    /// Creates a store over an existing database handle.
    #[must_use]
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Creates a store wrapped in an `Arc`.
    #[must_use]
    pub fn new_shared(database: Database) -> Arc<Self> {
        Arc::new(Self::new(database))
    }

    /// Creates the unique indexes declared by every collection.
    ///
    /// # Errors
    ///
    /// Returns an error if an index cannot be created, for example because existing data
    /// already violates it.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        for collection in Collection::ALL {
            for key in collection.unique_keys() {
                let mut keys = Document::new();
                keys.insert(key.field, 1);
                let options = IndexOptions::builder()
                    .unique(true)
                    .sparse(key.sparse)
                    .build();
                let model = IndexModel::builder().keys(keys).options(options).build();
                self.collection(collection)
                    .create_index(model)
                    .await
                    .map_err(|e| map_error(collection, e))?;
                debug!(collection = %collection, field = key.field, "Ensured unique index");
            }
        }
        info!("MongoDB indexes ready");
        Ok(())
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.database.collection(collection.as_str())
    }

    fn block_on<F, T>(future: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }
}

impl DocumentStore for MongoDocumentStore {
    fn insert(&self, collection: Collection, document: Map<String, Value>) -> Result<Value, StoreError> {
        let mut document = to_bson_document(document)?;
        let coll = self.collection(collection);
        Self::block_on(async move {
            let result = coll
                .insert_one(&document)
                .await
                .map_err(|e| map_error(collection, e))?;
            document.insert(ID_FIELD, result.inserted_id);
            Ok(from_bson_document(document))
        })
    }

    fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let id = parse_object_id(id)?;
        let coll = self.collection(collection);
        Self::block_on(async move {
            let found = coll
                .find_one(doc! { ID_FIELD: id })
                .await
                .map_err(|e| map_error(collection, e))?;
            Ok(found.map(from_bson_document))
        })
    }

    fn find_page(&self, collection: Collection, page: PageRequest) -> Result<Page, StoreError> {
        let coll = self.collection(collection);
        Self::block_on(async move {
            let total_count = coll
                .count_documents(doc! {})
                .await
                .map_err(|e| map_error(collection, e))?;
            let items: Vec<Document> = coll
                .find(doc! {})
                .sort(doc! { ID_FIELD: 1 })
                .skip(page.skip())
                .limit(i64::try_from(page.limit).unwrap_or(i64::MAX))
                .await
                .map_err(|e| map_error(collection, e))?
                .try_collect()
                .await
                .map_err(|e| map_error(collection, e))?;
            Ok(Page {
                items: items.into_iter().map(from_bson_document).collect(),
                total_count,
            })
        })
    }

    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        projection: &[&str],
    ) -> Result<Vec<Value>, StoreError> {
        let filter = filter_document(filter)?;
        let projection = (!projection.is_empty()).then(|| {
            let mut fields = doc! { ID_FIELD: 0 };
            for field in projection {
                fields.insert(*field, 1);
            }
            fields
        });
        let coll = self.collection(collection);
        Self::block_on(async move {
            let mut find = coll.find(filter);
            if let Some(projection) = projection {
                find = find.projection(projection);
            }
            let docs: Vec<Document> = find
                .await
                .map_err(|e| map_error(collection, e))?
                .try_collect()
                .await
                .map_err(|e| map_error(collection, e))?;
            Ok(docs.into_iter().map(from_bson_document).collect())
        })
    }

    fn replace_by_id(
        &self,
        collection: Collection,
        id: &str,
        document: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let id = parse_object_id(id)?;
        let mut replacement = to_bson_document(document)?;
        replacement.remove(ID_FIELD);
        let coll = self.collection(collection);
        Self::block_on(async move {
            let replaced = coll
                .find_one_and_replace(doc! { ID_FIELD: id }, replacement)
                .return_document(ReturnDocument::After)
                .await
                .map_err(|e| map_error(collection, e))?;
            Ok(replaced.map(from_bson_document))
        })
    }

    fn delete_by_id(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let id = parse_object_id(id)?;
        let coll = self.collection(collection);
        Self::block_on(async move {
            let result = coll
                .delete_one(doc! { ID_FIELD: id })
                .await
                .map_err(|e| map_error(collection, e))?;
            Ok(result.deleted_count > 0)
        })
    }

    fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let filter = filter_document(filter)?;
        let coll = self.collection(collection);
        Self::block_on(async move {
            coll.count_documents(filter)
                .await
                .map_err(|e| map_error(collection, e))
        })
    }

    fn upsert_many(
        &self,
        collection: Collection,
        documents: Vec<Map<String, Value>>,
    ) -> Result<BulkWriteSummary, StoreError> {
        let mut writes = Vec::with_capacity(documents.len());
        for document in documents {
            let mut set = to_bson_document(document)?;
            let selector = match set.remove(ID_FIELD) {
                Some(id) => doc! { ID_FIELD: id },
                None => match collection.natural_key().and_then(|key| set.get(key).map(|v| (key, v))) {
                    Some((key, value)) => doc! { key: value.clone() },
                    // A fresh id never matches, so the write inserts.
                    None => doc! { ID_FIELD: bson::oid::ObjectId::new() },
                },
            };
            writes.push((selector, set));
        }

        let coll = self.collection(collection);
        Self::block_on(async move {
            let mut summary = BulkWriteSummary::default();
            for (selector, set) in writes {
                let result = coll
                    .update_one(selector, doc! { "$set": set })
                    .upsert(true)
                    .await
                    .map_err(|e| map_error(collection, e))?;
                summary.matched += result.matched_count;
                summary.modified += result.modified_count;
                if result.upserted_id.is_some() {
                    summary.upserted += 1;
                }
            }
            Ok(summary)
        })
    }

    fn aggregate_periods(&self, spec: &PeriodAggregation) -> Result<Vec<GroupedRow>, StoreError> {
        let pipeline = period_pipeline(spec, filter_document(&spec.filter)?);
        let grouped = spec.group_field.is_some();
        let collection = spec.collection;
        let coll = self.collection(collection);
        Self::block_on(async move {
            let rows: Vec<Document> = coll
                .aggregate(pipeline)
                .await
                .map_err(|e| map_error(collection, e))?
                .try_collect()
                .await
                .map_err(|e| map_error(collection, e))?;
            Ok(rows
                .iter()
                .filter_map(|row| parse_period_row(row, grouped))
                .collect())
        })
    }

    fn aggregate_groups(&self, spec: &GroupAggregation) -> Result<Vec<GroupStats>, StoreError> {
        let pipeline = group_pipeline(spec, filter_document(&spec.filter)?);
        let key_len = spec.group_by.len();
        let collection = spec.collection;
        let coll = self.collection(collection);
        Self::block_on(async move {
            let rows: Vec<Document> = coll
                .aggregate(pipeline)
                .await
                .map_err(|e| map_error(collection, e))?
                .try_collect()
                .await
                .map_err(|e| map_error(collection, e))?;
            Ok(rows
                .iter()
                .filter_map(|row| parse_group_row(row, key_len))
                .collect())
        })
    }
}

fn map_error(collection: Collection, error: mongodb::error::Error) -> StoreError {
    let duplicate = match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            Some(e.message.clone())
        }
        ErrorKind::Command(e) if e.code == DUPLICATE_KEY => Some(e.message.clone()),
        _ => None,
    };
    match duplicate {
        Some(detail) => StoreError::Duplicate { collection, detail },
        None => StoreError::StorageError(error.to_string()),
    }
}

/// Converts a JSON document to BSON, turning a hex `_id` into an object id.
fn to_bson_document(mut document: Map<String, Value>) -> Result<Document, StoreError> {
    let id = match document.remove(ID_FIELD) {
        Some(Value::String(id)) => Some(parse_object_id(&id)?),
        Some(other) => return Err(StoreError::InvalidId(other.to_string())),
        None => None,
    };
    let mut converted =
        bson::to_document(&document).map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
    if let Some(id) = id {
        converted.insert(ID_FIELD, id);
    }
    Ok(converted)
}

fn filter_document(filter: &Filter) -> Result<Document, StoreError> {
    bson::to_document(filter.as_map()).map_err(|e| StoreError::InvalidDocument(e.to_string()))
}

fn from_bson_document(document: Document) -> Value {
    let map: Map<String, Value> = document
        .into_iter()
        .map(|(key, value)| (key, to_json(value)))
        .collect();
    Value::Object(map)
}
