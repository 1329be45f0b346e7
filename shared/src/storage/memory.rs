//! In-memory document store.

use super::aggregation::{AggregationOp, GroupAggregation, GroupSort, GroupStats, PeriodAggregation};
use super::filter::{compare, lookup_path, Filter};
use super::{
    new_object_id, parse_object_id, BulkWriteSummary, DocumentStore, Page, PageRequest,
    StoreError, ID_FIELD,
};
use crate::chart::{key_label, GroupedRow};
use crate::models::Collection;
use crate::time::{parse_stored_timestamp, Calendar, DateRange, PeriodKey};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

type Collections = HashMap<Collection, Vec<Value>>;

/// In-memory document store implementation.
///
/// Documents live in one `Vec` per collection behind a `RwLock`. Unique keys, filters and
/// aggregations behave like the MongoDB backend. Suitable for development and tests.
///
/// **Note:** Data is not persisted across restarts.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use shared::models::Collection;
/// use shared::storage::{DocumentStore, Filter, InMemoryDocumentStore};
///
/// let store = InMemoryDocumentStore::new();
/// let doc = json!({"business_id": "b1", "name": "Taco Stand"});
/// let stored = store
///     .insert(Collection::Businesses, doc.as_object().unwrap().clone())
///     .unwrap();
///
/// assert!(stored["_id"].is_string());
/// assert_eq!(store.count(Collection::Businesses, &Filter::new()).unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty store wrapped in an `Arc`.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert(
        &self,
        collection: Collection,
        mut document: Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let id = match document.get(ID_FIELD) {
            Some(Value::String(id)) => parse_object_id(id)?.to_hex(),
            Some(other) => return Err(StoreError::InvalidId(other.to_string())),
            None => new_object_id(),
        };
        document.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        let mut collections = self.collections.write().map_err(|_| StoreError::LockError)?;
        let docs = collections.entry(collection).or_default();
        if docs.iter().any(|doc| id_of(doc) == Some(id.as_str())) {
            return Err(StoreError::Duplicate {
                collection,
                detail: format!("_id '{id}' already exists"),
            });
        }
        check_unique(collection, docs, &document, &id)?;

        let document = Value::Object(document);
        docs.push(document.clone());
        Ok(document)
    }

    fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let id = parse_object_id(id)?.to_hex();
        let collections = self.collections.read().map_err(|_| StoreError::LockError)?;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| id_of(doc) == Some(id.as_str())))
            .cloned())
    }

    fn find_page(&self, collection: Collection, page: PageRequest) -> Result<Page, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::LockError)?;
        let mut docs: Vec<&Value> = collections.get(&collection).into_iter().flatten().collect();
        docs.sort_by(|a, b| id_of(a).cmp(&id_of(b)));

        let skip = usize::try_from(page.skip()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        Ok(Page {
            total_count: docs.len() as u64,
            items: docs.into_iter().skip(skip).take(limit).cloned().collect(),
        })
    }

    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        projection: &[&str],
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::LockError)?;
        Ok(collections
            .get(&collection)
            .into_iter()
            .flatten()
            .filter(|doc| filter.matches(doc))
            .map(|doc| project(doc, projection))
            .collect())
    }

    fn replace_by_id(
        &self,
        collection: Collection,
        id: &str,
        mut document: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let id = parse_object_id(id)?.to_hex();
        let mut collections = self.collections.write().map_err(|_| StoreError::LockError)?;
        let docs = collections.entry(collection).or_default();
        let Some(index) = docs.iter().position(|doc| id_of(doc) == Some(id.as_str())) else {
            return Ok(None);
        };

        document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        check_unique(collection, docs, &document, &id)?;

        let document = Value::Object(document);
        docs[index] = document.clone();
        Ok(Some(document))
    }

    fn delete_by_id(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let id = parse_object_id(id)?.to_hex();
        let mut collections = self.collections.write().map_err(|_| StoreError::LockError)?;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|doc| id_of(doc) != Some(id.as_str()));
        Ok(docs.len() < before)
    }

    fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::LockError)?;
        Ok(collections
            .get(&collection)
            .into_iter()
            .flatten()
            .filter(|doc| filter.matches(doc))
            .count() as u64)
    }

    fn upsert_many(
        &self,
        collection: Collection,
        documents: Vec<Map<String, Value>>,
    ) -> Result<BulkWriteSummary, StoreError> {
        let mut collections = self.collections.write().map_err(|_| StoreError::LockError)?;
        let committed = collections.entry(collection).or_default();
        // Writes go to a copy that replaces the collection only once the whole batch passed.
        let mut staged = committed.clone();
        let docs = &mut staged;
        let mut summary = BulkWriteSummary::default();

        for mut document in documents {
            let id = match document.get(ID_FIELD) {
                Some(Value::String(id)) => Some(parse_object_id(id)?.to_hex()),
                Some(other) => return Err(StoreError::InvalidId(other.to_string())),
                None => None,
            };
            let position = match (&id, collection.natural_key()) {
                (Some(id), _) => docs.iter().position(|doc| id_of(doc) == Some(id.as_str())),
                (None, Some(key)) => document.get(key).and_then(|value| {
                    docs.iter().position(|doc| doc.get(key) == Some(value))
                }),
                (None, None) => None,
            };

            if let Some(index) = position {
                summary.matched += 1;
                let Value::Object(existing) = &docs[index] else {
                    continue;
                };
                let mut merged = existing.clone();
                merged.extend(document);
                if merged != *existing {
                    let merged_id = merged
                        .get(ID_FIELD)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    check_unique(collection, docs, &merged, &merged_id)?;
                    docs[index] = Value::Object(merged);
                    summary.modified += 1;
                }
            } else {
                let id = id.unwrap_or_else(new_object_id);
                document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                check_unique(collection, docs, &document, &id)?;
                docs.push(Value::Object(document));
                summary.upserted += 1;
            }
        }

        *committed = staged;
        Ok(summary)
    }

    fn aggregate_periods(&self, spec: &PeriodAggregation) -> Result<Vec<GroupedRow>, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::LockError)?;
        let calendar = Calendar::new(spec.zone);

        let mut buckets: BTreeMap<(Option<String>, PeriodKey), Accumulator> = BTreeMap::new();
        for doc in collections.get(&spec.collection).into_iter().flatten() {
            if !spec.filter.matches(doc) {
                continue;
            }
            let Some(instant) = timestamp_in(doc, &spec.date_field, &spec.range) else {
                continue;
            };
            let group = spec
                .group_field
                .as_deref()
                .and_then(|field| lookup_path(doc, field))
                .filter(|value| !value.is_null())
                .map(key_label);
            let period = calendar.period_key(&instant, spec.interval);
            buckets
                .entry((group, period))
                .or_default()
                .add(doc, spec.value_field.as_deref());
        }

        Ok(buckets
            .into_iter()
            .filter_map(|((group, period), acc)| {
                acc.finish(spec.op)
                    .map(|value| GroupedRow::new(group, period, value))
            })
            .collect())
    }

    fn aggregate_groups(&self, spec: &GroupAggregation) -> Result<Vec<GroupStats>, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::LockError)?;

        let mut groups: HashMap<String, (Vec<Value>, Accumulator)> = HashMap::new();
        for doc in collections.get(&spec.collection).into_iter().flatten() {
            if !spec.filter.matches(doc) {
                continue;
            }
            if let Some(window) = &spec.window {
                if timestamp_in(doc, &window.field, &window.range).is_none() {
                    continue;
                }
            }
            let key: Vec<Value> = spec
                .group_by
                .iter()
                .map(|field| lookup_path(doc, field).cloned().unwrap_or(Value::Null))
                .collect();
            groups
                .entry(Value::Array(key.clone()).to_string())
                .or_insert_with(|| (key, Accumulator::default()))
                .1
                .add(doc, spec.value_field.as_deref());
        }

        let mut stats: Vec<GroupStats> = groups
            .into_values()
            .filter_map(|(key, acc)| {
                let count = acc.count;
                acc.finish(spec.op).map(|value| GroupStats { key, value, count })
            })
            .collect();

        stats.sort_by(|a, b| match spec.sort {
            GroupSort::ValueDesc => b
                .value
                .total_cmp(&a.value)
                .then_with(|| compare_keys(&a.key, &b.key)),
            GroupSort::KeyAsc => compare_keys(&a.key, &b.key),
        });
        if let Some(limit) = spec.limit {
            stats.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(stats)
    }
}

/// Running state of one aggregation group.
#[derive(Debug, Default)]
struct Accumulator {
    values: Vec<f64>,
    count: u64,
}

impl Accumulator {
    fn add(&mut self, doc: &Value, value_field: Option<&str>) {
        self.count += 1;
        if let Some(value) = value_field
            .and_then(|field| lookup_path(doc, field))
            .and_then(Value::as_f64)
        {
            self.values.push(value);
        }
    }

    fn finish(self, op: AggregationOp) -> Option<f64> {
        op.fold(&self.values, self.count)
    }
}

fn id_of(doc: &Value) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

fn check_unique(
    collection: Collection,
    docs: &[Value],
    document: &Map<String, Value>,
    id: &str,
) -> Result<(), StoreError> {
    for key in collection.unique_keys() {
        let value = document.get(key.field).unwrap_or(&Value::Null);
        if key.sparse && value.is_null() {
            continue;
        }
        let taken = docs.iter().any(|doc| {
            id_of(doc) != Some(id) && doc.get(key.field).unwrap_or(&Value::Null) == value
        });
        if taken {
            return Err(StoreError::Duplicate {
                collection,
                detail: format!("{} {value} already exists", key.field),
            });
        }
    }
    Ok(())
}

fn project(doc: &Value, projection: &[&str]) -> Value {
    if projection.is_empty() {
        return doc.clone();
    }
    let projected: Map<String, Value> = projection
        .iter()
        .filter_map(|field| doc.get(*field).map(|v| ((*field).to_string(), v.clone())))
        .collect();
    Value::Object(projected)
}

/// Reads `field` as a timestamp and returns it if it falls inside `range`.
fn timestamp_in(doc: &Value, field: &str, range: &DateRange) -> Option<DateTime<Utc>> {
    lookup_path(doc, field)
        .and_then(timestamp_of)
        .filter(|instant| range.contains(instant))
}

/// Accepts timestamp strings, epoch milliseconds and extended-JSON `{"$date": ...}`.
fn timestamp_of(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_stored_timestamp(s),
        Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?),
        Value::Object(map) => match map.get("$date")? {
            Value::Object(inner) => inner
                .get("$numberLong")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .and_then(DateTime::from_timestamp_millis),
            other => timestamp_of(other),
        },
        _ => None,
    }
}

/// Position of a value's type in MongoDB's comparison order.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

fn compare_keys(a: &[Value], b: &[Value]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            type_rank(x)
                .cmp(&type_rank(y))
                .then_with(|| compare(x, y).unwrap_or(Ordering::Equal))
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}
