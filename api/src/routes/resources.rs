//! CRUD endpoints for the five record collections.
//!
//! One generic router serves every [`Resource`]:
//!
//! - `POST   /api/v1/{base}` - validate and insert
//! - `GET    /api/v1/{base}?page=&limit=` - paginated listing
//! - `GET    /api/v1/{base}/{id}` - fetch one
//! - `PUT    /api/v1/{base}/{id}` - merge fields, re-validate and replace
//! - `DELETE /api/v1/{base}/{id}` - delete one

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use shared::models::{normalize_document, Business, CheckIn, Resource, Review, Tip, User};
use shared::storage::{PageRequest, DEFAULT_PAGE_LIMIT, ID_FIELD};
use std::marker::PhantomData;

/// Query parameters of a listing. Values that are not positive integers fall back to
/// the defaults instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// 1-based page number.
    pub page: Option<String>,
    /// Page size.
    pub limit: Option<String>,
}

impl ListParams {
    fn page_request(&self) -> PageRequest {
        let number = |raw: &Option<String>, default: u64| {
            raw.as_deref()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };
        PageRequest::new(number(&self.page, 1), number(&self.limit, DEFAULT_PAGE_LIMIT))
    }
}

/// One page of a listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    /// Documents across all pages.
    pub total_count: u64,
    /// Page returned.
    pub page: u64,
    /// Pages available at the requested size.
    pub total_pages: u64,
    /// Documents on this page.
    pub items: Vec<Value>,
}

/// Creates the CRUD routes for every collection.
pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .merge(ResourceRouter::<Business>::new("businesses").build(state.clone()))
        .merge(ResourceRouter::<Review>::new("reviews").build(state.clone()))
        .merge(ResourceRouter::<CheckIn>::new("checkins").build(state.clone()))
        .merge(ResourceRouter::<Tip>::new("tips").build(state.clone()))
        .merge(ResourceRouter::<User>::new("users").build(state))
}

/// Builder for the routes of one resource type.
struct ResourceRouter<T> {
    base: &'static str,
    _resource: PhantomData<fn() -> T>,
}

impl<T: Resource> ResourceRouter<T> {
    fn new(base: &'static str) -> Self {
        Self {
            base,
            _resource: PhantomData,
        }
    }

    fn build(self, state: AppState) -> Router {
        let collection = format!("/api/v1/{}", self.base);
        let item = format!("{collection}/{{id}}");
        Router::new()
            .route(&collection, get(list::<T>).post(create::<T>))
            .route(&item, get(fetch::<T>).put(update::<T>).delete(remove::<T>))
            .with_state(state)
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, ApiError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::BadRequest("Expected a JSON object".to_string())),
    }
}

fn not_found<T: Resource>(id: &str) -> ApiError {
    ApiError::NotFound(format!("{} '{id}' not found", T::NAME))
}

async fn create<T: Resource>(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = payload?;
    let body = Value::Object(into_object(body)?);
    let document = into_object(normalize_document::<T>(body)?)?;

    let stored = state.store().insert(T::COLLECTION, document)?;
    tracing::debug!(collection = %T::COLLECTION, "Created document");
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list<T: Resource>(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let request = params.page_request();
    let page = state.store().find_page(T::COLLECTION, request)?;

    Ok(Json(ListResponse {
        total_count: page.total_count,
        page: request.page,
        total_pages: request.total_pages(page.total_count),
        items: page.items,
    }))
}

async fn fetch<T: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .store()
        .find_by_id(T::COLLECTION, &id)?
        .map(Json)
        .ok_or_else(|| not_found::<T>(&id))
}

/// Fields in the body overwrite the stored ones; the merged document must still be a
/// valid resource.
async fn update<T: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let changes = into_object(body)?;

    let existing = state
        .store()
        .find_by_id(T::COLLECTION, &id)?
        .ok_or_else(|| not_found::<T>(&id))?;
    let mut merged = into_object(existing)?;
    merged.remove(ID_FIELD);
    merged.extend(changes.into_iter().filter(|(key, _)| key != ID_FIELD));

    let document = into_object(normalize_document::<T>(Value::Object(merged))?)?;
    let stored = state
        .store()
        .replace_by_id(T::COLLECTION, &id, document)?
        .ok_or_else(|| not_found::<T>(&id))?;

    tracing::debug!(collection = %T::COLLECTION, %id, "Updated document");
    Ok(Json(stored))
}

async fn remove<T: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.store().delete_by_id(T::COLLECTION, &id)? {
        tracing::debug!(collection = %T::COLLECTION, %id, "Deleted document");
        Ok(Json(json!({ "message": format!("{} deleted", T::NAME) })))
    } else {
        Err(not_found::<T>(&id))
    }
}
