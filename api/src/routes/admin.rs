//! Administrative endpoints.
//!
//! `POST /api/v1/admin/upload-json` bulk-loads an array of documents into one collection.
//! Every document is validated against its model first; a single invalid document
//! rejects the whole batch. Valid batches are upserted by `_id` or, without one, by the
//! collection's natural key. A duplicate key fails the request with 409; the in-memory
//! store then keeps none of the batch, while MongoDB keeps the documents written before
//! the conflicting one.

use crate::error::{ApiError, ValidationErrorDetail};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::models::{normalizer_for, Collection};
use shared::storage::ID_FIELD;
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Request body for `/admin/upload-json`.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Target collection.
    pub collection: Collection,
    /// Documents to upsert.
    pub data: Vec<Value>,
}

/// Outcome of an upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Always true on success.
    pub ok: bool,
    /// Documents inserted.
    pub upserted: u64,
    /// Existing documents that changed.
    pub modified: u64,
    /// Existing documents matched.
    pub matched: u64,
}

/// Creates the admin routes.
pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/admin/upload-json", post(upload_json))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Accepts `_id` either as a hex string or as extended JSON `{"$oid": "..."}`.
fn upload_id(document: &Value) -> Option<Value> {
    match document.get(ID_FIELD)? {
        Value::Object(oid) => oid.get("$oid").cloned(),
        other => Some(other.clone()),
    }
}

fn prepare(collection: Collection, data: Vec<Value>) -> Result<Vec<Map<String, Value>>, ApiError> {
    let normalize = normalizer_for(collection);
    let mut details = Vec::new();
    let mut documents = Vec::with_capacity(data.len());

    for (index, document) in data.into_iter().enumerate() {
        let id = upload_id(&document);
        match normalize(document) {
            Ok(Value::Object(mut map)) => {
                if let Some(id) = id {
                    map.insert(ID_FIELD.to_string(), id);
                }
                documents.push(map);
            }
            Ok(_) => details.push(ValidationErrorDetail {
                index,
                field: "document".to_string(),
                message: "Expected a JSON object".to_string(),
            }),
            Err(e) => details.extend(ValidationErrorDetail::from_model(index, &e)),
        }
    }

    if details.is_empty() {
        Ok(documents)
    } else {
        Err(ApiError::validation(details))
    }
}

async fn upload_json(
    State(state): State<AppState>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let Json(request) = payload?;
    if request.data.is_empty() {
        return Err(ApiError::EmptyBatch(
            "At least one document is required".to_string(),
        ));
    }

    let documents = prepare(request.collection, request.data)?;
    let count = documents.len();
    let summary = state.store().upsert_many(request.collection, documents)?;

    tracing::info!(
        collection = %request.collection,
        count,
        upserted = summary.upserted,
        modified = summary.modified,
        matched = summary.matched,
        "Uploaded documents"
    );

    Ok(Json(UploadResponse {
        ok: true,
        upserted: summary.upserted,
        modified: summary.modified,
        matched: summary.matched,
    }))
}
