//! HTTP error responses.
//!
//! Every handler returns [`ApiError`] on failure; it renders as
//! `{"error": "<code>", "message": "<text>"}` with an optional `details` list for
//! validation failures.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use shared::models::ModelError;
use shared::storage::{FilterError, StoreError};
use shared::time::TimeError;
use thiserror::Error;
use validator::ValidationErrors;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Detailed error message.
    pub message: String,
    /// Validation errors by index (for batch requests).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

/// Validation error detail for a specific document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Index in the batch (0 for single requests).
    pub index: usize,
    /// Field that failed validation.
    pub field: String,
    /// Error message.
    pub message: String,
}

impl ValidationErrorDetail {
    /// Flattens validator errors into one detail per failed rule, sorted by field.
    #[must_use]
    pub fn from_validation(index: usize, errors: &ValidationErrors) -> Vec<Self> {
        let mut details: Vec<Self> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                let field = field.to_string();
                errors.iter().map(move |e| Self {
                    index,
                    field: field.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map_or_else(|| format!("failed '{}' check", e.code), ToString::to_string),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        details
    }

    /// Details for a document that failed to become a model.
    #[must_use]
    pub fn from_model(index: usize, error: &ModelError) -> Vec<Self> {
        match error {
            ModelError::Validation(errors) => Self::from_validation(index, errors),
            other => vec![Self {
                index,
                field: "document".to_string(),
                message: other.to_string(),
            }],
        }
    }
}

/// Errors produced by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The body is not valid JSON or does not have the expected shape.
    #[error("{0}")]
    InvalidJson(String),

    /// One or more documents broke a field rule.
    #[error("{message}")]
    Validation {
        /// Summary message.
        message: String,
        /// One entry per failed rule.
        details: Vec<ValidationErrorDetail>,
    },

    /// The body exceeds the route's size limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// A batch request carried no documents.
    #[error("{0}")]
    EmptyBatch(String),

    /// Any other client error.
    #[error("{0}")]
    BadRequest(String),

    /// The addressed document does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A unique key is already taken.
    #[error("{0}")]
    Conflict(String),

    /// Storage or other server-side failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Builds a validation error from collected details.
    #[must_use]
    pub fn validation(details: Vec<ValidationErrorDetail>) -> Self {
        let failed = details
            .iter()
            .map(|d| d.index)
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        Self::Validation {
            message: format!("{failed} document(s) failed validation"),
            details,
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidJson(_) => (StatusCode::BAD_REQUEST, "invalid_json"),
            Self::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_failed"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            Self::EmptyBatch(_) => (StatusCode::BAD_REQUEST, "empty_batch"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "duplicate_key"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, code, "Request rejected");
        }

        let message = self.to_string();
        let details = match self {
            Self::Validation { details, .. } => Some(details),
            _ => None,
        };
        let body = ErrorResponse {
            error: code.to_string(),
            message,
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::InvalidJson(rejection.body_text())
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidId(_) | StoreError::InvalidDocument(_) => {
                Self::BadRequest(e.to_string())
            }
            StoreError::Duplicate { .. } => Self::Conflict(e.to_string()),
            StoreError::LockError | StoreError::StorageError(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<TimeError> for ApiError {
    fn from(e: TimeError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<FilterError> for ApiError {
    fn from(e: FilterError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        Self::validation(ValidationErrorDetail::from_validation(0, &e))
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::UnknownCollection(_) => Self::BadRequest(e.to_string()),
            other => Self::validation(ValidationErrorDetail::from_model(0, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use shared::models::{Collection, Resource, Review};

    async fn render(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_store_errors_map_to_status() {
        let (status, body) = render(StoreError::InvalidId("xyz".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");

        let duplicate = StoreError::Duplicate {
            collection: Collection::Businesses,
            detail: "business_id 'b1'".into(),
        };
        let (status, body) = render(duplicate.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "duplicate_key");

        let (status, _) = render(StoreError::LockError.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_validation_error_has_details() {
        let error = Review::from_json(serde_json::json!({
            "review_id": "r1",
            "user_id": "u1",
            "business_id": "b1",
            "stars": 9,
            "text": "Great tacos",
            "date": "2023-01-01"
        }))
        .unwrap_err();

        let (status, body) = render(error.into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["details"][0]["index"], 0);
        assert_eq!(body["details"][0]["field"], "stars");
    }

    #[tokio::test]
    async fn test_details_omitted_when_absent() {
        let (status, body) = render(ApiError::NotFound("Business not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Business not found");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_validation_message_counts_documents() {
        let detail = |index| ValidationErrorDetail {
            index,
            field: "stars".into(),
            message: "out of range".into(),
        };
        let error = ApiError::validation(vec![detail(0), detail(0), detail(3)]);
        assert_eq!(error.to_string(), "2 document(s) failed validation");
    }
}
