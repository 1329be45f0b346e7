//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup, HTTP request helpers and sample records.

#![allow(dead_code)]

use api::{create_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shared::time::Calendar;

/// Creates a test router with a fresh in-memory store, bucketing in UTC.
pub fn test_app() -> (Router, AppState) {
    let state = AppState::with_in_memory_store().with_calendar(Calendar::new(chrono_tz::UTC));
    let router = create_router(state.clone());
    (router, state)
}

async fn send(app: Router, method: &str, uri: &str, body: Option<&Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_string(body).unwrap())
        }
        None => Body::empty(),
    };

    let response = tower::ServiceExt::oneshot(app, request.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// POSTs a JSON body and returns the status and parsed response.
pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(&body)).await
}

/// PUTs a JSON body and returns the status and parsed response.
pub async fn put_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", uri, Some(&body)).await
}

/// GETs a URI and returns the status and parsed response.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

/// DELETEs a URI and returns the status and parsed response.
pub async fn delete(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, "DELETE", uri, None).await
}

/// A valid business document.
pub fn business(id: &str, name: &str) -> Value {
    json!({
        "business_id": id,
        "name": name,
        "address": "1 Main St",
        "city": "Tampa",
        "state": "FL",
        "postal_code": "33602",
        "latitude": 27.95,
        "longitude": -82.46,
        "stars": 4.0,
        "review_count": 10,
        "is_open": 1,
        "categories": "Mexican, Restaurants",
        "attributes": {"WiFi": "free"}
    })
}

/// A valid review document.
pub fn review(id: &str, business_id: &str, stars: f64, date: &str) -> Value {
    json!({
        "review_id": id,
        "user_id": "u1",
        "business_id": business_id,
        "stars": stars,
        "text": "Solid tacos, slow service",
        "date": date
    })
}
