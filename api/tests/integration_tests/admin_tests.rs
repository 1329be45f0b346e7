//! Integration tests for bulk upload.

use axum::http::StatusCode;
use serde_json::json;

use super::common::{business, get, post_json, test_app};

#[tokio::test]
async fn test_upload_then_reupload_updates_in_place() {
    let (app, _state) = test_app();

    let (status, summary) = post_json(
        app.clone(),
        "/api/v1/admin/upload-json",
        json!({"collection": "negocios", "data": [business("b1", "One"), business("b2", "Two")]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["ok"], true);
    assert_eq!(summary["upserted"], 2);

    let mut renamed = business("b1", "Uno");
    renamed["stars"] = json!(4.5);
    let (status, summary) = post_json(
        app.clone(),
        "/api/v1/admin/upload-json",
        json!({"collection": "businesses", "data": [renamed, business("b2", "Two")]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["upserted"], 0);
    assert_eq!(summary["matched"], 2);
    assert_eq!(summary["modified"], 1);

    let (_, page) = get(app, "/api/v1/businesses").await;
    assert_eq!(page["total_count"], 2);
    let names: Vec<&str> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|b| b["name"].as_str())
        .collect();
    assert!(names.contains(&"Uno"));
}

#[tokio::test]
async fn test_upload_keeps_extended_json_ids() {
    let (app, _state) = test_app();
    let mut doc = business("b1", "One");
    doc["_id"] = json!({"$oid": "65a1b2c3d4e5f60718293a4b"});

    let (status, _) = post_json(
        app.clone(),
        "/api/v1/admin/upload-json",
        json!({"collection": "businesses", "data": [doc]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, fetched) = get(app, "/api/v1/businesses/65a1b2c3d4e5f60718293a4b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["business_id"], "b1");
}

#[tokio::test]
async fn test_upload_rejects_whole_batch() {
    let (app, _state) = test_app();
    let mut bad = business("b2", "Two");
    bad["stars"] = json!(9);

    let (status, response) = post_json(
        app.clone(),
        "/api/v1/admin/upload-json",
        json!({"collection": "businesses", "data": [business("b1", "One"), bad]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "validation_failed");
    assert_eq!(response["details"][0]["index"], 1);

    let (_, page) = get(app.clone(), "/api/v1/businesses").await;
    assert_eq!(page["total_count"], 0);

    let (status, response) = post_json(
        app,
        "/api/v1/admin/upload-json",
        json!({"collection": "bookings", "data": [{}]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_json");
}

#[tokio::test]
async fn test_conflicting_upload_keeps_nothing() {
    let (app, _state) = test_app();

    let (status, response) = post_json(
        app.clone(),
        "/api/v1/admin/upload-json",
        json!({
            "collection": "users",
            "data": [
                {"user_id": "u1", "name": "Ana", "email": "ana@example.com"},
                {"user_id": "u2", "name": "Bea", "email": "ana@example.com"}
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(response["error"], "duplicate_key");

    let (_, page) = get(app, "/api/v1/users").await;
    assert_eq!(page["total_count"], 0);
}
