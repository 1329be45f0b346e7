//! Integration tests for the CRUD endpoints.
//!
//! Tests cover:
//! - Create/fetch/update/delete round trip
//! - Unique keys and 409 responses
//! - Pagination parameters
//! - Validation failures and malformed ids

use axum::http::StatusCode;
use serde_json::json;

use super::common::{business, delete, get, post_json, put_json, review, test_app};

#[tokio::test]
async fn test_business_lifecycle() {
    let (app, _state) = test_app();

    let (status, created) = post_json(app.clone(), "/api/v1/businesses", business("b1", "Taqueria")).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["_id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 24);
    let uri = format!("/api/v1/businesses/{id}");

    let (status, fetched) = get(app.clone(), &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Taqueria");

    let (status, updated) = put_json(app.clone(), &uri, json!({"is_open": 0, "stars": 3.5})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_open"], 0);
    assert_eq!(updated["stars"], 3.5);
    assert_eq!(updated["city"], "Tampa");

    let (status, response) = delete(app.clone(), &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["message"], "Business deleted");

    let (status, response) = get(app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["error"], "not_found");
}

#[tokio::test]
async fn test_duplicate_business_id_conflicts() {
    let (app, _state) = test_app();

    let (status, _) = post_json(app.clone(), "/api/v1/businesses", business("b1", "One")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = post_json(app, "/api/v1/businesses", business("b1", "Two")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(response["error"], "duplicate_key");
}

#[tokio::test]
async fn test_update_cannot_steal_unique_key() {
    let (app, _state) = test_app();

    post_json(app.clone(), "/api/v1/businesses", business("b1", "One")).await;
    let (_, second) = post_json(app.clone(), "/api/v1/businesses", business("b2", "Two")).await;
    let uri = format!("/api/v1/businesses/{}", second["_id"].as_str().unwrap());

    let (status, _) = put_json(app, &uri, json!({"business_id": "b1"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_pagination() {
    let (app, _state) = test_app();

    for i in 0..5 {
        let (status, _) = post_json(
            app.clone(),
            "/api/v1/reviews",
            review(&format!("r{i}"), "b1", 4.0, "2023-01-01 10:00:00"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = get(app.clone(), "/api/v1/reviews?page=2&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_count"], 5);
    assert_eq!(page["page"], 2);
    assert_eq!(page["total_pages"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let (status, page) = get(app, "/api/v1/reviews?page=abc&limit=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], 1);
    assert_eq!(page["items"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_create_validation_failures() {
    let (app, _state) = test_app();

    let (status, response) = post_json(
        app.clone(),
        "/api/v1/reviews",
        review("r1", "b1", 7.0, "2023-01-01"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "validation_failed");
    assert_eq!(response["details"][0]["field"], "stars");

    let (status, response) = post_json(
        app.clone(),
        "/api/v1/reviews",
        review("r1", "b1", 4.0, "yesterday"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["details"][0]["field"], "date");

    let (status, response) = post_json(
        app,
        "/api/v1/users",
        json!({"user_id": "u1", "name": "Ana", "email": "not-an-email"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_user_accepts_spanish_name_alias() {
    let (app, _state) = test_app();

    let (status, created) = post_json(
        app,
        "/api/v1/users",
        json!({"user_id": "u1", "nombre": "Ana"}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Ana");
    assert!(created.get("nombre").is_none());
}

#[tokio::test]
async fn test_checkin_date_list() {
    let (app, _state) = test_app();

    let (status, _) = post_json(
        app.clone(),
        "/api/v1/checkins",
        json!({"business_id": "b1", "date": "2016-04-26 19:49:16, 2016-08-30 18:36:57"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = post_json(
        app,
        "/api/v1/checkins",
        json!({"business_id": "b2", "date": "2016-04-26 19:49:16, soon"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_requests() {
    let (app, _state) = test_app();

    let (status, response) = get(app.clone(), "/api/v1/tips/12345").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "bad_request");

    let (status, _) = put_json(
        app.clone(),
        "/api/v1/tips/65a1b2c3d4e5f60718293a4b",
        json!({"text": "x"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let response = tower::ServiceExt::oneshot(
        app,
        axum::http::Request::builder()
            .method("POST")
            .uri("/api/v1/tips")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
