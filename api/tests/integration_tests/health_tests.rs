//! Integration tests for the health check and empty-store behavior.

use axum::http::StatusCode;

use super::common::{get, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "bizlens-api");
    assert_eq!(response["timezone"], "UTC");
}

#[tokio::test]
async fn test_empty_collections_return_empty_pages() {
    let (app, _state) = test_app();

    for collection in ["businesses", "reviews", "checkins", "tips", "users"] {
        let (status, response) = get(app.clone(), &format!("/api/v1/{collection}")).await;
        assert_eq!(status, StatusCode::OK, "{collection}");
        assert_eq!(response["total_count"], 0);
        assert_eq!(response["total_pages"], 0);
        assert!(response["items"].as_array().unwrap().is_empty());
    }
}
