//! Integration tests for the competitor comparison endpoint.

use axum::http::StatusCode;
use serde_json::json;

use super::common::{post_json, review, test_app};

#[tokio::test]
async fn test_compare_uploaded_reviews() {
    let (app, _state) = test_app();

    let (status, _) = post_json(
        app.clone(),
        "/api/v1/admin/upload-json",
        json!({
            "collection": "reseñas",
            "data": [
                review("r1", "b1", 5.0, "2023-01-02 09:00:00"),
                review("r2", "b1", 3.0, "2023-01-04 09:00:00"),
                review("r3", "b2", 4.0, "2023-01-10 09:00:00"),
                review("r4", "b2", 4.0, "2023-01-11 09:00:00"),
                review("r5", "b3", 1.0, "2023-01-02 09:00:00")
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(
        app,
        "/api/v1/competitors/compare",
        json!({
            "businessIds": ["b2", "b1"],
            "from": "2023-01-02",
            "to": "2023-01-15",
            "interval": "week"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let labels = json!(["2023-W01", "2023-W02"]);
    assert_eq!(body["ratingOverTime"]["labels"], labels);
    assert_eq!(body["reviewsOverTime"]["labels"], labels);

    let rating = &body["ratingOverTime"]["datasets"];
    assert_eq!(rating.as_array().unwrap().len(), 2);
    assert_eq!(rating[0]["label"], "b1");
    assert_eq!(rating[0]["data"], json!([4.0, 0.0]));
    assert_eq!(rating[1]["label"], "b2");
    assert_eq!(rating[1]["data"], json!([0.0, 4.0]));

    let counts = &body["reviewsOverTime"]["datasets"];
    assert_eq!(counts[0]["data"], json!([2.0, 0.0]));
    assert_eq!(counts[1]["data"], json!([0.0, 2.0]));

    let distribution = &body["ratingDistribution"];
    assert_eq!(distribution["labels"], json!(["1", "2", "3", "4", "5"]));
    assert_eq!(distribution["datasets"][0]["data"], json!([0.0, 0.0, 1.0, 0.0, 1.0]));
    assert_eq!(distribution["datasets"][1]["data"], json!([0.0, 0.0, 0.0, 2.0, 0.0]));
}

#[tokio::test]
async fn test_compare_rejects_bad_requests() {
    let (app, _state) = test_app();

    let (status, response) = post_json(
        app.clone(),
        "/api/v1/competitors/compare",
        json!({"businessIds": ["b1"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "validation_failed");

    let (status, response) = post_json(
        app,
        "/api/v1/competitors/compare",
        json!({"businessIds": ["b1", "b2"], "from": "last tuesday"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "bad_request");
}
