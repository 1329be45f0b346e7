//! Integration tests for the attribute endpoints.

use axum::http::StatusCode;
use serde_json::{json, Value};

use super::common::{business, post_json, test_app};

fn with(id: &str, city: &str, stars: f64, attributes: Value) -> Value {
    let mut doc = business(id, id);
    doc["city"] = json!(city);
    doc["stars"] = json!(stars);
    doc["attributes"] = attributes;
    doc
}

async fn seed(app: axum::Router) {
    let (status, _) = post_json(
        app,
        "/api/v1/admin/upload-json",
        json!({
            "collection": "businesses",
            "data": [
                with("b1", "Tampa", 4.5, json!({"WiFi": "free", "NoiseLevel": "quiet"})),
                with("b2", "Tampa", 3.5, json!({"WiFi": "free", "NoiseLevel": "loud"})),
                with("b3", "Tampa", 2.0, json!({"WiFi": "no", "NoiseLevel": "loud"})),
                with("b4", "Tampa", 5.0, json!({"NoiseLevel": "quiet"})),
                with("b5", "Reno", 1.0, json!({"WiFi": "no"}))
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_compare_lists_attribute_tables() {
    let (app, _state) = test_app();
    seed(app.clone()).await;

    let (status, body) = post_json(
        app,
        "/api/v1/attributes/compare",
        json!({"businessIds": ["b1", "b3", "missing"]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert!(row.get("attributes").is_some());
        assert!(row.get("city").is_none());
    }
}

#[tokio::test]
async fn test_impact_in_one_city() {
    let (app, _state) = test_app();
    seed(app.clone()).await;

    let (status, body) = post_json(
        app,
        "/api/v1/attributes/impact",
        json!({
            "category": "mexican",
            "geo": {"city": "Tampa"},
            "attributes": ["attributes.WiFi", "attributes.NoiseLevel"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["byAttribute"],
        json!([
            {"key": "attributes.WiFi", "value": "free", "avgStars": 4.0, "count": 2},
            {"key": "attributes.WiFi", "value": "no", "avgStars": 2.0, "count": 1},
            {"key": "attributes.NoiseLevel", "value": "loud", "avgStars": 2.75, "count": 2},
            {"key": "attributes.NoiseLevel", "value": "quiet", "avgStars": 4.75, "count": 2}
        ])
    );
    assert_eq!(
        body["diff"],
        json!([{"compare": ["attributes.WiFi", "attributes.NoiseLevel"], "delta": 0.0}])
    );
}

#[tokio::test]
async fn test_impact_requires_attributes() {
    let (app, _state) = test_app();

    let (status, response) = post_json(
        app,
        "/api/v1/attributes/impact",
        json!({"attributes": []}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "validation_failed");
}
