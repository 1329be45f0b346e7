//! Integration tests for the metric endpoints.
//!
//! Tests cover:
//! - Timeseries bucketing per interval, with zero-filled gaps
//! - Top-N ranking and the `N/A` label for missing keys
//! - KPI values with and without a match document

use axum::http::StatusCode;
use serde_json::json;

use super::common::{business, post_json, review, test_app};

async fn seed_reviews(app: axum::Router) {
    for (id, business_id, stars, date) in [
        ("r1", "b1", 5.0, "2023-01-02 08:00:00"),
        ("r2", "b1", 3.0, "2023-01-03 20:00:00"),
        ("r3", "b2", 4.0, "2023-01-16 12:00:00"),
        ("r4", "b2", 2.0, "2023-02-20 12:00:00"),
    ] {
        let (status, _) = post_json(
            app.clone(),
            "/api/v1/reviews",
            review(id, business_id, stars, date),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn test_timeseries_by_month() {
    let (app, _state) = test_app();
    seed_reviews(app.clone()).await;

    let (status, chart) = post_json(
        app,
        "/api/v1/metrics/timeseries",
        json!({
            "collection": "reviews",
            "dateField": "date",
            "op": "count",
            "from": "2022-12-15",
            "to": "2023-03-10"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        chart["labels"],
        json!(["2022-12", "2023-01", "2023-02", "2023-03"])
    );
    assert_eq!(chart["datasets"][0]["label"], "count(count)");
    assert_eq!(chart["datasets"][0]["data"], json!([0.0, 3.0, 1.0, 0.0]));
}

#[tokio::test]
async fn test_timeseries_by_week_and_day() {
    let (app, _state) = test_app();
    seed_reviews(app.clone()).await;

    let (status, chart) = post_json(
        app.clone(),
        "/api/v1/metrics/timeseries",
        json!({
            "collection": "reviews",
            "dateField": "date",
            "op": "avg",
            "valueField": "stars",
            "from": "2023-01-01",
            "to": "2023-01-20",
            "interval": "week"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        chart["labels"],
        json!(["2022-W52", "2023-W01", "2023-W02", "2023-W03"])
    );
    assert_eq!(chart["datasets"][0]["data"], json!([0.0, 4.0, 0.0, 4.0]));

    let (status, chart) = post_json(
        app,
        "/api/v1/metrics/timeseries",
        json!({
            "collection": "reviews",
            "dateField": "date",
            "from": "2023-01-01",
            "to": "2023-01-03 23:59:59",
            "interval": "day"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        chart["labels"],
        json!(["2023-01-01", "2023-01-02", "2023-01-03"])
    );
    assert_eq!(chart["datasets"][0]["data"], json!([0.0, 1.0, 1.0]));
}

#[tokio::test]
async fn test_timeseries_empty_range() {
    let (app, _state) = test_app();
    seed_reviews(app.clone()).await;

    let (status, chart) = post_json(
        app,
        "/api/v1/metrics/timeseries",
        json!({
            "collection": "reviews",
            "dateField": "date",
            "from": "2023-03-01",
            "to": "2023-01-01"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(chart["labels"], json!([]));
    assert_eq!(chart["datasets"][0]["data"], json!([]));
}

#[tokio::test]
async fn test_top_businesses_by_review_count() {
    let (app, _state) = test_app();
    for (id, name, count) in [("b1", "One", 40), ("b2", "Two", 90), ("b3", "Three", 10)] {
        let mut doc = business(id, name);
        doc["review_count"] = json!(count);
        post_json(app.clone(), "/api/v1/businesses", doc).await;
    }

    let (status, chart) = post_json(
        app,
        "/api/v1/metrics/top",
        json!({
            "collection": "negocios",
            "groupBy": "name",
            "op": "sum",
            "valueField": "review_count",
            "n": 2
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(chart["labels"], json!(["Two", "One"]));
    assert_eq!(chart["datasets"][0]["label"], "sum(review_count)");
    assert_eq!(chart["datasets"][0]["data"], json!([90.0, 40.0]));
}

#[tokio::test]
async fn test_top_labels_missing_keys() {
    let (app, _state) = test_app();
    let mut doc = business("b1", "One");
    doc.as_object_mut().unwrap().remove("city");
    post_json(app.clone(), "/api/v1/businesses", doc).await;
    post_json(app.clone(), "/api/v1/businesses", business("b2", "Two")).await;
    post_json(app.clone(), "/api/v1/businesses", business("b3", "Three")).await;

    let (status, chart) = post_json(
        app,
        "/api/v1/metrics/top",
        json!({"collection": "businesses", "groupBy": "city"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(chart["labels"], json!(["Tampa", "N/A"]));
    assert_eq!(chart["datasets"][0]["data"], json!([2.0, 1.0]));
}

#[tokio::test]
async fn test_kpi() {
    let (app, _state) = test_app();
    seed_reviews(app.clone()).await;

    let (status, body) = post_json(
        app.clone(),
        "/api/v1/metrics/kpi",
        json!({"collection": "reviews", "op": "avg", "valueField": "stars"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], 3.5);

    let (status, body) = post_json(
        app,
        "/api/v1/metrics/kpi",
        json!({
            "collection": "reviews",
            "op": "count",
            "match": {"stars": {"$gte": 4}, "business_id": {"$in": ["b1", "b2"]}}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], 2.0);
}

#[tokio::test]
async fn test_series_label_names_op_and_field() {
    let (app, _state) = test_app();
    seed_reviews(app.clone()).await;

    let (status, chart) = post_json(
        app,
        "/api/v1/metrics/timeseries",
        json!({
            "collection": "reviews",
            "dateField": "date",
            "op": "count",
            "valueField": "stars",
            "from": "2023-01-01",
            "to": "2023-01-31"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(chart["datasets"][0]["label"], "count(stars)");
    assert_eq!(chart["datasets"][0]["data"], json!([3.0]));
}
