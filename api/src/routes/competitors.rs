//! Competitor comparison endpoint.
//!
//! `POST /api/v1/competitors/compare` lines up two to five businesses on one label axis:
//! average rating per bucket, review count per bucket and the star histogram over the
//! whole range.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::chart::{categorical_series, key_label, to_chart_series, CategoryRow, ChartSeries};
use shared::models::Collection;
use shared::storage::{AggregationOp, Filter, GroupAggregation, GroupSort, PeriodAggregation};
use shared::time::{DateRange, Interval};
use validator::Validate;

const REVIEW_DATE_FIELD: &str = "date";
const STAR_CATEGORIES: [&str; 5] = ["1", "2", "3", "4", "5"];

/// Request body for `/competitors/compare`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    /// Businesses to compare.
    #[validate(length(min = 2, max = 5, message = "between 2 and 5 businessIds are required"))]
    pub business_ids: Vec<String>,
    /// Range start.
    pub from: Option<String>,
    /// Range end.
    pub to: Option<String>,
    /// Bucket size.
    #[serde(default)]
    pub interval: Interval,
}

/// Three charts sharing the same datasets, one per business.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    /// Average stars per bucket.
    pub rating_over_time: ChartSeries,
    /// Review count per bucket.
    pub reviews_over_time: ChartSeries,
    /// Reviews per star value over the whole range.
    pub rating_distribution: ChartSeries,
}

/// Creates the competitor routes.
pub fn competitors_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/competitors/compare", post(compare))
        .with_state(state)
}

async fn compare(
    State(state): State<AppState>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> Result<Json<CompareResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let calendar = state.calendar();
    let range = calendar.normalize_range(request.from.as_deref(), request.to.as_deref())?;
    let ids = request
        .business_ids
        .iter()
        .cloned()
        .map(Value::String)
        .collect();
    let filter = Filter::new().field_in("business_id", ids);

    let over_time = |op: AggregationOp| {
        let value_field = op.needs_value_field().then(|| "stars".to_string());
        PeriodAggregation::new(
            Collection::Reviews,
            REVIEW_DATE_FIELD,
            range,
            request.interval,
            calendar.zone(),
        )
        .with_group_field("business_id")
        .with_op(op, value_field)
        .with_filter(filter.clone())
    };

    let avg_rows = state.store().aggregate_periods(&over_time(AggregationOp::Avg))?;
    let count_rows = state
        .store()
        .aggregate_periods(&over_time(AggregationOp::Count))?;
    let distribution = rating_distribution(&state, filter, range)?;

    tracing::debug!(
        businesses = request.business_ids.len(),
        interval = %request.interval,
        "Compared competitors"
    );

    Ok(Json(CompareResponse {
        rating_over_time: to_chart_series(&calendar, &avg_rows, &range, request.interval),
        reviews_over_time: to_chart_series(&calendar, &count_rows, &range, request.interval),
        rating_distribution: distribution,
    }))
}

fn rating_distribution(
    state: &AppState,
    filter: Filter,
    range: DateRange,
) -> Result<ChartSeries, ApiError> {
    let spec = GroupAggregation::new(Collection::Reviews)
        .group_by("business_id")
        .group_by("stars")
        .with_filter(filter)
        .with_window(REVIEW_DATE_FIELD, range)
        .with_sort(GroupSort::KeyAsc);

    #[allow(clippy::cast_precision_loss)]
    let rows: Vec<CategoryRow> = state
        .store()
        .aggregate_groups(&spec)?
        .into_iter()
        .filter_map(|stats| match stats.key.as_slice() {
            [business, stars] if !business.is_null() => Some(CategoryRow {
                group: key_label(business),
                category: key_label(stars),
                value: stats.count as f64,
            }),
            _ => None,
        })
        .collect();

    let categories: Vec<String> = STAR_CATEGORIES.iter().map(ToString::to_string).collect();
    Ok(categorical_series(&rows, &categories))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Map};
    use shared::time::Calendar;
    use tower::ServiceExt;

    fn create_test_router_with_state() -> (Router, AppState) {
        let state = AppState::with_in_memory_store().with_calendar(Calendar::new(chrono_tz::UTC));
        (competitors_routes(state.clone()), state)
    }

    fn review(id: &str, business: &str, stars: f64, date: &str) -> Map<String, Value> {
        match json!({"review_id": id, "business_id": business, "stars": stars, "date": date}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    async fn post(app: Router, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/competitors/compare")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_compare_aligns_businesses() {
        let (app, state) = create_test_router_with_state();
        for doc in [
            review("r1", "b1", 5.0, "2023-01-05 10:00:00"),
            review("r2", "b1", 4.0, "2023-01-25 10:00:00"),
            review("r3", "b2", 2.0, "2023-03-01 10:00:00"),
            review("r4", "b3", 1.0, "2023-02-01 10:00:00"),
        ] {
            state.store().insert(Collection::Reviews, doc).unwrap();
        }

        let (status, body) = post(
            app,
            json!({"businessIds": ["b1", "b2"], "from": "2023-01-01", "to": "2023-03-31"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let labels = json!(["2023-01", "2023-02", "2023-03"]);
        assert_eq!(body["ratingOverTime"]["labels"], labels);
        assert_eq!(body["reviewsOverTime"]["labels"], labels);

        let rating = &body["ratingOverTime"]["datasets"];
        assert_eq!(rating.as_array().unwrap().len(), 2);
        assert_eq!(rating[0]["label"], "b1");
        assert_eq!(rating[0]["data"], json!([4.5, 0.0, 0.0]));
        assert_eq!(rating[1]["data"], json!([0.0, 0.0, 2.0]));

        let counts = &body["reviewsOverTime"]["datasets"];
        assert_eq!(counts[0]["data"], json!([2.0, 0.0, 0.0]));

        let distribution = &body["ratingDistribution"];
        assert_eq!(distribution["labels"], json!(["1", "2", "3", "4", "5"]));
        assert_eq!(
            distribution["datasets"][0]["data"],
            json!([0.0, 0.0, 0.0, 1.0, 1.0])
        );
        assert_eq!(distribution["datasets"][1]["label"], "b2");
    }

    #[tokio::test]
    async fn test_compare_week_interval() {
        let (app, state) = create_test_router_with_state();
        state
            .store()
            .insert(Collection::Reviews, review("r1", "b1", 3.0, "2023-01-01 12:00:00"))
            .unwrap();

        let (status, body) = post(
            app,
            json!({
                "businessIds": ["b1", "b2"],
                "from": "2022-12-26",
                "to": "2023-01-08",
                "interval": "week"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["reviewsOverTime"]["labels"],
            json!(["2022-W52", "2023-W01"])
        );
        assert_eq!(body["reviewsOverTime"]["datasets"][0]["data"], json!([1.0, 0.0]));
    }

    #[tokio::test]
    async fn test_compare_requires_two_to_five_ids() {
        let (app, _) = create_test_router_with_state();

        let (status, body) = post(app.clone(), json!({"businessIds": ["b1"]})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");

        let ids: Vec<String> = (0..6).map(|i| format!("b{i}")).collect();
        let (status, _) = post(app, json!({ "businessIds": ids })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_compare_rejects_unknown_interval() {
        let (app, _) = create_test_router_with_state();

        let (status, body) = post(
            app,
            json!({"businessIds": ["b1", "b2"], "interval": "quarter"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_json");
    }
}
