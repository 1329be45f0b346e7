//! Generic metric endpoints.
//!
//! - `POST /api/v1/metrics/timeseries` - one aggregated value per calendar bucket
//! - `POST /api/v1/metrics/top` - the `n` groups with the largest aggregated value
//! - `POST /api/v1/metrics/kpi` - one aggregated value over a whole collection

use super::{parse_match, require_value_field, validate_field};
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::chart::{key_label, ranked_series, to_single_series, ChartSeries};
use shared::models::Collection;
use shared::storage::{AggregationOp, GroupAggregation, PeriodAggregation};
use shared::time::Interval;
use validator::Validate;

const fn default_top_n() -> u64 {
    10
}

/// Request body for `/metrics/timeseries`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesRequest {
    /// Collection to aggregate.
    pub collection: Collection,
    /// Field holding each document's timestamp.
    #[validate(custom(function = "validate_field"))]
    pub date_field: String,
    /// Reduction per bucket.
    #[serde(default)]
    pub op: AggregationOp,
    /// Field the reduction reads; required unless `op` is count.
    #[validate(custom(function = "validate_field"))]
    pub value_field: Option<String>,
    /// Range start.
    pub from: Option<String>,
    /// Range end.
    pub to: Option<String>,
    /// Bucket size.
    #[serde(default)]
    pub interval: Interval,
    /// Extra match document.
    #[serde(rename = "match")]
    pub filter: Option<Value>,
}

/// Request body for `/metrics/top`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TopRequest {
    /// Collection to aggregate.
    pub collection: Collection,
    /// Field whose values form the groups.
    #[validate(custom(function = "validate_field"))]
    pub group_by: String,
    /// Reduction per group.
    #[serde(default)]
    pub op: AggregationOp,
    /// Field the reduction reads; required unless `op` is count.
    #[validate(custom(function = "validate_field"))]
    pub value_field: Option<String>,
    /// How many groups to return.
    #[serde(default = "default_top_n")]
    #[validate(range(min = 1, max = 100, message = "n must be between 1 and 100"))]
    pub n: u64,
    /// Extra match document.
    #[serde(rename = "match")]
    pub filter: Option<Value>,
}

/// Request body for `/metrics/kpi`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct KpiRequest {
    /// Collection to aggregate.
    pub collection: Collection,
    /// Reduction over every matching document.
    #[serde(default)]
    pub op: AggregationOp,
    /// Field the reduction reads; required unless `op` is count.
    #[validate(custom(function = "validate_field"))]
    pub value_field: Option<String>,
    /// Extra match document.
    #[serde(rename = "match")]
    pub filter: Option<Value>,
}

/// A single aggregated value.
#[derive(Debug, Serialize, Deserialize)]
pub struct KpiResponse {
    /// The value, 0 when nothing matched.
    pub value: f64,
}

/// Creates the metric routes.
pub fn metrics_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/metrics/timeseries", post(timeseries))
        .route("/api/v1/metrics/top", post(top))
        .route("/api/v1/metrics/kpi", post(kpi))
        .with_state(state)
}

async fn timeseries(
    State(state): State<AppState>,
    payload: Result<Json<TimeseriesRequest>, JsonRejection>,
) -> Result<Json<ChartSeries>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;
    require_value_field(request.op, request.value_field.as_deref())?;

    let calendar = state.calendar();
    let range = calendar.normalize_range(request.from.as_deref(), request.to.as_deref())?;
    let label = request.op.series_label(request.value_field.as_deref());

    let spec = PeriodAggregation::new(
        request.collection,
        request.date_field,
        range,
        request.interval,
        calendar.zone(),
    )
    .with_op(request.op, request.value_field)
    .with_filter(parse_match(request.filter)?);
    let rows = state.store().aggregate_periods(&spec)?;

    tracing::debug!(
        collection = %request.collection,
        interval = %request.interval,
        rows = rows.len(),
        "Computed timeseries"
    );
    Ok(Json(to_single_series(
        &calendar,
        &rows,
        &range,
        request.interval,
        &label,
    )))
}

async fn top(
    State(state): State<AppState>,
    payload: Result<Json<TopRequest>, JsonRejection>,
) -> Result<Json<ChartSeries>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;
    require_value_field(request.op, request.value_field.as_deref())?;

    let label = request.op.series_label(request.value_field.as_deref());
    let spec = GroupAggregation::new(request.collection)
        .group_by(request.group_by)
        .with_op(request.op, request.value_field)
        .with_filter(parse_match(request.filter)?)
        .with_limit(request.n);
    let stats = state.store().aggregate_groups(&spec)?;

    let rows = stats.into_iter().map(|s| {
        let key = s.key.first().map_or_else(|| key_label(&Value::Null), key_label);
        (key, s.value)
    });
    Ok(Json(ranked_series(rows, &label)))
}

async fn kpi(
    State(state): State<AppState>,
    payload: Result<Json<KpiRequest>, JsonRejection>,
) -> Result<Json<KpiResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;
    require_value_field(request.op, request.value_field.as_deref())?;

    let spec = GroupAggregation::new(request.collection)
        .with_op(request.op, request.value_field)
        .with_filter(parse_match(request.filter)?);
    let value = state
        .store()
        .aggregate_groups(&spec)?
        .first()
        .map_or(0.0, |s| s.value);

    Ok(Json(KpiResponse { value }))
}
