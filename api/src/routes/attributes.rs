//! Business attribute endpoints.
//!
//! - `POST /api/v1/attributes/compare` - attribute tables of up to six businesses
//! - `POST /api/v1/attributes/impact` - average rating per attribute value, and how much
//!   each attribute moves the rating compared to the others

use super::validate_fields;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::chart::key_label;
use shared::models::Collection;
use shared::storage::{AggregationOp, Filter, GroupAggregation, GroupSort, GroupStats};
use validator::Validate;

/// Request body for `/attributes/compare`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    /// Businesses to list.
    #[validate(length(min = 1, max = 6, message = "between 1 and 6 businessIds are required"))]
    pub business_ids: Vec<String>,
}

/// Location restriction of an impact request.
#[derive(Debug, Default, Deserialize)]
pub struct GeoFilter {
    /// Exact city.
    pub city: Option<String>,
    /// Exact state.
    pub state: Option<String>,
}

/// Request body for `/attributes/impact`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImpactRequest {
    /// Substring of the business categories, case-insensitive.
    pub category: Option<String>,
    /// Location restriction.
    #[serde(default)]
    pub geo: GeoFilter,
    /// Attribute paths such as `attributes.NoiseLevel`.
    #[validate(
        length(min = 1, max = 10, message = "between 1 and 10 attributes are required"),
        custom(function = "validate_fields")
    )]
    pub attributes: Vec<String>,
}

/// Average rating of the businesses sharing one attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeImpact {
    /// Attribute path.
    pub key: String,
    /// Attribute value.
    pub value: String,
    /// Mean business stars.
    pub avg_stars: f64,
    /// Businesses with this value.
    pub count: u64,
}

/// Difference between the rating spreads of two attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDiff {
    /// The two attribute paths compared.
    pub compare: [String; 2],
    /// Spread of the first minus spread of the second.
    pub delta: f64,
}

/// Response of `/attributes/impact`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactResponse {
    /// One entry per (attribute, value).
    pub by_attribute: Vec<AttributeImpact>,
    /// One entry per attribute pair.
    pub diff: Vec<AttributeDiff>,
}

/// Creates the attribute routes.
pub fn attributes_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/attributes/compare", post(compare))
        .route("/api/v1/attributes/impact", post(impact))
        .with_state(state)
}

async fn compare(
    State(state): State<AppState>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let ids = request.business_ids.into_iter().map(Value::String).collect();
    let filter = Filter::new().field_in("business_id", ids);
    let businesses = state.store().find(
        Collection::Businesses,
        &filter,
        &["business_id", "name", "attributes"],
    )?;

    Ok(Json(businesses))
}

async fn impact(
    State(state): State<AppState>,
    payload: Result<Json<ImpactRequest>, JsonRejection>,
) -> Result<Json<ImpactResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let mut filter = Filter::new();
    if let Some(category) = request.category.as_deref().filter(|c| !c.trim().is_empty()) {
        filter = filter.contains_text("categories", category.trim());
    }
    if let Some(city) = request.geo.city {
        filter = filter.eq("city", city);
    }
    if let Some(region) = request.geo.state {
        filter = filter.eq("state", region);
    }

    let mut by_attribute = Vec::new();
    let mut spreads = Vec::with_capacity(request.attributes.len());
    for attribute in &request.attributes {
        let spec = GroupAggregation::new(Collection::Businesses)
            .group_by(attribute.as_str())
            .with_op(AggregationOp::Avg, Some("stars".to_string()))
            .with_filter(filter.clone())
            .with_sort(GroupSort::KeyAsc);
        let values = attribute_values(attribute, state.store().aggregate_groups(&spec)?);

        spreads.push((attribute.clone(), spread(&values)));
        by_attribute.extend(values);
    }

    Ok(Json(ImpactResponse {
        by_attribute,
        diff: pairwise_diff(&spreads),
    }))
}

/// Businesses without the attribute are left out.
fn attribute_values(attribute: &str, stats: Vec<GroupStats>) -> Vec<AttributeImpact> {
    stats
        .into_iter()
        .filter_map(|s| {
            let value = s.key.first().filter(|v| !v.is_null())?;
            Some(AttributeImpact {
                key: attribute.to_string(),
                value: key_label(value),
                avg_stars: s.value,
                count: s.count,
            })
        })
        .collect()
}

/// Max minus min average rating across the values of one attribute.
fn spread(values: &[AttributeImpact]) -> f64 {
    let stars = values.iter().map(|v| v.avg_stars);
    match (stars.clone().reduce(f64::max), stars.reduce(f64::min)) {
        (Some(max), Some(min)) => max - min,
        _ => 0.0,
    }
}

fn pairwise_diff(spreads: &[(String, f64)]) -> Vec<AttributeDiff> {
    let mut diff = Vec::new();
    for (i, (a, spread_a)) in spreads.iter().enumerate() {
        for (b, spread_b) in &spreads[i + 1..] {
            diff.push(AttributeDiff {
                compare: [a.clone(), b.clone()],
                delta: spread_a - spread_b,
            });
        }
    }
    diff
}
