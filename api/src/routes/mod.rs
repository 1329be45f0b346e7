//! API route definitions.
//!
//! This module organizes all HTTP routes for the Bizlens API server.

mod admin;
mod attributes;
mod competitors;
mod health;
mod metrics;
mod resources;

pub use admin::admin_routes;
pub use attributes::attributes_routes;
pub use competitors::competitors_routes;
pub use health::health_routes;
pub use metrics::metrics_routes;
pub use resources::resource_routes;

use crate::error::ApiError;
use serde_json::Value;
use shared::storage::{filter::validate_field_name, AggregationOp, Filter};
use std::borrow::Cow;
use validator::ValidationError;

/// Rejects field names that are empty or start with `$`.
fn validate_field(name: &str) -> Result<(), ValidationError> {
    validate_field_name(name).map_err(|e| {
        ValidationError::new("field_name").with_message(Cow::Owned(e.to_string()))
    })
}

/// Same as [`validate_field`] for every name in a list.
fn validate_fields(names: &[String]) -> Result<(), ValidationError> {
    names.iter().try_for_each(|name| validate_field(name))
}

/// Turns an optional `match` body member into a validated filter.
fn parse_match(value: Option<Value>) -> Result<Filter, ApiError> {
    Ok(Filter::parse(value.unwrap_or(Value::Null))?)
}

fn require_value_field(op: AggregationOp, value_field: Option<&str>) -> Result<(), ApiError> {
    if op.needs_value_field() && value_field.is_none() {
        return Err(ApiError::BadRequest(format!(
            "valueField is required for op '{op}'"
        )));
    }
    Ok(())
}
