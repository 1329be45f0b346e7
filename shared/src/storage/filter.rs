//! Match documents.
//!
//! A [`Filter`] is a MongoDB-style match document restricted to a small, safe subset:
//! field equality, the comparison operators, `$in`/`$nin`, `$exists`, `$regex` with
//! `$options`, and the logical `$and`/`$or`. Anything else is rejected when the filter is
//! built, so a filter that exists is always safe to hand to a backend.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use thiserror::Error;

/// Operators allowed inside a field condition.
const FIELD_OPERATORS: [&str; 11] = [
    "$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin", "$exists", "$regex", "$options",
];

/// Errors raised while building a filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The filter is not a JSON object.
    #[error("Filter must be a JSON object")]
    NotAnObject,

    /// The operator is not in the allowed subset.
    #[error("Unsupported operator '{0}'")]
    UnsupportedOperator(String),

    /// The field name is empty or starts with `$`.
    #[error("Invalid field name '{0}'")]
    InvalidField(String),

    /// The operand does not fit the operator.
    #[error("Invalid operand for '{operator}': {reason}")]
    InvalidOperand {
        /// Operator whose operand was rejected.
        operator: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// A validated match document.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use shared::storage::Filter;
///
/// let filter = Filter::parse(json!({"stars": {"$gte": 4}, "city": "Tampa"})).unwrap();
/// assert!(filter.matches(&json!({"stars": 4.5, "city": "Tampa"})));
/// assert!(!filter.matches(&json!({"stars": 3, "city": "Tampa"})));
///
/// assert!(Filter::parse(json!({"$where": "sleep(1000)"})).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Filter(Map<String, Value>);

impl Filter {
    /// Creates a filter that matches every document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates an arbitrary JSON value as a filter.
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] describing the first rejected part.
    pub fn parse(value: Value) -> Result<Self, FilterError> {
        match value {
            Value::Object(map) => Self::try_from(map),
            Value::Null => Ok(Self::new()),
            _ => Err(FilterError::NotAnObject),
        }
    }

    /// Adds an equality condition.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Adds a membership condition.
    #[must_use]
    pub fn field_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        let mut condition = Map::new();
        condition.insert("$in".to_string(), Value::Array(values));
        self.0.insert(field.into(), Value::Object(condition));
        self
    }

    /// Adds a case-insensitive substring condition. `text` is matched literally.
    #[must_use]
    pub fn contains_text(mut self, field: impl Into<String>, text: &str) -> Self {
        let mut condition = Map::new();
        condition.insert("$regex".to_string(), Value::String(regex::escape(text)));
        condition.insert("$options".to_string(), Value::String("i".to_string()));
        self.0.insert(field.into(), Value::Object(condition));
        self
    }

    /// Combines two filters so both must match.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        let mut map = Map::new();
        map.insert(
            "$and".to_string(),
            Value::Array(vec![Value::Object(self.0), Value::Object(other.0)]),
        );
        Self(map)
    }

    /// Returns true if the filter has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying match document.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Evaluates the filter against a document.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        matches_map(&self.0, document)
    }
}

impl TryFrom<Map<String, Value>> for Filter {
    type Error = FilterError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        validate_map(&map)?;
        Ok(Self(map))
    }
}

impl From<Filter> for Map<String, Value> {
    fn from(filter: Filter) -> Self {
        filter.0
    }
}

/// Checks that `name` can be used as a document field path.
///
/// # Errors
///
/// Returns [`FilterError::InvalidField`] if the name is blank, starts with `$` or has
/// an empty path segment.
pub fn validate_field_name(name: &str) -> Result<(), FilterError> {
    if name.trim().is_empty() || name.starts_with('$') || name.split('.').any(str::is_empty) {
        return Err(FilterError::InvalidField(name.to_string()));
    }
    Ok(())
}

/// Resolves a dotted field path inside a document.
#[must_use]
pub fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

fn validate_map(map: &Map<String, Value>) -> Result<(), FilterError> {
    for (key, value) in map {
        if key.starts_with('$') {
            validate_logical(key, value)?;
        } else {
            validate_field_name(key)?;
            validate_condition(value)?;
        }
    }
    Ok(())
}

fn validate_logical(operator: &str, value: &Value) -> Result<(), FilterError> {
    if operator != "$and" && operator != "$or" {
        return Err(FilterError::UnsupportedOperator(operator.to_string()));
    }
    let clauses = value
        .as_array()
        .filter(|clauses| !clauses.is_empty())
        .ok_or_else(|| invalid_operand(operator, "expected a non-empty array"))?;
    for clause in clauses {
        let map = clause
            .as_object()
            .ok_or_else(|| invalid_operand(operator, "every clause must be an object"))?;
        validate_map(map)?;
    }
    Ok(())
}

fn validate_condition(value: &Value) -> Result<(), FilterError> {
    let Some(condition) = value.as_object() else {
        return Ok(());
    };
    if !condition.keys().any(|k| k.starts_with('$')) {
        return Ok(());
    }

    for (operator, operand) in condition {
        if !FIELD_OPERATORS.contains(&operator.as_str()) {
            return Err(FilterError::UnsupportedOperator(operator.clone()));
        }
        match operator.as_str() {
            "$in" | "$nin" if !operand.is_array() => {
                return Err(invalid_operand(operator, "expected an array"));
            }
            "$exists" if !operand.is_boolean() => {
                return Err(invalid_operand(operator, "expected a boolean"));
            }
            "$regex" => {
                let pattern = operand
                    .as_str()
                    .ok_or_else(|| invalid_operand(operator, "expected a string"))?;
                let options = condition.get("$options").and_then(Value::as_str).unwrap_or("");
                build_regex(pattern, options)
                    .map_err(|e| invalid_operand(operator, &e.to_string()))?;
            }
            "$options" => {
                let options = operand
                    .as_str()
                    .ok_or_else(|| invalid_operand(operator, "expected a string"))?;
                if !condition.contains_key("$regex") {
                    return Err(invalid_operand(operator, "requires $regex"));
                }
                if let Some(flag) = options.chars().find(|c| !"imsx".contains(*c)) {
                    return Err(invalid_operand(operator, &format!("unknown flag '{flag}'")));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn invalid_operand(operator: &str, reason: &str) -> FilterError {
    FilterError::InvalidOperand {
        operator: operator.to_string(),
        reason: reason.to_string(),
    }
}

fn build_regex(pattern: &str, options: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .ignore_whitespace(options.contains('x'))
        .build()
}

fn matches_map(map: &Map<String, Value>, document: &Value) -> bool {
    map.iter().all(|(key, value)| match key.as_str() {
        "$and" => clauses(value).all(|clause| matches_map(clause, document)),
        "$or" => clauses(value).any(|clause| matches_map(clause, document)),
        field => matches_condition(lookup_path(document, field), value),
    })
}

fn clauses(value: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn matches_condition(field: Option<&Value>, condition: &Value) -> bool {
    let operators = condition
        .as_object()
        .filter(|c| c.keys().any(|k| k.starts_with('$')));
    let Some(operators) = operators else {
        return equals(field, condition);
    };

    operators.iter().all(|(operator, operand)| match operator.as_str() {
        "$eq" => equals(field, operand),
        "$ne" => !equals(field, operand),
        "$gt" => compares(field, operand, Ordering::is_gt),
        "$gte" => compares(field, operand, Ordering::is_ge),
        "$lt" => compares(field, operand, Ordering::is_lt),
        "$lte" => compares(field, operand, Ordering::is_le),
        "$in" => operand
            .as_array()
            .is_some_and(|values| values.iter().any(|v| equals(field, v))),
        "$nin" => operand
            .as_array()
            .is_some_and(|values| !values.iter().any(|v| equals(field, v))),
        "$exists" => operand.as_bool() == Some(field.is_some()),
        "$regex" => {
            let options = operators.get("$options").and_then(Value::as_str).unwrap_or("");
            let regex = operand.as_str().and_then(|p| build_regex(p, options).ok());
            regex.is_some_and(|re| candidates(field).any(|v| v.as_str().is_some_and(|s| re.is_match(s))))
        }
        _ => true,
    })
}

/// The value itself plus, for arrays, each element.
fn candidates(field: Option<&Value>) -> impl Iterator<Item = &Value> {
    let elements = field.and_then(Value::as_array).into_iter().flatten();
    field.into_iter().chain(elements)
}

fn equals(field: Option<&Value>, operand: &Value) -> bool {
    if operand.is_null() && matches!(field, None | Some(Value::Null)) {
        return true;
    }
    candidates(field).any(|value| compare(value, operand) == Some(Ordering::Equal) || value == operand)
}

fn compares(field: Option<&Value>, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    candidates(field).any(|value| compare(value, operand).is_some_and(accept))
}

/// Orders two scalars of the same kind. Mixed kinds do not compare.
pub(crate) fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
