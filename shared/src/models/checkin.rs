//! Check-in model.

use super::{Collection, Resource};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// All check-ins of one business.
///
/// `date` holds every check-in timestamp of the business, comma separated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CheckIn {
    /// Business the check-ins belong to; one document per business.
    #[validate(length(min = 1, message = "business_id cannot be empty"))]
    pub business_id: String,

    /// Comma-separated check-in timestamps.
    #[validate(custom(function = "validate_date_list"))]
    pub date: String,
}

impl Resource for CheckIn {
    const COLLECTION: Collection = Collection::CheckIns;
    const NAME: &'static str = "Check-in";
}

impl CheckIn {
    /// Iterates over the individual timestamps in `date`.
    pub fn timestamps(&self) -> impl Iterator<Item = &str> {
        self.date.split(',').map(str::trim).filter(|s| !s.is_empty())
    }
}

fn validate_date_list(value: &str) -> Result<(), ValidationError> {
    let mut entries = value.split(',').map(str::trim).filter(|s| !s.is_empty()).peekable();
    if entries.peek().is_none() {
        return Err(ValidationError::new("length")
            .with_message(Cow::Borrowed("date must list at least one timestamp")));
    }
    for entry in entries {
        if crate::time::parse_stored_timestamp(entry).is_none() {
            return Err(ValidationError::new("timestamp")
                .with_message(Cow::Owned(format!("'{entry}' is not a valid timestamp"))));
        }
    }
    Ok(())
}
