//! Tip model.

use super::{validate_timestamp, Collection, Resource};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A short tip a user left on a business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Tip {
    /// Author.
    #[validate(length(min = 1, message = "user_id cannot be empty"))]
    pub user_id: String,

    /// Business the tip is about.
    #[validate(length(min = 1, message = "business_id cannot be empty"))]
    pub business_id: String,

    /// Tip body.
    #[validate(length(min = 1, message = "text cannot be empty"))]
    pub text: String,

    /// When the tip was written.
    #[validate(custom(function = "validate_timestamp"))]
    pub date: String,

    /// Compliments received.
    #[serde(default)]
    pub compliment_count: u64,
}

impl Resource for Tip {
    const COLLECTION: Collection = Collection::Tips;
    const NAME: &'static str = "Tip";
}
