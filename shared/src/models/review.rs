//! Review model.

use super::{validate_timestamp, Collection, Resource};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A review a user left on a business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Review {
    /// External identifier, unique across reviews.
    #[validate(length(min = 1, message = "review_id cannot be empty"))]
    pub review_id: String,

    /// Author.
    #[validate(length(min = 1, message = "user_id cannot be empty"))]
    pub user_id: String,

    /// Reviewed business.
    #[validate(length(min = 1, message = "business_id cannot be empty"))]
    pub business_id: String,

    /// Rating, 1 to 5.
    #[validate(range(min = 1.0, max = 5.0, message = "stars must be between 1 and 5"))]
    pub stars: f64,

    /// "Useful" votes.
    #[serde(default)]
    pub useful: i64,

    /// "Funny" votes.
    #[serde(default)]
    pub funny: i64,

    /// "Cool" votes.
    #[serde(default)]
    pub cool: i64,

    /// Review body.
    #[validate(length(min = 1, message = "text cannot be empty"))]
    pub text: String,

    /// When the review was written, e.g. `2018-07-07 22:09:11`.
    #[validate(custom(function = "validate_timestamp"))]
    pub date: String,
}

impl Resource for Review {
    const COLLECTION: Collection = Collection::Reviews;
    const NAME: &'static str = "Review";
}
