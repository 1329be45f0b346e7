//! User profile model.

use super::{validate_timestamp, Collection, Resource};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A user profile.
///
/// `name` is also accepted as `nombre` on input. Credentials are not part of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct User {
    /// Display name.
    #[serde(alias = "nombre")]
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: String,

    /// Contact email, unique when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "email is not a valid address"))]
    pub email: Option<String>,

    /// External identifier, unique across users.
    #[validate(length(min = 1, message = "user_id cannot be empty"))]
    pub user_id: String,

    /// Reviews written.
    #[serde(default)]
    pub review_count: u64,

    /// Sign-up date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_timestamp"))]
    pub yelping_since: Option<String>,

    /// "Useful" votes sent.
    #[serde(default)]
    pub useful: i64,

    /// "Funny" votes sent.
    #[serde(default)]
    pub funny: i64,

    /// "Cool" votes sent.
    #[serde(default)]
    pub cool: i64,

    /// Comma-separated years of elite status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elite: Option<String>,

    /// Comma-separated friend ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friends: Option<String>,

    /// Followers.
    #[serde(default)]
    pub fans: u64,

    /// Average rating across the user's reviews.
    #[serde(default)]
    #[validate(range(min = 0.0, max = 5.0, message = "average_stars must be between 0 and 5"))]
    pub average_stars: f64,

    /// Compliment counters.
    #[serde(flatten)]
    pub compliments: Compliments,
}

/// Compliments received, by kind.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Compliments {
    pub compliment_hot: u64,
    pub compliment_more: u64,
    pub compliment_profile: u64,
    pub compliment_cute: u64,
    pub compliment_list: u64,
    pub compliment_note: u64,
    pub compliment_plain: u64,
    pub compliment_cool: u64,
    pub compliment_funny: u64,
    pub compliment_writer: u64,
    pub compliment_photos: u64,
}

impl Compliments {
    /// Sum of all compliment counters.
    #[must_use]
    pub fn total(&self) -> u64 {
        [
            self.compliment_hot,
            self.compliment_more,
            self.compliment_profile,
            self.compliment_cute,
            self.compliment_list,
            self.compliment_note,
            self.compliment_plain,
            self.compliment_cool,
            self.compliment_funny,
            self.compliment_writer,
            self.compliment_photos,
        ]
        .iter()
        .sum()
    }
}

impl Resource for User {
    const COLLECTION: Collection = Collection::Users;
    const NAME: &'static str = "User";
}
