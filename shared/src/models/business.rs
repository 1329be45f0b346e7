//! Business listing model.

use super::{Collection, Resource};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// A business listing.
///
/// # Example
///
/// ```
/// use shared::models::{Business, Resource};
///
/// let business = Business::from_json(serde_json::json!({
///     "business_id": "Pns2l4eNsfO8kk83dixA6A",
///     "name": "Abby Rappoport, LAC, CMQ",
///     "state": "CA",
///     "postal_code": "93101",
///     "is_open": 0
/// }))
/// .unwrap();
///
/// assert_eq!(business.stars, 0.0);
/// assert_eq!(business.review_count, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Business {
    /// External identifier, unique across businesses.
    #[validate(length(min = 1, message = "business_id cannot be empty"))]
    pub business_id: String,

    /// Display name.
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: String,

    /// Street address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// City.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// State or province code.
    #[validate(length(min = 1, message = "state cannot be empty"))]
    pub state: String,

    /// Postal code.
    #[validate(length(min = 1, message = "postal_code cannot be empty"))]
    pub postal_code: String,

    /// Latitude in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,

    /// Longitude in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = -180.0, max = 180.0, message = "longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,

    /// Average rating.
    #[serde(default)]
    #[validate(range(min = 0.0, max = 5.0, message = "stars must be between 0 and 5"))]
    pub stars: f64,

    /// Number of reviews received.
    #[serde(default)]
    pub review_count: u64,

    /// 1 if the business is open, 0 if it closed.
    #[validate(range(max = 1, message = "is_open must be 0 or 1"))]
    pub is_open: u8,

    /// Free-form attributes such as `WiFi` or `RestaurantsPriceRange2`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,

    /// Comma-separated category list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,

    /// Opening hours, kept as supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<Value>,
}

impl Resource for Business {
    const COLLECTION: Collection = Collection::Businesses;
    const NAME: &'static str = "Business";
}

impl Business {
    /// Returns the categories as a trimmed list.
    #[must_use]
    pub fn category_list(&self) -> Vec<&str> {
        self.categories
            .as_deref()
            .map(|c| {
                c.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
