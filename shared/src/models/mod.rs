//! Resource models for the review dataset.
//!
//! Each resource type knows the [`Collection`] it is stored in and validates itself with
//! `validator` before anything reaches the store.

pub mod business;
pub mod checkin;
pub mod review;
pub mod tip;
pub mod user;

pub use business::Business;
pub use checkin::CheckIn;
pub use review::Review;
pub use tip::Tip;
pub use user::{Compliments, User};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// The document collections backing the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Collection {
    /// Business listings.
    Businesses,
    /// Reviews left by users on businesses.
    Reviews,
    /// Check-in timestamps, one document per business.
    CheckIns,
    /// Short tips left by users.
    Tips,
    /// User profiles.
    Users,
}

/// A field whose value must be unique within a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueKey {
    /// Field name.
    pub field: &'static str,
    /// Documents without the field are exempt.
    pub sparse: bool,
}

const fn unique(field: &'static str) -> UniqueKey {
    UniqueKey {
        field,
        sparse: false,
    }
}

const fn sparse(field: &'static str) -> UniqueKey {
    UniqueKey {
        field,
        sparse: true,
    }
}

impl Collection {
    /// All collections, in a stable order.
    pub const ALL: [Self; 5] = [
        Self::Businesses,
        Self::Reviews,
        Self::CheckIns,
        Self::Tips,
        Self::Users,
    ];

    /// Returns the stored collection name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Businesses => "negocios",
            Self::Reviews => "resenas",
            Self::CheckIns => "checkin",
            Self::Tips => "tips",
            Self::Users => "usuario",
        }
    }

    /// Returns the fields that carry a unique index.
    #[must_use]
    pub const fn unique_keys(&self) -> &'static [UniqueKey] {
        const BUSINESSES: [UniqueKey; 1] = [unique("business_id")];
        const REVIEWS: [UniqueKey; 1] = [unique("review_id")];
        const USERS: [UniqueKey; 2] = [unique("user_id"), sparse("email")];
        match self {
            Self::Businesses | Self::CheckIns => &BUSINESSES,
            Self::Reviews => &REVIEWS,
            Self::Tips => &[],
            Self::Users => &USERS,
        }
    }

    /// Returns the field bulk uploads match existing documents on when `_id` is absent.
    #[must_use]
    pub const fn natural_key(&self) -> Option<&'static str> {
        match self {
            Self::Businesses | Self::CheckIns => Some("business_id"),
            Self::Reviews => Some("review_id"),
            Self::Tips => None,
            Self::Users => Some("user_id"),
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Collection {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "negocios" | "businesses" | "business" => Ok(Self::Businesses),
            "resenas" | "reseñas" | "reviews" | "review" => Ok(Self::Reviews),
            "checkin" | "checkins" => Ok(Self::CheckIns),
            "tips" | "tip" => Ok(Self::Tips),
            "usuario" | "usuarios" | "users" | "user" => Ok(Self::Users),
            _ => Err(ModelError::UnknownCollection(s.to_string())),
        }
    }
}

impl TryFrom<String> for Collection {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Collection> for &'static str {
    fn from(collection: Collection) -> Self {
        collection.as_str()
    }
}

/// Errors raised while turning JSON into a resource.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The document does not have the shape of the resource.
    #[error("Invalid document: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// The document has the right shape but breaks a field rule.
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The collection name is not one of the known collections.
    #[error("Unknown collection '{0}'")]
    UnknownCollection(String),
}

/// A validated record stored in one collection.
pub trait Resource: Serialize + DeserializeOwned + Validate + Send + Sync + 'static {
    /// Collection the resource lives in.
    const COLLECTION: Collection;

    /// Singular, human-readable name used in messages.
    const NAME: &'static str;

    /// Deserializes and validates a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the resource or fails validation.
    fn from_json(value: Value) -> Result<Self, ModelError> {
        let resource: Self = serde_json::from_value(value)?;
        resource.validate()?;
        Ok(resource)
    }

    /// Serializes the resource into the document that gets stored.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_json(&self) -> Result<Value, ModelError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Validates a document as `T` and returns its canonical stored form.
///
/// Defaults are filled in, aliases are resolved and unknown fields are dropped.
///
/// # Errors
///
/// Returns an error if the document is not a valid `T`.
pub fn normalize_document<T: Resource>(value: Value) -> Result<Value, ModelError> {
    T::from_json(value)?.to_json()
}

/// Returns the normalizer for documents of the given collection.
#[must_use]
pub fn normalizer_for(collection: Collection) -> fn(Value) -> Result<Value, ModelError> {
    match collection {
        Collection::Businesses => normalize_document::<Business>,
        Collection::Reviews => normalize_document::<Review>,
        Collection::CheckIns => normalize_document::<CheckIn>,
        Collection::Tips => normalize_document::<Tip>,
        Collection::Users => normalize_document::<User>,
    }
}

/// Checks that a string is a timestamp the analytics layer can bucket.
///
/// # Errors
///
/// Returns a `timestamp` validation error if the value does not parse.
pub fn validate_timestamp(value: &str) -> Result<(), ValidationError> {
    if crate::time::parse_stored_timestamp(value).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("timestamp").with_message(Cow::Borrowed(
            "Expected YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339",
        )))
    }
}
