use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique review identifier, assigned by the ingestion collaborator.
///
/// `Ord` on the wrapped string is the system-wide deterministic
/// tie-breaker: wherever two distances compare equal, the smaller
/// `ReviewId` wins.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub String);

impl ReviewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReviewId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An embedded customer review. Immutable: created by the ingestion
/// collaborator, read-only thereafter.
///
/// Field names follow the source CSV columns (`reviewer_name`,
/// `review_title`, `review_details`, `review_rating`, `url`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Unique identifier.
    pub id: ReviewId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Reviewer display name.
    pub reviewer_name: String,
    /// Review title text.
    pub review_title: String,
    /// Review body text.
    pub review_details: String,
    /// Numeric rating on the 1–5 scale.
    pub review_rating: f32,
    /// Source URL of the review.
    pub url: String,
    /// Embedding vector. Fixed dimensionality, fixed once produced.
    pub embedding: Vec<f32>,
}

/// The full embedded review set, keyed by id for deterministic iteration.
pub type ReviewCatalog = BTreeMap<ReviewId, Review>;
