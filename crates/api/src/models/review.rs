//! Review domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use greenbasket_core::{ProductId, Rating, ReviewId, UserId};

/// A persisted review.
///
/// Exactly one review may exist per (product, author) pair; the ledger checks
/// this before inserting and the store's uniqueness constraint backstops the
/// check under concurrent posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Unique review ID.
    pub id: ReviewId,
    /// Product this review belongs to. Immutable after creation.
    pub product_id: ProductId,
    /// Review body text.
    pub body: String,
    /// Rating on the 1-5 scale.
    pub rating: Rating,
    /// The author's identity. Immutable after creation.
    pub author: UserId,
    /// When the review was posted.
    pub created_at: DateTime<Utc>,
    /// When the review was last edited.
    pub updated_at: DateTime<Utc>,
}

/// Input for posting a new review. Built by the review ledger after its
/// precondition checks pass.
#[derive(Debug, Clone)]
pub struct NewReview {
    /// Product being reviewed.
    pub product_id: ProductId,
    /// Review body text (non-empty).
    pub body: String,
    /// Rating on the 1-5 scale.
    pub rating: Rating,
    /// The posting actor.
    pub author: UserId,
}

/// A review author resolved for hydration on the single-product view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// The author's user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
}

/// A review hydrated with its author, as returned on the single-product view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDetail {
    /// Unique review ID.
    pub id: ReviewId,
    /// Review body text.
    pub body: String,
    /// Rating on the 1-5 scale.
    pub rating: Rating,
    /// The resolved author.
    pub author: Author,
    /// When the review was posted.
    pub created_at: DateTime<Utc>,
    /// When the review was last edited.
    pub updated_at: DateTime<Utc>,
}
