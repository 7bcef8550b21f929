//! Product domain types.
//!
//! Three shapes exist on purpose:
//!
//! - [`ProductRecord`] - the full persisted record, photo included. Only the
//!   store and the photo accessor ever see it.
//! - [`ProductSummary`] - the listing projection. Has no photo and no reviews
//!   field at all, so list/filter/search/related responses are bounded in
//!   size by construction.
//! - [`ProductDetail`] - the single-product projection: photo suppressed,
//!   reviews hydrated with their authors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use greenbasket_core::{CategoryId, Price, ProductId, Slug};

use super::category::Category;
use super::review::ReviewDetail;

/// The full persisted product record.
#[derive(Debug, Clone)]
pub struct ProductRecord {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// URL-safe identifier derived from the name.
    pub slug: Slug,
    /// Long-form description.
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Units in stock.
    pub quantity: u32,
    /// Category this product belongs to.
    pub category_id: CategoryId,
    /// Whether the product ships.
    pub shipping: bool,
    /// Optional photo payload.
    pub photo: Option<Photo>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

/// A stored photo payload with its content type.
#[derive(Debug, Clone)]
pub struct Photo {
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// MIME content type, e.g. `image/jpeg`.
    pub content_type: String,
}

/// Listing projection of a product: category resolved, photo and reviews
/// suppressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// URL-safe identifier derived from the name.
    pub slug: Slug,
    /// Long-form description.
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Units in stock.
    pub quantity: u32,
    /// Whether the product ships.
    pub shipping: bool,
    /// The resolved category record.
    pub category: Category,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

/// Single-product projection: photo suppressed, reviews hydrated with their
/// authors, sorted most-recently-updated first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    /// The listing projection of this product.
    #[serde(flatten)]
    pub summary: ProductSummary,
    /// Hydrated reviews, most-recently-updated first.
    pub reviews: Vec<ReviewDetail>,
}

/// Validated input for creating or updating a product.
///
/// Produced only by the catalog service's fixed-order validation; the slug is
/// re-derived from the name every time.
#[derive(Debug, Clone)]
pub struct ProductInput {
    /// Display name.
    pub name: String,
    /// Slug derived from `name`.
    pub slug: Slug,
    /// Long-form description.
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Units in stock.
    pub quantity: u32,
    /// Category this product belongs to.
    pub category_id: CategoryId,
    /// Whether the product ships.
    pub shipping: bool,
    /// Optional replacement photo. `None` leaves any stored photo in place
    /// on update.
    pub photo: Option<Photo>,
}
