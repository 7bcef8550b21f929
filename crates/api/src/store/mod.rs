//! Catalog store adapter.
//!
//! The [`CatalogStore`] trait is the repository seam between the core logic
//! and the storage engine: services speak in typed records and never see SQL.
//! Two implementations exist:
//!
//! - [`postgres::PgStore`] - production `PostgreSQL` store
//! - [`memory::MemoryStore`] - in-memory store for router tests and tooling
//!
//! # Migrations
//!
//! Migrations live in `crates/api/migrations/` and are run via:
//! ```bash
//! cargo run -p greenbasket-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use greenbasket_core::{CategoryId, OrderId, ProductId, Rating, ReviewId};

use crate::models::{
    Author, Category, NewOrder, NewReview, Photo, ProductDetail, ProductInput, ProductRecord,
    ProductSummary, Review,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate review by the same author).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// A filter predicate over products.
///
/// The same value drives both [`CatalogStore::filter_products`] and
/// [`CatalogStore::count_filtered`], so listings and counts are computed
/// from one predicate-construction rule and can never disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Category constraint; empty means no constraint.
    pub categories: Vec<CategoryId>,
    /// Inclusive price range `[low, high]`; `None` means no constraint.
    pub price: Option<(Decimal, Decimal)>,
}

impl ProductFilter {
    /// Whether the filter constrains anything at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.price.is_none()
    }
}

/// A 1-indexed pagination window with a fixed page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-indexed page number.
    pub number: u32,
    /// Items per page.
    pub size: u32,
}

impl Page {
    /// Create a page, clamping the number to at least 1.
    #[must_use]
    pub const fn new(number: u32, size: u32) -> Self {
        Self {
            number: if number == 0 { 1 } else { number },
            size,
        }
    }

    /// Items to skip before this page starts.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.number as u64 - 1) * self.size as u64
    }

    /// Items in the page window.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.size as u64
    }
}

/// Typed repository interface over products, categories, reviews, and orders.
///
/// All operations are potentially blocking I/O and must be awaited before a
/// response is produced. Concurrency control is delegated entirely to the
/// implementation; the core performs no in-process locking.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // --- Products -----------------------------------------------------------

    /// Persist a new product.
    async fn insert_product(&self, input: ProductInput) -> Result<ProductRecord, StoreError>;

    /// Overwrite an existing product. A `None` photo leaves any stored photo
    /// in place.
    ///
    /// Returns [`StoreError::NotFound`] if the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> Result<ProductRecord, StoreError>;

    /// Delete a product record (photo included).
    ///
    /// Returns [`StoreError::NotFound`] if the product does not exist.
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError>;

    /// All products, newest-first, as listing summaries.
    async fn list_products(&self) -> Result<Vec<ProductSummary>, StoreError>;

    /// A single product by slug, reviews hydrated with their authors and
    /// sorted most-recently-updated first. `None` when no product matches.
    async fn find_product_by_slug(&self, slug: &str)
    -> Result<Option<ProductDetail>, StoreError>;

    /// The stored photo payload for a product, if any.
    async fn find_photo(&self, id: ProductId) -> Result<Option<Photo>, StoreError>;

    /// Products matching `filter`, newest-first, windowed by `page`.
    async fn filter_products(
        &self,
        filter: &ProductFilter,
        page: Page,
    ) -> Result<Vec<ProductSummary>, StoreError>;

    /// Total number of products matching `filter`.
    async fn count_filtered(&self, filter: &ProductFilter) -> Result<u64, StoreError>;

    /// Unfiltered page of products, newest-first.
    async fn list_page(&self, page: Page) -> Result<Vec<ProductSummary>, StoreError>;

    /// Total number of products.
    async fn count_products(&self) -> Result<u64, StoreError>;

    /// Case-insensitive substring match against name or description. An empty
    /// keyword matches everything.
    async fn search_products(&self, keyword: &str) -> Result<Vec<ProductSummary>, StoreError>;

    /// Up to `limit` products in `category`, excluding `product`. Order is
    /// store-stable; no sort is mandated.
    async fn related_products(
        &self,
        product: ProductId,
        category: CategoryId,
        limit: u32,
    ) -> Result<Vec<ProductSummary>, StoreError>;

    /// All products referencing `category`, newest-first.
    async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<ProductSummary>, StoreError>;

    // --- Categories ---------------------------------------------------------

    /// Persist a new category, deriving its slug from the name.
    async fn insert_category(&self, name: &str) -> Result<Category, StoreError>;

    /// A category by slug. `None` when no category matches.
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError>;

    // --- Reviews ------------------------------------------------------------

    /// The reviews attached to a product, or `None` if the product itself
    /// does not exist.
    async fn reviews_for_product(
        &self,
        product: ProductId,
    ) -> Result<Option<Vec<Review>>, StoreError>;

    /// A review by ID. `None` when no review matches.
    async fn find_review(&self, id: ReviewId) -> Result<Option<Review>, StoreError>;

    /// Persist a new review and attach it to its product.
    ///
    /// Returns [`StoreError::Conflict`] if the author already has a review on
    /// the product (uniqueness constraint).
    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError>;

    /// Overwrite a review's body and rating in place. Identity and product
    /// linkage are immutable.
    ///
    /// Returns [`StoreError::NotFound`] if the review does not exist.
    async fn update_review(
        &self,
        id: ReviewId,
        body: &str,
        rating: Rating,
    ) -> Result<Review, StoreError>;

    /// Remove the review from its product and delete the record. Idempotent:
    /// deleting an already-deleted review succeeds.
    async fn delete_review(&self, product: ProductId, review: ReviewId)
    -> Result<(), StoreError>;

    // --- Identity -----------------------------------------------------------

    /// Record or refresh a review author's display name, as resolved by the
    /// out-of-scope auth layer.
    async fn upsert_author(&self, author: &Author) -> Result<(), StoreError>;

    // --- Orders -------------------------------------------------------------

    /// Persist an order as the terminal step of a successful checkout.
    async fn insert_order(&self, order: NewOrder) -> Result<OrderId, StoreError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamps_to_one() {
        let page = Page::new(0, 8);
        assert_eq!(page.number, 1);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_offset() {
        let page = Page::new(3, 6);
        assert_eq!(page.offset(), 12);
        assert_eq!(page.limit(), 6);
    }

    #[test]
    fn test_empty_filter() {
        assert!(ProductFilter::default().is_empty());
        let filter = ProductFilter {
            categories: vec![CategoryId::new(1)],
            price: None,
        };
        assert!(!filter.is_empty());
    }
}
