//! `PostgreSQL` implementation of the catalog store.
//!
//! Row structs are converted into domain types at the boundary; invalid data
//! read back from the database surfaces as [`StoreError::DataCorruption`]
//! rather than panicking. Queries use the runtime sqlx API so the crate
//! builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, QueryBuilder, Row};

use greenbasket_core::{CategoryId, OrderId, Price, ProductId, Rating, ReviewId, Slug, UserId};

use crate::models::{
    Author, Category, NewOrder, NewReview, Photo, ProductDetail, ProductInput, ProductRecord,
    ProductSummary, Review, ReviewDetail,
};

use super::{CatalogStore, Page, ProductFilter, StoreError};

/// Shared SELECT for listing projections: category resolved, photo and
/// reviews never part of the column list.
const SUMMARY_SELECT: &str = "SELECT p.id, p.name, p.slug, p.description, p.price, p.quantity, \
     p.shipping, p.created_at, \
     c.id AS category_id, c.name AS category_name, c.slug AS category_slug \
     FROM product p JOIN category c ON c.id = p.category_id";

/// Newest-first ordering with a deterministic tiebreaker.
const NEWEST_FIRST: &str = " ORDER BY p.created_at DESC, p.id DESC";

/// `PostgreSQL`-backed catalog store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool (used by the readiness probe).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: i32,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    quantity: i32,
    shipping: bool,
    created_at: DateTime<Utc>,
    category_id: i32,
    category_name: String,
    category_slug: String,
}

impl SummaryRow {
    fn into_summary(self) -> Result<ProductSummary, StoreError> {
        Ok(ProductSummary {
            id: ProductId::new(self.id),
            name: self.name,
            slug: Slug::from_stored(self.slug),
            description: self.description,
            price: Price::new(self.price).map_err(|e| {
                StoreError::DataCorruption(format!("invalid price in database: {e}"))
            })?,
            quantity: u32::try_from(self.quantity).map_err(|_| {
                StoreError::DataCorruption(format!(
                    "negative quantity in database: {}",
                    self.quantity
                ))
            })?,
            shipping: self.shipping,
            category: Category {
                id: CategoryId::new(self.category_id),
                name: self.category_name,
                slug: Slug::from_stored(self.category_slug),
            },
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    quantity: i32,
    category_id: i32,
    shipping: bool,
    photo: Option<Vec<u8>>,
    photo_content_type: Option<String>,
    created_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_record(self) -> Result<ProductRecord, StoreError> {
        let photo = match (self.photo, self.photo_content_type) {
            (Some(bytes), Some(content_type)) => Some(Photo {
                bytes,
                content_type,
            }),
            _ => None,
        };

        Ok(ProductRecord {
            id: ProductId::new(self.id),
            name: self.name,
            slug: Slug::from_stored(self.slug),
            description: self.description,
            price: Price::new(self.price).map_err(|e| {
                StoreError::DataCorruption(format!("invalid price in database: {e}"))
            })?,
            quantity: u32::try_from(self.quantity).map_err(|_| {
                StoreError::DataCorruption(format!(
                    "negative quantity in database: {}",
                    self.quantity
                ))
            })?,
            category_id: CategoryId::new(self.category_id),
            shipping: self.shipping,
            photo,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    product_id: i32,
    body: String,
    rating: i32,
    author_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_review(self) -> Result<Review, StoreError> {
        Ok(Review {
            id: ReviewId::new(self.id),
            product_id: ProductId::new(self.product_id),
            body: self.body,
            rating: Rating::new(i64::from(self.rating)).map_err(|e| {
                StoreError::DataCorruption(format!("invalid rating in database: {e}"))
            })?,
            author: UserId::new(self.author_id),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewDetailRow {
    id: i32,
    body: String,
    rating: i32,
    author_id: i32,
    author_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReviewDetailRow {
    fn into_detail(self) -> Result<ReviewDetail, StoreError> {
        Ok(ReviewDetail {
            id: ReviewId::new(self.id),
            body: self.body,
            rating: Rating::new(i64::from(self.rating)).map_err(|e| {
                StoreError::DataCorruption(format!("invalid rating in database: {e}"))
            })?,
            author: Author {
                id: UserId::new(self.author_id),
                name: self.author_name.unwrap_or_else(|| "customer".to_owned()),
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Append the WHERE clauses for `filter` to a query.
///
/// Both `filter_products` and `count_filtered` go through here, which is what
/// keeps the listing and the count on the identical predicate.
fn push_filter_clauses(builder: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &ProductFilter) {
    if !filter.categories.is_empty() {
        let ids: Vec<i32> = filter.categories.iter().map(|c| c.as_i32()).collect();
        builder.push(" AND p.category_id = ANY(");
        builder.push_bind(ids);
        builder.push(")");
    }

    if let Some((low, high)) = filter.price {
        builder.push(" AND p.price >= ");
        builder.push_bind(low);
        builder.push(" AND p.price <= ");
        builder.push_bind(high);
    }
}

/// Escape LIKE metacharacters so a keyword is matched literally.
fn escape_like(keyword: &str) -> String {
    keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn rows_to_summaries(rows: Vec<SummaryRow>) -> Result<Vec<ProductSummary>, StoreError> {
    rows.into_iter().map(SummaryRow::into_summary).collect()
}

fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

// =============================================================================
// CatalogStore implementation
// =============================================================================

#[async_trait]
impl CatalogStore for PgStore {
    async fn insert_product(&self, input: ProductInput) -> Result<ProductRecord, StoreError> {
        let (photo, content_type) = match input.photo {
            Some(photo) => (Some(photo.bytes), Some(photo.content_type)),
            None => (None, None),
        };

        let row = sqlx::query_as::<_, ProductRow>(
            "INSERT INTO product \
             (name, slug, description, price, quantity, category_id, shipping, photo, photo_content_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id, name, slug, description, price, quantity, category_id, shipping, \
                       photo, photo_content_type, created_at",
        )
        .bind(&input.name)
        .bind(input.slug.as_str())
        .bind(&input.description)
        .bind(input.price.amount())
        .bind(i32::try_from(input.quantity).unwrap_or(i32::MAX))
        .bind(input.category_id.as_i32())
        .bind(input.shipping)
        .bind(photo)
        .bind(content_type)
        .fetch_one(&self.pool)
        .await?;

        row.into_record()
    }

    async fn update_product(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> Result<ProductRecord, StoreError> {
        let (photo, content_type) = match input.photo {
            Some(photo) => (Some(photo.bytes), Some(photo.content_type)),
            None => (None, None),
        };

        let row = sqlx::query_as::<_, ProductRow>(
            "UPDATE product SET \
             name = $2, slug = $3, description = $4, price = $5, quantity = $6, \
             category_id = $7, shipping = $8, \
             photo = COALESCE($9, photo), \
             photo_content_type = COALESCE($10, photo_content_type) \
             WHERE id = $1 \
             RETURNING id, name, slug, description, price, quantity, category_id, shipping, \
                       photo, photo_content_type, created_at",
        )
        .bind(id.as_i32())
        .bind(&input.name)
        .bind(input.slug.as_str())
        .bind(&input.description)
        .bind(input.price.amount())
        .bind(i32::try_from(input.quantity).unwrap_or(i32::MAX))
        .bind(input.category_id.as_i32())
        .bind(input.shipping)
        .bind(photo)
        .bind(content_type)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::NotFound)?.into_record()
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<ProductSummary>, StoreError> {
        let sql = format!("{SUMMARY_SELECT}{NEWEST_FIRST}");
        let rows = sqlx::query_as::<_, SummaryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows_to_summaries(rows)
    }

    async fn find_product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductDetail>, StoreError> {
        // Slugs are not unique; a collision resolves to the newest product.
        let sql = format!("{SUMMARY_SELECT} WHERE p.slug = $1{NEWEST_FIRST} LIMIT 1");
        let Some(row) = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let summary = row.into_summary()?;

        let review_rows = sqlx::query_as::<_, ReviewDetailRow>(
            "SELECT r.id, r.body, r.rating, r.author_id, u.name AS author_name, \
                    r.created_at, r.updated_at \
             FROM review r LEFT JOIN app_user u ON u.id = r.author_id \
             WHERE r.product_id = $1 \
             ORDER BY r.updated_at DESC, r.id DESC",
        )
        .bind(summary.id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        let reviews = review_rows
            .into_iter()
            .map(ReviewDetailRow::into_detail)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ProductDetail { summary, reviews }))
    }

    async fn find_photo(&self, id: ProductId) -> Result<Option<Photo>, StoreError> {
        let row = sqlx::query(
            "SELECT photo, photo_content_type FROM product WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let bytes: Option<Vec<u8>> = row.try_get("photo")?;
        let content_type: Option<String> = row.try_get("photo_content_type")?;

        Ok(match (bytes, content_type) {
            (Some(bytes), Some(content_type)) => Some(Photo {
                bytes,
                content_type,
            }),
            _ => None,
        })
    }

    async fn filter_products(
        &self,
        filter: &ProductFilter,
        page: Page,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        let mut builder = QueryBuilder::new(format!("{SUMMARY_SELECT} WHERE TRUE"));
        push_filter_clauses(&mut builder, filter);
        builder.push(NEWEST_FIRST);
        builder.push(" LIMIT ");
        builder.push_bind(i64::try_from(page.limit()).unwrap_or(i64::MAX));
        builder.push(" OFFSET ");
        builder.push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let rows = builder
            .build_query_as::<SummaryRow>()
            .fetch_all(&self.pool)
            .await?;
        rows_to_summaries(rows)
    }

    async fn count_filtered(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM product p WHERE TRUE");
        push_filter_clauses(&mut builder, filter);

        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count_to_u64(count))
    }

    async fn list_page(&self, page: Page) -> Result<Vec<ProductSummary>, StoreError> {
        let sql = format!("{SUMMARY_SELECT}{NEWEST_FIRST} LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(i64::try_from(page.limit()).unwrap_or(i64::MAX))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows_to_summaries(rows)
    }

    async fn count_products(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product")
            .fetch_one(&self.pool)
            .await?;
        Ok(count_to_u64(count))
    }

    async fn search_products(&self, keyword: &str) -> Result<Vec<ProductSummary>, StoreError> {
        let pattern = format!("%{}%", escape_like(keyword));
        let sql = format!(
            "{SUMMARY_SELECT} WHERE p.name ILIKE $1 OR p.description ILIKE $1{NEWEST_FIRST}"
        );
        let rows = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;
        rows_to_summaries(rows)
    }

    async fn related_products(
        &self,
        product: ProductId,
        category: CategoryId,
        limit: u32,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        let sql = format!("{SUMMARY_SELECT} WHERE p.category_id = $1 AND p.id <> $2 LIMIT $3");
        let rows = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(category.as_i32())
            .bind(product.as_i32())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        rows_to_summaries(rows)
    }

    async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        let sql = format!("{SUMMARY_SELECT} WHERE p.category_id = $1{NEWEST_FIRST}");
        let rows = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(category.as_i32())
            .fetch_all(&self.pool)
            .await?;
        rows_to_summaries(rows)
    }

    async fn insert_category(&self, name: &str) -> Result<Category, StoreError> {
        let slug = Slug::from_name(name);
        let row = sqlx::query("INSERT INTO category (name, slug) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(slug.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(Category {
            id: CategoryId::new(row.try_get("id")?),
            name: name.to_owned(),
            slug,
        })
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query("SELECT id, name, slug FROM category WHERE slug = $1 LIMIT 1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(Category {
                id: CategoryId::new(row.try_get("id")?),
                name: row.try_get("name")?,
                slug: Slug::from_stored(row.try_get::<String, _>("slug")?),
            }),
            None => None,
        })
    }

    async fn reviews_for_product(
        &self,
        product: ProductId,
    ) -> Result<Option<Vec<Review>>, StoreError> {
        let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM product WHERE id = $1")
            .bind(product.as_i32())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, product_id, body, rating, author_id, created_at, updated_at \
             FROM review WHERE product_id = $1 \
             ORDER BY updated_at DESC, id DESC",
        )
        .bind(product.as_i32())
        .fetch_all(&self.pool)
        .await?;

        let reviews = rows
            .into_iter()
            .map(ReviewRow::into_review)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(reviews))
    }

    async fn find_review(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, product_id, body, rating, author_id, created_at, updated_at \
             FROM review WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ReviewRow::into_review).transpose()
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "INSERT INTO review (product_id, body, rating, author_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, product_id, body, rating, author_id, created_at, updated_at",
        )
        .bind(review.product_id.as_i32())
        .bind(&review.body)
        .bind(i32::from(review.rating.value()))
        .bind(review.author.as_i32())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict("review already posted for this product".to_owned());
            }
            StoreError::Database(e)
        })?;

        row.into_review()
    }

    async fn update_review(
        &self,
        id: ReviewId,
        body: &str,
        rating: Rating,
    ) -> Result<Review, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "UPDATE review SET body = $2, rating = $3, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, product_id, body, rating, author_id, created_at, updated_at",
        )
        .bind(id.as_i32())
        .bind(body)
        .bind(i32::from(rating.value()))
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::NotFound)?.into_review()
    }

    async fn delete_review(
        &self,
        product: ProductId,
        review: ReviewId,
    ) -> Result<(), StoreError> {
        // The product reference and the record are one row here, so both
        // effects land together and re-deleting is a no-op.
        sqlx::query("DELETE FROM review WHERE id = $1 AND product_id = $2")
            .bind(review.as_i32())
            .bind(product.as_i32())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_author(&self, author: &Author) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO app_user (id, name) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
        )
        .bind(author.id.as_i32())
        .bind(&author.name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_order(&self, order: NewOrder) -> Result<OrderId, StoreError> {
        let cart = serde_json::to_value(&order.cart)
            .map_err(|e| StoreError::DataCorruption(format!("unserializable cart: {e}")))?;

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO orders (buyer_id, cart, payment) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(order.buyer.as_i32())
        .bind(cart)
        .bind(order.payment)
        .fetch_one(&self.pool)
        .await?;

        Ok(OrderId::new(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50% off_deal"), "50\\% off\\_deal");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_filter_clauses_full_predicate() {
        let filter = ProductFilter {
            categories: vec![CategoryId::new(1), CategoryId::new(2)],
            price: Some((Decimal::new(10, 0), Decimal::new(50, 0))),
        };
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM product p WHERE TRUE");
        push_filter_clauses(&mut builder, &filter);

        let sql = builder.sql();
        assert!(sql.contains("p.category_id = ANY("));
        assert!(sql.contains("p.price >= "));
        assert!(sql.contains("p.price <= "));
    }

    #[test]
    fn test_filter_clauses_empty_predicate_adds_nothing() {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM product p WHERE TRUE");
        push_filter_clauses(&mut builder, &ProductFilter::default());
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM product p WHERE TRUE");
    }

    #[test]
    fn test_listing_and_count_share_clause_shape() {
        let filter = ProductFilter {
            categories: vec![CategoryId::new(4)],
            price: Some((Decimal::ZERO, Decimal::new(100, 0))),
        };

        let mut list = QueryBuilder::new("WHERE TRUE");
        push_filter_clauses(&mut list, &filter);
        let mut count = QueryBuilder::new("WHERE TRUE");
        push_filter_clauses(&mut count, &filter);

        assert_eq!(list.sql(), count.sql());
    }
}
