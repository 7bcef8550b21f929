//! In-memory implementation of the catalog store.
//!
//! Backs the router tests and local tooling. Behavior mirrors
//! [`super::postgres::PgStore`]: newest-first ordering with an ID tiebreaker,
//! a uniqueness constraint on (product, author) review pairs, and idempotent
//! review deletion.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use greenbasket_core::{CategoryId, OrderId, ProductId, Rating, ReviewId, Slug, UserId};

use crate::models::{
    Author, Category, NewOrder, NewReview, Order, Photo, ProductDetail, ProductInput,
    ProductRecord, ProductSummary, Review, ReviewDetail,
};

use super::{CatalogStore, Page, ProductFilter, StoreError};

#[derive(Default)]
struct Inner {
    categories: BTreeMap<i32, Category>,
    products: BTreeMap<i32, ProductRecord>,
    reviews: BTreeMap<i32, Review>,
    authors: BTreeMap<i32, String>,
    orders: Vec<Order>,
    next_category: i32,
    next_product: i32,
    next_review: i32,
    next_order: i32,
}

/// In-memory catalog store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all persisted orders, newest last. Test observability.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DataCorruption`] if the lock is poisoned.
    pub fn orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.read()?.orders.clone())
    }

    /// Snapshot of all registered authors. Test observability.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DataCorruption`] if the lock is poisoned.
    pub fn authors(&self) -> Result<Vec<Author>, StoreError> {
        Ok(self
            .read()?
            .authors
            .iter()
            .map(|(&id, name)| Author {
                id: UserId::new(id),
                name: name.clone(),
            })
            .collect())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::DataCorruption("lock poisoned".to_owned()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::DataCorruption("lock poisoned".to_owned()))
    }
}

impl Inner {
    fn summarize(&self, product: &ProductRecord) -> Result<ProductSummary, StoreError> {
        let category = self
            .categories
            .get(&product.category_id.as_i32())
            .cloned()
            .ok_or_else(|| {
                StoreError::DataCorruption(format!(
                    "product {} references missing category {}",
                    product.id, product.category_id
                ))
            })?;

        Ok(ProductSummary {
            id: product.id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            price: product.price,
            quantity: product.quantity,
            shipping: product.shipping,
            category,
            created_at: product.created_at,
        })
    }

    /// Products matching `filter`, newest-first.
    fn filtered(&self, filter: &ProductFilter) -> Vec<&ProductRecord> {
        let mut matches: Vec<&ProductRecord> = self
            .products
            .values()
            .filter(|p| {
                (filter.categories.is_empty() || filter.categories.contains(&p.category_id))
                    && filter.price.is_none_or(|(low, high)| {
                        let amount = p.price.amount();
                        amount >= low && amount <= high
                    })
            })
            .collect();
        matches.sort_by_key(|p| (std::cmp::Reverse(p.created_at), std::cmp::Reverse(p.id)));
        matches
    }

    fn summaries(&self, products: &[&ProductRecord]) -> Result<Vec<ProductSummary>, StoreError> {
        products.iter().map(|p| self.summarize(p)).collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_product(&self, input: ProductInput) -> Result<ProductRecord, StoreError> {
        let mut inner = self.write()?;
        inner.next_product += 1;
        let record = ProductRecord {
            id: ProductId::new(inner.next_product),
            name: input.name,
            slug: input.slug,
            description: input.description,
            price: input.price,
            quantity: input.quantity,
            category_id: input.category_id,
            shipping: input.shipping,
            photo: input.photo,
            created_at: Utc::now(),
        };
        inner.products.insert(record.id.as_i32(), record.clone());
        Ok(record)
    }

    async fn update_product(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> Result<ProductRecord, StoreError> {
        let mut inner = self.write()?;
        let record = inner
            .products
            .get_mut(&id.as_i32())
            .ok_or(StoreError::NotFound)?;

        record.name = input.name;
        record.slug = input.slug;
        record.description = input.description;
        record.price = input.price;
        record.quantity = input.quantity;
        record.category_id = input.category_id;
        record.shipping = input.shipping;
        if let Some(photo) = input.photo {
            record.photo = Some(photo);
        }
        Ok(record.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner
            .products
            .remove(&id.as_i32())
            .ok_or(StoreError::NotFound)?;
        inner
            .reviews
            .retain(|_, review| review.product_id != id);
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<ProductSummary>, StoreError> {
        let inner = self.read()?;
        let all = inner.filtered(&ProductFilter::default());
        inner.summaries(&all)
    }

    async fn find_product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductDetail>, StoreError> {
        let inner = self.read()?;
        // Slugs are not unique; a collision resolves to the newest product.
        let Some(product) = inner
            .products
            .values()
            .rev()
            .find(|p| p.slug.as_str() == slug)
        else {
            return Ok(None);
        };
        let summary = inner.summarize(product)?;

        let mut reviews: Vec<&Review> = inner
            .reviews
            .values()
            .filter(|r| r.product_id == product.id)
            .collect();
        reviews.sort_by_key(|r| (std::cmp::Reverse(r.updated_at), std::cmp::Reverse(r.id)));

        let reviews = reviews
            .into_iter()
            .map(|r| ReviewDetail {
                id: r.id,
                body: r.body.clone(),
                rating: r.rating,
                author: Author {
                    id: r.author,
                    name: inner
                        .authors
                        .get(&r.author.as_i32())
                        .cloned()
                        .unwrap_or_else(|| "customer".to_owned()),
                },
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
            .collect();

        Ok(Some(ProductDetail { summary, reviews }))
    }

    async fn find_photo(&self, id: ProductId) -> Result<Option<Photo>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .products
            .get(&id.as_i32())
            .and_then(|p| p.photo.clone()))
    }

    async fn filter_products(
        &self,
        filter: &ProductFilter,
        page: Page,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        let inner = self.read()?;
        let matches = inner.filtered(filter);
        let window: Vec<&ProductRecord> = matches
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
            .collect();
        inner.summaries(&window)
    }

    async fn count_filtered(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let inner = self.read()?;
        Ok(inner.filtered(filter).len() as u64)
    }

    async fn list_page(&self, page: Page) -> Result<Vec<ProductSummary>, StoreError> {
        self.filter_products(&ProductFilter::default(), page).await
    }

    async fn count_products(&self) -> Result<u64, StoreError> {
        let inner = self.read()?;
        Ok(inner.products.len() as u64)
    }

    async fn search_products(&self, keyword: &str) -> Result<Vec<ProductSummary>, StoreError> {
        let needle = keyword.to_lowercase();
        let inner = self.read()?;
        let matches: Vec<&ProductRecord> = inner
            .filtered(&ProductFilter::default())
            .into_iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
            })
            .collect();
        inner.summaries(&matches)
    }

    async fn related_products(
        &self,
        product: ProductId,
        category: CategoryId,
        limit: u32,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        let inner = self.read()?;
        let matches: Vec<&ProductRecord> = inner
            .products
            .values()
            .filter(|p| p.category_id == category && p.id != product)
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();
        inner.summaries(&matches)
    }

    async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        let inner = self.read()?;
        let matches: Vec<&ProductRecord> = inner
            .filtered(&ProductFilter {
                categories: vec![category],
                price: None,
            })
            .into_iter()
            .collect();
        inner.summaries(&matches)
    }

    async fn insert_category(&self, name: &str) -> Result<Category, StoreError> {
        let mut inner = self.write()?;
        inner.next_category += 1;
        let category = Category {
            id: CategoryId::new(inner.next_category),
            name: name.to_owned(),
            slug: Slug::from_name(name),
        };
        inner.categories.insert(category.id.as_i32(), category.clone());
        Ok(category)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .categories
            .values()
            .find(|c| c.slug.as_str() == slug)
            .cloned())
    }

    async fn reviews_for_product(
        &self,
        product: ProductId,
    ) -> Result<Option<Vec<Review>>, StoreError> {
        let inner = self.read()?;
        if !inner.products.contains_key(&product.as_i32()) {
            return Ok(None);
        }
        let mut reviews: Vec<Review> = inner
            .reviews
            .values()
            .filter(|r| r.product_id == product)
            .cloned()
            .collect();
        reviews.sort_by_key(|r| (std::cmp::Reverse(r.updated_at), std::cmp::Reverse(r.id)));
        Ok(Some(reviews))
    }

    async fn find_review(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        let inner = self.read()?;
        Ok(inner.reviews.get(&id.as_i32()).cloned())
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let mut inner = self.write()?;
        let duplicate = inner
            .reviews
            .values()
            .any(|r| r.product_id == review.product_id && r.author == review.author);
        if duplicate {
            return Err(StoreError::Conflict(
                "review already posted for this product".to_owned(),
            ));
        }

        inner.next_review += 1;
        let now = Utc::now();
        let record = Review {
            id: ReviewId::new(inner.next_review),
            product_id: review.product_id,
            body: review.body,
            rating: review.rating,
            author: review.author,
            created_at: now,
            updated_at: now,
        };
        inner.reviews.insert(record.id.as_i32(), record.clone());
        Ok(record)
    }

    async fn update_review(
        &self,
        id: ReviewId,
        body: &str,
        rating: Rating,
    ) -> Result<Review, StoreError> {
        let mut inner = self.write()?;
        let review = inner
            .reviews
            .get_mut(&id.as_i32())
            .ok_or(StoreError::NotFound)?;
        review.body = body.to_owned();
        review.rating = rating;
        review.updated_at = Utc::now();
        Ok(review.clone())
    }

    async fn delete_review(
        &self,
        product: ProductId,
        review: ReviewId,
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let matches = inner
            .reviews
            .get(&review.as_i32())
            .is_some_and(|r| r.product_id == product);
        if matches {
            inner.reviews.remove(&review.as_i32());
        }
        Ok(())
    }

    async fn upsert_author(&self, author: &Author) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner
            .authors
            .insert(author.id.as_i32(), author.name.clone());
        Ok(())
    }

    async fn insert_order(&self, order: NewOrder) -> Result<OrderId, StoreError> {
        let mut inner = self.write()?;
        inner.next_order += 1;
        let record = Order {
            id: OrderId::new(inner.next_order),
            cart: order.cart,
            payment: order.payment,
            buyer: order.buyer,
            created_at: Utc::now(),
        };
        let id = record.id;
        inner.orders.push(record);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use greenbasket_core::Price;

    use super::*;

    fn input(name: &str, category: CategoryId, price: i64) -> ProductInput {
        ProductInput {
            name: name.to_owned(),
            slug: Slug::from_name(name),
            description: format!("{name} description"),
            price: Price::new(Decimal::new(price, 0)).expect("price"),
            quantity: 5,
            category_id: category,
            shipping: true,
            photo: None,
        }
    }

    #[tokio::test]
    async fn test_filter_and_count_agree() {
        let store = MemoryStore::new();
        let tea = store.insert_category("Tea").await.expect("category");
        let mugs = store.insert_category("Mugs").await.expect("category");

        for (name, category, price) in [
            ("Green Tea", tea.id, 8),
            ("Black Tea", tea.id, 12),
            ("Stone Mug", mugs.id, 25),
        ] {
            store.insert_product(input(name, category, price)).await.expect("product");
        }

        let filter = ProductFilter {
            categories: vec![tea.id],
            price: Some((Decimal::new(10, 0), Decimal::new(20, 0))),
        };
        let listed = store
            .filter_products(&filter, Page::new(1, 8))
            .await
            .expect("filter");
        let counted = store.count_filtered(&filter).await.expect("count");

        assert_eq!(listed.len(), 1);
        assert_eq!(counted, 1);
        assert_eq!(listed[0].name, "Black Tea");
    }

    #[tokio::test]
    async fn test_colliding_slugs_resolve_to_newest_product() {
        let store = MemoryStore::new();
        let mugs = store.insert_category("Mugs").await.expect("category");

        let mut older = input("Mug", mugs.id, 10);
        older.description = "the first mug".to_owned();
        store.insert_product(older).await.expect("first product");

        let mut newer = input("Mug", mugs.id, 12);
        newer.description = "the second mug".to_owned();
        store.insert_product(newer).await.expect("second product");

        let found = store
            .find_product_by_slug("mug")
            .await
            .expect("lookup")
            .expect("a match");
        assert_eq!(found.summary.description, "the second mug");
    }

    #[tokio::test]
    async fn test_duplicate_review_conflicts() {
        let store = MemoryStore::new();
        let tea = store.insert_category("Tea").await.expect("category");
        let product = store
            .insert_product(input("Green Tea", tea.id, 8))
            .await
            .expect("product");

        let review = NewReview {
            product_id: product.id,
            body: "lovely".to_owned(),
            rating: Rating::new(5).expect("rating"),
            author: UserId::new(1),
        };
        store.insert_review(review.clone()).await.expect("first insert");
        let err = store.insert_review(review).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_review_is_idempotent() {
        let store = MemoryStore::new();
        let tea = store.insert_category("Tea").await.expect("category");
        let product = store
            .insert_product(input("Green Tea", tea.id, 8))
            .await
            .expect("product");
        let review = store
            .insert_review(NewReview {
                product_id: product.id,
                body: "ok".to_owned(),
                rating: Rating::new(3).expect("rating"),
                author: UserId::new(1),
            })
            .await
            .expect("insert");

        store
            .delete_review(product.id, review.id)
            .await
            .expect("first delete");
        store
            .delete_review(product.id, review.id)
            .await
            .expect("second delete");
        assert!(store.find_review(review.id).await.expect("find").is_none());
    }
}
