//! The review ledger.
//!
//! Enforces the one-review-per-author-per-product rule and the author-only
//! edit/delete rules. All checks run before any mutation, so a rejected
//! request leaves the ledger untouched.

use std::sync::Arc;

use tracing::instrument;

use greenbasket_core::{ProductId, Rating, ReviewId, UserId};

use crate::error::{ApiError, Result};
use crate::models::{NewReview, Review};
use crate::store::CatalogStore;

/// Raw review fields, as received from the client.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ReviewDraft {
    /// Review body text.
    pub body: Option<String>,
    /// Rating on the 1-5 scale.
    pub rating: Option<i64>,
}

impl ReviewDraft {
    fn body_and_rating(self) -> Result<(String, Rating)> {
        let body = self
            .body
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| ApiError::Validation("Body is Required".to_owned()))?;
        let rating = self
            .rating
            .ok_or_else(|| ApiError::Validation("Rating is Required".to_owned()))
            .and_then(|r| {
                Rating::new(r).map_err(|e| ApiError::Validation(e.to_string()))
            })?;
        Ok((body, rating))
    }
}

/// Ledger of reviews over the store adapter.
#[derive(Clone)]
pub struct ReviewLedger {
    store: Arc<dyn CatalogStore>,
}

impl ReviewLedger {
    /// Create a ledger over a store.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Post a review on a product.
    ///
    /// Check order: the product must exist, the actor must not already have a
    /// review on it, then the draft fields are validated. The store's
    /// uniqueness constraint backstops the duplicate check under concurrent
    /// posts, so at most one insert wins either way.
    #[instrument(skip(self, draft))]
    pub async fn post(
        &self,
        product: ProductId,
        actor: UserId,
        draft: ReviewDraft,
    ) -> Result<Review> {
        let existing = self
            .store
            .reviews_for_product(product)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no product with id {product}")))?;
        if existing.iter().any(|r| r.author == actor) {
            return Err(ApiError::Conflict(
                "Review already posted for this product".to_owned(),
            ));
        }

        let (body, rating) = draft.body_and_rating()?;
        Ok(self
            .store
            .insert_review(NewReview {
                product_id: product,
                body,
                rating,
                author: actor,
            })
            .await?)
    }

    /// Edit a review's body and rating in place.
    ///
    /// The draft is validated before the review is looked up; a bad draft
    /// never reveals whether the review exists. Only the original author may
    /// edit.
    #[instrument(skip(self, draft))]
    pub async fn update(
        &self,
        review: ReviewId,
        actor: UserId,
        draft: ReviewDraft,
    ) -> Result<Review> {
        let (body, rating) = draft.body_and_rating()?;

        let existing = self
            .store
            .find_review(review)
            .await?
            .ok_or_else(|| ApiError::NotFound("Review not found".to_owned()))?;
        if existing.author != actor {
            return Err(ApiError::Forbidden(
                "You are not authorized to update this review".to_owned(),
            ));
        }

        Ok(self.store.update_review(review, &body, rating).await?)
    }

    /// Remove a review from its product and delete the record.
    ///
    /// Only the original author may delete. The store delete itself is
    /// idempotent, but the existence check here means a repeat request from
    /// the author reports `NotFound` rather than silently succeeding twice.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        product: ProductId,
        review: ReviewId,
        actor: UserId,
    ) -> Result<()> {
        let existing = self
            .store
            .find_review(review)
            .await?
            .ok_or_else(|| ApiError::NotFound("Review not found".to_owned()))?;
        if existing.author != actor {
            return Err(ApiError::Forbidden(
                "You are not authorized to delete this review".to_owned(),
            ));
        }

        Ok(self.store.delete_review(product, review).await?)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use greenbasket_core::{Price, Slug};

    use crate::models::ProductInput;
    use crate::store::MemoryStore;

    use super::*;

    fn draft(body: &str, rating: i64) -> ReviewDraft {
        ReviewDraft {
            body: Some(body.to_owned()),
            rating: Some(rating),
        }
    }

    async fn seed_product(store: &MemoryStore) -> ProductId {
        let category = store.insert_category("Drinks").await.expect("category");
        let record = store
            .insert_product(ProductInput {
                name: "Cold Brew Kit".to_owned(),
                slug: Slug::from_name("Cold Brew Kit"),
                description: "brew at home".to_owned(),
                price: Price::new(Decimal::new(25, 0)).expect("price"),
                quantity: 10,
                category_id: category.id,
                shipping: true,
                photo: None,
            })
            .await
            .expect("product");
        record.id
    }

    #[tokio::test]
    async fn test_post_requires_product() {
        let store = Arc::new(MemoryStore::new());
        let ledger = ReviewLedger::new(store);
        let err = ledger
            .post(ProductId::new(99), UserId::new(1), draft("great", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_second_post_by_same_author_conflicts() {
        let store = Arc::new(MemoryStore::new());
        let product = seed_product(&store).await;
        let ledger = ReviewLedger::new(store.clone());
        let actor = UserId::new(7);

        ledger
            .post(product, actor, draft("great", 5))
            .await
            .expect("first post");
        let err = ledger
            .post(product, actor, draft("still great", 4))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // The first review is untouched.
        let reviews = store
            .reviews_for_product(product)
            .await
            .expect("reviews")
            .expect("product exists");
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].body, "great");
    }

    #[tokio::test]
    async fn test_post_validates_after_existence_checks() {
        let store = Arc::new(MemoryStore::new());
        let product = seed_product(&store).await;
        let ledger = ReviewLedger::new(store);

        let err = ledger
            .post(
                product,
                UserId::new(7),
                ReviewDraft {
                    body: None,
                    rating: Some(5),
                },
            )
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(msg) => assert_eq!(msg, "Body is Required"),
            other => panic!("expected validation error, got {other}"),
        }

        let err = ledger
            .post(product, UserId::new(7), draft("fine", 9))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_non_author() {
        let store = Arc::new(MemoryStore::new());
        let product = seed_product(&store).await;
        let ledger = ReviewLedger::new(store.clone());
        let author = UserId::new(7);

        let review = ledger
            .post(product, author, draft("great", 5))
            .await
            .expect("post");
        let err = ledger
            .update(review.id, UserId::new(8), draft("meh", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // Untouched by the rejected edit.
        let stored = store
            .find_review(review.id)
            .await
            .expect("lookup")
            .expect("exists");
        assert_eq!(stored.body, "great");
        assert_eq!(stored.rating.value(), 5);
    }

    #[tokio::test]
    async fn test_update_validates_draft_before_lookup() {
        let store = Arc::new(MemoryStore::new());
        let ledger = ReviewLedger::new(store);

        // Missing body on a missing review: the draft check fires first.
        let err = ledger
            .update(ReviewId::new(99), UserId::new(1), ReviewDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_rejects_non_author() {
        let store = Arc::new(MemoryStore::new());
        let product = seed_product(&store).await;
        let ledger = ReviewLedger::new(store.clone());
        let author = UserId::new(7);

        let review = ledger
            .post(product, author, draft("great", 5))
            .await
            .expect("post");
        let err = ledger
            .delete(product, review.id, UserId::new(8))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // Author deletes, then a repeat delete reports NotFound.
        ledger
            .delete(product, review.id, author)
            .await
            .expect("author delete");
        let err = ledger
            .delete(product, review.id, author)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
