//! Catalog query engine and product CRUD.
//!
//! Every listing path returns [`ProductSummary`] values, which carry no photo
//! and no reviews by construction; only [`CatalogService::get_by_slug`] opts
//! into full review hydration, since the product page is the one place a
//! client legitimately needs review detail.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::instrument;

use greenbasket_core::{CategoryId, Price, ProductId, Slug};

use crate::error::{ApiError, Result};
use crate::models::{Category, Photo, ProductDetail, ProductInput, ProductRecord, ProductSummary};
use crate::store::{CatalogStore, Page, ProductFilter};

/// Fixed page size for filtered listings.
pub const FILTER_PAGE_SIZE: u32 = 8;
/// Fixed page size for the plain paged listing.
pub const LIST_PAGE_SIZE: u32 = 6;
/// Maximum number of related products returned.
pub const RELATED_LIMIT: u32 = 4;
/// Maximum accepted photo payload in bytes.
pub const MAX_PHOTO_BYTES: usize = 1_000_000;

/// Raw product form fields, as collected from a multipart request.
///
/// Validation happens in [`ProductForm::validate`], in a fixed field order,
/// each with its own message.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<CategoryId>,
    pub quantity: Option<i64>,
    pub shipping: bool,
    pub photo: Option<Photo>,
}

impl ProductForm {
    /// Validate the form into a [`ProductInput`].
    ///
    /// Checks run in the fixed order name, description, price, category,
    /// quantity, photo size; the first failure wins and nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] with a field-specific message.
    pub fn validate(self) -> Result<ProductInput> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ApiError::Validation("Name is Required".to_owned()))?;
        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| ApiError::Validation("Description is Required".to_owned()))?;
        let price = self
            .price
            .ok_or_else(|| ApiError::Validation("Price is Required".to_owned()))
            .and_then(|p| {
                Price::new(p)
                    .map_err(|_| ApiError::Validation("Price must be non-negative".to_owned()))
            })?;
        let category_id = self
            .category
            .ok_or_else(|| ApiError::Validation("Category is Required".to_owned()))?;
        let quantity = self
            .quantity
            .ok_or_else(|| ApiError::Validation("Quantity is Required".to_owned()))
            .and_then(|q| {
                u32::try_from(q).map_err(|_| {
                    ApiError::Validation("Quantity must be a non-negative integer".to_owned())
                })
            })?;
        if let Some(photo) = &self.photo
            && photo.bytes.len() > MAX_PHOTO_BYTES
        {
            return Err(ApiError::Validation(
                "Photo should be less than 1MB".to_owned(),
            ));
        }

        let slug = Slug::from_name(&name);
        Ok(ProductInput {
            name,
            slug,
            description,
            price,
            quantity,
            category_id,
            shipping: self.shipping,
            photo: self.photo,
        })
    }
}

/// Catalog query engine over the store adapter.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    /// Create a service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Create a product from a validated form. The slug is derived from the
    /// name at this point.
    #[instrument(skip(self, form))]
    pub async fn create(&self, form: ProductForm) -> Result<ProductRecord> {
        let input = form.validate()?;
        Ok(self.store.insert_product(input).await?)
    }

    /// Overwrite a product from a validated form. The slug is re-derived; an
    /// absent photo field keeps the stored photo.
    #[instrument(skip(self, form))]
    pub async fn update(&self, id: ProductId, form: ProductForm) -> Result<ProductRecord> {
        let input = form.validate()?;
        Ok(self.store.update_product(id, input).await?)
    }

    /// Delete a product record.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        Ok(self.store.delete_product(id).await?)
    }

    /// All products, newest-first.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<ProductSummary>> {
        Ok(self.store.list_products().await?)
    }

    /// A single product by slug, reviews hydrated. An empty lookup is
    /// interpreted as `NotFound` here; the store itself never errors on zero
    /// results.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<ProductDetail> {
        self.store
            .find_product_by_slug(slug)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no product with slug '{slug}'")))
    }

    /// The stored photo for a product. `Ok(None)` means no payload is stored,
    /// which is an empty response rather than an error.
    #[instrument(skip(self))]
    pub async fn photo(&self, id: ProductId) -> Result<Option<Photo>> {
        Ok(self.store.find_photo(id).await?)
    }

    /// Filtered listing, page size 8, 1-indexed.
    #[instrument(skip(self, filter))]
    pub async fn filter(&self, filter: &ProductFilter, page: u32) -> Result<Vec<ProductSummary>> {
        Ok(self
            .store
            .filter_products(filter, Page::new(page, FILTER_PAGE_SIZE))
            .await?)
    }

    /// Count over the identical filter predicate used by [`Self::filter`].
    #[instrument(skip(self, filter))]
    pub async fn filter_count(&self, filter: &ProductFilter) -> Result<u64> {
        Ok(self.store.count_filtered(filter).await?)
    }

    /// Unfiltered listing, page size 6, 1-indexed.
    #[instrument(skip(self))]
    pub async fn list_page(&self, page: u32) -> Result<Vec<ProductSummary>> {
        Ok(self
            .store
            .list_page(Page::new(page, LIST_PAGE_SIZE))
            .await?)
    }

    /// Total product count, no predicate.
    #[instrument(skip(self))]
    pub async fn total_count(&self) -> Result<u64> {
        Ok(self.store.count_products().await?)
    }

    /// Case-insensitive substring search over name and description.
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str) -> Result<Vec<ProductSummary>> {
        Ok(self.store.search_products(keyword).await?)
    }

    /// Up to four products sharing a category, excluding the given product.
    #[instrument(skip(self))]
    pub async fn related(
        &self,
        product: ProductId,
        category: CategoryId,
    ) -> Result<Vec<ProductSummary>> {
        Ok(self
            .store
            .related_products(product, category, RELATED_LIMIT)
            .await?)
    }

    /// The category with the given slug and all products referencing it.
    #[instrument(skip(self))]
    pub async fn by_category_slug(
        &self,
        slug: &str,
    ) -> Result<(Category, Vec<ProductSummary>)> {
        let category = self
            .store
            .find_category_by_slug(slug)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no category with slug '{slug}'")))?;
        let products = self.store.products_in_category(category.id).await?;
        Ok((category, products))
    }
}

#[cfg(test)]
mod tests {
    use crate::store::MemoryStore;

    use super::*;

    fn form(name: &str, category: Option<CategoryId>) -> ProductForm {
        ProductForm {
            name: Some(name.to_owned()),
            description: Some("a fine product".to_owned()),
            price: Some(Decimal::new(10, 0)),
            category,
            quantity: Some(3),
            shipping: true,
            photo: None,
        }
    }

    fn validation_message(err: ApiError) -> String {
        match err {
            ApiError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_validation_order_is_fixed() {
        // Everything missing: the name check fires first.
        let err = ProductForm::default().validate().unwrap_err();
        assert_eq!(validation_message(err), "Name is Required");

        // Name present: description is next.
        let err = ProductForm {
            name: Some("Mug".to_owned()),
            ..ProductForm::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(validation_message(err), "Description is Required");

        // Then price, category, quantity.
        let err = ProductForm {
            name: Some("Mug".to_owned()),
            description: Some("stoneware".to_owned()),
            ..ProductForm::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(validation_message(err), "Price is Required");

        let err = ProductForm {
            name: Some("Mug".to_owned()),
            description: Some("stoneware".to_owned()),
            price: Some(Decimal::new(25, 0)),
            ..ProductForm::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(validation_message(err), "Category is Required");

        let err = ProductForm {
            name: Some("Mug".to_owned()),
            description: Some("stoneware".to_owned()),
            price: Some(Decimal::new(25, 0)),
            category: Some(CategoryId::new(1)),
            ..ProductForm::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(validation_message(err), "Quantity is Required");
    }

    #[test]
    fn test_oversized_photo_rejected() {
        let mut f = form("Mug", Some(CategoryId::new(1)));
        f.photo = Some(Photo {
            bytes: vec![0u8; MAX_PHOTO_BYTES + 1],
            content_type: "image/jpeg".to_owned(),
        });
        let err = f.validate().unwrap_err();
        assert_eq!(validation_message(err), "Photo should be less than 1MB");
    }

    #[test]
    fn test_photo_at_cap_accepted() {
        let mut f = form("Mug", Some(CategoryId::new(1)));
        f.photo = Some(Photo {
            bytes: vec![0u8; MAX_PHOTO_BYTES],
            content_type: "image/jpeg".to_owned(),
        });
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_slug_derived_from_name() {
        let input = form("Cold Brew Kit", Some(CategoryId::new(1)))
            .validate()
            .expect("valid form");
        assert_eq!(input.slug.as_str(), "cold-brew-kit");
    }

    #[tokio::test]
    async fn test_get_by_slug_maps_empty_to_not_found() {
        let service = CatalogService::new(std::sync::Arc::new(MemoryStore::new()));
        let err = service.get_by_slug("nope").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_by_category_slug_requires_category() {
        let service = CatalogService::new(std::sync::Arc::new(MemoryStore::new()));
        let err = service.by_category_slug("ghosts").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
