//! Product route handlers.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use greenbasket_core::{CategoryId, Price, ProductId, Slug};

use crate::error::{ApiError, Result};
use crate::middleware::Actor;
use crate::models::{Photo, ProductRecord};
use crate::services::CatalogService;
use crate::services::catalog::ProductForm;
use crate::state::AppState;
use crate::store::ProductFilter;

/// Filter request body: category IDs plus an optional `[low, high]` price
/// range.
#[derive(Debug, Default, Deserialize)]
pub struct FilterBody {
    /// Selected category IDs; empty means no category constraint.
    #[serde(default)]
    pub checked: Vec<CategoryId>,
    /// Price range as `[low, high]`; fewer than two entries means no price
    /// constraint.
    #[serde(default)]
    pub radio: Vec<Decimal>,
}

impl From<FilterBody> for ProductFilter {
    fn from(body: FilterBody) -> Self {
        let price = (body.radio.len() >= 2).then(|| (body.radio[0], body.radio[1]));
        Self {
            categories: body.checked,
            price,
        }
    }
}

/// Response view of a created or updated product. The photo stays out of the
/// response; clients fetch it from the photo endpoint.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Price,
    pub quantity: u32,
    pub category_id: CategoryId,
    pub shipping: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ProductRecord> for ProductView {
    fn from(record: ProductRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            slug: record.slug,
            description: record.description,
            price: record.price,
            quantity: record.quantity,
            category_id: record.category_id,
            shipping: record.shipping,
            created_at: record.created_at,
        }
    }
}

fn catalog(state: &AppState) -> CatalogService {
    CatalogService::new(state.store().clone())
}

/// Collect a multipart request into a raw product form.
///
/// Unknown fields are ignored. Numeric fields that fail to parse surface as
/// validation errors naming the field.
async fn read_form(mut multipart: Multipart) -> Result<ProductForm> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart request: {e}")))?
    {
        let Some(name) = field.name().map(ToOwned::to_owned) else {
            continue;
        };
        match name.as_str() {
            "name" => form.name = Some(read_text(field, "name").await?),
            "description" => form.description = Some(read_text(field, "description").await?),
            "price" => {
                let raw = read_text(field, "price").await?;
                form.price = Some(raw.parse().map_err(|_| {
                    ApiError::Validation("price must be a decimal number".to_owned())
                })?);
            }
            "category" => {
                let raw = read_text(field, "category").await?;
                let id: i32 = raw
                    .parse()
                    .map_err(|_| ApiError::Validation("category must be an integer".to_owned()))?;
                form.category = Some(CategoryId::new(id));
            }
            "quantity" => {
                let raw = read_text(field, "quantity").await?;
                form.quantity = Some(raw.parse().map_err(|_| {
                    ApiError::Validation("quantity must be an integer".to_owned())
                })?);
            }
            "shipping" => {
                let raw = read_text(field, "shipping").await?;
                form.shipping = matches!(raw.as_str(), "true" | "1");
            }
            "photo" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::Validation(format!("could not read photo field: {e}"))
                })?;
                form.photo = Some(Photo {
                    bytes: bytes.to_vec(),
                    content_type,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("could not read field '{name}': {e}")))
}

/// Create a product from a multipart form.
pub async fn create(
    State(state): State<AppState>,
    Actor(_user): Actor,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = read_form(multipart).await?;
    let record = catalog(&state).create(form).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Product Created",
            "product": ProductView::from(record),
        })),
    ))
}

/// Update a product from a multipart form. An absent photo field keeps the
/// stored photo.
pub async fn update(
    State(state): State<AppState>,
    Actor(_user): Actor,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = read_form(multipart).await?;
    let record = catalog(&state).update(id, form).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Product Updated",
        "product": ProductView::from(record),
    })))
}

/// Delete a product and its reviews.
pub async fn remove(
    State(state): State<AppState>,
    Actor(_user): Actor,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    catalog(&state).delete(id).await?;
    Ok(Json(json!({ "success": true, "message": "Product Deleted" })))
}

/// All products, newest-first.
pub async fn index(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let products = catalog(&state).list_all().await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

/// A single product by slug, reviews hydrated.
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let product = catalog(&state).get_by_slug(&slug).await?;
    Ok(Json(json!({ "success": true, "product": product })))
}

/// The stored photo, or 204 when none exists.
pub async fn photo(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    match catalog(&state).photo(id).await? {
        Some(photo) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, photo.content_type)],
            photo.bytes,
        )
            .into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Filtered listing, page size 8.
pub async fn filter(
    State(state): State<AppState>,
    Path(page): Path<u32>,
    Json(body): Json<FilterBody>,
) -> Result<impl IntoResponse> {
    let filter = ProductFilter::from(body);
    let products = catalog(&state).filter(&filter, page).await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

/// Count over the identical filter predicate.
pub async fn filter_count(
    State(state): State<AppState>,
    Json(body): Json<FilterBody>,
) -> Result<impl IntoResponse> {
    let filter = ProductFilter::from(body);
    let total = catalog(&state).filter_count(&filter).await?;
    Ok(Json(json!({ "success": true, "total": total })))
}

/// Total product count.
pub async fn count(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let total = catalog(&state).total_count().await?;
    Ok(Json(json!({ "success": true, "total": total })))
}

/// Unfiltered paged listing, page size 6.
pub async fn page(
    State(state): State<AppState>,
    Path(page): Path<u32>,
) -> Result<impl IntoResponse> {
    let products = catalog(&state).list_page(page).await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

/// Case-insensitive substring search over name and description.
pub async fn search(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
) -> Result<impl IntoResponse> {
    let products = catalog(&state).search(&keyword).await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

/// Up to four products sharing a category, excluding the given product.
pub async fn related(
    State(state): State<AppState>,
    Path((pid, cid)): Path<(ProductId, CategoryId)>,
) -> Result<impl IntoResponse> {
    let products = catalog(&state).related(pid, cid).await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

/// A category by slug plus all products referencing it.
pub async fn by_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let (category, products) = catalog(&state).by_category_slug(&slug).await?;
    Ok(Json(json!({
        "success": true,
        "category": category,
        "products": products,
    })))
}
