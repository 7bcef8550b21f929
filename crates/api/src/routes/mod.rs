//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                  - Liveness check
//! GET    /health/ready                            - Readiness check (pings the database)
//!
//! # Products
//! POST   /api/products                            - Create product (multipart, auth)
//! GET    /api/products                            - All products, newest-first
//! PUT    /api/products/{id}                       - Update product (multipart, auth)
//! DELETE /api/products/{id}                       - Delete product (auth)
//! GET    /api/products/slug/{slug}                - Single product, reviews hydrated
//! GET    /api/products/{id}/photo                 - Photo bytes, 204 when absent
//! POST   /api/products/filter/{page}              - Filtered listing, page size 8
//! POST   /api/products/filter-count               - Count over the same filter
//! GET    /api/products/count                      - Total product count
//! GET    /api/products/page/{page}                - Paged listing, page size 6
//! GET    /api/products/search/{keyword}           - Substring search
//! GET    /api/products/related/{id}/{cid}         - Up to 4 related products
//! GET    /api/categories/{slug}/products          - Category plus its products
//!
//! # Reviews (auth)
//! POST   /api/products/{id}/reviews               - Post a review
//! PUT    /api/reviews/{rid}                       - Edit own review
//! DELETE /api/products/{id}/reviews/{rid}         - Delete own review
//!
//! # Checkout
//! GET    /api/checkout/token                      - Gateway client token
//! POST   /api/checkout/payment                    - Charge cart, persist order (auth)
//! ```

pub mod checkout;
pub mod products;
pub mod reviews;

use axum::{
    Json,
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(products::create).get(products::index))
        .route("/{id}", put(products::update).delete(products::remove))
        .route("/slug/{slug}", get(products::show))
        .route("/{id}/photo", get(products::photo))
        .route("/filter/{page}", post(products::filter))
        .route("/filter-count", post(products::filter_count))
        .route("/count", get(products::count))
        .route("/page/{page}", get(products::page))
        .route("/search/{keyword}", get(products::search))
        .route("/related/{id}/{cid}", get(products::related))
        .route("/{id}/reviews", post(reviews::create))
        .route("/{id}/reviews/{rid}", delete(reviews::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/token", get(checkout::token))
        .route("/payment", post(checkout::payment))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .nest("/api/products", product_routes())
        .route("/api/categories/{slug}/products", get(products::by_category))
        .route("/api/reviews/{rid}", put(reviews::update))
        .nest("/api/checkout", checkout_routes())
}

/// Liveness check. Always succeeds while the process is up.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Readiness check. Pings the database when this deployment carries a pool.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = state.pool() {
        match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
            Err(e) => {
                tracing::warn!(error = %e, "readiness check failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "status": "unavailable" })),
                )
            }
        }
    } else {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    }
}
