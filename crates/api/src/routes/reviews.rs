//! Review route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use greenbasket_core::{ProductId, ReviewId};

use crate::error::Result;
use crate::middleware::Actor;
use crate::models::Author;
use crate::services::ReviewLedger;
use crate::services::reviews::ReviewDraft;
use crate::state::AppState;
use crate::store::CatalogStore;

fn ledger(state: &AppState) -> ReviewLedger {
    ReviewLedger::new(state.store().clone())
}

/// Post a review on a product.
///
/// The caller's display name is recorded alongside so the single-product
/// view can hydrate the author without another identity lookup.
pub async fn create(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path(pid): Path<ProductId>,
    Json(draft): Json<ReviewDraft>,
) -> Result<impl IntoResponse> {
    state
        .store()
        .upsert_author(&Author {
            id: user.id,
            name: user.name,
        })
        .await?;
    let review = ledger(&state).post(pid, user.id, draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "review": review })),
    ))
}

/// Edit the caller's own review in place.
pub async fn update(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path(rid): Path<ReviewId>,
    Json(draft): Json<ReviewDraft>,
) -> Result<impl IntoResponse> {
    let review = ledger(&state).update(rid, user.id, draft).await?;
    Ok(Json(json!({ "success": true, "review": review })))
}

/// Delete the caller's own review.
pub async fn remove(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path((pid, rid)): Path<(ProductId, ReviewId)>,
) -> Result<impl IntoResponse> {
    ledger(&state).delete(pid, rid, user.id).await?;
    Ok(Json(json!({ "success": true, "message": "Review deleted" })))
}
