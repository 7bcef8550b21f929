//! Checkout route handlers.

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::middleware::Actor;
use crate::models::{Author, CartLineItem};
use crate::services::CheckoutService;
use crate::state::AppState;
use crate::store::CatalogStore;

/// Payment request body.
#[derive(Debug, Deserialize)]
pub struct PaymentBody {
    /// The buyer's cart; each entry counts as one unit.
    pub cart: Vec<CartLineItem>,
    /// Single-use payment method nonce from the client SDK.
    pub nonce: String,
}

fn checkout(state: &AppState) -> CheckoutService {
    CheckoutService::new(state.store().clone(), state.gateway().clone())
}

/// Generate a client-side gateway token. The gateway payload is passed
/// through opaquely.
pub async fn token(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(checkout(&state).client_token().await?))
}

/// Charge the cart and persist the order. The order write completes before
/// this responds, so `ok` means the order exists.
///
/// The buyer is registered before the charge so the order write cannot fail
/// on an unknown buyer after the sale has settled.
pub async fn payment(
    State(state): State<AppState>,
    Actor(user): Actor,
    Json(body): Json<PaymentBody>,
) -> Result<impl IntoResponse> {
    state
        .store()
        .upsert_author(&Author {
            id: user.id,
            name: user.name,
        })
        .await?;
    checkout(&state)
        .process(user.id, body.cart, body.nonce)
        .await?;
    Ok(Json(json!({ "ok": true })))
}
