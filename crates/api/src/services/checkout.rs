//! Checkout orchestration.
//!
//! Two operations: hand the client a gateway token, and process a payment.
//! Processing charges the sum of the cart's unit prices, then persists the
//! order with the gateway's full transaction result before answering. A
//! declined or failed sale never creates an order.

use std::sync::Arc;

use tracing::instrument;

use greenbasket_core::{OrderId, UserId};

use crate::error::Result;
use crate::gateway::{PaymentGateway, SaleRequest};
use crate::models::{CartLineItem, NewOrder, order::cart_total};
use crate::store::CatalogStore;

/// Orchestrates token generation and payment processing.
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn CatalogStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    /// Create a service over a store and a gateway.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Generate a client-side token. The gateway's response is passed through
    /// opaquely.
    #[instrument(skip(self))]
    pub async fn client_token(&self) -> Result<serde_json::Value> {
        Ok(self.gateway.client_token().await?)
    }

    /// Charge the cart and persist the resulting order.
    ///
    /// The charge amount is the sum of unit prices across line items; each
    /// entry counts as one unit. The order write is awaited before returning,
    /// so a success response always means the order exists.
    #[instrument(skip(self, cart, nonce), fields(items = cart.len()))]
    pub async fn process(
        &self,
        buyer: UserId,
        cart: Vec<CartLineItem>,
        nonce: String,
    ) -> Result<OrderId> {
        let amount = cart_total(&cart);
        let sale = self
            .gateway
            .sale(SaleRequest {
                amount: amount.amount(),
                payment_method_nonce: nonce,
                submit_for_settlement: true,
            })
            .await?;

        let order_id = self
            .store
            .insert_order(NewOrder {
                cart,
                payment: sale.0,
                buyer,
            })
            .await?;
        Ok(order_id)
    }
}
