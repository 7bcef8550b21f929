//! Payment gateway client.
//!
//! The gateway is an external collaborator: this module defines the seam
//! ([`PaymentGateway`]) the checkout orchestrator talks through, plus the
//! production HTTP implementation ([`http::HttpPaymentGateway`]).
//!
//! The original SDK surface is callback-style; here it is a plain async call
//! that either returns the gateway's opaque payload or fails with a
//! [`GatewayError`].

pub mod http;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

pub use http::HttpPaymentGateway;

/// Errors that can occur when talking to the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed (connection, timeout, non-JSON body).
    #[error("gateway HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway rejected the sale. Carries the gateway's error payload,
    /// which is surfaced to the caller without an order being created.
    #[error("sale declined by gateway")]
    Declined {
        /// The gateway's full error payload.
        payload: serde_json::Value,
    },

    /// The gateway answered with an unexpected status.
    #[error("unexpected gateway response: status {status}")]
    Unexpected {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },
}

/// A sale request submitted to the gateway.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SaleRequest {
    /// The charge amount.
    pub amount: Decimal,
    /// Single-use opaque token proving payment authorization.
    pub payment_method_nonce: String,
    /// Request immediate settlement of the sale.
    pub submit_for_settlement: bool,
}

/// The gateway's transaction result, kept opaque for order persistence.
#[derive(Debug, Clone)]
pub struct SaleResult(pub serde_json::Value);

/// Seam between the checkout orchestrator and the payment gateway.
///
/// Both operations fail fast; the HTTP implementation carries an explicit
/// request timeout so neither can block a request indefinitely.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Produce an opaque client-side token. Pure pass-through.
    async fn client_token(&self) -> Result<serde_json::Value, GatewayError>;

    /// Execute a sale. On decline the error carries the gateway payload.
    async fn sale(&self, request: SaleRequest) -> Result<SaleResult, GatewayError>;
}
