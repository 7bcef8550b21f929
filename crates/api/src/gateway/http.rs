//! HTTP payment gateway client.
//!
//! Speaks a JSON REST dialect against the configured gateway endpoint,
//! authenticating with the merchant's public/private key pair. Responses are
//! treated as opaque payloads; only the top-level `success` flag of a sale is
//! interpreted.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::GatewayConfig;

use super::{GatewayError, PaymentGateway, SaleRequest, SaleResult};

/// Outbound call timeout. The gateway is expected to fail fast; this bounds
/// the worst case.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the payment gateway's merchant API.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    client: reqwest::Client,
    base_url: String,
    merchant_id: String,
    public_key: String,
    private_key: String,
}

impl HttpPaymentGateway {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be constructed.
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_owned(),
                merchant_id: config.merchant_id.clone(),
                public_key: config.public_key.clone(),
                private_key: config.private_key.expose_secret().to_owned(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/merchants/{}/{path}",
            self.inner.base_url, self.inner.merchant_id
        )
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(path))
            .basic_auth(&self.inner.public_key, Some(&self.inner.private_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "gateway returned non-success status"
            );
            return Err(GatewayError::Unexpected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self))]
    async fn client_token(&self) -> Result<serde_json::Value, GatewayError> {
        self.post_json("client-token", &serde_json::json!({})).await
    }

    #[instrument(skip(self, request), fields(amount = %request.amount))]
    async fn sale(&self, request: SaleRequest) -> Result<SaleResult, GatewayError> {
        let body = serde_json::json!({
            "amount": request.amount,
            "payment_method_nonce": request.payment_method_nonce,
            "options": {
                "submit_for_settlement": request.submit_for_settlement,
            },
        });

        let payload = self.post_json("transactions", &body).await?;

        // The gateway reports declines inside a 2xx response; only the
        // top-level success flag is interpreted here.
        if payload.get("success").and_then(serde_json::Value::as_bool) == Some(false) {
            return Err(GatewayError::Declined { payload });
        }

        Ok(SaleResult(payload))
    }
}
