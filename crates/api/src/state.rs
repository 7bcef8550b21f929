//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::gateway::{HttpPaymentGateway, PaymentGateway};
use crate::store::{CatalogStore, PgStore};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The store and the gateway sit behind trait
/// objects so the router tests can swap in the in-memory store and a mock
/// gateway.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn CatalogStore>,
    gateway: Arc<dyn PaymentGateway>,
    pool: Option<PgPool>,
}

impl AppState {
    /// Create the production state: `PostgreSQL` store + HTTP gateway.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the gateway HTTP client cannot be built.
    pub fn new(config: &ApiConfig, pool: PgPool) -> Result<Self, reqwest::Error> {
        let gateway = HttpPaymentGateway::new(&config.gateway)?;
        Ok(Self::with_parts(
            Arc::new(PgStore::new(pool.clone())),
            Arc::new(gateway),
            Some(pool),
        ))
    }

    /// Assemble state from explicit parts. Used by tests and tooling.
    #[must_use]
    pub fn with_parts(
        store: Arc<dyn CatalogStore>,
        gateway: Arc<dyn PaymentGateway>,
        pool: Option<PgPool>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                gateway,
                pool,
            }),
        }
    }

    /// Get a reference to the catalog store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.inner.store
    }

    /// Get a reference to the payment gateway.
    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn PaymentGateway> {
        &self.inner.gateway
    }

    /// Get the database pool, if this state is backed by one.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }
}
