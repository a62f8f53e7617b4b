//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::crypto::CredentialCodec;
use crate::db::{MerchantStore, PgMerchantStore, ProductRepository, ShopSessionRepository};
use crate::error::AppError;
use crate::services::{WebhookLocks, WebhookReconciler};
use crate::shopify::ShopifyApp;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    codec: CredentialCodec,
    shopify: ShopifyApp,
    merchants: Arc<dyn MerchantStore>,
    webhook_locks: WebhookLocks,
}

impl AppState {
    /// Build the state over a PostgreSQL merchant store.
    ///
    /// # Errors
    ///
    /// Returns an error if the encryption key is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, AppError> {
        let merchants = Arc::new(PgMerchantStore::new(
            pool.clone(),
            config.collections.merchants.clone(),
        ));
        Self::with_merchant_store(config, pool, merchants)
    }

    /// Build the state over any merchant store.
    ///
    /// # Errors
    ///
    /// See [`AppState::new`].
    pub fn with_merchant_store(
        config: AppConfig,
        pool: PgPool,
        merchants: Arc<dyn MerchantStore>,
    ) -> Result<Self, AppError> {
        let codec = CredentialCodec::from_secret(&config.encryption_key)?;
        let shopify = ShopifyApp::new(&config.shopify, &config.app_url)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                codec,
                shopify,
                merchants,
                webhook_locks: WebhookLocks::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn codec(&self) -> &CredentialCodec {
        &self.inner.codec
    }

    #[must_use]
    pub fn shopify(&self) -> &ShopifyApp {
        &self.inner.shopify
    }

    #[must_use]
    pub fn merchants(&self) -> &dyn MerchantStore {
        self.inner.merchants.as_ref()
    }

    #[must_use]
    pub fn shop_sessions(&self) -> ShopSessionRepository<'_> {
        ShopSessionRepository::new(&self.inner.pool)
    }

    #[must_use]
    pub fn product_records(&self) -> ProductRepository<'_> {
        let collections = &self.inner.config.collections;
        ProductRepository::new(&self.inner.pool, &collections.products, &collections.variants)
    }

    #[must_use]
    pub fn webhooks(&self) -> WebhookReconciler<'_> {
        WebhookReconciler::new(
            self.inner.merchants.as_ref(),
            &self.inner.codec,
            &self.inner.webhook_locks,
        )
    }
}
