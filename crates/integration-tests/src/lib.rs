//! Integration tests for digiful.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory tests
//! cargo test -p digiful-integration-tests
//!
//! # Including the PostgreSQL tests
//! DATABASE_URL=postgres://... cargo test -p digiful-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `webhook_reconciler` - Registration and removal against a scripted remote
//! - `credential_codec` - Encryption round trips and known weaknesses
//! - `merchant_store` - Document store against a live database (ignored by default)

use chrono::Utc;

use digiful_admin::crypto::CredentialCodec;
use digiful_admin::db::{MemoryMerchantStore, MerchantStore};
use digiful_admin::models::MerchantAccount;
use digiful_admin::services::{WebhookLocks, WebhookReconciler};
use digiful_core::ShopId;

/// Fixed 32-byte test key.
pub const TEST_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

/// Callback used for `ORDERS_PAID` in these tests.
pub const ORDERS_PAID_CALLBACK: &str = "https://hooks.digiful.app/orders/paid";

/// A merchant with an account in an in-memory store, plus the reconciler's
/// collaborators.
pub struct TestMerchant {
    pub store: MemoryMerchantStore,
    pub codec: CredentialCodec,
    pub locks: WebhookLocks,
    pub shop_id: ShopId,
}

impl TestMerchant {
    /// Create the merchant's account.
    ///
    /// # Panics
    ///
    /// Panics if the test key is invalid or the insert fails.
    #[allow(clippy::unwrap_used)]
    pub async fn new(shop_id: &str) -> Self {
        let store = MemoryMerchantStore::new();
        let shop_id = ShopId::new(shop_id);
        store
            .insert(&MerchantAccount::new(shop_id.clone(), Utc::now()))
            .await
            .unwrap();
        Self {
            store,
            codec: CredentialCodec::from_hex(TEST_KEY).unwrap(),
            locks: WebhookLocks::new(),
            shop_id,
        }
    }

    #[must_use]
    pub fn reconciler(&self) -> WebhookReconciler<'_> {
        WebhookReconciler::new(&self.store, &self.codec, &self.locks)
    }

    /// The stored account document as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the account is missing.
    #[allow(clippy::unwrap_used)]
    pub async fn document(&self) -> serde_json::Value {
        self.store.raw(&self.shop_id).await.unwrap()
    }
}
