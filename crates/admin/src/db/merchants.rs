//! Merchant account persistence.
//!
//! The reconciler and handlers depend on [`MerchantStore`], not on the
//! PostgreSQL repository, so they can run against the in-memory store in
//! tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use digiful_core::{ShopId, WebhookTopic};

use super::{RepositoryError, document::DocumentRepository};
use crate::models::{MerchantAccount, PlanRecord, S3Settings, WebhookEntry};
use crate::shopify::RemoteWebhook;

/// Path of the cached registration for `topic`.
#[must_use]
pub fn webhook_path(topic: WebhookTopic) -> String {
    format!("webhooks.{}", topic.record_key())
}

/// Key under `archivedWebhooks` for listings archived on `date`.
#[must_use]
pub fn archive_key(date: NaiveDate) -> String {
    date.format("%Y_%m_%d").to_string()
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, RepositoryError> {
    serde_json::to_value(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("unserializable value: {e}")))
}

/// Storage of merchant account documents.
#[async_trait]
pub trait MerchantStore: Send + Sync {
    /// Load an account.
    async fn find(&self, shop_id: &ShopId) -> Result<Option<MerchantAccount>, RepositoryError>;

    /// Insert an account unless one exists. Returns whether it was inserted.
    async fn insert(&self, account: &MerchantAccount) -> Result<bool, RepositoryError>;

    /// Set a dotted path inside an existing account.
    async fn set_path(&self, shop_id: &ShopId, path: &str, value: Value)
    -> Result<(), RepositoryError>;

    /// Remove a dotted path from an existing account.
    async fn unset_path(&self, shop_id: &ShopId, path: &str) -> Result<(), RepositoryError>;

    /// Replace the cached registration for `topic`.
    async fn set_webhook_entry(
        &self,
        shop_id: &ShopId,
        topic: WebhookTopic,
        entry: &WebhookEntry,
    ) -> Result<(), RepositoryError> {
        self.set_path(shop_id, &webhook_path(topic), to_value(entry)?)
            .await
    }

    /// Drop the cached registration for `topic`.
    async fn remove_webhook_entry(
        &self,
        shop_id: &ShopId,
        topic: WebhookTopic,
    ) -> Result<(), RepositoryError> {
        self.unset_path(shop_id, &webhook_path(topic)).await
    }

    /// Archive a remote listing under `archivedWebhooks.<date>` and clear
    /// every cached registration.
    async fn archive_and_reset_webhooks(
        &self,
        shop_id: &ShopId,
        date: NaiveDate,
        listing: &[RemoteWebhook],
    ) -> Result<(), RepositoryError> {
        let path = format!("archivedWebhooks.{}", archive_key(date));
        self.set_path(shop_id, &path, to_value(&listing)?).await?;
        self.set_path(shop_id, "webhooks", Value::Object(serde_json::Map::new()))
            .await
    }

    /// Record the name of the merchant's active plan.
    async fn record_plan_name(&self, shop_id: &ShopId, plan_name: &str) -> Result<(), RepositoryError> {
        let plan = PlanRecord {
            plan_name: plan_name.to_string(),
        };
        self.set_path(shop_id, "plan", to_value(&plan)?).await
    }

    /// Replace the S3 settings. Any previous test result is cleared.
    async fn save_s3_settings(
        &self,
        shop_id: &ShopId,
        settings: &S3Settings,
    ) -> Result<(), RepositoryError> {
        let settings = S3Settings {
            s3_creds_test_success: None,
            ..settings.clone()
        };
        self.set_path(shop_id, "s3", to_value(&settings)?).await
    }

    /// Record a successful credentials test.
    async fn record_s3_test_success(&self, shop_id: &ShopId) -> Result<(), RepositoryError> {
        self.set_path(shop_id, "s3.s3CredsTestSuccess", Value::Bool(true))
            .await
    }
}

/// PostgreSQL-backed merchant store.
#[derive(Debug, Clone)]
pub struct PgMerchantStore {
    pool: PgPool,
    collection: String,
}

impl PgMerchantStore {
    /// Create a store over `collection`.
    #[must_use]
    pub fn new(pool: PgPool, collection: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
        }
    }

    fn documents(&self) -> DocumentRepository<'_> {
        DocumentRepository::new(&self.pool)
    }
}

#[async_trait]
impl MerchantStore for PgMerchantStore {
    async fn find(&self, shop_id: &ShopId) -> Result<Option<MerchantAccount>, RepositoryError> {
        let Some(body) = self
            .documents()
            .find_one(&self.collection, shop_id.as_str())
            .await?
        else {
            return Ok(None);
        };

        let account = serde_json::from_value(body).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid merchant document {shop_id}: {e}"))
        })?;
        Ok(Some(account))
    }

    async fn insert(&self, account: &MerchantAccount) -> Result<bool, RepositoryError> {
        self.documents()
            .insert_one(&self.collection, account.shop_id.as_str(), &to_value(account)?)
            .await
    }

    async fn set_path(
        &self,
        shop_id: &ShopId,
        path: &str,
        value: Value,
    ) -> Result<(), RepositoryError> {
        self.documents()
            .set_path(&self.collection, shop_id.as_str(), path, &value)
            .await
    }

    async fn unset_path(&self, shop_id: &ShopId, path: &str) -> Result<(), RepositoryError> {
        self.documents()
            .unset_path(&self.collection, shop_id.as_str(), path)
            .await
    }
}
