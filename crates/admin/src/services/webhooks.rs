//! Webhook reconciliation.
//!
//! The platform's subscription list is the source of truth; the merchant
//! document caches what was registered under each topic's logical name.
//!
//! Per (merchant, topic) the cached entry moves through:
//!
//! ```text
//! Unregistered ──create──▶ Registered ──unsubscribe──▶ Unregistered
//!       │
//!       └──user errors──▶ Errored ──create──▶ Registered
//! ```
//!
//! An `Errored` entry carries no id, so it never blocks a later create.
//! User errors are stored and reported, never raised or retried. A delete
//! whose echoed id differs from the requested one is a hard failure and
//! leaves the cached entry in place.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};

use digiful_core::{ShopId, WebhookSubscriptionId, WebhookTopic};

use crate::crypto::CredentialCodec;
use crate::db::{MerchantStore, RepositoryError, merchants::archive_key};
use crate::models::{WebhookEntry, WebhookRegistration};
use crate::shopify::{AdminShopifyError, UserError, WebhookApi, join_user_errors};

/// Errors from webhook reconciliation.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Shopify(#[from] AdminShopifyError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The platform confirmed deleting a different subscription, or none.
    #[error(
        "webhook deletion not confirmed: requested {requested}, confirmed {}",
        .confirmed.as_ref().map_or("nothing", WebhookSubscriptionId::as_str)
    )]
    VerificationFailed {
        requested: WebhookSubscriptionId,
        confirmed: Option<WebhookSubscriptionId>,
    },

    #[error("no merchant account for shop {0}")]
    AccountNotFound(ShopId),
}

// =============================================================================
// Results
// =============================================================================

/// Result of `ensure_webhook`, serialized as the action response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    /// Always `true`: user errors are reported in `outcome`, not as failure.
    pub success: bool,
    pub already_existed: bool,
    #[serde(flatten)]
    pub outcome: RegistrationOutcome,
}

/// What `ensure_webhook` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RegistrationOutcome {
    /// A remote subscription already delivers this topic to this URL.
    AlreadyExisted { id: WebhookSubscriptionId },
    Created { id: WebhookSubscriptionId },
    /// The create mutation returned user errors; they were stored.
    Rejected { errors: Vec<UserError> },
    Skipped { reason: SkipReason },
}

/// Why no create was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// The merchant document already holds an id for this topic.
    LocalRecordPresent,
    NoAccessToken,
}

impl From<RegistrationOutcome> for RegistrationResult {
    fn from(outcome: RegistrationOutcome) -> Self {
        Self {
            success: true,
            already_existed: matches!(outcome, RegistrationOutcome::AlreadyExisted { .. }),
            outcome,
        }
    }
}

/// Result of `unsubscribe_webhook`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum UnsubscribeOutcome {
    /// No cached id; nothing was sent to the platform.
    NotRegistered,
    Removed { id: WebhookSubscriptionId },
}

/// Result of `unsubscribe_all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeAllOutcome {
    pub removed: Vec<WebhookSubscriptionId>,
    /// Key under `archivedWebhooks` holding the listing.
    pub archived_under: String,
}

// =============================================================================
// Locks
// =============================================================================

/// Keyed async locks serializing reconciliation per (merchant, topic).
///
/// Idle locks expire after ten minutes. The platform offers no idempotency
/// key, so this only closes the race within one process.
#[derive(Clone)]
pub struct WebhookLocks {
    cache: Cache<(ShopId, WebhookTopic), Arc<Mutex<()>>>,
}

impl std::fmt::Debug for WebhookLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookLocks")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl Default for WebhookLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookLocks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_idle(Duration::from_secs(600))
                .build(),
        }
    }

    /// Wait for and take the lock of (`shop_id`, `topic`).
    pub async fn lock(&self, shop_id: &ShopId, topic: WebhookTopic) -> OwnedMutexGuard<()> {
        let mutex = self
            .cache
            .get_with((shop_id.clone(), topic), async { Arc::new(Mutex::new(())) })
            .await;
        mutex.lock_owned().await
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Registers and removes webhook subscriptions for merchants.
pub struct WebhookReconciler<'a> {
    store: &'a dyn MerchantStore,
    codec: &'a CredentialCodec,
    locks: &'a WebhookLocks,
}

impl<'a> WebhookReconciler<'a> {
    #[must_use]
    pub const fn new(
        store: &'a dyn MerchantStore,
        codec: &'a CredentialCodec,
        locks: &'a WebhookLocks,
    ) -> Self {
        Self {
            store,
            codec,
            locks,
        }
    }

    /// Make sure `topic` is delivered to `callback_url` exactly once.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` before any remote call when the merchant has
    /// no document, and propagates transport and storage failures unchanged.
    #[instrument(skip(self, api, access_token), fields(shop_id = %shop_id, topic = %topic))]
    pub async fn ensure_webhook(
        &self,
        api: &dyn WebhookApi,
        shop_id: &ShopId,
        topic: WebhookTopic,
        callback_url: &str,
        access_token: Option<&SecretString>,
    ) -> Result<RegistrationResult, WebhookError> {
        let _guard = self.locks.lock(shop_id, topic).await;

        let account = self
            .store
            .find(shop_id)
            .await?
            .ok_or_else(|| WebhookError::AccountNotFound(shop_id.clone()))?;

        let remote = api.list_webhooks().await?;
        if let Some(existing) = remote
            .iter()
            .find(|hook| hook.matches(topic.as_graphql(), callback_url))
        {
            info!(id = %existing.id, "Webhook already registered");
            return Ok(RegistrationOutcome::AlreadyExisted {
                id: existing.id.clone(),
            }
            .into());
        }

        if let Some(id) = account.webhook_id(topic) {
            warn!(%id, "Cached webhook id not found remotely, skipping create");
            return Ok(RegistrationOutcome::Skipped {
                reason: SkipReason::LocalRecordPresent,
            }
            .into());
        }

        let Some(access_token) = access_token else {
            return Ok(RegistrationOutcome::Skipped {
                reason: SkipReason::NoAccessToken,
            }
            .into());
        };

        let outcome = api.create_webhook(topic, callback_url).await?;

        if !outcome.user_errors.is_empty() {
            warn!(
                errors = %join_user_errors(&outcome.user_errors),
                "Webhook registration rejected"
            );
            let entry = WebhookEntry::Failed {
                errors: outcome.user_errors.clone(),
            };
            self.store.set_webhook_entry(shop_id, topic, &entry).await?;
            return Ok(RegistrationOutcome::Rejected {
                errors: outcome.user_errors,
            }
            .into());
        }

        let created = outcome
            .webhook_subscription
            .ok_or(AdminShopifyError::MissingData("webhookSubscription"))?;

        let registration = WebhookRegistration {
            id: created.id.clone(),
            topic: created.topic,
            created_at: created.created_at,
            access_token: self.codec.encrypt(access_token.expose_secret()),
        };
        self.store
            .set_webhook_entry(shop_id, topic, &WebhookEntry::Registered(registration))
            .await?;

        info!(id = %created.id, "Webhook registered");
        Ok(RegistrationOutcome::Created { id: created.id }.into())
    }

    /// Remove the subscription cached for `topic`.
    ///
    /// # Errors
    ///
    /// Returns `VerificationFailed` when the platform echoes a different id;
    /// the cached entry is kept in that case.
    #[instrument(skip(self, api), fields(shop_id = %shop_id, topic = %topic))]
    pub async fn unsubscribe_webhook(
        &self,
        api: &dyn WebhookApi,
        shop_id: &ShopId,
        topic: WebhookTopic,
    ) -> Result<UnsubscribeOutcome, WebhookError> {
        let _guard = self.locks.lock(shop_id, topic).await;

        let Some(id) = self
            .store
            .find(shop_id)
            .await?
            .and_then(|account| account.webhook_id(topic))
        else {
            info!("No cached webhook, nothing to remove");
            return Ok(UnsubscribeOutcome::NotRegistered);
        };

        delete_verified(api, &id).await?;
        self.store.remove_webhook_entry(shop_id, topic).await?;

        info!(%id, "Webhook unsubscribed");
        Ok(UnsubscribeOutcome::Removed { id })
    }

    /// Delete every remote subscription of the shop, archive the listing
    /// under `archivedWebhooks.<today>` and clear the cached entries.
    ///
    /// # Errors
    ///
    /// Stops at the first failed or unverified delete; nothing is archived
    /// in that case.
    #[instrument(skip(self, api), fields(shop_id = %shop_id))]
    pub async fn unsubscribe_all(
        &self,
        api: &dyn WebhookApi,
        shop_id: &ShopId,
        today: NaiveDate,
    ) -> Result<UnsubscribeAllOutcome, WebhookError> {
        let mut guards = Vec::with_capacity(WebhookTopic::ALL.len());
        for topic in WebhookTopic::ALL {
            guards.push(self.locks.lock(shop_id, topic).await);
        }

        if self.store.find(shop_id).await?.is_none() {
            return Err(WebhookError::AccountNotFound(shop_id.clone()));
        }

        let listing = api.list_webhooks().await?;
        let mut removed = Vec::with_capacity(listing.len());
        for hook in &listing {
            delete_verified(api, &hook.id).await?;
            removed.push(hook.id.clone());
        }

        self.store
            .archive_and_reset_webhooks(shop_id, today, &listing)
            .await?;

        info!(count = removed.len(), "All webhooks unsubscribed");
        Ok(UnsubscribeAllOutcome {
            removed,
            archived_under: archive_key(today),
        })
    }
}

async fn delete_verified(
    api: &dyn WebhookApi,
    id: &WebhookSubscriptionId,
) -> Result<(), WebhookError> {
    let outcome = api.delete_webhook(id).await?;
    if outcome.deleted_webhook_subscription_id.as_ref() != Some(id) {
        warn!(
            requested = %id,
            errors = %join_user_errors(&outcome.user_errors),
            "Webhook deletion not confirmed"
        );
        return Err(WebhookError::VerificationFailed {
            requested: id.clone(),
            confirmed: outcome.deleted_webhook_subscription_id,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::db::MemoryMerchantStore;
    use crate::models::MerchantAccount;
    use crate::shopify::{FakeWebhookApi, RemoteWebhook};

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
    const CALLBACK: &str = "https://hooks.digiful.app/orders/paid";

    struct Fixture {
        store: MemoryMerchantStore,
        codec: CredentialCodec,
        locks: WebhookLocks,
        shop_id: ShopId,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = MemoryMerchantStore::new();
            let shop_id = ShopId::new("42");
            store
                .insert(&MerchantAccount::new(shop_id.clone(), Utc::now()))
                .await
                .unwrap();
            Self {
                store,
                codec: CredentialCodec::from_hex(KEY).unwrap(),
                locks: WebhookLocks::new(),
                shop_id,
            }
        }

        fn reconciler(&self) -> WebhookReconciler<'_> {
            WebhookReconciler::new(&self.store, &self.codec, &self.locks)
        }
    }

    #[test]
    fn test_registration_result_json() {
        let result: RegistrationResult = RegistrationOutcome::AlreadyExisted {
            id: WebhookSubscriptionId::new("gid://shopify/WebhookSubscription/1"),
        }
        .into();
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "success": true,
                "alreadyExisted": true,
                "outcome": "alreadyExisted",
                "id": "gid://shopify/WebhookSubscription/1"
            })
        );

        let result: RegistrationResult = RegistrationOutcome::Skipped {
            reason: SkipReason::NoAccessToken,
        }
        .into();
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "success": true,
                "alreadyExisted": false,
                "outcome": "skipped",
                "reason": "noAccessToken"
            })
        );
    }

    #[test]
    fn test_verification_error_message() {
        let err = WebhookError::VerificationFailed {
            requested: WebhookSubscriptionId::new("gid://shopify/WebhookSubscription/1"),
            confirmed: None,
        };
        assert_eq!(
            err.to_string(),
            "webhook deletion not confirmed: requested gid://shopify/WebhookSubscription/1, confirmed nothing"
        );
    }

    #[tokio::test]
    async fn test_create_stores_encrypted_token() {
        let fx = Fixture::new().await;
        let api = FakeWebhookApi::new();
        let token = SecretString::from("shpat_token");

        let result = fx
            .reconciler()
            .ensure_webhook(&api, &fx.shop_id, WebhookTopic::OrdersPaid, CALLBACK, Some(&token))
            .await
            .unwrap();
        assert!(matches!(result.outcome, RegistrationOutcome::Created { .. }));

        let account = fx.store.find(&fx.shop_id).await.unwrap().unwrap();
        let Some(WebhookEntry::Registered(registration)) = account.webhooks.get("webhookOrdersPaid")
        else {
            panic!("expected a registration");
        };
        assert_eq!(fx.codec.decrypt(&registration.access_token).unwrap(), "shpat_token");
    }

    #[tokio::test]
    async fn test_missing_account_makes_no_remote_call() {
        let fx = Fixture::new().await;
        let api = FakeWebhookApi::new();
        let token = SecretString::from("shpat_token");

        let result = fx
            .reconciler()
            .ensure_webhook(
                &api,
                &ShopId::new("404"),
                WebhookTopic::OrdersPaid,
                CALLBACK,
                Some(&token),
            )
            .await;
        assert!(matches!(result, Err(WebhookError::AccountNotFound(_))));
        assert_eq!(api.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_token_skips_create() {
        let fx = Fixture::new().await;
        let api = FakeWebhookApi::new();

        let result = fx
            .reconciler()
            .ensure_webhook(&api, &fx.shop_id, WebhookTopic::OrdersPaid, CALLBACK, None)
            .await
            .unwrap();
        assert_eq!(
            result.outcome,
            RegistrationOutcome::Skipped {
                reason: SkipReason::NoAccessToken
            }
        );
        assert_eq!(api.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_matching_requires_same_topic() {
        let fx = Fixture::new().await;
        let api = FakeWebhookApi::new().with_remote(vec![RemoteWebhook {
            id: WebhookSubscriptionId::new("gid://shopify/WebhookSubscription/9"),
            topic: "APP_UNINSTALLED".to_string(),
            callback_url: Some(CALLBACK.to_string()),
        }]);
        let token = SecretString::from("shpat_token");

        let result = fx
            .reconciler()
            .ensure_webhook(&api, &fx.shop_id, WebhookTopic::OrdersPaid, CALLBACK, Some(&token))
            .await
            .unwrap();
        assert!(!result.already_existed);
        assert_eq!(api.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let fx = Fixture::new().await;
        let api = FakeWebhookApi::new();
        api.fail_next_list(AdminShopifyError::RateLimited(2));
        let token = SecretString::from("shpat_token");

        let result = fx
            .reconciler()
            .ensure_webhook(&api, &fx.shop_id, WebhookTopic::OrdersPaid, CALLBACK, Some(&token))
            .await;
        assert!(matches!(
            result,
            Err(WebhookError::Shopify(AdminShopifyError::RateLimited(2)))
        ));
        assert_eq!(api.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_all_archives_listing() {
        let fx = Fixture::new().await;
        let api = FakeWebhookApi::new();
        let token = SecretString::from("shpat_token");
        let reconciler = fx.reconciler();

        for topic in [WebhookTopic::OrdersPaid, WebhookTopic::AppUninstalled] {
            reconciler
                .ensure_webhook(&api, &fx.shop_id, topic, CALLBACK, Some(&token))
                .await
                .unwrap();
        }

        let today = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let outcome = reconciler
            .unsubscribe_all(&api, &fx.shop_id, today)
            .await
            .unwrap();

        assert_eq!(outcome.removed.len(), 2);
        assert_eq!(outcome.archived_under, "2025_03_07");
        assert!(api.remote().is_empty());

        let raw = fx.store.raw(&fx.shop_id).await.unwrap();
        assert_eq!(raw["webhooks"], json!({}));
        assert_eq!(raw["archivedWebhooks"]["2025_03_07"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_all_stops_on_unverified_delete() {
        let fx = Fixture::new().await;
        let api = FakeWebhookApi::new();
        let token = SecretString::from("shpat_token");
        let reconciler = fx.reconciler();
        reconciler
            .ensure_webhook(&api, &fx.shop_id, WebhookTopic::OrdersPaid, CALLBACK, Some(&token))
            .await
            .unwrap();
        api.echo_on_delete(None);

        let today = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let result = reconciler.unsubscribe_all(&api, &fx.shop_id, today).await;
        assert!(matches!(result, Err(WebhookError::VerificationFailed { .. })));

        let account = fx.store.find(&fx.shop_id).await.unwrap().unwrap();
        assert!(account.archived_webhooks.is_empty());
        assert!(account.webhook_id(WebhookTopic::OrdersPaid).is_some());
    }

    #[tokio::test]
    async fn test_locks_serialize_same_key() {
        let locks = WebhookLocks::new();
        let shop_id = ShopId::new("42");

        let guard = locks.lock(&shop_id, WebhookTopic::OrdersPaid).await;
        let contended = tokio::time::timeout(
            Duration::from_millis(50),
            locks.lock(&shop_id, WebhookTopic::OrdersPaid),
        )
        .await;
        assert!(contended.is_err());

        // Other topics are independent.
        let _other = locks.lock(&shop_id, WebhookTopic::AppUninstalled).await;

        drop(guard);
        let _again = locks.lock(&shop_id, WebhookTopic::OrdersPaid).await;
    }
}
