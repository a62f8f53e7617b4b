//! Integration tests for webhook reconciliation.
//!
//! The remote platform is a scripted in-memory fake; the merchant document
//! lives in the in-memory store. Assertions go through the stored JSON so
//! they pin the persisted shape as well as the behavior.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::SecretString;
use serde_json::json;

use digiful_admin::db::MerchantStore;
use digiful_admin::models::WebhookEntry;
use digiful_admin::services::{
    RegistrationOutcome, SkipReason, UnsubscribeOutcome, WebhookError,
};
use digiful_admin::shopify::{
    AdminShopifyError, FAKE_CREATED_AT, FakeWebhookApi, RemoteWebhook, UserError, WebhookApi,
    WebhookCreateOutcome, WebhookDeleteOutcome,
};
use digiful_core::{WebhookSubscriptionId, WebhookTopic};
use digiful_integration_tests::{ORDERS_PAID_CALLBACK, TestMerchant};

fn token() -> SecretString {
    SecretString::from("shpat_integration")
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_first_call_creates_and_second_call_finds_it() {
    let merchant = TestMerchant::new("1001").await;
    let api = FakeWebhookApi::new();
    let token = token();
    let reconciler = merchant.reconciler();

    let first = reconciler
        .ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            Some(&token),
        )
        .await
        .unwrap();
    assert!(first.success);
    assert!(!first.already_existed);

    let doc = merchant.document().await;
    assert_eq!(
        doc["webhooks"]["webhookOrdersPaid"]["id"],
        "gid://shopify/WebhookSubscription/1"
    );
    assert_eq!(doc["webhooks"]["webhookOrdersPaid"]["topic"], "ORDERS_PAID");
    assert_eq!(doc["webhooks"]["webhookOrdersPaid"]["createdAt"], FAKE_CREATED_AT);

    let second = reconciler
        .ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            Some(&token),
        )
        .await
        .unwrap();
    assert!(second.success);
    assert!(second.already_existed);
    assert_eq!(api.create_calls(), 1);
    assert_eq!(api.list_calls(), 2);
}

#[tokio::test]
async fn test_stored_token_decrypts_to_session_token() {
    let merchant = TestMerchant::new("1002").await;
    let api = FakeWebhookApi::new();

    merchant
        .reconciler()
        .ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::AppUninstalled,
            "https://hooks.digiful.app/app/uninstalled",
            Some(&token()),
        )
        .await
        .unwrap();

    let account = merchant.store.find(&merchant.shop_id).await.unwrap().unwrap();
    let Some(WebhookEntry::Registered(registration)) = account.webhooks.get("webhookAppUninstalled")
    else {
        panic!("expected a registration under webhookAppUninstalled");
    };
    assert_eq!(registration.access_token.iv.len(), 32);
    assert_eq!(
        merchant.codec.decrypt(&registration.access_token).unwrap(),
        "shpat_integration"
    );
}

#[tokio::test]
async fn test_same_topic_other_callback_is_created() {
    let merchant = TestMerchant::new("1003").await;
    let api = FakeWebhookApi::new().with_remote(vec![RemoteWebhook {
        id: WebhookSubscriptionId::new("gid://shopify/WebhookSubscription/77"),
        topic: "ORDERS_PAID".to_string(),
        callback_url: Some("https://old.example.com/orders/paid".to_string()),
    }]);

    let result = merchant
        .reconciler()
        .ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            Some(&token()),
        )
        .await
        .unwrap();

    assert!(matches!(result.outcome, RegistrationOutcome::Created { .. }));
    assert_eq!(api.remote().len(), 2);
}

#[tokio::test]
async fn test_remote_match_does_not_touch_local_record() {
    let merchant = TestMerchant::new("1004").await;
    let api = FakeWebhookApi::new().with_remote(vec![RemoteWebhook {
        id: WebhookSubscriptionId::new("gid://shopify/WebhookSubscription/5"),
        topic: "ORDERS_PAID".to_string(),
        callback_url: Some(ORDERS_PAID_CALLBACK.to_string()),
    }]);

    let result = merchant
        .reconciler()
        .ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            None,
        )
        .await
        .unwrap();

    assert!(result.already_existed);
    assert_eq!(merchant.document().await["webhooks"], json!({}));
}

#[tokio::test]
async fn test_stale_local_record_blocks_create() {
    let merchant = TestMerchant::new("1005").await;
    merchant
        .store
        .set_path(
            &merchant.shop_id,
            "webhooks.webhookOrdersPaid",
            json!({ "id": "gid://shopify/WebhookSubscription/9", "topic": "ORDERS_PAID" }),
        )
        .await
        .unwrap();
    let api = FakeWebhookApi::new();

    let result = merchant
        .reconciler()
        .ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            Some(&token()),
        )
        .await
        .unwrap();

    assert_eq!(
        result.outcome,
        RegistrationOutcome::Skipped {
            reason: SkipReason::LocalRecordPresent
        }
    );
    assert_eq!(api.create_calls(), 0);
}

// =============================================================================
// User errors and the errored state
// =============================================================================

#[tokio::test]
async fn test_user_errors_are_stored_not_raised() {
    let merchant = TestMerchant::new("1006").await;
    let api = FakeWebhookApi::new();
    api.reject_next_create(vec![UserError {
        field: Some(vec!["webhookSubscription".to_string(), "callbackUrl".to_string()]),
        message: "Address is invalid".to_string(),
    }]);

    let result = merchant
        .reconciler()
        .ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            Some(&token()),
        )
        .await
        .unwrap();

    assert!(result.success);
    assert!(matches!(result.outcome, RegistrationOutcome::Rejected { .. }));
    assert_eq!(
        merchant.document().await["webhooks"]["webhookOrdersPaid"],
        json!({
            "errors": [{
                "field": ["webhookSubscription", "callbackUrl"],
                "message": "Address is invalid"
            }]
        })
    );
}

#[tokio::test]
async fn test_errored_topic_registers_on_next_call() {
    let merchant = TestMerchant::new("1007").await;
    let api = FakeWebhookApi::new();
    let token = token();
    api.reject_next_create(vec![UserError {
        field: None,
        message: "Throttled".to_string(),
    }]);
    let reconciler = merchant.reconciler();

    reconciler
        .ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            Some(&token),
        )
        .await
        .unwrap();

    let retry = reconciler
        .ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            Some(&token),
        )
        .await
        .unwrap();

    assert!(matches!(retry.outcome, RegistrationOutcome::Created { .. }));
    assert_eq!(api.create_calls(), 2);
    assert_eq!(
        merchant.document().await["webhooks"]["webhookOrdersPaid"]["id"],
        "gid://shopify/WebhookSubscription/1"
    );
}

// =============================================================================
// Unsubscribe
// =============================================================================

#[tokio::test]
async fn test_unsubscribe_without_record_is_noop() {
    let merchant = TestMerchant::new("1008").await;
    let api = FakeWebhookApi::new();

    let outcome = merchant
        .reconciler()
        .unsubscribe_webhook(&api, &merchant.shop_id, WebhookTopic::OrdersPaid)
        .await
        .unwrap();

    assert_eq!(outcome, UnsubscribeOutcome::NotRegistered);
    assert!(api.delete_calls().is_empty());
}

#[tokio::test]
async fn test_unsubscribe_removes_remote_and_local() {
    let merchant = TestMerchant::new("1009").await;
    let api = FakeWebhookApi::new();
    let reconciler = merchant.reconciler();
    reconciler
        .ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::AppSubscriptionsUpdate,
            "https://hooks.digiful.app/app/subscriptions",
            Some(&token()),
        )
        .await
        .unwrap();

    let outcome = reconciler
        .unsubscribe_webhook(&api, &merchant.shop_id, WebhookTopic::AppSubscriptionsUpdate)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        UnsubscribeOutcome::Removed {
            id: WebhookSubscriptionId::new("gid://shopify/WebhookSubscription/1")
        }
    );
    assert!(api.remote().is_empty());
    assert_eq!(merchant.document().await["webhooks"], json!({}));
}

#[tokio::test]
async fn test_unsubscribe_mismatch_keeps_record() {
    let merchant = TestMerchant::new("1010").await;
    let api = FakeWebhookApi::new();
    let reconciler = merchant.reconciler();
    reconciler
        .ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            Some(&token()),
        )
        .await
        .unwrap();
    api.echo_on_delete(Some(WebhookSubscriptionId::new(
        "gid://shopify/WebhookSubscription/999",
    )));

    let err = reconciler
        .unsubscribe_webhook(&api, &merchant.shop_id, WebhookTopic::OrdersPaid)
        .await
        .unwrap_err();

    let WebhookError::VerificationFailed {
        requested,
        confirmed,
    } = err
    else {
        panic!("expected a verification failure, got {err}");
    };
    assert_eq!(requested.as_str(), "gid://shopify/WebhookSubscription/1");
    assert_eq!(
        confirmed.as_ref().map(WebhookSubscriptionId::as_str),
        Some("gid://shopify/WebhookSubscription/999")
    );
    assert_eq!(
        merchant.document().await["webhooks"]["webhookOrdersPaid"]["id"],
        "gid://shopify/WebhookSubscription/1"
    );
}

#[tokio::test]
async fn test_unsubscribe_all_archives_listing() {
    let merchant = TestMerchant::new("1011").await;
    let api = FakeWebhookApi::new();
    let token = token();
    let reconciler = merchant.reconciler();
    for (topic, url) in [
        (WebhookTopic::OrdersPaid, ORDERS_PAID_CALLBACK),
        (
            WebhookTopic::AppUninstalled,
            "https://hooks.digiful.app/app/uninstalled",
        ),
    ] {
        reconciler
            .ensure_webhook(&api, &merchant.shop_id, topic, url, Some(&token))
            .await
            .unwrap();
    }

    let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
    let outcome = reconciler
        .unsubscribe_all(&api, &merchant.shop_id, today)
        .await
        .unwrap();

    assert_eq!(outcome.removed.len(), 2);
    assert_eq!(outcome.archived_under, "2025_03_14");
    assert!(api.remote().is_empty());

    let doc = merchant.document().await;
    assert_eq!(doc["webhooks"], json!({}));
    let archived = doc["archivedWebhooks"]["2025_03_14"].as_array().unwrap();
    assert_eq!(archived.len(), 2);
    assert_eq!(archived[0]["callbackUrl"], ORDERS_PAID_CALLBACK);
}

// =============================================================================
// Concurrent calls for the same topic
// =============================================================================

/// Pauses after listing and before deleting, so a second call for the same
/// topic can run in the gap unless the reconciler holds the topic's lock.
struct SlowRemote<'a> {
    inner: &'a FakeWebhookApi,
}

impl SlowRemote<'_> {
    const PAUSE: Duration = Duration::from_millis(20);
}

#[async_trait]
impl WebhookApi for SlowRemote<'_> {
    async fn list_webhooks(&self) -> Result<Vec<RemoteWebhook>, AdminShopifyError> {
        let listing = self.inner.list_webhooks().await;
        tokio::time::sleep(Self::PAUSE).await;
        listing
    }

    async fn create_webhook(
        &self,
        topic: WebhookTopic,
        callback_url: &str,
    ) -> Result<WebhookCreateOutcome, AdminShopifyError> {
        self.inner.create_webhook(topic, callback_url).await
    }

    async fn delete_webhook(
        &self,
        id: &WebhookSubscriptionId,
    ) -> Result<WebhookDeleteOutcome, AdminShopifyError> {
        tokio::time::sleep(Self::PAUSE).await;
        self.inner.delete_webhook(id).await
    }
}

#[tokio::test]
async fn test_concurrent_ensure_creates_once() {
    let merchant = TestMerchant::new("1012").await;
    let fake = FakeWebhookApi::new();
    let api = SlowRemote { inner: &fake };
    let token = token();
    let reconciler = merchant.reconciler();

    let (first, second) = tokio::join!(
        reconciler.ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            Some(&token),
        ),
        reconciler.ensure_webhook(
            &api,
            &merchant.shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            Some(&token),
        ),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(fake.create_calls(), 1);
    assert_eq!(fake.remote().len(), 1);
    assert_eq!(
        [first.already_existed, second.already_existed]
            .iter()
            .filter(|existed| **existed)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_concurrent_unsubscribe_deletes_once() {
    let merchant = TestMerchant::new("1013").await;
    let fake = FakeWebhookApi::new();
    let reconciler = merchant.reconciler();
    reconciler
        .ensure_webhook(
            &fake,
            &merchant.shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            Some(&token()),
        )
        .await
        .unwrap();
    let api = SlowRemote { inner: &fake };

    let (first, second) = tokio::join!(
        reconciler.unsubscribe_webhook(&api, &merchant.shop_id, WebhookTopic::OrdersPaid),
        reconciler.unsubscribe_webhook(&api, &merchant.shop_id, WebhookTopic::OrdersPaid),
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    assert_eq!(fake.delete_calls().len(), 1);
    assert!(outcomes.contains(&UnsubscribeOutcome::NotRegistered));
    assert!(outcomes.contains(&UnsubscribeOutcome::Removed {
        id: WebhookSubscriptionId::new("gid://shopify/WebhookSubscription/1"),
    }));
    assert_eq!(merchant.document().await["webhooks"], json!({}));
}
