//! PostgreSQL document store tests.
//!
//! Each test writes into its own collection so runs do not collide.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use chrono::{NaiveDate, Utc};
use secrecy::SecretString;
use sqlx::PgPool;

use digiful_admin::crypto::CredentialCodec;
use digiful_admin::db::{MerchantStore, PgMerchantStore};
use digiful_admin::models::MerchantAccount;
use digiful_admin::services::{WebhookLocks, WebhookReconciler};
use digiful_admin::shopify::FakeWebhookApi;
use digiful_core::{ShopId, WebhookTopic};
use digiful_integration_tests::{ORDERS_PAID_CALLBACK, TEST_KEY};

async fn store() -> PgMerchantStore {
    let url = std::env::var("DATABASE_URL").unwrap();
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("../admin/migrations").run(&pool).await.unwrap();
    let collection = format!("it_merchants_{}", Utc::now().timestamp_micros());
    PgMerchantStore::new(pool, collection)
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn test_insert_is_once_only() {
    let store = store().await;
    let account = MerchantAccount::new(ShopId::new("2001"), Utc::now());

    assert!(store.insert(&account).await.unwrap());
    assert!(!store.insert(&account).await.unwrap());
    assert_eq!(store.find(&account.shop_id).await.unwrap(), Some(account));
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn test_reconciler_round_trip() {
    let store = store().await;
    let shop_id = ShopId::new("2002");
    store
        .insert(&MerchantAccount::new(shop_id.clone(), Utc::now()))
        .await
        .unwrap();
    let codec = CredentialCodec::from_hex(TEST_KEY).unwrap();
    let locks = WebhookLocks::new();
    let reconciler = WebhookReconciler::new(&store, &codec, &locks);
    let api = FakeWebhookApi::new();
    let token = SecretString::from("shpat_pg");

    reconciler
        .ensure_webhook(
            &api,
            &shop_id,
            WebhookTopic::OrdersPaid,
            ORDERS_PAID_CALLBACK,
            Some(&token),
        )
        .await
        .unwrap();
    let account = store.find(&shop_id).await.unwrap().unwrap();
    assert!(account.webhook_id(WebhookTopic::OrdersPaid).is_some());

    let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    reconciler.unsubscribe_all(&api, &shop_id, today).await.unwrap();

    let account = store.find(&shop_id).await.unwrap().unwrap();
    assert!(account.webhooks.is_empty());
    assert_eq!(account.archived_webhooks["2025_06_01"].len(), 1);
}
