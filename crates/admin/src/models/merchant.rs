//! Merchant account documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use digiful_core::{
    AccountStatus, EncryptedSecret, PlanKey, ShopId, WebhookSubscriptionId, WebhookTopic,
};

use crate::shopify::{RemoteWebhook, UserError};

/// One merchant, keyed by the numeric shop id.
///
/// Created on first visit, updated by path writes, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantAccount {
    pub shop_id: ShopId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub account_status: AccountStatus,
    /// Prefix for object keys in the operator's bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_prefix_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    /// Shop money format template (`${{amount}}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Settings>,
    /// Cached registrations keyed by logical name (`webhookOrdersPaid`).
    #[serde(default)]
    pub webhooks: BTreeMap<String, WebhookEntry>,
    /// Remote listings captured by unsubscribe-all, keyed by `YYYY_MM_DD`.
    #[serde(default)]
    pub archived_webhooks: BTreeMap<String, Vec<RemoteWebhook>>,
}

/// The plan name first seen on an active subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRecord {
    pub plan_name: String,
}

/// Merchant-owned S3 bucket settings.
///
/// Every field tolerates absence so partially saved settings still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Settings {
    #[serde(default)]
    pub s3_access_key_id: String,
    #[serde(default)]
    pub s3_secret_access_key: EncryptedSecret,
    #[serde(default)]
    pub s3_bucket_name: String,
    #[serde(default)]
    pub s3_region: String,
    /// `None` until a credentials test has run since the last save.
    #[serde(default)]
    pub s3_creds_test_success: Option<bool>,
}

impl S3Settings {
    /// Whether every credential needed to reach the bucket is present.
    #[must_use]
    pub fn has_all_aws_creds(&self) -> bool {
        !self.s3_access_key_id.is_empty()
            && self.s3_secret_access_key.is_present()
            && !self.s3_bucket_name.is_empty()
            && !self.s3_region.is_empty()
    }
}

/// A cached webhook registration or the errors from a failed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WebhookEntry {
    Registered(WebhookRegistration),
    Failed { errors: Vec<UserError> },
    /// Anything else found in older documents.
    Other(serde_json::Value),
}

/// A successful webhook registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRegistration {
    pub id: WebhookSubscriptionId,
    pub topic: String,
    #[serde(default)]
    pub created_at: String,
    /// Token the receiver uses to call back into the shop.
    #[serde(default)]
    pub access_token: EncryptedSecret,
}

impl WebhookEntry {
    /// Remote subscription id, if this entry carries one.
    #[must_use]
    pub fn subscription_id(&self) -> Option<WebhookSubscriptionId> {
        match self {
            Self::Registered(registration) => Some(registration.id.clone()),
            Self::Failed { .. } => None,
            Self::Other(value) => value
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map(WebhookSubscriptionId::new),
        }
    }
}

impl MerchantAccount {
    /// A fresh active account.
    #[must_use]
    pub fn new(shop_id: ShopId, created_at: DateTime<Utc>) -> Self {
        let prefix = shop_prefix_hash(&shop_id);
        Self {
            shop_id,
            created_at: Some(created_at),
            account_status: AccountStatus::Active,
            shop_prefix_hash: Some(prefix),
            shop_slug: None,
            shop_name: None,
            currency_code: None,
            currency_format: None,
            plan: None,
            s3: None,
            webhooks: BTreeMap::new(),
            archived_webhooks: BTreeMap::new(),
        }
    }

    /// Remote id cached for `topic`, if any.
    #[must_use]
    pub fn webhook_id(&self, topic: WebhookTopic) -> Option<WebhookSubscriptionId> {
        self.webhooks
            .get(topic.record_key())
            .and_then(WebhookEntry::subscription_id)
    }

    /// The recorded plan, if it is one of the catalog plans.
    #[must_use]
    pub fn plan_key(&self) -> Option<PlanKey> {
        self.plan
            .as_ref()
            .and_then(|plan| PlanKey::lookup(&plan.plan_name))
    }

    /// Whether uploads go to the merchant's own bucket.
    #[must_use]
    pub fn uses_own_storage(&self) -> bool {
        self.s3.is_some() && self.plan_key() == Some(PlanKey::SelfHosting)
    }

    /// Whether complete S3 credentials are saved.
    #[must_use]
    pub fn has_all_aws_creds(&self) -> bool {
        self.s3.as_ref().is_some_and(S3Settings::has_all_aws_creds)
    }

    /// Object key prefix, derived from the shop id when the stored one is missing.
    #[must_use]
    pub fn prefix_hash(&self) -> String {
        self.shop_prefix_hash
            .clone()
            .unwrap_or_else(|| shop_prefix_hash(&self.shop_id))
    }
}

/// First 16 hex characters of the SHA-256 of the shop id.
#[must_use]
pub fn shop_prefix_hash(shop_id: &ShopId) -> String {
    let digest = Sha256::digest(shop_id.as_str().as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(16);
    hash
}
