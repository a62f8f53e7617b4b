//! Webhook topics the app subscribes to.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A webhook topic managed by the reconciler.
///
/// Each topic has two names: the GraphQL enum value sent to Shopify
/// (`ORDERS_PAID`) and the logical name under which the registration is
/// cached in the merchant document (`webhookOrdersPaid`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookTopic {
    OrdersPaid,
    AppSubscriptionsUpdate,
    AppUninstalled,
}

/// Returned when a logical webhook name does not map to a known topic.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown webhook name: {0}")]
pub struct UnknownWebhookName(pub String);

impl WebhookTopic {
    /// All managed topics.
    pub const ALL: [Self; 3] = [
        Self::OrdersPaid,
        Self::AppSubscriptionsUpdate,
        Self::AppUninstalled,
    ];

    /// GraphQL `WebhookSubscriptionTopic` enum value.
    #[must_use]
    pub const fn as_graphql(self) -> &'static str {
        match self {
            Self::OrdersPaid => "ORDERS_PAID",
            Self::AppSubscriptionsUpdate => "APP_SUBSCRIPTIONS_UPDATE",
            Self::AppUninstalled => "APP_UNINSTALLED",
        }
    }

    /// Key of the cached registration under `webhooks` in the merchant document.
    #[must_use]
    pub const fn record_key(self) -> &'static str {
        match self {
            Self::OrdersPaid => "webhookOrdersPaid",
            Self::AppSubscriptionsUpdate => "webhookAppSubscriptionsUpdate",
            Self::AppUninstalled => "webhookAppUninstalled",
        }
    }

    /// Look up a topic by its GraphQL enum value.
    #[must_use]
    pub fn from_graphql(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_graphql() == value)
    }

    /// Look up a topic by its logical record key.
    ///
    /// # Errors
    ///
    /// Returns `UnknownWebhookName` if the key is not one of the managed names.
    pub fn from_record_key(key: &str) -> Result<Self, UnknownWebhookName> {
        Self::ALL
            .into_iter()
            .find(|t| t.record_key() == key)
            .ok_or_else(|| UnknownWebhookName(key.to_string()))
    }
}

impl fmt::Display for WebhookTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_graphql())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keys_are_distinct() {
        let keys: std::collections::HashSet<_> =
            WebhookTopic::ALL.iter().map(|t| t.record_key()).collect();
        assert_eq!(keys.len(), WebhookTopic::ALL.len());
    }

    #[test]
    fn test_record_key_lookup() {
        assert_eq!(
            WebhookTopic::from_record_key("webhookAppUninstalled").unwrap(),
            WebhookTopic::AppUninstalled
        );
        assert_eq!(
            WebhookTopic::from_record_key("webhookNope"),
            Err(UnknownWebhookName("webhookNope".to_string()))
        );
    }

    #[test]
    fn test_graphql_lookup() {
        assert_eq!(
            WebhookTopic::from_graphql("ORDERS_PAID"),
            Some(WebhookTopic::OrdersPaid)
        );
        assert_eq!(WebhookTopic::from_graphql("PRODUCTS_CREATE"), None);
    }

    #[test]
    fn test_serde_matches_graphql_enum() {
        for topic in WebhookTopic::ALL {
            let json = serde_json::to_string(&topic).unwrap();
            assert_eq!(json, format!("\"{}\"", topic.as_graphql()));
        }
    }
}
