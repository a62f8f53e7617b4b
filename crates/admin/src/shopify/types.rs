//! Domain types for the Shopify Admin API responses digiful reads.
//!
//! Field names follow the GraphQL schema (camelCase) so the same structs
//! deserialize straight from the response body and serialize back into the
//! merchant document where they are archived.

use serde::{Deserialize, Serialize};

use digiful_core::{SubscriptionStatus, VariantGid, WebhookSubscriptionId};

// =============================================================================
// Connections
// =============================================================================

/// A GraphQL connection, flattened to its nodes on access.
#[derive(Debug, Clone, Deserialize)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
}

/// A single connection edge.
#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

impl<T> Connection<T> {
    /// Consume the connection and return its nodes in order.
    #[must_use]
    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }
}

// =============================================================================
// Errors returned inside a 200 response
// =============================================================================

/// A field-level validation error from a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    /// Path to the offending input field, if any.
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// Join user error messages for logs and error values.
#[must_use]
pub fn join_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Shop & billing
// =============================================================================

/// `shop { id name currencyCode currencyFormats { moneyFormat } }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopInfo {
    /// Shop GID (`gid://shopify/Shop/123`).
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub currency_formats: Option<CurrencyFormats>,
}

impl ShopInfo {
    /// Money format template, e.g. `${{amount}}`.
    #[must_use]
    pub fn money_format(&self) -> Option<&str> {
        self.currency_formats
            .as_ref()
            .and_then(|formats| formats.money_format.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyFormats {
    #[serde(default)]
    pub money_format: Option<String>,
}

/// An entry of `appInstallation.activeSubscriptions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSubscription {
    pub id: String,
    pub name: String,
    pub status: SubscriptionStatus,
}

// =============================================================================
// Webhooks
// =============================================================================

/// A webhook subscription as listed by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWebhook {
    pub id: WebhookSubscriptionId,
    /// GraphQL topic enum value, kept as a string so unmanaged topics still parse.
    pub topic: String,
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl RemoteWebhook {
    /// Whether this subscription delivers `topic` to `callback_url`.
    #[must_use]
    pub fn matches(&self, topic: &str, callback_url: &str) -> bool {
        self.topic == topic && self.callback_url.as_deref() == Some(callback_url)
    }
}

/// The subscription returned by `webhookSubscriptionCreate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWebhook {
    pub id: WebhookSubscriptionId,
    pub topic: String,
    pub created_at: String,
}

/// Payload of `webhookSubscriptionCreate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookCreateOutcome {
    pub webhook_subscription: Option<CreatedWebhook>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

/// Payload of `webhookSubscriptionDelete`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookDeleteOutcome {
    pub deleted_webhook_subscription_id: Option<WebhookSubscriptionId>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

// =============================================================================
// Products
// =============================================================================

/// A product returned by the tagged product listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedProduct {
    pub id: String,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for `productCreate`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct<'a> {
    pub title: &'a str,
    pub tags: Vec<&'a str>,
    pub status: &'static str,
    pub description_html: &'a str,
}

/// Payload of `productCreate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreateOutcome {
    pub product: Option<IdNode>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

/// An object selected only by id.
#[derive(Debug, Clone, Deserialize)]
pub struct IdNode {
    pub id: String,
}

/// A variant returned by `productVariantsBulkCreate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedVariant {
    pub id: VariantGid,
    pub inventory_item: IdNode,
    pub price: Option<String>,
    pub compare_at_price: Option<String>,
    #[serde(default)]
    pub taxable: bool,
    pub sku: Option<String>,
    pub barcode: Option<String>,
}

/// Payload of `productVariantsBulkCreate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantsBulkCreateOutcome {
    #[serde(default)]
    pub product_variants: Vec<CreatedVariant>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

/// A sales channel publication.
#[derive(Debug, Clone, Deserialize)]
pub struct Publication {
    pub id: String,
    pub name: String,
}

/// Payload of mutations that only report user errors.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserErrorsOnly {
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_webhook_matches_topic_and_url() {
        let hook: RemoteWebhook = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/WebhookSubscription/1",
            "topic": "ORDERS_PAID",
            "callbackUrl": "https://hooks.example.com/orders/paid"
        }))
        .unwrap();

        assert!(hook.matches("ORDERS_PAID", "https://hooks.example.com/orders/paid"));
        assert!(!hook.matches("APP_UNINSTALLED", "https://hooks.example.com/orders/paid"));
        assert!(!hook.matches("ORDERS_PAID", "https://hooks.example.com/other"));
    }

    #[test]
    fn test_remote_webhook_without_callback_never_matches() {
        let hook: RemoteWebhook = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/WebhookSubscription/2",
            "topic": "ORDERS_PAID"
        }))
        .unwrap();
        assert!(!hook.matches("ORDERS_PAID", ""));
    }

    #[test]
    fn test_connection_into_nodes() {
        let conn: Connection<Publication> = serde_json::from_value(serde_json::json!({
            "edges": [
                {"node": {"id": "gid://shopify/Publication/1", "name": "Online Store"}},
                {"node": {"id": "gid://shopify/Publication/2", "name": "Point of Sale"}}
            ]
        }))
        .unwrap();
        let nodes = conn.into_nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].name, "Point of Sale");
    }

    #[test]
    fn test_join_user_errors() {
        let errors = vec![
            UserError {
                field: Some(vec!["price".to_string()]),
                message: "Price is invalid".to_string(),
            },
            UserError {
                field: None,
                message: "Title is taken".to_string(),
            },
        ];
        assert_eq!(join_user_errors(&errors), "Price is invalid, Title is taken");
    }
}
