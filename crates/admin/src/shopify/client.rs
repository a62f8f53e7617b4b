//! Shopify Admin API GraphQL client bound to one shop and access token.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::instrument;

use digiful_core::{Plan, ShopDomain, WebhookSubscriptionId, WebhookTopic};

use super::{
    AdminShopifyError, GraphQLError, GraphQLErrorLocation, WebhookApi, queries,
    types::{
        AppSubscription, Connection, NewProduct, ProductCreateOutcome, Publication, RemoteWebhook,
        ShopInfo, TaggedProduct, UserError, UserErrorsOnly, VariantsBulkCreateOutcome,
        WebhookCreateOutcome, WebhookDeleteOutcome, join_user_errors,
    },
};

/// Name of the sales channel new digital products are published to.
pub const ONLINE_STORE_PUBLICATION: &str = "Online Store";

/// Shopify Admin API GraphQL client.
///
/// Cheap to clone. Each handler builds one from the shop's offline token.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    http: reqwest::Client,
    shop: ShopDomain,
    api_version: String,
    access_token: SecretString,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("shop", &self.inner.shop)
            .field("api_version", &self.inner.api_version)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    locations: Vec<GraphQLErrorLocationResponse>,
    #[serde(default)]
    path: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorLocationResponse {
    line: i64,
    column: i64,
}

// Response shapes, one per document.

#[derive(Debug, Deserialize)]
struct ShopData {
    shop: ShopInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppInstallationData {
    app_installation: AppInstallation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppInstallation {
    active_subscriptions: Vec<AppSubscription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSubscriptionCreateData {
    app_subscription_create: AppSubscriptionCreatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSubscriptionCreatePayload {
    confirmation_url: Option<String>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookSubscriptionsData {
    webhook_subscriptions: Connection<RemoteWebhook>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookCreateData {
    webhook_subscription_create: WebhookCreateOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookDeleteData {
    webhook_subscription_delete: WebhookDeleteOutcome,
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: Connection<TaggedProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductCreateData {
    product_create: ProductCreateOutcome,
}

#[derive(Debug, Deserialize)]
struct PublicationsData {
    publications: Connection<Publication>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantsBulkCreateData {
    product_variants_bulk_create: VariantsBulkCreateOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryItemUpdateData {
    inventory_item_update: UserErrorsOnly,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishablePublishData {
    publishable_publish: UserErrorsOnly,
}

impl AdminClient {
    pub(crate) fn new(
        http: reqwest::Client,
        shop: ShopDomain,
        api_version: &str,
        access_token: SecretString,
    ) -> Self {
        Self {
            inner: Arc::new(AdminClientInner {
                http,
                shop,
                api_version: api_version.to_string(),
                access_token,
            }),
        }
    }

    /// The shop this client talks to.
    #[must_use]
    pub fn shop(&self) -> &ShopDomain {
        &self.inner.shop
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.inner.shop, self.inner.api_version
        )
    }

    /// Execute a GraphQL document and decode its `data`.
    ///
    /// # Errors
    ///
    /// Returns `RateLimited` on 429, `Unauthorized` on 401, `Http` on other
    /// transport failures, `GraphQL` when the response carries top-level
    /// errors, and `Parse` when the body does not match `T`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, AdminShopifyError> {
        let body = json!({ "query": query, "variables": variables });

        let response = self
            .inner
            .http
            .post(self.endpoint())
            .header("X-Shopify-Access-Token", self.inner.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(AdminShopifyError::RateLimited(retry_after));
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AdminShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let bytes = response.error_for_status()?.bytes().await?;
        let graphql_response: GraphQLResponse<T> = serde_json::from_slice(&bytes)?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            let converted_errors: Vec<GraphQLError> = errors
                .into_iter()
                .map(|e| GraphQLError {
                    message: e.message,
                    locations: e
                        .locations
                        .into_iter()
                        .map(|l| GraphQLErrorLocation {
                            line: l.line,
                            column: l.column,
                        })
                        .collect(),
                    path: e.path,
                })
                .collect();
            return Err(AdminShopifyError::GraphQL(converted_errors));
        }

        graphql_response
            .data
            .ok_or(AdminShopifyError::MissingData("data"))
    }

    // =========================================================================
    // Shop & billing
    // =========================================================================

    /// Shop id and display name.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute`].
    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    pub async fn shop_info(&self) -> Result<ShopInfo, AdminShopifyError> {
        let data: ShopData = self.execute(queries::SHOP_INFO, json!({})).await?;
        Ok(data.shop)
    }

    /// Subscriptions of this app installation that are currently active.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute`].
    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    pub async fn active_subscriptions(&self) -> Result<Vec<AppSubscription>, AdminShopifyError> {
        let data: AppInstallationData = self
            .execute(queries::ACTIVE_SUBSCRIPTIONS, json!({}))
            .await?;
        Ok(data.app_installation.active_subscriptions)
    }

    /// Start a recurring subscription for `plan` and return the URL the
    /// merchant must visit to approve it.
    ///
    /// # Errors
    ///
    /// Returns `UserError` when Shopify rejects the input and `MissingData`
    /// when no confirmation URL comes back.
    #[instrument(skip(self, plan), fields(shop = %self.inner.shop, plan = plan.name))]
    pub async fn create_app_subscription(
        &self,
        plan: &Plan,
        return_url: &str,
        test: bool,
    ) -> Result<String, AdminShopifyError> {
        let variables = json!({
            "name": plan.name,
            "returnUrl": return_url,
            "test": test,
            "lineItems": [{
                "plan": {
                    "appRecurringPricingDetails": {
                        "price": {
                            "amount": plan.price.amount_string(),
                            "currencyCode": plan.price.currency_code.to_string(),
                        },
                        "interval": "EVERY_30_DAYS",
                    }
                }
            }],
        });

        let data: AppSubscriptionCreateData = self
            .execute(queries::APP_SUBSCRIPTION_CREATE, variables)
            .await?;
        let payload = data.app_subscription_create;

        if !payload.user_errors.is_empty() {
            return Err(AdminShopifyError::UserError(join_user_errors(
                &payload.user_errors,
            )));
        }

        payload
            .confirmation_url
            .ok_or(AdminShopifyError::MissingData("confirmationUrl"))
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Products carrying `tag` (first 250).
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute`].
    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    pub async fn products_by_tag(&self, tag: &str) -> Result<Vec<TaggedProduct>, AdminShopifyError> {
        let data: ProductsData = self
            .execute(queries::PRODUCTS_BY_TAG, json!({ "query": format!("tag:{tag}") }))
            .await?;
        Ok(data.products.into_nodes())
    }

    /// Create a product. User errors are returned, not raised.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute`].
    #[instrument(skip(self, input), fields(shop = %self.inner.shop, title = input.title))]
    pub async fn product_create(
        &self,
        input: &NewProduct<'_>,
    ) -> Result<ProductCreateOutcome, AdminShopifyError> {
        let data: ProductCreateData = self
            .execute(queries::PRODUCT_CREATE, json!({ "input": input }))
            .await?;
        Ok(data.product_create)
    }

    /// The "Online Store" publication, if the shop has one.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute`].
    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    pub async fn online_store_publication(&self) -> Result<Option<Publication>, AdminShopifyError> {
        let data: PublicationsData = self.execute(queries::PUBLICATIONS, json!({})).await?;
        Ok(data
            .publications
            .into_nodes()
            .into_iter()
            .find(|p| p.name == ONLINE_STORE_PUBLICATION))
    }

    /// Create the single variant of a digital product.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute`].
    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    pub async fn variants_bulk_create(
        &self,
        product_id: &str,
        price: &str,
        option_title: &str,
    ) -> Result<VariantsBulkCreateOutcome, AdminShopifyError> {
        let variables = json!({
            "productId": product_id,
            "variants": [{
                "price": price,
                "optionValues": [{ "optionName": "Title", "name": option_title }],
            }],
        });
        let data: VariantsBulkCreateData = self
            .execute(queries::PRODUCT_VARIANTS_BULK_CREATE, variables)
            .await?;
        Ok(data.product_variants_bulk_create)
    }

    /// Mark an inventory item as untracked and not requiring shipping.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute`].
    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    pub async fn inventory_item_update(
        &self,
        inventory_item_id: &str,
    ) -> Result<Vec<UserError>, AdminShopifyError> {
        let variables = json!({
            "id": inventory_item_id,
            "input": { "tracked": false, "requiresShipping": false },
        });
        let data: InventoryItemUpdateData = self
            .execute(queries::INVENTORY_ITEM_UPDATE, variables)
            .await?;
        Ok(data.inventory_item_update.user_errors)
    }

    /// Publish a product to a publication.
    ///
    /// # Errors
    ///
    /// See [`AdminClient::execute`].
    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    pub async fn publish(
        &self,
        product_id: &str,
        publication_id: &str,
    ) -> Result<Vec<UserError>, AdminShopifyError> {
        let variables = json!({
            "id": product_id,
            "input": [{ "publicationId": publication_id }],
        });
        let data: PublishablePublishData = self
            .execute(queries::PUBLISHABLE_PUBLISH, variables)
            .await?;
        Ok(data.publishable_publish.user_errors)
    }
}

#[async_trait]
impl WebhookApi for AdminClient {
    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    async fn list_webhooks(&self) -> Result<Vec<RemoteWebhook>, AdminShopifyError> {
        let data: WebhookSubscriptionsData = self
            .execute(queries::WEBHOOK_SUBSCRIPTIONS, json!({}))
            .await?;
        Ok(data.webhook_subscriptions.into_nodes())
    }

    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    async fn create_webhook(
        &self,
        topic: WebhookTopic,
        callback_url: &str,
    ) -> Result<WebhookCreateOutcome, AdminShopifyError> {
        let variables = json!({
            "topic": topic.as_graphql(),
            "callbackUrl": callback_url,
        });
        let data: WebhookCreateData = self
            .execute(queries::WEBHOOK_SUBSCRIPTION_CREATE, variables)
            .await?;
        Ok(data.webhook_subscription_create)
    }

    #[instrument(skip(self), fields(shop = %self.inner.shop))]
    async fn delete_webhook(
        &self,
        id: &WebhookSubscriptionId,
    ) -> Result<WebhookDeleteOutcome, AdminShopifyError> {
        let data: WebhookDeleteData = self
            .execute(queries::WEBHOOK_SUBSCRIPTION_DELETE, json!({ "id": id }))
            .await?;
        Ok(data.webhook_subscription_delete)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> AdminClient {
        AdminClient::new(
            reqwest::Client::new(),
            ShopDomain::parse("test-shop.myshopify.com").unwrap(),
            "2025-01",
            SecretString::from("shpat_test"),
        )
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client().endpoint(),
            "https://test-shop.myshopify.com/admin/api/2025-01/graphql.json"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let output = format!("{:?}", client());
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("shpat_test"));
    }

    #[test]
    fn test_graphql_errors_decode() {
        let body = r#"{"data":null,"errors":[{"message":"Throttled","locations":[{"line":1,"column":2}]}]}"#;
        let response: GraphQLResponse<ShopData> = serde_json::from_str(body).unwrap();
        assert!(response.data.is_none());
        let errors = response.errors.unwrap();
        assert_eq!(errors.first().unwrap().message, "Throttled");
    }

    #[test]
    fn test_webhook_listing_decodes() {
        let body = serde_json::json!({
            "webhookSubscriptions": {
                "edges": [{
                    "node": {
                        "id": "gid://shopify/WebhookSubscription/1",
                        "topic": "ORDERS_PAID",
                        "callbackUrl": "https://hooks.example.com/orders/paid"
                    }
                }]
            }
        });
        let data: WebhookSubscriptionsData = serde_json::from_value(body).unwrap();
        let hooks = data.webhook_subscriptions.into_nodes();
        assert_eq!(hooks.len(), 1);
        assert_eq!(
            hooks.first().unwrap().id.as_str(),
            "gid://shopify/WebhookSubscription/1"
        );
    }

    #[test]
    fn test_delete_outcome_with_null_id() {
        let body = serde_json::json!({
            "webhookSubscriptionDelete": {
                "deletedWebhookSubscriptionId": null,
                "userErrors": [{"field": ["id"], "message": "Webhook subscription does not exist"}]
            }
        });
        let data: WebhookDeleteData = serde_json::from_value(body).unwrap();
        assert!(
            data.webhook_subscription_delete
                .deleted_webhook_subscription_id
                .is_none()
        );
        assert_eq!(data.webhook_subscription_delete.user_errors.len(), 1);
    }

    #[tokio::test]
    #[ignore = "Requires a Shopify development store and SHOPIFY_TEST_TOKEN"]
    async fn test_live_shop_info() {
        let shop = std::env::var("SHOPIFY_TEST_SHOP").unwrap();
        let token = std::env::var("SHOPIFY_TEST_TOKEN").unwrap();
        let client = AdminClient::new(
            reqwest::Client::new(),
            ShopDomain::parse(&shop).unwrap(),
            "2025-01",
            SecretString::from(token),
        );
        let info = client.shop_info().await.unwrap();
        assert!(info.id.starts_with("gid://shopify/Shop/"));
    }
}
