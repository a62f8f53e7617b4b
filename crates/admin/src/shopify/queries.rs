//! GraphQL documents sent to the Shopify Admin API.
//!
//! Every document takes its inputs as variables; nothing is interpolated into
//! the query text.

// =============================================================================
// Shop & billing
// =============================================================================

pub const SHOP_INFO: &str = "query ShopInfo { shop { id name currencyCode currencyFormats { moneyFormat } } }";

pub const ACTIVE_SUBSCRIPTIONS: &str = r"
query ActiveSubscriptions {
  appInstallation {
    activeSubscriptions { id name status }
  }
}";

pub const APP_SUBSCRIPTION_CREATE: &str = r"
mutation AppSubscriptionCreate(
  $name: String!
  $returnUrl: URL!
  $test: Boolean
  $lineItems: [AppSubscriptionLineItemInput!]!
) {
  appSubscriptionCreate(name: $name, returnUrl: $returnUrl, test: $test, lineItems: $lineItems) {
    confirmationUrl
    appSubscription { id status }
    userErrors { field message }
  }
}";

// =============================================================================
// Webhooks
// =============================================================================

/// The listing is capped at the first 100 subscriptions.
pub const WEBHOOK_SUBSCRIPTIONS: &str = r"
query WebhookSubscriptions {
  webhookSubscriptions(first: 100) {
    edges { node { id topic callbackUrl } }
  }
}";

pub const WEBHOOK_SUBSCRIPTION_CREATE: &str = r"
mutation WebhookSubscriptionCreate($topic: WebhookSubscriptionTopic!, $callbackUrl: URL!) {
  webhookSubscriptionCreate(
    topic: $topic
    webhookSubscription: { callbackUrl: $callbackUrl, format: JSON }
  ) {
    webhookSubscription { id topic createdAt }
    userErrors { field message }
  }
}";

pub const WEBHOOK_SUBSCRIPTION_DELETE: &str = r"
mutation WebhookSubscriptionDelete($id: ID!) {
  webhookSubscriptionDelete(id: $id) {
    deletedWebhookSubscriptionId
    userErrors { field message }
  }
}";

// =============================================================================
// Products
// =============================================================================

pub const PRODUCTS_BY_TAG: &str = r"
query ProductsByTag($query: String!) {
  products(first: 250, query: $query) {
    edges { node { id title handle tags } }
  }
}";

pub const PRODUCT_CREATE: &str = r"
mutation ProductCreate($input: ProductInput!) {
  productCreate(input: $input) {
    product { id }
    userErrors { field message }
  }
}";

pub const PUBLICATIONS: &str = r"
query Publications {
  publications(first: 10) {
    edges { node { id name } }
  }
}";

pub const PRODUCT_VARIANTS_BULK_CREATE: &str = r"
mutation ProductVariantsBulkCreate($productId: ID!, $variants: [ProductVariantsBulkInput!]!) {
  productVariantsBulkCreate(productId: $productId, variants: $variants) {
    productVariants { id inventoryItem { id } price compareAtPrice taxable sku barcode }
    userErrors { field message }
  }
}";

pub const INVENTORY_ITEM_UPDATE: &str = r"
mutation InventoryItemUpdate($id: ID!, $input: InventoryItemInput!) {
  inventoryItemUpdate(id: $id, input: $input) {
    inventoryItem { id tracked requiresShipping }
    userErrors { field message }
  }
}";

pub const PUBLISHABLE_PUBLISH: &str = r"
mutation PublishablePublish($id: ID!, $input: [PublicationInput!]!) {
  publishablePublish(id: $id, input: $input) {
    userErrors { field message }
  }
}";
