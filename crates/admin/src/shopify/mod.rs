//! Shopify Admin API client and OAuth.
//!
//! # Architecture
//!
//! - [`ShopifyApp`] holds the app credentials and runs the install flow
//! - [`AdminClient`] talks GraphQL to one shop with its offline token
//! - [`WebhookApi`] is the seam the webhook reconciler depends on, so the
//!   reconciliation logic can run against a scripted fake
//!
//! Documents are plain strings with JSON variables (see [`queries`]). Every
//! remote call is a single request; there is no retry or backoff.
//!
//! # Example
//!
//! ```rust,ignore
//! use digiful_admin::shopify::ShopifyApp;
//!
//! let app = ShopifyApp::new(&config.shopify, &config.app_url)?;
//! let client = app.admin(shop, access_token);
//!
//! let info = client.shop_info().await?;
//! let hooks = client.list_webhooks().await?;
//! ```

mod client;
#[cfg(any(test, feature = "testing"))]
mod fake;
mod oauth;
pub mod queries;
pub mod types;

pub use client::{AdminClient, ONLINE_STORE_PUBLICATION};
#[cfg(any(test, feature = "testing"))]
pub use fake::{FAKE_CREATED_AT, FakeWebhookApi};
pub use oauth::{AccessToken, ShopifyApp};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use digiful_core::{WebhookSubscriptionId, WebhookTopic};

/// Errors that can occur when interacting with Shopify.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),

    /// OAuth token exchange failed.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// A field the caller relies on was absent from the response.
    #[error("Missing {0} in response")]
    MissingData(&'static str),

    /// A URL could not be built from the shop domain.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Webhook subscription endpoints of one shop.
///
/// User errors come back inside the outcome; only transport and GraphQL
/// failures are errors.
#[async_trait]
pub trait WebhookApi: Send + Sync {
    /// The shop's webhook subscriptions (first 100).
    async fn list_webhooks(&self) -> Result<Vec<RemoteWebhook>, AdminShopifyError>;

    /// Subscribe `callback_url` to `topic` with JSON payloads.
    async fn create_webhook(
        &self,
        topic: WebhookTopic,
        callback_url: &str,
    ) -> Result<WebhookCreateOutcome, AdminShopifyError>;

    /// Delete a subscription by id.
    async fn delete_webhook(
        &self,
        id: &WebhookSubscriptionId,
    ) -> Result<WebhookDeleteOutcome, AdminShopifyError>;
}
