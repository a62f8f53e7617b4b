//! Shopify app credentials: OAuth install flow and per-shop clients.

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use tracing::instrument;
use url::Url;

use digiful_core::ShopDomain;

use super::{AdminShopifyError, client::AdminClient};
use crate::config::ShopifyAppConfig;

type HmacSha256 = Hmac<Sha256>;

/// Offline access token granted on install.
pub struct AccessToken {
    pub access_token: SecretString,
    /// Comma-separated granted scopes.
    pub scope: String,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    #[serde(default)]
    scope: String,
}

/// The Shopify app itself: API key, secret and one shared HTTP client.
#[derive(Clone)]
pub struct ShopifyApp {
    inner: Arc<ShopifyAppInner>,
}

struct ShopifyAppInner {
    http: reqwest::Client,
    config: ShopifyAppConfig,
    app_url: String,
}

impl std::fmt::Debug for ShopifyApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyApp")
            .field("config", &self.inner.config)
            .field("app_url", &self.inner.app_url)
            .finish_non_exhaustive()
    }
}

impl ShopifyApp {
    /// Create the app handle.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ShopifyAppConfig, app_url: &str) -> Result<Self, AdminShopifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(ShopifyAppInner {
                http,
                config: config.clone(),
                app_url: app_url.to_string(),
            }),
        })
    }

    /// Admin API version requests are pinned to.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.inner.config.api_version
    }

    /// OAuth redirect target registered with the app.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.inner.app_url)
    }

    /// Build the URL that starts the install flow for `shop`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the shop domain does not form a valid URL.
    pub fn authorization_url(&self, shop: &ShopDomain, state: &str) -> Result<Url, AdminShopifyError> {
        let scopes = self.inner.config.scopes.join(",");
        let redirect_uri = self.redirect_uri();
        let url = Url::parse_with_params(
            &format!("https://{shop}/admin/oauth/authorize"),
            &[
                ("client_id", self.inner.config.api_key.as_str()),
                ("scope", scopes.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("state", state),
            ],
        )?;
        Ok(url)
    }

    /// Verify the `hmac` parameter of a request signed by Shopify.
    ///
    /// The message is every other parameter, sorted by key and joined as
    /// `key=value` pairs with `&`. Comparison is constant time.
    #[must_use]
    pub fn verify_hmac(&self, params: &[(String, String)]) -> bool {
        let Some(provided) = params
            .iter()
            .find(|(k, _)| k == "hmac")
            .and_then(|(_, v)| hex::decode(v).ok())
        else {
            return false;
        };

        let mut pairs: Vec<(&str, &str)> = params
            .iter()
            .filter(|(k, _)| k != "hmac" && k != "signature")
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.sort_unstable();

        let message = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let Ok(mut mac) =
            HmacSha256::new_from_slice(self.inner.config.api_secret.expose_secret().as_bytes())
        else {
            return false;
        };
        mac.update(message.as_bytes());
        mac.verify_slice(&provided).is_ok()
    }

    /// Exchange an authorization code for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns `OAuth` if Shopify rejects the exchange and `Http` on
    /// transport failure.
    #[instrument(skip(self, code), fields(shop = %shop))]
    pub async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<AccessToken, AdminShopifyError> {
        let url = format!("https://{shop}/admin/oauth/access_token");
        let params = [
            ("client_id", self.inner.config.api_key.as_str()),
            ("client_secret", self.inner.config.api_secret.expose_secret()),
            ("code", code),
        ];

        let response = self.inner.http.post(&url).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AdminShopifyError::OAuth(format!(
                "token exchange failed ({status}): {text}"
            )));
        }

        let token: AccessTokenResponse = response.json().await?;
        Ok(AccessToken {
            access_token: SecretString::from(token.access_token),
            scope: token.scope,
        })
    }

    /// Admin API client for one shop.
    #[must_use]
    pub fn admin(&self, shop: ShopDomain, access_token: SecretString) -> AdminClient {
        AdminClient::new(
            self.inner.http.clone(),
            shop,
            &self.inner.config.api_version,
            access_token,
        )
    }
}
