//! Authentication extractors.
//!
//! A request is authenticated when its session names a shop that has an
//! offline access token on file.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde_json::json;
use tower_sessions::Session;

use digiful_core::ShopDomain;

use crate::error::set_sentry_shop;
use crate::models::session_keys;
use crate::shopify::AdminClient;
use crate::state::AppState;

/// An authenticated shop and its offline access token.
#[derive(Debug, Clone)]
pub struct CurrentShop {
    pub domain: ShopDomain,
    pub access_token: SecretString,
}

/// Extractor that requires an installed, authenticated shop.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireShop(shop): RequireShop) -> impl IntoResponse {
///     shop.domain.to_string()
/// }
/// ```
pub struct RequireShop(pub CurrentShop);

/// Why a request was not authenticated.
#[derive(Debug)]
pub enum ShopAuthRejection {
    /// No session or no shop in the session.
    NoSession,
    /// The shop has no access token on file.
    NotInstalled,
    /// The token lookup failed.
    Unavailable,
}

impl IntoResponse for ShopAuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NoSession => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            Self::NotInstalled => (StatusCode::UNAUTHORIZED, "App is not installed for this shop"),
            Self::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "Session store unavailable"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl FromRequestParts<AppState> for RequireShop {
    type Rejection = ShopAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(ShopAuthRejection::NoSession)?;

        let domain: ShopDomain = session
            .get(session_keys::CURRENT_SHOP)
            .await
            .ok()
            .flatten()
            .ok_or(ShopAuthRejection::NoSession)?;

        let stored = state
            .shop_sessions()
            .get(&domain)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, shop = %domain, "Failed to load shop session");
                ShopAuthRejection::Unavailable
            })?
            .ok_or(ShopAuthRejection::NotInstalled)?;

        set_sentry_shop(&domain);

        Ok(Self(CurrentShop {
            domain,
            access_token: stored.access_token,
        }))
    }
}

impl CurrentShop {
    /// Admin API client for this shop.
    #[must_use]
    pub fn admin(&self, state: &AppState) -> AdminClient {
        state
            .shopify()
            .admin(self.domain.clone(), self.access_token.clone())
    }
}
