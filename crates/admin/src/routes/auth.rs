//! Shopify OAuth install routes.
//!
//! `/auth/install` starts the authorization code grant for a shop and
//! `/auth/callback` completes it: the offline token is stored, the shop is
//! remembered in the session and the merchant account is created if missing.

use axum::{
    Router,
    extract::{Query, RawQuery, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use digiful_core::ShopDomain;

use crate::error::AppError;
use crate::models::session_keys;
use crate::services::ensure_account;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/install", get(install))
        .route("/auth/callback", get(callback))
}

#[derive(Debug, Deserialize)]
pub struct InstallParams {
    pub shop: Option<String>,
}

fn parse_shop(shop: Option<&str>) -> Result<ShopDomain, AppError> {
    let shop = shop.ok_or_else(|| AppError::BadRequest("missing shop parameter".to_string()))?;
    ShopDomain::parse(shop).map_err(|e| AppError::BadRequest(e.to_string()))
}

fn query_pairs(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// GET /auth/install - Start OAuth flow.
#[instrument(skip(state, session))]
async fn install(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<InstallParams>,
) -> Result<Response, AppError> {
    let shop = parse_shop(params.shop.as_deref())?;

    // Random state parameter for CSRF protection
    let oauth_state = uuid::Uuid::new_v4().to_string();
    session.insert(session_keys::OAUTH_STATE, &oauth_state).await?;

    let auth_url = state.shopify().authorization_url(&shop, &oauth_state)?;
    tracing::info!(shop = %shop, "Redirecting to Shopify OAuth");
    Ok(Redirect::to(auth_url.as_str()).into_response())
}

/// GET /auth/callback - Handle OAuth callback.
#[instrument(skip(state, session, raw_query))]
async fn callback(
    State(state): State<AppState>,
    session: Session,
    RawQuery(raw_query): RawQuery,
) -> Result<Response, AppError> {
    let pairs = query_pairs(raw_query.as_deref());

    if !state.shopify().verify_hmac(&pairs) {
        tracing::warn!("Invalid HMAC signature in OAuth callback");
        return Err(AppError::Unauthorized("invalid signature".to_string()));
    }

    let shop = parse_shop(param(&pairs, "shop"))?;
    let code = param(&pairs, "code")
        .ok_or_else(|| AppError::BadRequest("missing code parameter".to_string()))?;

    // Verify state matches what we stored
    let stored_state: Option<String> = session.remove(session_keys::OAUTH_STATE).await?;
    if stored_state.is_none() || stored_state.as_deref() != param(&pairs, "state") {
        tracing::warn!(shop = %shop, "OAuth state mismatch");
        return Err(AppError::Unauthorized("invalid state".to_string()));
    }

    let token = state.shopify().exchange_code(&shop, code).await?;
    state
        .shop_sessions()
        .save(&shop, &token.access_token, &token.scope)
        .await?;
    session.insert(session_keys::CURRENT_SHOP, &shop).await?;

    let admin = state.shopify().admin(shop.clone(), token.access_token);
    let info = admin.shop_info().await?;
    let account = ensure_account(state.merchants(), &shop, &info).await?;

    tracing::info!(shop = %shop, shop_id = %account.shop_id, "App installed");
    Ok(Redirect::to("/app").into_response())
}
