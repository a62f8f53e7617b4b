//! Billing confirmation landing route.

use axum::{Router, extract::RawQuery, routing::get};

use crate::state::AppState;

/// Build the billing router.
pub fn router() -> Router<AppState> {
    Router::new().route("/billing/callback", get(callback))
}

/// GET /billing/callback - Shopify redirects here after a charge is approved.
async fn callback(RawQuery(query): RawQuery) -> &'static str {
    tracing::info!(query = query.as_deref().unwrap_or_default(), "Billing completed");
    "OK"
}
