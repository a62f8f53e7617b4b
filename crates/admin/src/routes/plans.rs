//! Plan catalog and subscription routes.

use axum::{
    Form, Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use digiful_core::{Plan, PlanKey};

use crate::error::AppError;
use crate::middleware::RequireShop;
use crate::state::AppState;

/// Build the plans router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/app/plans", get(catalog))
        .route("/app/plans/subscribe", post(subscribe))
}

#[derive(Debug, Serialize)]
pub struct PlansView {
    pub plans: Vec<Plan>,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub plan: Option<String>,
}

/// GET /app/plans - The plan catalog.
async fn catalog(RequireShop(_): RequireShop) -> Json<PlansView> {
    Json(PlansView {
        plans: Plan::catalog(),
    })
}

/// POST /app/plans/subscribe - Create a recurring charge for a plan.
///
/// Returns the URL where the merchant approves the charge.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn subscribe(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Form(form): Form<SubscribeForm>,
) -> Result<Json<Value>, AppError> {
    let key = form
        .plan
        .as_deref()
        .and_then(PlanKey::lookup)
        .ok_or_else(|| AppError::BadRequest("unknown plan".to_string()))?;

    let config = state.config();
    let return_url = format!("{}/billing/callback", config.app_url);
    let confirmation_url = shop
        .admin(&state)
        .create_app_subscription(&key.plan(), &return_url, config.billing_test_mode)
        .await?;

    tracing::info!(plan = %key, "App subscription created");
    Ok(Json(json!({
        "success": true,
        "plan": key.name(),
        "confirmationUrl": confirmation_url,
    })))
}
