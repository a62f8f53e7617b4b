//! Webhook maintenance route.

use axum::{Form, Json, Router, extract::State, routing::post};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::instrument;

use super::app::load_shop;
use super::commands::{UnsubscribeCommand, UnsubscribeForm};
use crate::error::AppError;
use crate::middleware::RequireShop;
use crate::services::UnsubscribeOutcome;
use crate::state::AppState;

/// Build the webhook maintenance router.
pub fn router() -> Router<AppState> {
    Router::new().route("/app/unsubscribe-webhook", post(unsubscribe))
}

/// POST /app/unsubscribe-webhook - Remove one or all webhook subscriptions.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn unsubscribe(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Form(form): Form<UnsubscribeForm>,
) -> Result<Json<Value>, AppError> {
    let command = UnsubscribeCommand::parse(&form)?;
    let admin = shop.admin(&state);
    let (_, shop_id) = load_shop(&admin).await?;
    let webhooks = state.webhooks();

    let body = match command {
        UnsubscribeCommand::Unsubscribe(topic) => {
            let outcome = webhooks.unsubscribe_webhook(&admin, &shop_id, topic).await?;
            json!({
                "action": command.action_type(),
                "success": true,
                "webhookName": topic.record_key(),
                "result": outcome,
            })
        }
        UnsubscribeCommand::UnsubscribeUnmanaged => {
            tracing::info!(webhook_name = ?form.webhook_name, "Unmanaged webhook name, nothing to remove");
            json!({
                "action": command.action_type(),
                "success": true,
                "webhookName": form.webhook_name,
                "result": UnsubscribeOutcome::NotRegistered,
            })
        }
        UnsubscribeCommand::UnsubscribeAll => {
            let outcome = webhooks
                .unsubscribe_all(&admin, &shop_id, Utc::now().date_naive())
                .await?;
            json!({
                "action": command.action_type(),
                "success": true,
                "result": outcome,
            })
        }
    };

    Ok(Json(body))
}
