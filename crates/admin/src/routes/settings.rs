//! Storage settings routes.
//!
//! Merchants on the self-hosting plan save their own S3 credentials here and
//! run a write/read/delete probe against the bucket.

use axum::{
    Form, Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::instrument;

use digiful_core::{AccountStatus, ShopId};

use super::app::load_shop;
use super::commands::{SettingsCommand, SettingsForm};
use crate::error::AppError;
use crate::middleware::RequireShop;
use crate::models::S3Settings;
use crate::services::ensure_account;
use crate::state::AppState;
use crate::storage::{ObjectStore, S3Target};

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new().route("/app/settings", get(settings_page).post(update_settings))
}

/// Show the first and last three characters of a key.
#[must_use]
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let start: String = chars.iter().take(3).collect();
    let end: String = chars.iter().skip(chars.len() - 3).collect();
    format!("{start}**************{end}")
}

/// Reply of the `s3CredsTest` action.
fn creds_test_reply(action: &str, passed: bool) -> Value {
    json!({
        "action": action,
        "success": passed,
        "s3CredsTestSuccess": passed,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub shop_id: ShopId,
    pub shop_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub account_status: AccountStatus,
    pub plan_name: Option<String>,
    pub s3_access_key_id_masked: String,
    pub s3_bucket_name: String,
    pub s3_region: String,
    pub has_s3_secret_access_key: bool,
    pub s3_creds_test_success: Option<bool>,
}

/// GET /app/settings - Current storage settings.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn settings_page(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<Json<SettingsView>, AppError> {
    let admin = shop.admin(&state);
    let (info, _) = load_shop(&admin).await?;
    let account = ensure_account(state.merchants(), &shop.domain, &info).await?;
    let s3 = account.s3.clone().unwrap_or_default();

    Ok(Json(SettingsView {
        shop_id: account.shop_id,
        shop_name: info.name,
        created_at: account.created_at,
        account_status: account.account_status,
        plan_name: account.plan.map(|p| p.plan_name),
        s3_access_key_id_masked: mask_key(&s3.s3_access_key_id),
        has_s3_secret_access_key: s3.s3_secret_access_key.is_present(),
        s3_bucket_name: s3.s3_bucket_name,
        s3_region: s3.s3_region,
        s3_creds_test_success: s3.s3_creds_test_success,
    }))
}

/// POST /app/settings - Save or test S3 credentials.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn update_settings(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    Form(form): Form<SettingsForm>,
) -> Result<Response, AppError> {
    let command = SettingsCommand::parse(&form)?;
    let action = command.action_type();

    let admin = shop.admin(&state);
    let (_, shop_id) = load_shop(&admin).await?;

    match command {
        SettingsCommand::SaveS3Settings(input) => {
            let settings = S3Settings {
                s3_access_key_id: input.access_key_id,
                s3_secret_access_key: state.codec().encrypt(&input.secret_access_key),
                s3_bucket_name: input.bucket_name,
                s3_region: input.region,
                s3_creds_test_success: None,
            };
            state
                .merchants()
                .save_s3_settings(&shop_id, &settings)
                .await?;
            tracing::info!(shop_id = %shop_id, bucket = %settings.s3_bucket_name, "S3 settings saved");
            Ok(Json(json!({ "action": action, "success": true })).into_response())
        }
        SettingsCommand::S3CredsTest => {
            let account = state
                .merchants()
                .find(&shop_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("merchant {shop_id}")))?;
            let Some(s3) = account.s3.filter(S3Settings::has_all_aws_creds) else {
                let mut reply = creds_test_reply(action, false);
                reply["error"] = json!("S3 credentials are incomplete");
                return Ok(Json(reply).into_response());
            };

            let target = S3Target {
                bucket: s3.s3_bucket_name,
                region: s3.s3_region,
                access_key_id: s3.s3_access_key_id,
                secret_access_key: state.codec().decrypt_secret(&s3.s3_secret_access_key)?,
            };

            if let Err(e) = ObjectStore::new(&target).credentials_test().await {
                tracing::warn!(shop_id = %shop_id, error = %e, "S3 credentials test failed");
                return Ok(Json(creds_test_reply(action, false)).into_response());
            }

            state.merchants().record_s3_test_success(&shop_id).await?;
            tracing::info!(shop_id = %shop_id, "S3 credentials test passed");
            Ok(Json(creds_test_reply(action, true)).into_response())
        }
    }
}
