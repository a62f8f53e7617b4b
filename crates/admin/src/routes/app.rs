//! Dashboard routes.
//!
//! `GET /app` summarizes the merchant's account and subscription;
//! `POST /app` runs the dashboard commands (webhook registration and
//! digital products) from a multipart form.

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::instrument;

use digiful_core::{AccountStatus, ShopId, SubscriptionStatus};

use super::commands::{ActionResponse, IndexCommand};
use crate::error::AppError;
use crate::middleware::{CurrentShop, RequireShop};
use crate::models::MerchantAccount;
use crate::services::{NewDigitalProduct, ProductService, UploadedFile};
use crate::shopify::{AdminClient, AppSubscription, ShopInfo};
use crate::state::AppState;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/app", get(dashboard).post(action))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
}

/// Name of the plan when the first subscription is active.
fn active_plan_name(subscriptions: &[AppSubscription]) -> Option<&str> {
    subscriptions
        .first()
        .filter(|s| s.status == SubscriptionStatus::Active)
        .map(|s| s.name.as_str())
}

/// Shop details shared by every page.
pub(super) async fn load_shop(
    admin: &AdminClient,
) -> Result<(ShopInfo, ShopId), AppError> {
    let info = admin.shop_info().await?;
    let shop_id = ShopId::from_gid(&info.id);
    Ok((info, shop_id))
}

// =============================================================================
// GET /app
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub shop_name: String,
    pub shop_domain: String,
    pub shop_slug: String,
    pub shop_id: ShopId,
    pub created_at: Option<DateTime<Utc>>,
    pub account_status: AccountStatus,
    pub s3_creds_test_success: Option<bool>,
    pub digital_product_tag: String,
    pub has_active_subscription: bool,
    pub plan_name: String,
    pub has_all_aws_creds: bool,
    pub vm_id: Option<String>,
}

impl DashboardView {
    fn new(
        shop: &CurrentShop,
        info: ShopInfo,
        account: &MerchantAccount,
        plan_name: &str,
        state: &AppState,
    ) -> Self {
        Self {
            shop_name: info.name,
            shop_domain: shop.domain.to_string(),
            shop_slug: shop.domain.slug().to_string(),
            shop_id: account.shop_id.clone(),
            created_at: account.created_at,
            account_status: account.account_status,
            s3_creds_test_success: account.s3.as_ref().and_then(|s3| s3.s3_creds_test_success),
            digital_product_tag: state.config().digital_product_tag.clone(),
            has_active_subscription: true,
            plan_name: plan_name.to_string(),
            has_all_aws_creds: account.has_all_aws_creds(),
            vm_id: state.config().vm_id.clone(),
        }
    }
}

/// GET /app - Dashboard data.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn dashboard(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<Response, AppError> {
    let vm_id = state.config().vm_id.clone();
    let admin = shop.admin(&state);
    let (info, shop_id) = load_shop(&admin).await?;

    let Some(account) = state.merchants().find(&shop_id).await? else {
        tracing::error!(shop_id = %shop_id, "No account found for merchant");
        return Ok(Json(json!({ "error": "Account not found!", "vmId": vm_id })).into_response());
    };

    let subscriptions = admin.active_subscriptions().await?;
    let Some(plan_name) = active_plan_name(&subscriptions) else {
        return Ok(Json(json!({ "hasActiveSubscription": false, "vmId": vm_id })).into_response());
    };

    if account.plan.is_none() {
        state
            .merchants()
            .record_plan_name(&shop_id, plan_name)
            .await?;
        tracing::info!(shop_id = %shop_id, plan = plan_name, "Plan recorded");
    }

    let view = DashboardView::new(&shop, info, &account, plan_name, &state);
    Ok(Json(view).into_response())
}

// =============================================================================
// POST /app
// =============================================================================

/// Fields of the dashboard form.
#[derive(Debug, Default)]
struct IndexForm {
    action_type: Option<String>,
    title: Option<String>,
    price: Option<String>,
    active: bool,
    description: Option<String>,
    file: Option<UploadedFile>,
}

impl IndexForm {
    fn set_text(&mut self, name: &str, value: String) {
        match name {
            "actionType" => self.action_type = Some(value),
            "title" => self.title = Some(value),
            "price" => self.price = Some(value),
            "active" => self.active = matches!(value.as_str(), "true" | "on" | "1"),
            "description" => self.description = Some(value),
            _ => {}
        }
    }

    fn into_product(self) -> Result<NewDigitalProduct, AppError> {
        let price = match self.price.as_deref().map(str::trim) {
            None | Some("") => Decimal::ZERO,
            Some(raw) => Decimal::from_str(raw)
                .ok()
                .filter(|price| !price.is_sign_negative())
                .ok_or_else(|| AppError::BadRequest(format!("invalid price: {raw}")))?,
        };
        Ok(NewDigitalProduct {
            title: self.title,
            file: self.file,
            price,
            active: self.active,
            description: self.description.unwrap_or_default(),
        })
    }
}

fn bad_multipart(err: MultipartError) -> AppError {
    AppError::BadRequest(format!("invalid multipart body: {err}"))
}

async fn read_index_form(mut multipart: Multipart) -> Result<IndexForm, AppError> {
    let mut form = IndexForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "file" {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(bad_multipart)?;
            // Browsers send an empty part when no file was picked
            if let Some(file_name) = file_name.filter(|n| !n.is_empty() && !bytes.is_empty()) {
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field.text().await.map_err(bad_multipart)?;
            form.set_text(&name, value);
        }
    }

    Ok(form)
}

/// POST /app - Dashboard commands.
#[instrument(skip_all, fields(shop = %shop.domain))]
async fn action(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_index_form(multipart).await?;
    let command = IndexCommand::parse(form.action_type.as_deref())?;

    let admin = shop.admin(&state);
    let (_, shop_id) = load_shop(&admin).await?;
    let config = state.config();
    let products = ProductService::new(
        &admin,
        state.merchants(),
        state.product_records(),
        state.codec(),
        config.hosted_storage.as_ref(),
        &config.digital_product_tag,
    );

    let response = match command {
        IndexCommand::RegisterWebhook(topic) => {
            let callback_url = config.webhooks.callback_url(topic);
            let result = state
                .webhooks()
                .ensure_webhook(
                    &admin,
                    &shop_id,
                    topic,
                    &callback_url,
                    Some(&shop.access_token),
                )
                .await?;
            Json(ActionResponse {
                action: command.action_type(),
                result,
            })
            .into_response()
        }
        IndexCommand::GetAllDigitalProducts => Json(products.list().await?).into_response(),
        IndexCommand::AddNewDigitalProduct => {
            Json(products.add(&shop_id, form.into_product()?).await?).into_response()
        }
    };

    Ok(response)
}
