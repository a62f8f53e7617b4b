//! Unified error handling for the admin app.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use digiful_core::ShopDomain;

use crate::crypto::CryptoError;
use crate::db::RepositoryError;
use crate::services::{ProductError, WebhookError};
use crate::shopify::AdminShopifyError;
use crate::storage::StorageError;

/// Application-level error type for the admin app.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// Object storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A stored secret could not be decrypted.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Shopify refused a mutation with user errors.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Shop is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request conflicts with remote state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Shopify(e) => Self::Shopify(e),
            WebhookError::Repository(e) => Self::Database(e),
            WebhookError::AccountNotFound(_) => Self::NotFound(err.to_string()),
            WebhookError::VerificationFailed { .. } => Self::Conflict(err.to_string()),
        }
    }
}

impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::Shopify(e) => Self::Shopify(e),
            ProductError::Repository(e) => Self::Database(e),
            ProductError::Crypto(e) => Self::Crypto(e),
            ProductError::AccountNotFound(_) => Self::NotFound(err.to_string()),
            ProductError::HostedStorageMissing => Self::Internal(err.to_string()),
            ProductError::Rejected { .. } => Self::Rejected(err.to_string()),
        }
    }
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Crypto(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Shopify(_) | Self::Storage(_) => StatusCode::BAD_GATEWAY,
            Self::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() || matches!(self, Self::Conflict(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_)
            | Self::Crypto(_)
            | Self::Session(_)
            | Self::Internal(_) => "Internal server error".to_string(),
            Self::Shopify(_) | Self::Storage(_) => "External service error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Tag Sentry events of this request with the shop.
pub fn set_sentry_shop(shop: &ShopDomain) {
    sentry::configure_scope(|scope| {
        scope.set_tag("shop", shop.as_str());
    });
}
