//! HTTP route handlers for the merchant admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness
//! GET  /health/ready              - Database ping
//!
//! # Auth (Shopify OAuth)
//! GET  /auth/install?shop=        - Start install
//! GET  /auth/callback             - Finish install
//! GET  /billing/callback          - Charge approved landing
//!
//! # App (requires an installed shop)
//! GET  /app                       - Dashboard data
//! POST /app                       - Webhook registration, digital products (multipart)
//! GET  /app/settings              - S3 settings
//! POST /app/settings              - Save or test S3 settings (form)
//! POST /app/unsubscribe-webhook   - Remove webhook subscriptions (form)
//! GET  /app/plans                 - Plan catalog
//! POST /app/plans/subscribe       - Create a subscription (form)
//! ```
//!
//! All responses are JSON except the health and billing endpoints.

use axum::Router;

use crate::state::AppState;

pub mod app;
pub mod auth;
pub mod billing;
pub mod commands;
pub mod health;
pub mod plans;
pub mod settings;
pub mod webhooks;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(billing::router())
        .merge(app::router())
        .merge(settings::router())
        .merge(webhooks::router())
        .merge(plans::router())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{AppConfig, CollectionNames, ShopifyAppConfig, WebhookConfig};
    use crate::db::MemoryMerchantStore;
    use crate::middleware::{create_session_layer, create_session_store};

    fn config() -> AppConfig {
        AppConfig {
            database_url: SecretString::from("postgres://localhost/digiful_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            app_url: "https://app.digiful.test".to_string(),
            session_secret: SecretString::from("s".repeat(32)),
            encryption_key: SecretString::from("ab".repeat(32)),
            shopify: ShopifyAppConfig {
                api_key: "key".to_string(),
                api_secret: SecretString::from("secret"),
                api_version: "2025-01".to_string(),
                scopes: vec!["write_products".to_string()],
            },
            webhooks: WebhookConfig {
                base_url: "https://hooks.digiful.test".to_string(),
                orders_paid_route: "/orders/paid".to_string(),
                app_subscriptions_update_route: "/app/subscriptions".to_string(),
                app_uninstalled_route: "/app/uninstalled".to_string(),
            },
            collections: CollectionNames::default(),
            digital_product_tag: "digiful".to_string(),
            billing_test_mode: true,
            vm_id: None,
            hosted_storage: None,
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Full router over a pool that never connects. Requests without a
    /// session cookie do not reach the database.
    fn app() -> Router {
        let config = config();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/digiful_test")
            .unwrap();
        let session_layer = create_session_layer(create_session_store(&pool).unwrap(), &config);
        let state = AppState::with_merchant_store(
            config,
            pool,
            Arc::new(MemoryMerchantStore::new()),
        )
        .unwrap();
        routes().layer(session_layer).with_state(state)
    }

    async fn get(uri: &str) -> StatusCode {
        app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(get("/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_app_requires_shop_session() {
        assert_eq!(get("/app").await, StatusCode::UNAUTHORIZED);
        assert_eq!(get("/app/settings").await, StatusCode::UNAUTHORIZED);
        assert_eq!(get("/app/plans").await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_install_rejects_foreign_domain() {
        assert_eq!(
            get("/auth/install?shop=evil.example.com").await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get("/auth/install").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_billing_callback() {
        assert_eq!(get("/billing/callback").await, StatusCode::OK);
    }
}
