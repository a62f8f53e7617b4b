//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The app runs
//! inside the Shopify admin iframe, so over HTTPS the cookie is sent
//! cross-site (`SameSite=None; Secure`).

use sqlx::PgPool;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "digiful_session";

/// Session expiry time in seconds (24 hours).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Cookie `SameSite` policy for the serving scheme.
#[must_use]
pub const fn same_site_policy(is_secure: bool) -> SameSite {
    if is_secure { SameSite::None } else { SameSite::Lax }
}

/// Create the session store on `digiful.session`.
///
/// # Errors
///
/// Returns an error if the schema or table name is rejected by the store.
pub fn create_session_store(pool: &PgPool) -> Result<PostgresStore, String> {
    PostgresStore::new(pool.clone())
        .with_schema_name("digiful")
        .and_then(|store| store.with_table_name("session"))
        .map_err(|e| e.to_string())
}

/// Create the session layer with the `PostgreSQL` store.
#[must_use]
pub fn create_session_layer(
    store: PostgresStore,
    config: &AppConfig,
) -> SessionManagerLayer<PostgresStore> {
    let is_secure = config.is_secure();

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(same_site_policy(is_secure))
        .with_http_only(true)
        .with_path("/")
}
