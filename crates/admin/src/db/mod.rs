//! Database operations for the admin service.
//!
//! # Database: `digiful` schema
//!
//! ## Tables
//!
//! - `document` - JSON documents keyed by `(collection, key)`: merchant
//!   accounts, digital products and variants
//! - `shop_session` - Offline Shopify access tokens
//! - `session` - Browser sessions (tower-sessions)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p digiful-cli -- migrate
//! ```

pub mod document;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod merchants;
pub mod products;
pub mod shop_session;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use document::DocumentRepository;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryMerchantStore;
pub use merchants::{MerchantStore, PgMerchantStore};
pub use products::ProductRepository;
pub use shop_session::{ShopSession, ShopSessionRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// The write could not be applied as requested.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
