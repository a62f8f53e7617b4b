//! Offline access tokens, one per installed shop.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use digiful_core::ShopDomain;

use super::RepositoryError;

/// The stored offline session of a shop.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopSession {
    pub shop: ShopDomain,
    pub access_token: SecretString,
    /// Granted scopes.
    pub scopes: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShopSessionRow {
    shop: String,
    access_token: String,
    scope: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShopSessionRow> for ShopSession {
    type Error = RepositoryError;

    fn try_from(row: ShopSessionRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shop domain in database: {e}"))
        })?;
        let scopes = row
            .scope
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            shop,
            access_token: SecretString::from(row.access_token),
            scopes,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for `digiful.shop_session`.
pub struct ShopSessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopSessionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the session of a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails and
    /// `DataCorruption` if the stored domain is invalid.
    pub async fn get(&self, shop: &ShopDomain) -> Result<Option<ShopSession>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopSessionRow>(
            r"
            SELECT shop, access_token, scope, updated_at
            FROM digiful.shop_session
            WHERE shop = $1
            ",
        )
        .bind(shop.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(ShopSession::try_from).transpose()
    }

    /// Save or replace the session of a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        scope: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO digiful.shop_session (shop, access_token, scope)
            VALUES ($1, $2, $3)
            ON CONFLICT (shop) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                scope = EXCLUDED.scope,
                updated_at = NOW()
            ",
        )
        .bind(shop.as_str())
        .bind(access_token.expose_secret())
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete the session of a shop. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM digiful.shop_session WHERE shop = $1")
            .bind(shop.as_str())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
