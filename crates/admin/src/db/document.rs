//! JSON document store on `digiful.document`.
//!
//! Documents are addressed by `(collection, key)`. Updates are partial: a
//! dotted path is set or removed inside `body` without rewriting the rest of
//! the document.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;

/// Split a dotted path (`s3.s3CredsTestSuccess`) into its segments.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` for an empty path or an empty segment.
pub fn split_path(path: &str) -> Result<Vec<String>, RepositoryError> {
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    if segments.iter().any(String::is_empty) {
        return Err(RepositoryError::Conflict(format!(
            "invalid document path: {path:?}"
        )));
    }
    Ok(segments)
}

/// Repository for raw JSON documents.
pub struct DocumentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DocumentRepository<'a> {
    /// Create a new document repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch one document body.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_one(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<Value>, RepositoryError> {
        let body = sqlx::query_scalar::<_, Value>(
            r"
            SELECT body FROM digiful.document
            WHERE collection = $1 AND key = $2
            ",
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        Ok(body)
    }

    /// Insert a document unless one already exists under `key`.
    ///
    /// Returns whether a row was written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert_one(
        &self,
        collection: &str,
        key: &str,
        body: &Value,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO digiful.document (collection, key, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key) DO NOTHING
            ",
        )
        .bind(collection)
        .bind(key)
        .bind(body)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a document under a generated key and return the key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert_new(&self, collection: &str, body: &Value) -> Result<String, RepositoryError> {
        let key = Uuid::new_v4().to_string();
        if !self.insert_one(collection, &key, body).await? {
            return Err(RepositoryError::Conflict(format!(
                "generated key {key} already exists in {collection}"
            )));
        }
        Ok(key)
    }

    /// Set `path` inside an existing document, creating parent objects.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the document does not exist.
    pub async fn set_path(
        &self,
        collection: &str,
        key: &str,
        path: &str,
        value: &Value,
    ) -> Result<(), RepositoryError> {
        let segments = split_path(path)?;
        let result = sqlx::query(
            r"
            UPDATE digiful.document
            SET body = digiful.jsonb_set_deep(body, $3::text[], $4),
                updated_at = NOW()
            WHERE collection = $1 AND key = $2
            ",
        )
        .bind(collection)
        .bind(key)
        .bind(&segments)
        .bind(value)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove `path` from an existing document. Missing paths are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the document does not exist.
    pub async fn unset_path(
        &self,
        collection: &str,
        key: &str,
        path: &str,
    ) -> Result<(), RepositoryError> {
        let segments = split_path(path)?;
        let result = sqlx::query(
            r"
            UPDATE digiful.document
            SET body = body #- $3::text[],
                updated_at = NOW()
            WHERE collection = $1 AND key = $2
            ",
        )
        .bind(collection)
        .bind(key)
        .bind(&segments)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(
            split_path("webhooks.webhookOrdersPaid").unwrap(),
            vec!["webhooks".to_string(), "webhookOrdersPaid".to_string()]
        );
        assert_eq!(split_path("plan").unwrap(), vec!["plan".to_string()]);
    }

    #[test]
    fn test_split_path_rejects_empty_segments() {
        assert!(split_path("").is_err());
        assert!(split_path("webhooks.").is_err());
        assert!(split_path(".plan").is_err());
    }

    #[tokio::test]
    #[ignore = "Requires DATABASE_URL with migrations applied"]
    async fn test_set_and_unset_nested_path() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let pool = PgPool::connect(&url).await.unwrap();
        let repo = DocumentRepository::new(&pool);
        let key = Uuid::new_v4().to_string();

        repo.insert_one("test_documents", &key, &serde_json::json!({"shopId": key}))
            .await
            .unwrap();
        repo.set_path(
            "test_documents",
            &key,
            "webhooks.webhookOrdersPaid",
            &serde_json::json!({"id": "gid://shopify/WebhookSubscription/1"}),
        )
        .await
        .unwrap();

        let body = repo.find_one("test_documents", &key).await.unwrap().unwrap();
        assert_eq!(
            body.pointer("/webhooks/webhookOrdersPaid/id").unwrap(),
            "gid://shopify/WebhookSubscription/1"
        );

        repo.unset_path("test_documents", &key, "webhooks.webhookOrdersPaid")
            .await
            .unwrap();
        let body = repo.find_one("test_documents", &key).await.unwrap().unwrap();
        assert!(body.pointer("/webhooks/webhookOrdersPaid").is_none());
        assert!(body.pointer("/webhooks").is_some());
    }
}
