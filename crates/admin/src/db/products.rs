//! Digital product and variant records.

use sqlx::PgPool;

use super::{RepositoryError, document::DocumentRepository};
use crate::models::{DigitalProductRecord, VariantRecord};

/// Repository for the product and variant collections.
pub struct ProductRepository<'a> {
    documents: DocumentRepository<'a>,
    products: &'a str,
    variants: &'a str,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, products: &'a str, variants: &'a str) -> Self {
        Self {
            documents: DocumentRepository::new(pool),
            products,
            variants,
        }
    }

    /// Insert a product record and return its key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_product(
        &self,
        product: &DigitalProductRecord,
    ) -> Result<String, RepositoryError> {
        let body = serde_json::to_value(product)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        self.documents.insert_new(self.products, &body).await
    }

    /// Insert a variant record and return its key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_variant(&self, variant: &VariantRecord) -> Result<String, RepositoryError> {
        let body = serde_json::to_value(variant)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        self.documents.insert_new(self.variants, &body).await
    }
}
