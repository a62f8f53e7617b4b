//! Digital product and variant documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use digiful_core::ShopId;

/// A product created through the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalProductRecord {
    pub title: String,
    /// Numeric tail of the product GID.
    pub shopify_product_id: String,
    pub shop_id: ShopId,
    /// Key of the merchant document.
    pub merchant_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The uploaded file behind a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Object key in the bucket.
    pub name: String,
    pub original_name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
    #[serde(rename = "ETag")]
    pub etag: Option<String>,
}

/// A file that was attached to a variant at some point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    pub file: FileInfo,
    pub created_at: DateTime<Utc>,
}

/// The single variant of a digital product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRecord {
    /// Full variant GID.
    pub shopify_variant_id: String,
    pub shopify_product_id: String,
    pub shop_id: ShopId,
    pub price: Option<String>,
    pub compare_at_price: Option<String>,
    /// Key of the product document.
    pub product_id: String,
    pub taxable: bool,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub file: FileInfo,
    pub file_version_history: Vec<FileVersion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
