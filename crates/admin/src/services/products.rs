//! Digital product upload.
//!
//! A digital product is a catalog product with one untracked, non-shipping
//! variant whose file lives in object storage. Files go to the merchant's own
//! bucket on the self-hosting plan and to the operator's bucket otherwise.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use digiful_core::{ProductGid, ProductStatus, ShopId};

use crate::config::HostedStorageConfig;
use crate::crypto::{CredentialCodec, CryptoError};
use crate::db::{MerchantStore, ProductRepository, RepositoryError};
use crate::models::{DigitalProductRecord, FileInfo, FileVersion, MerchantAccount, VariantRecord};
use crate::shopify::{
    AdminClient, AdminShopifyError, CreatedVariant, NewProduct, TaggedProduct, join_user_errors,
};
use crate::storage::{ObjectStore, S3Target};

/// Action name reported by the upload.
pub const ADD_NEW_DIGITAL_PRODUCT: &str = "addNewDigitalProduct";

/// Action name reported by the tagged product listing.
pub const GET_ALL_DIGITAL_PRODUCTS: &str = "getAllDigitalProductsFromShop";

/// Errors from the product flows.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error(transparent)]
    Shopify(#[from] AdminShopifyError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("failed to decrypt S3 secret: {0}")]
    Crypto(#[from] CryptoError),

    #[error("no merchant account for shop {0}")]
    AccountNotFound(ShopId),

    /// A hosted plan upload was attempted without operator storage configured.
    #[error("hosted storage is not configured")]
    HostedStorageMissing,

    /// Shopify rejected one of the follow-up mutations.
    #[error("{mutation} rejected: {message}")]
    Rejected {
        mutation: &'static str,
        message: String,
    },
}

/// A file received from the upload form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Fields of the upload form. Title and file may be missing.
#[derive(Debug, Clone, Default)]
pub struct NewDigitalProduct {
    pub title: Option<String>,
    pub file: Option<UploadedFile>,
    pub price: Decimal,
    pub active: bool,
    pub description: String,
}

/// Response of the upload action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProductOutcome {
    pub action: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shopify_product_id: Option<String>,
}

impl AddProductOutcome {
    const fn failed() -> Self {
        Self {
            action: ADD_NEW_DIGITAL_PRODUCT,
            success: false,
            shopify_product_id: None,
        }
    }
}

/// Response of the tagged product listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    pub action: &'static str,
    pub success: bool,
    pub products: Vec<TaggedProduct>,
}

/// Where an upload is written.
#[derive(Debug, Clone)]
pub struct StoragePlacement {
    pub target: S3Target,
    pub key: String,
}

/// Pick the bucket and object key for `file_name`.
///
/// # Errors
///
/// Returns `Crypto` if the merchant's secret cannot be decrypted and
/// `HostedStorageMissing` if a hosted upload has no operator bucket.
pub fn storage_placement(
    account: &MerchantAccount,
    hosted: Option<&HostedStorageConfig>,
    codec: &CredentialCodec,
    file_name: &str,
) -> Result<StoragePlacement, ProductError> {
    if let Some(s3) = account.s3.as_ref().filter(|_| account.uses_own_storage()) {
        let target = S3Target {
            bucket: s3.s3_bucket_name.clone(),
            region: s3.s3_region.clone(),
            access_key_id: s3.s3_access_key_id.clone(),
            secret_access_key: codec.decrypt_secret(&s3.s3_secret_access_key)?,
        };
        return Ok(StoragePlacement {
            target,
            key: file_name.to_string(),
        });
    }

    let hosted = hosted.ok_or(ProductError::HostedStorageMissing)?;
    Ok(StoragePlacement {
        target: S3Target::from(hosted),
        key: format!("{}_{file_name}", account.prefix_hash()),
    })
}

fn variant_record(
    variant: CreatedVariant,
    product: &ProductGid,
    shop_id: &ShopId,
    product_key: String,
    file: FileInfo,
    now: DateTime<Utc>,
) -> VariantRecord {
    VariantRecord {
        shopify_variant_id: variant.id.into_inner(),
        shopify_product_id: product.numeric_id().to_string(),
        shop_id: shop_id.clone(),
        price: variant.price,
        compare_at_price: variant.compare_at_price,
        product_id: product_key,
        taxable: variant.taxable,
        barcode: variant.barcode,
        sku: variant.sku,
        file_version_history: vec![FileVersion {
            file: file.clone(),
            created_at: now,
        }],
        file,
        created_at: now,
        updated_at: now,
    }
}

fn reject_on_errors(
    mutation: &'static str,
    errors: &[crate::shopify::UserError],
) -> Result<(), ProductError> {
    if errors.is_empty() {
        return Ok(());
    }
    Err(ProductError::Rejected {
        mutation,
        message: join_user_errors(errors),
    })
}

/// Creates digital products for one shop.
pub struct ProductService<'a> {
    admin: &'a AdminClient,
    merchants: &'a dyn MerchantStore,
    records: ProductRepository<'a>,
    codec: &'a CredentialCodec,
    hosted_storage: Option<&'a HostedStorageConfig>,
    tag: &'a str,
}

impl<'a> ProductService<'a> {
    #[must_use]
    pub const fn new(
        admin: &'a AdminClient,
        merchants: &'a dyn MerchantStore,
        records: ProductRepository<'a>,
        codec: &'a CredentialCodec,
        hosted_storage: Option<&'a HostedStorageConfig>,
        tag: &'a str,
    ) -> Self {
        Self {
            admin,
            merchants,
            records,
            codec,
            hosted_storage,
            tag,
        }
    }

    /// Products carrying the digital product tag.
    ///
    /// # Errors
    ///
    /// Propagates Shopify failures.
    pub async fn list(&self) -> Result<ProductListing, ProductError> {
        let products = self.admin.products_by_tag(self.tag).await?;
        Ok(ProductListing {
            action: GET_ALL_DIGITAL_PRODUCTS,
            success: true,
            products,
        })
    }

    /// Upload the file, create the product and its variant, and record both.
    ///
    /// A missing title or file, or a failed upload, is reported as
    /// `success: false` rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the account is missing, a Shopify call fails or
    /// is rejected, or the records cannot be written.
    #[instrument(skip(self, input), fields(shop_id = %shop_id))]
    pub async fn add(
        &self,
        shop_id: &ShopId,
        input: NewDigitalProduct,
    ) -> Result<AddProductOutcome, ProductError> {
        let title = input.title.filter(|t| !t.trim().is_empty());
        let (Some(title), Some(file)) = (title, input.file) else {
            warn!("Upload is missing a title or a file");
            return Ok(AddProductOutcome::failed());
        };

        let account = self
            .merchants
            .find(shop_id)
            .await?
            .ok_or_else(|| ProductError::AccountNotFound(shop_id.clone()))?;

        let placement = storage_placement(&account, self.hosted_storage, self.codec, &file.file_name)?;
        let size = file.bytes.len() as u64;
        let store = ObjectStore::new(&placement.target);
        let etag = match store
            .put(&placement.key, file.bytes, &file.content_type, Some(&title))
            .await
        {
            Ok(etag) => etag,
            Err(e) => {
                error!(error = %e, bucket = %store.bucket(), "File upload failed");
                return Ok(AddProductOutcome::failed());
            }
        };

        let created = self
            .admin
            .product_create(&NewProduct {
                title: &title,
                tags: vec![self.tag],
                status: ProductStatus::from_active_flag(input.active).as_graphql(),
                description_html: &input.description,
            })
            .await?;
        if !created.user_errors.is_empty() {
            warn!(
                errors = %join_user_errors(&created.user_errors),
                "productCreate returned user errors"
            );
        }
        let product = ProductGid::new(
            created
                .product
                .ok_or(AdminShopifyError::MissingData("product"))?
                .id,
        );

        let variants = self
            .admin
            .variants_bulk_create(product.as_str(), &format!("{:.2}", input.price), &title)
            .await?;
        reject_on_errors("productVariantsBulkCreate", &variants.user_errors)?;
        let variant = variants
            .product_variants
            .into_iter()
            .next()
            .ok_or(AdminShopifyError::MissingData("productVariants"))?;

        let inventory_errors = self
            .admin
            .inventory_item_update(&variant.inventory_item.id)
            .await?;
        reject_on_errors("inventoryItemUpdate", &inventory_errors)?;

        if let Some(publication) = self.admin.online_store_publication().await? {
            let errors = self.admin.publish(product.as_str(), &publication.id).await?;
            if !errors.is_empty() {
                warn!(errors = %join_user_errors(&errors), "Publishing to the online store failed");
            }
        }

        let now = Utc::now();
        let product_key = self
            .records
            .insert_product(&DigitalProductRecord {
                title: title.clone(),
                shopify_product_id: product.numeric_id().to_string(),
                shop_id: shop_id.clone(),
                merchant_id: account.shop_id.to_string(),
                created_at: now,
                updated_at: now,
            })
            .await?;

        let file_info = FileInfo {
            name: placement.key,
            original_name: file.file_name,
            content_type: file.content_type,
            size,
            etag,
        };
        self.records
            .insert_variant(&variant_record(variant, &product, shop_id, product_key, file_info, now))
            .await?;

        info!(product = %product, "Digital product created");
        Ok(AddProductOutcome {
            action: ADD_NEW_DIGITAL_PRODUCT,
            success: true,
            shopify_product_id: Some(product.numeric_id().to_string()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use digiful_core::VariantGid;
    use secrecy::{ExposeSecret, SecretString};

    use super::*;
    use crate::models::{PlanRecord, S3Settings};
    use crate::shopify::IdNode;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn codec() -> CredentialCodec {
        CredentialCodec::from_hex(KEY).unwrap()
    }

    fn hosted() -> HostedStorageConfig {
        HostedStorageConfig {
            bucket: "digiful-hosted".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: "AKIAOPERATOR".to_string(),
            secret_access_key: SecretString::from("operator-secret"),
        }
    }

    fn self_hosting_account(codec: &CredentialCodec) -> MerchantAccount {
        let mut account = MerchantAccount::new(ShopId::new("42"), Utc::now());
        account.plan = Some(PlanRecord {
            plan_name: "SelfHosting".to_string(),
        });
        account.s3 = Some(S3Settings {
            s3_access_key_id: "AKIAMERCHANT".to_string(),
            s3_secret_access_key: codec.encrypt("merchant-secret"),
            s3_bucket_name: "merchant-files".to_string(),
            s3_region: "eu-west-1".to_string(),
            s3_creds_test_success: Some(true),
        });
        account
    }

    #[test]
    fn test_hosted_placement_prefixes_key() {
        let account = MerchantAccount::new(ShopId::new("42"), Utc::now());
        let placement =
            storage_placement(&account, Some(&hosted()), &codec(), "book.pdf").unwrap();

        assert_eq!(placement.target.bucket, "digiful-hosted");
        assert_eq!(placement.key, format!("{}_book.pdf", account.prefix_hash()));
    }

    #[test]
    fn test_self_hosting_placement_uses_merchant_bucket() {
        let codec = codec();
        let account = self_hosting_account(&codec);
        let placement = storage_placement(&account, Some(&hosted()), &codec, "book.pdf").unwrap();

        assert_eq!(placement.target.bucket, "merchant-files");
        assert_eq!(placement.target.region, "eu-west-1");
        assert_eq!(placement.target.secret_access_key.expose_secret(), "merchant-secret");
        assert_eq!(placement.key, "book.pdf");
    }

    #[test]
    fn test_s3_settings_without_self_hosting_plan_use_hosted_bucket() {
        let codec = codec();
        let mut account = self_hosting_account(&codec);
        account.plan = None;

        let placement = storage_placement(&account, Some(&hosted()), &codec, "book.pdf").unwrap();
        assert_eq!(placement.target.bucket, "digiful-hosted");
    }

    #[test]
    fn test_hosted_placement_requires_config() {
        let account = MerchantAccount::new(ShopId::new("42"), Utc::now());
        let result = storage_placement(&account, None, &codec(), "book.pdf");
        assert!(matches!(result, Err(ProductError::HostedStorageMissing)));
    }

    #[test]
    fn test_variant_record_starts_version_history() {
        let now = Utc::now();
        let variant = CreatedVariant {
            id: VariantGid::new("gid://shopify/ProductVariant/7"),
            inventory_item: IdNode {
                id: "gid://shopify/InventoryItem/8".to_string(),
            },
            price: Some("9.99".to_string()),
            compare_at_price: None,
            taxable: true,
            sku: None,
            barcode: None,
        };
        let file = FileInfo {
            name: "book.pdf".to_string(),
            original_name: "book.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: 10,
            etag: Some("\"abc\"".to_string()),
        };

        let record = variant_record(
            variant,
            &ProductGid::new("gid://shopify/Product/5"),
            &ShopId::new("42"),
            "product-key".to_string(),
            file.clone(),
            now,
        );

        assert_eq!(record.shopify_product_id, "5");
        assert_eq!(record.shopify_variant_id, "gid://shopify/ProductVariant/7");
        assert_eq!(record.file_version_history.len(), 1);
        assert_eq!(record.file_version_history.first().unwrap().file, file);
        assert_eq!(record.product_id, "product-key");
    }

    #[test]
    fn test_failed_outcome_json() {
        let value = serde_json::to_value(AddProductOutcome::failed()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"action": "addNewDigitalProduct", "success": false})
        );
    }
}
