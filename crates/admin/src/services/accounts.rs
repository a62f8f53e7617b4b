//! Merchant account bootstrap.

use chrono::Utc;
use tracing::{info, instrument};

use digiful_core::{ShopDomain, ShopId};

use crate::db::{MerchantStore, RepositoryError};
use crate::models::MerchantAccount;
use crate::shopify::ShopInfo;

/// Load the merchant for `shop`, creating an active account on first visit.
///
/// Concurrent first visits are safe: the insert is skipped when another
/// request created the document first, and the stored one is returned.
///
/// # Errors
///
/// Returns `RepositoryError` if the store fails.
#[instrument(skip(store, info), fields(shop = %shop))]
pub async fn ensure_account(
    store: &dyn MerchantStore,
    shop: &ShopDomain,
    info: &ShopInfo,
) -> Result<MerchantAccount, RepositoryError> {
    let shop_id = ShopId::from_gid(&info.id);
    if let Some(account) = store.find(&shop_id).await? {
        return Ok(account);
    }

    let mut account = MerchantAccount::new(shop_id.clone(), Utc::now());
    account.shop_name = Some(info.name.clone());
    account.shop_slug = Some(shop.slug().to_string());
    account.currency_code.clone_from(&info.currency_code);
    account.currency_format = info.money_format().map(str::to_string);

    if store.insert(&account).await? {
        info!(shop_id = %shop_id, "Merchant account created");
        return Ok(account);
    }

    store.find(&shop_id).await?.ok_or(RepositoryError::NotFound)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use digiful_core::AccountStatus;

    use super::*;
    use crate::db::MemoryMerchantStore;
    use crate::shopify::CurrencyFormats;

    fn info() -> ShopInfo {
        ShopInfo {
            id: "gid://shopify/Shop/77190234190".to_string(),
            name: "Pixel Press".to_string(),
            currency_code: Some("CAD".to_string()),
            currency_formats: Some(CurrencyFormats {
                money_format: Some("${{amount}} CAD".to_string()),
            }),
        }
    }

    #[tokio::test]
    async fn test_creates_account_on_first_visit() {
        let store = MemoryMerchantStore::new();
        let shop = ShopDomain::parse("pixel-press.myshopify.com").unwrap();

        let account = ensure_account(&store, &shop, &info()).await.unwrap();

        assert_eq!(account.shop_id.as_str(), "77190234190");
        assert_eq!(account.account_status, AccountStatus::Active);
        assert_eq!(account.shop_slug.as_deref(), Some("pixel-press"));
        assert_eq!(account.currency_code.as_deref(), Some("CAD"));
        let raw = store.raw(&account.shop_id).await.unwrap();
        assert_eq!(raw["currencyFormat"], "${{amount}} CAD");
    }

    #[tokio::test]
    async fn test_existing_account_is_untouched() {
        let store = MemoryMerchantStore::new();
        let shop = ShopDomain::parse("pixel-press.myshopify.com").unwrap();
        let shop_id = ShopId::new("77190234190");
        store
            .insert(&MerchantAccount::new(shop_id.clone(), Utc::now()))
            .await
            .unwrap();
        store.record_plan_name(&shop_id, "HostedBasic").await.unwrap();

        let account = ensure_account(&store, &shop, &info()).await.unwrap();

        assert_eq!(account.plan.unwrap().plan_name, "HostedBasic");
        assert!(account.shop_name.is_none());
    }
}
