//! In-memory merchant store for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use digiful_core::ShopId;

use super::{RepositoryError, document::split_path, merchants::MerchantStore};
use crate::models::MerchantAccount;

/// Set `value` at `segments` inside `target`, creating parent objects.
///
/// Non-object parents are replaced by objects, matching the PostgreSQL
/// `digiful.jsonb_set_deep` function.
pub fn set_json_path(target: &mut Value, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *target = value;
        return;
    };

    let mut current = target;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.clone(), value);
    }
}

/// Remove the value at `segments`. Missing paths are a no-op.
pub fn unset_json_path(target: &mut Value, segments: &[String]) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = target;
    for segment in parents {
        match current.get_mut(segment.as_str()) {
            Some(next) => current = next,
            None => return,
        }
    }

    if let Value::Object(map) = current {
        map.remove(last.as_str());
    }
}

/// Merchant documents held as raw JSON, like the PostgreSQL store.
#[derive(Debug, Default)]
pub struct MemoryMerchantStore {
    documents: RwLock<HashMap<ShopId, Value>>,
}

impl MemoryMerchantStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw document body, for assertions on exact stored shape.
    pub async fn raw(&self, shop_id: &ShopId) -> Option<Value> {
        self.documents.read().await.get(shop_id).cloned()
    }
}

#[async_trait]
impl MerchantStore for MemoryMerchantStore {
    async fn find(&self, shop_id: &ShopId) -> Result<Option<MerchantAccount>, RepositoryError> {
        let documents = self.documents.read().await;
        documents
            .get(shop_id)
            .map(|body| {
                serde_json::from_value(body.clone())
                    .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
            })
            .transpose()
    }

    async fn insert(&self, account: &MerchantAccount) -> Result<bool, RepositoryError> {
        let body = serde_json::to_value(account)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let mut documents = self.documents.write().await;
        if documents.contains_key(&account.shop_id) {
            return Ok(false);
        }
        documents.insert(account.shop_id.clone(), body);
        Ok(true)
    }

    async fn set_path(
        &self,
        shop_id: &ShopId,
        path: &str,
        value: Value,
    ) -> Result<(), RepositoryError> {
        let segments = split_path(path)?;
        let mut documents = self.documents.write().await;
        let body = documents.get_mut(shop_id).ok_or(RepositoryError::NotFound)?;
        set_json_path(body, &segments, value);
        Ok(())
    }

    async fn unset_path(&self, shop_id: &ShopId, path: &str) -> Result<(), RepositoryError> {
        let segments = split_path(path)?;
        let mut documents = self.documents.write().await;
        let body = documents.get_mut(shop_id).ok_or(RepositoryError::NotFound)?;
        unset_json_path(body, &segments);
        Ok(())
    }
}
