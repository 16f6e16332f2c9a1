// In-memory asset store: blobs and links in HashMaps. The failing
// constructor exists for exercising the photo-failure path in tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use social_broker::stores::{AssetRef, AssetStore};
use social_broker_core::error::{BrokerError, Result};

/// A recorded asset-to-user link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLink {
    pub asset: AssetRef,
    pub user_id: i64,
    pub field_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    links: Arc<RwLock<Vec<AssetLink>>>,
    fail_puts: bool,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `put` always fails.
    pub fn failing() -> Self {
        Self {
            fail_puts: true,
            ..Default::default()
        }
    }

    pub async fn blob_count(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn links(&self) -> Vec<AssetLink> {
        self.links.read().await.clone()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn put(&self, content: &[u8], suggested_name: &str) -> Result<AssetRef> {
        if self.fail_puts {
            return Err(BrokerError::Asset("asset store is unavailable".into()));
        }
        self.blobs
            .write()
            .await
            .insert(suggested_name.to_string(), content.to_vec());
        Ok(AssetRef(suggested_name.to_string()))
    }

    async fn link(&self, asset: &AssetRef, user_id: i64, field_name: &str) -> Result<()> {
        self.links.write().await.push(AssetLink {
            asset: asset.clone(),
            user_id,
            field_name: field_name.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_and_link_round_trip() {
        let store = MemoryAssetStore::new();
        let asset = store.put(b"jpegbytes", "google_1.jpg").await.unwrap();
        assert_eq!(asset, AssetRef("google_1.jpg".into()));
        store.link(&asset, 7, "image").await.unwrap();

        assert_eq!(store.blob_count().await, 1);
        let links = store.links().await;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].user_id, 7);
        assert_eq!(links[0].field_name, "image");
    }

    #[tokio::test]
    async fn failing_store_rejects_puts() {
        let store = MemoryAssetStore::failing();
        let err = store.put(b"x", "n.jpg").await.unwrap_err();
        assert!(matches!(err, BrokerError::Asset(_)));
    }
}
