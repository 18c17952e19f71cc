//! 存储工厂模块
//!
//! 根据配置创建相应的键值存储实例。

use crate::config::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::storage::file::FileStore;
use crate::storage::kv::KeyValueStore;
use crate::storage::memory::MemoryStore;
use std::sync::Arc;

/// 存储工厂
pub struct StoreFactory;

impl StoreFactory {
    /// 根据配置创建存储实例
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
        match config.backend {
            StorageBackend::Memory => {
                tracing::info!("Using in-memory store");
                Ok(Arc::new(MemoryStore::new()))
            }
            StorageBackend::File => {
                tracing::info!("Using file store at {}", config.data_dir.display());
                let store = FileStore::open(&config.data_dir).await?;
                Ok(Arc::new(store))
            }
        }
    }

    /// 检查存储是否可用
    pub async fn health_check(store: &dyn KeyValueStore) -> Result<bool> {
        const HEALTH_KEY: &str = "__health_check";
        store.set(HEALTH_KEY, serde_json::json!(1)).await?;
        let ok = store.get(HEALTH_KEY).await?.is_some();
        store.remove(HEALTH_KEY).await?;
        Ok(ok)
    }
}
