//! 键值存储接口
//!
//! 引擎只通过 `get` / `set` 访问外部持久化存储，值为 JSON。

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// 引擎使用的存储键
pub mod keys {
    /// 复习记录表
    pub const REVIEW_RECORDS: &str = "review_records";
    /// 已完成会话列表
    pub const COMPLETED_SESSIONS: &str = "completed_sessions";
    /// 模式指标前缀
    pub const MODE_METRICS_PREFIX: &str = "mode_metrics:";

    pub fn mode_metrics(mode_id: &str) -> String {
        format!("{}{}", MODE_METRICS_PREFIX, mode_id)
    }
}

/// 键值存储 trait
///
/// 共享存储，后写覆盖先写。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 读取值，不存在时返回 `None`
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// 写入值
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// 删除值，返回是否存在
    async fn remove(&self, key: &str) -> Result<bool>;
}

/// 容错读取：缺失、读取失败或格式损坏都视为默认值
pub async fn read_or_default<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match store.get(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Corrupt value under key {}, using defaults: {}", key, e);
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!("Store read failed for key {}, using defaults: {}", key, e);
            T::default()
        }
    }
}

/// 序列化后写入
pub async fn write_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_value(value)?;
    tracing::debug!("Writing key {}", key);
    store.set(key, json).await
}
