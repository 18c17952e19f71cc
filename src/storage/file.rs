//! 文件存储
//!
//! 每个键对应目录下的一个 JSON 文件。

use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::storage::kv::KeyValueStore;

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("{}: {}", dir.display(), e)))?;
        tracing::debug!("File store opened at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Percent-encoded so distinct keys never share a file
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::StoreUnavailable(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let path = self.path_for(key);
        let content = serde_json::to_string_pretty(&value)?;
        // 先写临时文件再改名，避免读到半个文件
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("{}: {}", path.display(), e)))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::StoreUnavailable(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        store
            .set("mode_metrics:quiz", json!({"sessions_run": 3}))
            .await
            .unwrap();

        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.get("mode_metrics:quiz").await.unwrap(),
            Some(json!({"sessions_run": 3}))
        );
        assert!(dir.path().join("mode_metrics%3Aquiz.json").exists());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("review_records.json"), "{not json").unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        let err = store.get("review_records").await.unwrap_err();
        assert_eq!(err.code(), "SERIALIZATION_ERROR");
    }

    #[tokio::test]
    async fn test_file_store_remove_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(!store.remove("nothing").await.unwrap());
        assert_eq!(store.get("nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_keys_differing_in_punctuation_stay_apart() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        store.set("mode_metrics:a.b", json!(1)).await.unwrap();
        store.set("mode_metrics:a_b", json!(2)).await.unwrap();
        store.set("mode_metrics:a/b", json!(3)).await.unwrap();

        assert_eq!(store.get("mode_metrics:a.b").await.unwrap(), Some(json!(1)));
        assert_eq!(store.get("mode_metrics:a_b").await.unwrap(), Some(json!(2)));
        assert_eq!(store.get("mode_metrics:a/b").await.unwrap(), Some(json!(3)));

        assert!(store.remove("mode_metrics:a.b").await.unwrap());
        assert_eq!(store.get("mode_metrics:a_b").await.unwrap(), Some(json!(2)));
    }
}
