use std::sync::Arc;

use crate::error::Result;
use crate::models::mode::ModeMetrics;
use crate::storage::kv::{KeyValueStore, keys, read_or_default, write_json};

/// Per-mode usage metrics, merged into the store on every stop
#[derive(Clone)]
pub struct ModeMetricsStore {
    store: Arc<dyn KeyValueStore>,
}

impl ModeMetricsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, mode_id: &str) -> ModeMetrics {
        let mut metrics: ModeMetrics =
            read_or_default(self.store.as_ref(), &keys::mode_metrics(mode_id)).await;
        if metrics.mode_id.is_empty() {
            metrics.mode_id = mode_id.to_string();
        }
        metrics
    }

    /// Read, merge `delta`, write back
    pub async fn record(&self, delta: &ModeMetrics) -> Result<ModeMetrics> {
        let mut stored = self.get(&delta.mode_id).await;
        stored.merge(delta);
        write_json(
            self.store.as_ref(),
            &keys::mode_metrics(&delta.mode_id),
            &stored,
        )
        .await?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn test_record_merges_instead_of_overwriting() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &keys::mode_metrics("quiz"),
                json!({"mode_id": "quiz", "sessions_run": 4, "total_active_ms": 900, "interactions": 12}),
            )
            .await
            .unwrap();
        let metrics = ModeMetricsStore::new(store);

        let merged = metrics
            .record(&ModeMetrics {
                mode_id: "quiz".into(),
                sessions_run: 1,
                total_active_ms: 100,
                last_used: Some(Utc::now()),
                interactions: 3,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(merged.sessions_run, 5);
        assert_eq!(merged.total_active_ms, 1_000);
        assert_eq!(merged.interactions, 15);
        assert!(merged.last_used.is_some());
        assert_eq!(metrics.get("quiz").await, merged);
    }

    #[tokio::test]
    async fn test_unknown_mode_has_zero_metrics() {
        let metrics = ModeMetricsStore::new(Arc::new(MemoryStore::new()));
        let m = metrics.get("flashcard").await;
        assert_eq!(m.mode_id, "flashcard");
        assert_eq!(m.sessions_run, 0);
    }
}
