//! 会话进度服务
//!
//! 记录哪些会话已完成。对存储只做薄封装：读取失败或数据损坏都视为"尚无进度"。

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::progress::{CompletionRecord, Progress};
use crate::models::session::{Session, parse_session_id};
use crate::models::vocabulary::VocabularyCorpus;
use crate::services::clock::Clock;
use crate::services::partitioner::DifficultyPartitioner;
use crate::storage::kv::{KeyValueStore, keys, read_or_default, write_json};

pub struct SessionProgressStore {
    store: Arc<dyn KeyValueStore>,
    corpus: Arc<VocabularyCorpus>,
    partitioner: DifficultyPartitioner,
    clock: Arc<dyn Clock>,
}

impl SessionProgressStore {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        corpus: Arc<VocabularyCorpus>,
        partitioner: DifficultyPartitioner,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            corpus,
            partitioner,
            clock,
        }
    }

    async fn load(&self) -> Vec<CompletionRecord> {
        read_or_default(self.store.as_ref(), keys::COMPLETED_SESSIONS).await
    }

    pub async fn is_completed(&self, session_id: &str) -> bool {
        self.load()
            .await
            .iter()
            .any(|record| record.session_id == session_id)
    }

    /// 标记会话完成；已完成的会话保持原记录不变
    pub async fn mark_completed(&self, session_id: &str, item_ids: &[String]) -> Result<()> {
        let (category_id, _) = parse_session_id(session_id)?;

        let mut records = self.load().await;
        if records.iter().any(|record| record.session_id == session_id) {
            tracing::debug!("Session {} already completed", session_id);
            return Ok(());
        }

        records.push(CompletionRecord {
            session_id: session_id.to_string(),
            category_id: category_id.to_string(),
            completed_at: self.clock.now(),
            item_ids: item_ids.to_vec(),
        });
        write_json(self.store.as_ref(), keys::COMPLETED_SESSIONS, &records).await?;

        tracing::info!("Session {} marked completed", session_id);
        Ok(())
    }

    /// 已完成会话 ID（按完成顺序），可按分类过滤
    pub async fn completed_session_ids(&self, category_id: Option<&str>) -> Vec<String> {
        self.load()
            .await
            .into_iter()
            .filter(|record| category_id.is_none_or(|c| record.category_id == c))
            .map(|record| record.session_id)
            .collect()
    }

    pub async fn completion_records(&self) -> Vec<CompletionRecord> {
        self.load().await
    }

    /// 分类进度；总数由当前词库和会话大小推算
    pub async fn progress_for(&self, category_id: &str) -> Result<Progress> {
        let category = self
            .corpus
            .category(category_id)
            .ok_or_else(|| AppError::NotFound(format!("Category not found: {}", category_id)))?;
        let total = self.partitioner.session_count(category.items.len());

        let completed = self
            .completed_session_ids(Some(category_id))
            .await
            .iter()
            .filter_map(|id| parse_session_id(id).ok())
            .filter(|(_, number)| *number <= total)
            .count();

        Ok(Progress::new(completed, total))
    }

    /// 分类中第一个未完成的会话
    pub async fn next_session(&self, category_id: &str) -> Result<Option<Session>> {
        let category = self
            .corpus
            .category(category_id)
            .ok_or_else(|| AppError::NotFound(format!("Category not found: {}", category_id)))?;

        let completed = self.completed_session_ids(Some(category_id)).await;
        Ok(self
            .partitioner
            .partition(category_id, &category.items)
            .into_iter()
            .find(|session| !completed.contains(&session.id())))
    }
}
