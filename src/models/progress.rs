use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 会话完成记录
///
/// 每个会话 ID 最多一条；`item_ids` 是完成时的快照，仅用于审计和复习选择。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub session_id: String,
    pub category_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub item_ids: Vec<String>,
}

/// 分类学习进度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    /// 0.0 - 100.0
    pub percentage: f64,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            (completed as f64 / total as f64 * 100.0).min(100.0)
        };
        Self {
            completed,
            total,
            percentage,
        }
    }
}

/// 推荐所需的用户学习概况
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    /// 最近一次评价为困难的词条数
    pub struggling_items: usize,
    /// 至少评价过一次的词条数
    pub learned_items: usize,
}
