use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AppError, Result};
use crate::models::vocabulary::{Tier, VocabularyItem};

/// 会话 ID 分隔符：`{category_id}:{number}`
pub const SESSION_ID_SEPARATOR: char = ':';

/// 学习会话
///
/// 由词库和会话大小派生，从不修改；对同一输入重新计算结果完全一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// 所属分类
    pub category_id: String,

    /// 会话序号（从 1 开始，连续）
    pub number: usize,

    /// 本会话的词条（按等级、再按原文排序）
    pub items: Vec<VocabularyItem>,

    /// 等级分布
    pub tier_distribution: BTreeMap<Tier, usize>,

    /// 主等级：词条最多的等级，并列时取较低等级
    pub primary_tier: Tier,

    /// 等级范围标签，例如 `"2"` 或 `"1-3"`
    pub tier_range: String,
}

impl Session {
    /// 会话 ID
    pub fn id(&self) -> String {
        session_id(&self.category_id, self.number)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    /// 生成挂载到模式输入上的会话元数据
    pub fn info(&self, total_sessions: usize) -> SessionInfo {
        SessionInfo {
            session_id: self.id(),
            category_id: self.category_id.clone(),
            number: self.number,
            total_sessions,
            tier_range: self.tier_range.clone(),
            primary_tier: self.primary_tier,
        }
    }
}

/// 会话元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub category_id: String,
    pub number: usize,
    /// 该分类的会话总数
    pub total_sessions: usize,
    pub tier_range: String,
    pub primary_tier: Tier,
}

/// 拼接会话 ID
pub fn session_id(category_id: &str, number: usize) -> String {
    format!("{}{}{}", category_id, SESSION_ID_SEPARATOR, number)
}

/// 拆分会话 ID 为 (分类, 序号)
///
/// 分类 ID 本身可以包含分隔符，只按最后一个分隔符拆分。
pub fn parse_session_id(session_id: &str) -> Result<(&str, usize)> {
    let (category, number) = session_id
        .rsplit_once(SESSION_ID_SEPARATOR)
        .ok_or_else(|| AppError::InvalidArgument(format!("Malformed session id: {}", session_id)))?;

    let number: usize = number
        .parse()
        .map_err(|_| AppError::InvalidArgument(format!("Malformed session id: {}", session_id)))?;

    if category.is_empty() || number == 0 {
        return Err(AppError::InvalidArgument(format!(
            "Malformed session id: {}",
            session_id
        )));
    }

    Ok((category, number))
}
