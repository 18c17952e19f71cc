//! 词汇数据模型
//!
//! 词库由外部提供，引擎只读。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{AppError, Result};

/// 难度等级
///
/// 有序枚举：等级 1 最基础，数值越大越难。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tier(pub u8);

impl Tier {
    pub fn new(level: u8) -> Self {
        Tier(level)
    }

    pub fn level(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 词条
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
    /// 稳定标识
    pub id: String,
    /// 原文
    pub text: String,
    /// 译文
    pub translation: String,
    /// 发音提示
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    /// 难度等级
    pub tier: Tier,
}

impl VocabularyItem {
    pub fn new(id: &str, text: &str, translation: &str, tier: u8) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            translation: translation.to_string(),
            pronunciation: None,
            tier: Tier(tier),
        }
    }

    pub fn with_pronunciation(mut self, pronunciation: &str) -> Self {
        self.pronunciation = Some(pronunciation.to_string());
        self
    }
}

/// 词库分类
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub items: Vec<VocabularyItem>,
}

/// 词库
///
/// JSON 形如 `{ "categories": { "<id>": { "items": [...] } } }`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyCorpus {
    #[serde(default)]
    pub categories: BTreeMap<String, Category>,
}

impl VocabularyCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加分类（同名分类被替换）
    pub fn with_category(mut self, category_id: &str, items: Vec<VocabularyItem>) -> Self {
        self.categories.insert(
            category_id.to_string(),
            Category {
                label: None,
                items,
            },
        );
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Io(format!("{}: {}", path.display(), e)))?;
        let corpus = Self::from_json_str(&content)?;
        tracing::info!(
            "Loaded vocabulary corpus from {}: {} categories, {} items",
            path.display(),
            corpus.categories.len(),
            corpus.item_count()
        );
        Ok(corpus)
    }

    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories.get(category_id)
    }

    pub fn category_ids(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(|k| k.as_str())
    }

    /// 按 ID 查找词条（跨分类）
    pub fn find_item(&self, item_id: &str) -> Option<&VocabularyItem> {
        self.categories
            .values()
            .flat_map(|c| c.items.iter())
            .find(|item| item.id == item_id)
    }

    pub fn item_count(&self) -> usize {
        self.categories.values().map(|c| c.items.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_from_json() {
        let json = r#"{
            "categories": {
                "greetings": {
                    "label": "Greetings",
                    "items": [
                        {"id": "w1", "text": "hola", "translation": "hello", "tier": 1},
                        {"id": "w2", "text": "adiós", "translation": "goodbye", "pronunciation": "a-DYOS", "tier": 2}
                    ]
                }
            }
        }"#;

        let corpus = VocabularyCorpus::from_json_str(json).unwrap();

        assert_eq!(corpus.item_count(), 2);
        let item = corpus.find_item("w2").unwrap();
        assert_eq!(item.tier, Tier(2));
        assert_eq!(item.pronunciation.as_deref(), Some("a-DYOS"));
        assert_eq!(
            corpus.category("greetings").unwrap().label.as_deref(),
            Some("Greetings")
        );
    }

    #[test]
    fn test_corpus_rejects_malformed_json() {
        let err = VocabularyCorpus::from_json_str("{\"categories\": 3}").unwrap_err();
        assert_eq!(err.code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier(1) < Tier(2));
        assert_eq!(Tier(3).to_string(), "3");
    }
}
