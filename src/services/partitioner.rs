//! 会话划分
//!
//! 把一个分类的词条按 (等级, 原文) 排序后切成固定大小的会话。
//! 纯函数：不读写存储，也不参考复习记录。

use std::cmp::Ordering;
use std::collections::BTreeMap;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::error::{AppError, Result};
use crate::models::session::{Session, parse_session_id};
use crate::models::vocabulary::{Tier, VocabularyCorpus, VocabularyItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyPartitioner {
    page_size: usize,
}

impl DifficultyPartitioner {
    /// 会话大小为 0 时返回 `InvalidArgument`
    pub fn new(page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(AppError::InvalidArgument(
                "page size must be a positive integer".to_string(),
            ));
        }
        Ok(Self { page_size })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// 划分单个分类
    pub fn partition(&self, category_id: &str, items: &[VocabularyItem]) -> Vec<Session> {
        let sorted = sort_by_tier(items);

        sorted
            .chunks(self.page_size)
            .enumerate()
            .map(|(index, chunk)| build_session(category_id, index + 1, chunk.to_vec()))
            .collect()
    }

    /// 划分整个词库
    pub fn partition_corpus(&self, corpus: &VocabularyCorpus) -> BTreeMap<String, Vec<Session>> {
        corpus
            .categories
            .iter()
            .map(|(id, category)| (id.clone(), self.partition(id, &category.items)))
            .collect()
    }

    /// 会话数量（不构造会话）
    pub fn session_count(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.page_size)
    }

    /// 按 ID 查找会话，返回会话及该分类的会话总数
    pub fn find_session(
        &self,
        corpus: &VocabularyCorpus,
        session_id: &str,
    ) -> Result<(Session, usize)> {
        let (category_id, number) = parse_session_id(session_id)
            .map_err(|_| AppError::NotFound(format!("Session not found: {}", session_id)))?;

        let category = corpus
            .category(category_id)
            .ok_or_else(|| AppError::NotFound(format!("Category not found: {}", category_id)))?;

        let mut sessions = self.partition(category_id, &category.items);
        let total = sessions.len();
        if number > total {
            return Err(AppError::NotFound(format!(
                "Session not found: {}",
                session_id
            )));
        }
        Ok((sessions.swap_remove(number - 1), total))
    }
}

/// 排序键：去掉变音符号并转为小写，使 "École" 与 "ecole" 相邻
pub fn collation_key(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn compare_items(a: &VocabularyItem, b: &VocabularyItem) -> Ordering {
    a.tier
        .cmp(&b.tier)
        .then_with(|| collation_key(&a.text).cmp(&collation_key(&b.text)))
        .then_with(|| a.text.cmp(&b.text))
        .then_with(|| a.id.cmp(&b.id))
}

/// 稳定排序：等级升序，再按原文
pub fn sort_by_tier(items: &[VocabularyItem]) -> Vec<VocabularyItem> {
    let mut sorted = items.to_vec();
    sorted.sort_by(compare_items);
    sorted
}

fn build_session(category_id: &str, number: usize, items: Vec<VocabularyItem>) -> Session {
    let mut distribution: BTreeMap<Tier, usize> = BTreeMap::new();
    for item in &items {
        *distribution.entry(item.tier).or_insert(0) += 1;
    }

    Session {
        category_id: category_id.to_string(),
        number,
        primary_tier: primary_tier(&distribution),
        tier_range: tier_range_label(&distribution),
        tier_distribution: distribution,
        items,
    }
}

/// 词条最多的等级；并列时取较低等级
fn primary_tier(distribution: &BTreeMap<Tier, usize>) -> Tier {
    let mut best: Option<(Tier, usize)> = None;
    for (tier, count) in distribution {
        match best {
            Some((_, best_count)) if *count <= best_count => {}
            _ => best = Some((*tier, *count)),
        }
    }
    best.map(|(tier, _)| tier).unwrap_or(Tier(0))
}

fn tier_range_label(distribution: &BTreeMap<Tier, usize>) -> String {
    let lowest = distribution.keys().next();
    let highest = distribution.keys().next_back();
    match (lowest, highest) {
        (Some(lo), Some(hi)) if lo == hi => lo.to_string(),
        (Some(lo), Some(hi)) => format!("{}-{}", lo, hi),
        _ => String::new(),
    }
}
