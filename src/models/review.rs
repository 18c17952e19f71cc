//! 复习记录模型

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// 用户对词条的难度评价
///
/// 排序：Hard < Medium < Easy，越难复习越早。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Hard,
    Medium,
    Easy,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Hard, Difficulty::Medium, Difficulty::Easy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Hard => "hard",
            Difficulty::Medium => "medium",
            Difficulty::Easy => "easy",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hard" => Ok(Difficulty::Hard),
            "medium" => Ok(Difficulty::Medium),
            "easy" => Ok(Difficulty::Easy),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown difficulty: {}",
                other
            ))),
        }
    }
}

/// 单次评价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub difficulty: Difficulty,
    pub rated_at: DateTime<Utc>,
}

/// 复习记录
///
/// 首次评价时创建，之后每次评价原地更新，只有显式重置才会删除。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub item_id: String,
    /// 最近一次评价
    pub difficulty: Difficulty,
    pub last_reviewed: DateTime<Utc>,
    pub next_due: DateTime<Utc>,
    pub rating_count: u32,
    /// 评价历史（只追加）
    #[serde(default)]
    pub history: Vec<RatingEntry>,
}

impl ReviewRecord {
    pub fn new(item_id: &str, difficulty: Difficulty, now: DateTime<Utc>, interval: Duration) -> Self {
        Self {
            item_id: item_id.to_string(),
            difficulty,
            last_reviewed: now,
            next_due: now + interval,
            rating_count: 1,
            history: vec![RatingEntry {
                difficulty,
                rated_at: now,
            }],
        }
    }

    /// 记录新的评价
    ///
    /// `last_reviewed` 不会倒退，即使时钟回拨。
    pub fn apply(&mut self, difficulty: Difficulty, now: DateTime<Utc>, interval: Duration) {
        let reviewed_at = now.max(self.last_reviewed);
        self.difficulty = difficulty;
        self.last_reviewed = reviewed_at;
        self.next_due = reviewed_at + interval;
        self.rating_count += 1;
        self.history.push(RatingEntry {
            difficulty,
            rated_at: reviewed_at,
        });
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_due <= now
    }
}

/// 单个难度桶的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStats {
    pub total: usize,
    pub due: usize,
    /// 未来窗口内到期（不含已到期）
    pub upcoming_within_24h: usize,
}

/// `due` 查询的难度过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DueFilter {
    #[default]
    All,
    Only(Difficulty),
}

impl DueFilter {
    pub fn matches(&self, difficulty: Difficulty) -> bool {
        match self {
            DueFilter::All => true,
            DueFilter::Only(d) => *d == difficulty,
        }
    }
}

impl FromStr for DueFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(DueFilter::All)
        } else {
            s.parse().map(DueFilter::Only)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_never_moves_backwards() {
        let t0 = Utc::now();
        let mut record = ReviewRecord::new("w1", Difficulty::Easy, t0, Duration::days(7));

        let earlier = t0 - Duration::hours(5);
        record.apply(Difficulty::Hard, earlier, Duration::days(1));

        assert_eq!(record.last_reviewed, t0);
        assert_eq!(record.next_due, t0 + Duration::days(1));
        assert_eq!(record.rating_count, 2);
        assert_eq!(record.history.len(), 2);
    }

    #[test]
    fn test_due_filter_parse() {
        assert_eq!("all".parse::<DueFilter>().unwrap(), DueFilter::All);
        assert_eq!(
            "Hard".parse::<DueFilter>().unwrap(),
            DueFilter::Only(Difficulty::Hard)
        );
        assert!("brutal".parse::<DueFilter>().is_err());
    }
}
