//! 学习模式数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::models::review::Difficulty;
use crate::models::session::SessionInfo;
use crate::models::vocabulary::VocabularyItem;

/// 模式描述
///
/// 注册后不可局部修改；重新注册会整体替换。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeDescriptor {
    /// 模式唯一标识
    pub id: String,
    /// 显示名称
    pub label: String,
    /// 启动时必须可解析的能力名称
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// 默认绘制表面名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_surface: Option<String>,
    /// 是否启用
    pub enabled: bool,
}

impl ModeDescriptor {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            dependencies: Vec::new(),
            default_surface: None,
            enabled: true,
        }
    }

    pub fn with_dependency(mut self, dependency: &str) -> Self {
        self.dependencies.push(dependency.to_string());
        self
    }

    pub fn with_surface(mut self, surface: &str) -> Self {
        self.default_surface = Some(surface.to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// 模式输入数据
///
/// 调用方通常只给出 `session_id` 或 `category_id`，由生命周期管理器展开为具体词条。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default)]
    pub words: Vec<VocabularyItem>,
    /// 展开会话后挂载的元数据
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionInfo>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ModeData {
    pub fn for_session(session_id: &str) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            ..Default::default()
        }
    }

    pub fn for_category(category_id: &str) -> Self {
        Self {
            category_id: Some(category_id.to_string()),
            ..Default::default()
        }
    }

    pub fn with_words(words: Vec<VocabularyItem>) -> Self {
        Self {
            words,
            ..Default::default()
        }
    }
}

/// 切换模式时保存的状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    /// 产生该状态的模式
    pub mode_id: String,
    pub state: Value,
}

/// 模式启动选项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeOptions {
    /// 覆盖描述中的默认绘制表面
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface: Option<String>,
    /// 上一个模式的状态（由 switch 填充）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<SavedState>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub settings: Map<String, Value>,
}

/// 用户交互
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ModeAction {
    /// 翻面
    Flip,
    Next,
    Previous,
    /// 对当前词条评价
    Rate { difficulty: Difficulty },
    /// 选择题作答（选项下标）
    Answer { choice: usize },
}

/// 交互结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeOutcome {
    Continue,
    Answered { correct: bool },
    /// 没有更多词条，模式已发出 sessionEnded
    Finished,
    /// 当前模式不处理该交互
    Ignored,
}

/// 单个模式实例的使用情况
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeUsage {
    pub interactions: u64,
    pub items_seen: u64,
    pub ratings: u64,
}

/// 按模式累计的使用指标（持久化）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeMetrics {
    pub mode_id: String,
    pub sessions_run: u64,
    pub total_active_ms: u64,
    pub last_used: Option<DateTime<Utc>>,
    pub interactions: u64,
    /// 模式自报的已展示词条数
    pub items_seen: u64,
    /// 模式自报的评价次数
    pub ratings: u64,
}

impl ModeMetrics {
    pub fn new(mode_id: &str) -> Self {
        Self {
            mode_id: mode_id.to_string(),
            ..Default::default()
        }
    }

    /// 合并一次运行的增量
    pub fn merge(&mut self, delta: &ModeMetrics) {
        self.sessions_run += delta.sessions_run;
        self.total_active_ms += delta.total_active_ms;
        self.interactions += delta.interactions;
        self.items_seen += delta.items_seen;
        self.ratings += delta.ratings;
        self.last_used = match (self.last_used, delta.last_used) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

/// 生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LifecycleState {
    #[default]
    Idle,
    Starting,
    Active,
    Stopping,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Starting => "starting",
            LifecycleState::Active => "active",
            LifecycleState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// 推荐结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub mode_id: String,
    pub reason: String,
}
