use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 会话划分配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// 每个学习会话的词条数量
    pub page_size: usize,
    /// 词库 JSON 文件路径
    pub corpus_path: PathBuf,
}

/// 间隔复习配置
///
/// 只有顺序是硬性要求：困难 <= 一般 <= 简单。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReviewConfig {
    /// 评为困难后的复习间隔（小时）
    pub hard_interval_hours: i64,
    /// 评为一般后的复习间隔（小时）
    pub medium_interval_hours: i64,
    /// 评为简单后的复习间隔（小时）
    pub easy_interval_hours: i64,
    /// 统计"即将到期"的时间窗口（小时）
    pub upcoming_window_hours: i64,
}

/// 存储后端类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 进程内存储
    #[default]
    Memory,
    /// 每个键一个 JSON 文件
    File,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// 存储后端
    pub backend: StorageBackend,
    /// 文件存储目录
    pub data_dir: PathBuf,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

/// 学习模式推荐配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RecommendationConfig {
    /// 已学词条低于该值时推荐入门模式
    pub intro_threshold: usize,
    /// 复习模式 ID
    pub review_mode: String,
    /// 入门模式 ID
    pub intro_mode: String,
    /// 测验模式 ID
    pub quiz_mode: String,
}

/// 事件总线配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EventConfig {
    /// 广播通道容量
    pub capacity: usize,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 会话划分配置
    pub session: SessionConfig,
    /// 间隔复习配置
    pub review: ReviewConfig,
    /// 存储配置
    pub storage: StorageConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 推荐配置
    pub recommendation: RecommendationConfig,
    /// 事件总线配置
    pub events: EventConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            session: SessionConfig {
                page_size: 10,
                corpus_path: PathBuf::from("./data/vocabulary.json"),
            },
            review: ReviewConfig {
                hard_interval_hours: 24,
                medium_interval_hours: 3 * 24,
                easy_interval_hours: 7 * 24,
                upcoming_window_hours: 24,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                data_dir: PathBuf::from("./data/store"),
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            recommendation: RecommendationConfig {
                intro_threshold: 10,
                review_mode: "review".into(),
                intro_mode: "flashcard".into(),
                quiz_mode: "quiz".into(),
            },
            events: EventConfig { capacity: 64 },
            app_name: "mnemos".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.storage.backend = StorageBackend::File;
        config
    }
}
