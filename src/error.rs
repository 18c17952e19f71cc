//! 错误处理模块
//!
//! 定义引擎的错误类型，以及随 `modeError` 事件广播的错误负载。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// 资源不存在（未知的模式、会话或分类）
    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 模式已注册但被禁用
    #[error("模式已禁用: {0}")]
    Disabled(String),

    /// 模式声明的依赖无法满足
    #[error("模式 {mode_id} 的依赖未满足: {dependency}")]
    DependencyUnmet { mode_id: String, dependency: String },

    /// 模式初始化时缺少必要的输入字段
    #[error("模式 {mode_id} 缺少必要数据: {}", .fields.join(", "))]
    MissingData { mode_id: String, fields: Vec<String> },

    /// 参数无效
    #[error("参数无效: {0}")]
    InvalidArgument(String),

    /// 持久化存储不可用
    #[error("存储不可用: {0}")]
    StoreUnavailable(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AppError {
    /// 稳定的机器可读错误代码
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Disabled(_) => "DISABLED",
            AppError::DependencyUnmet { .. } => "DEPENDENCY_UNMET",
            AppError::MissingData { .. } => "MISSING_DATA",
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

/// 错误负载
///
/// `modeError` 事件携带的可序列化错误描述，供被动观察者（例如回退到旧界面的处理器）使用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,
    /// 错误消息
    pub message: String,
    /// 详细信息
    pub details: Option<String>,
}

impl ErrorResponse {
    /// 创建新错误负载
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    /// 添加详细信息
    pub fn with_details(mut self, details: &str) -> Self {
        self.details = Some(details.to_string());
        self
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let response = ErrorResponse::new(err.code(), &err.to_string());
        match err {
            AppError::DependencyUnmet { dependency, .. } => response.with_details(dependency),
            AppError::MissingData { fields, .. } => response.with_details(&fields.join(",")),
            _ => response,
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;
