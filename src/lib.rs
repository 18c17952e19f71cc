//! Mnemos - 词汇学习会话与复习调度引擎
//!
//! 将词库按难度切分为固定大小的学习会话，按用户评价安排复习，
//! 并管理同一时间只有一个处于活动状态的学习模式。

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod modes;
pub mod observability;
pub mod services;
pub mod storage;

pub use engine::Engine;
pub use error::{AppError, Result};
