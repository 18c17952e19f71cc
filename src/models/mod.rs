//! 核心数据模型模块
//!
//! 定义引擎的核心数据结构：VocabularyItem, Session, ReviewRecord,
//! CompletionRecord 以及学习模式相关的描述与指标。

pub mod mode;
pub mod progress;
pub mod review;
pub mod session;
pub mod vocabulary;

pub use mode::*;
pub use progress::*;
pub use review::*;
pub use session::*;
pub use vocabulary::*;
