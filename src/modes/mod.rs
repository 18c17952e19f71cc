//! 学习模式模块
//!
//! 模式注册表、生命周期管理器、事件总线以及内置模式。

pub mod builtin;
pub mod events;
pub mod manager;
pub mod metrics;
pub mod recommend;
pub mod registry;
pub mod surface;
pub mod unit;

pub use builtin::register_builtin_modes;
pub use events::{EventBus, EventSubscriber, ModeEvent, SubscriptionTopic};
pub use manager::{CAPABILITY_SPACED_REPETITION, Capability, ManagerBuilder, ModeLifecycleManager};
pub use metrics::ModeMetricsStore;
pub use recommend::recommend_next;
pub use registry::ModeRegistry;
pub use surface::{NullSurface, RecordingSurface, Surface};
pub use unit::{LearningModeUnit, ModeBase, ModeContext, ModeFactory};
