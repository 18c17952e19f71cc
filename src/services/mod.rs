//! 服务模块

pub mod clock;
pub mod partitioner;
pub mod progress;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use partitioner::{DifficultyPartitioner, collation_key, sort_by_tier};
pub use progress::SessionProgressStore;
pub use scheduler::{IntervalPolicy, ReviewScheduler};
