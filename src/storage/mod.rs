//! 存储层模块
//!
//! 外部键值存储的抽象，以及内存和文件两种实现。

pub mod factory;
pub mod file;
pub mod kv;
pub mod memory;

pub use factory::StoreFactory;
pub use file::FileStore;
pub use kv::{KeyValueStore, keys};
pub use memory::MemoryStore;
