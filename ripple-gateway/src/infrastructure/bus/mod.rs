//! 扇出总线实现

pub mod in_memory;
pub mod redis;

pub use in_memory::InMemoryFanoutBus;
pub use redis::RedisFanoutBus;
