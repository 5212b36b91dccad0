//! 在线状态注册表实现

pub mod in_memory;
pub mod redis;

pub use in_memory::InMemoryPresenceRegistry;
pub use redis::RedisPresenceRegistry;
