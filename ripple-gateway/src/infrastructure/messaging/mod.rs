//! 持久化摄入队列生产侧实现

pub mod in_memory;
pub mod kafka_producer;

pub use in_memory::InMemoryMessageQueue;
pub use kafka_producer::KafkaMessageQueue;
