//! 队列消费接入

pub mod consumer;

pub use consumer::MessageConsumer;
