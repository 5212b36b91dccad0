//! Kafka 消息入队
//!
//! 以 `conversation_id` 作为分区键:同会话消息落在同一分区,
//! 消费组扩容时仍保持会话内顺序。生产者开启幂等,JSON 载荷。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use ripple_common::RippleResult;
use ripple_common::error::RippleError;
use ripple_common::models::Message;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::domain::MessageQueue;

pub struct KafkaMessageQueue {
    producer: FutureProducer,
    config: Arc<GatewayConfig>,
}

impl KafkaMessageQueue {
    pub fn new(config: Arc<GatewayConfig>) -> anyhow::Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_bootstrap)
            .set("message.timeout.ms", config.kafka_timeout_ms.to_string())
            .set("enable.idempotence", "true")
            .create()
            .context("failed to build kafka producer")?;
        Ok(Self { producer, config })
    }
}

#[async_trait]
impl MessageQueue for KafkaMessageQueue {
    async fn enqueue(&self, message: &Message) -> RippleResult<()> {
        let payload = serde_json::to_vec(message)
            .map_err(|err| RippleError::PersistenceFailure(err.to_string()))?;

        let record = FutureRecord::to(&self.config.kafka_topic)
            .payload(&payload)
            .key(&message.conversation_id);

        self.producer
            .send(record, Duration::from_millis(self.config.kafka_timeout_ms))
            .await
            .map_err(|(err, _)| RippleError::PersistenceFailure(err.to_string()))?;

        debug!(
            message_id = %message.id,
            conversation_id = %message.conversation_id,
            topic = %self.config.kafka_topic,
            "message enqueued to kafka"
        );
        Ok(())
    }
}
