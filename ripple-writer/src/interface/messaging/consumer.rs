//! Kafka 摄入消费者
//!
//! 单逻辑消费组的长驻循环:批量拉取、逐条落库、成功后才提交
//! 位点。落库失败由 [`PersistService`] 在原记录上退避重试,
//! 重试期间本循环不再拉取,即持久化契约要求的 "暂停摄入"。
//! 坏载荷无法通过重试变得可写,记录后跳过。

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rdkafka::ClientConfig;
use rdkafka::Message as _;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::BorrowedMessage;
use ripple_common::models::Message;
use tracing::{debug, error, info, warn};

use crate::application::PersistService;
use crate::config::WriterConfig;
use crate::metrics::WriterMetrics;

pub struct MessageConsumer {
    config: Arc<WriterConfig>,
    kafka_consumer: StreamConsumer,
    persist: Arc<PersistService>,
    metrics: Arc<WriterMetrics>,
}

impl MessageConsumer {
    pub fn new(
        config: Arc<WriterConfig>,
        persist: Arc<PersistService>,
        metrics: Arc<WriterMetrics>,
    ) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_bootstrap)
            .set("group.id", &config.kafka_group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .context("failed to build kafka consumer")?;

        consumer
            .subscribe(&[config.kafka_topic.as_str()])
            .context("failed to subscribe to kafka topic")?;

        info!(
            bootstrap = %config.kafka_bootstrap,
            group = %config.kafka_group,
            topic = %config.kafka_topic,
            "message consumer initialized"
        );

        Ok(Self {
            config,
            kafka_consumer: consumer,
            persist,
            metrics,
        })
    }

    /// 消费主循环,只在进程停机时退出
    pub async fn consume_messages(&self) -> Result<()> {
        info!(
            topic = %self.config.kafka_topic,
            group_id = %self.config.kafka_group,
            "starting message consumer loop"
        );

        loop {
            let mut batch = Vec::new();

            for _ in 0..self.config.max_poll_records {
                match tokio::time::timeout(
                    Duration::from_millis(self.config.fetch_max_wait_ms),
                    self.kafka_consumer.recv(),
                )
                .await
                {
                    Ok(Ok(message)) => {
                        debug!(
                            partition = message.partition(),
                            offset = message.offset(),
                            "received message from kafka"
                        );
                        batch.push(message);
                    }
                    Ok(Err(err)) => {
                        error!(error = ?err, "error receiving from kafka");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        break;
                    }
                    Err(_) => break,
                }
            }

            if batch.is_empty() {
                continue;
            }

            self.process_batch(batch).await;
        }
    }

    /// 处理一批记录:解码、按交付顺序落库、成功后提交位点
    async fn process_batch(&self, messages: Vec<BorrowedMessage<'_>>) {
        let mut records = Vec::new();
        let mut valid_messages = Vec::new();

        for message in messages {
            let payload = match message.payload() {
                Some(payload) => payload,
                None => {
                    warn!(offset = message.offset(), "kafka message without payload");
                    continue;
                }
            };

            match serde_json::from_slice::<Message>(payload) {
                Ok(record) => {
                    records.push(record);
                    valid_messages.push(message);
                }
                Err(err) => {
                    // 坏载荷重试也不会变得可写,跳过
                    self.metrics.malformed_payload_total.inc();
                    warn!(
                        offset = message.offset(),
                        partition = message.partition(),
                        error = %err,
                        "undecodable payload, skipping"
                    );
                }
            }
        }

        if records.is_empty() {
            return;
        }

        // persist_batch 内部退避重试直到每条成功,返回即可提交
        if let Err(err) = self.persist.persist_batch(&records).await {
            error!(error = %err, "unrecoverable persist error, offsets not committed");
            return;
        }

        for message in &valid_messages {
            self.commit_message(message);
        }

        debug!(
            batch_size = valid_messages.len(),
            "batch persisted and committed"
        );
    }

    fn commit_message(&self, message: &BorrowedMessage<'_>) {
        if let Err(err) = self
            .kafka_consumer
            .commit_message(message, CommitMode::Async)
        {
            warn!(error = ?err, "failed to commit kafka message");
        }
    }
}
