//! Redis Pub/Sub 扇出总线
//!
//! 投递语义继承自 Redis Pub/Sub:至多一次,无回放。订阅建立前
//! 发布的事件对该订阅者丢失,这对在线状态与输入中信号是可接受的。

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use redis::{AsyncCommands, aio::ConnectionManager};
use ripple_common::RippleResult;
use ripple_common::error::RippleError;

use crate::domain::{BusEvent, BusStream, FanoutBus};

pub struct RedisFanoutBus {
    client: Arc<redis::Client>,
    conn: ConnectionManager,
}

impl RedisFanoutBus {
    /// 发布走多路复用连接,订阅各自持有专用的 pubsub 连接
    pub fn new(client: Arc<redis::Client>, conn: ConnectionManager) -> Self {
        Self { client, conn }
    }
}

#[async_trait]
impl FanoutBus for RedisFanoutBus {
    async fn publish(&self, channel: &str, payload: &[u8]) -> RippleResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .publish(channel, payload)
            .await
            .map_err(|err| RippleError::DeliveryFailure(err.to_string()))?;
        Ok(())
    }

    async fn subscribe(&self, patterns: &[String]) -> RippleResult<BusStream> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .context("failed to open redis pubsub connection")?;
        for pattern in patterns {
            pubsub
                .psubscribe(pattern)
                .await
                .with_context(|| format!("failed to psubscribe to {pattern}"))?;
        }

        let stream = pubsub.into_on_message().map(|msg| BusEvent {
            channel: msg.get_channel_name().to_string(),
            payload: msg.get_payload_bytes().to_vec(),
        });
        Ok(Box::pin(stream))
    }
}
