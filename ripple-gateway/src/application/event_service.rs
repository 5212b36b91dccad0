//! 客户端事件处理服务
//!
//! 持有注入的注册表/总线/队列句柄,承载 Active 状态下的全部
//! 客户端事件语义,以及认证/断开时的在线状态变更与广播。

use std::sync::Arc;

use ripple_common::RippleResult;
use ripple_common::error::RippleError;
use ripple_common::models::{Message, MessageType, PresenceSignal, TypingSignal};
use ripple_common::utils::{validate_conversation_id, validate_user_id};
use tracing::{info, warn};

use crate::domain::channels::{self, PRESENCE_CHANNEL};
use crate::domain::{FanoutBus, MessageQueue, PresenceRegistry};
use crate::metrics::GatewayMetrics;

pub struct EventService {
    presence: Arc<dyn PresenceRegistry>,
    bus: Arc<dyn FanoutBus>,
    queue: Arc<dyn MessageQueue>,
    metrics: Arc<GatewayMetrics>,
}

impl EventService {
    pub fn new(
        presence: Arc<dyn PresenceRegistry>,
        bus: Arc<dyn FanoutBus>,
        queue: Arc<dyn MessageQueue>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            presence,
            bus,
            queue,
            metrics,
        }
    }

    /// 认证成功:登记在线并广播上线事件
    pub async fn announce_online(&self, user_id: &str, connection_id: &str) -> RippleResult<()> {
        self.presence.set_online(user_id, connection_id).await?;
        let signal = PresenceSignal {
            user_id: user_id.to_string(),
            is_online: true,
        };
        self.publish_presence(&signal).await;
        info!(%user_id, %connection_id, "user connected");
        Ok(())
    }

    /// 心跳续期:刷新在线表项的 TTL,不产生广播
    pub async fn refresh_online(&self, user_id: &str, connection_id: &str) {
        if let Err(err) = self.presence.set_online(user_id, connection_id).await {
            warn!(%user_id, error = %err, "failed to refresh presence entry");
        }
    }

    /// 连接断开:清除在线表项并广播离线事件
    pub async fn announce_offline(&self, user_id: &str, connection_id: &str) {
        if let Err(err) = self.presence.clear_online(user_id).await {
            warn!(%user_id, error = %err, "failed to clear presence entry");
        }
        let signal = PresenceSignal {
            user_id: user_id.to_string(),
            is_online: false,
        };
        self.publish_presence(&signal).await;
        info!(%user_id, %connection_id, "user disconnected");
    }

    async fn publish_presence(&self, signal: &PresenceSignal) {
        let payload = match serde_json::to_vec(signal) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to encode presence signal");
                return;
            }
        };
        // 在线状态信令尽力而为,发布失败只记录
        if let Err(err) = self.bus.publish(PRESENCE_CHANNEL, &payload).await {
            self.metrics.publish_failure_total.inc();
            warn!(user_id = %signal.user_id, error = %err, "failed to publish presence signal");
        }
    }

    /// `check-online` 时点快照查询
    pub async fn check_online(&self, user_id: &str) -> RippleResult<bool> {
        validate_user_id(user_id).map_err(RippleError::InvalidParameter)?;
        self.presence.is_online(user_id).await
    }

    /// `typing` 信号转发到会话频道
    pub async fn typing(&self, conversation_id: &str, user_id: &str) -> RippleResult<()> {
        validate_conversation_id(conversation_id).map_err(RippleError::InvalidParameter)?;
        validate_user_id(user_id).map_err(RippleError::InvalidParameter)?;
        let signal = TypingSignal {
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
        };
        let payload = serde_json::to_vec(&signal)
            .map_err(|err| RippleError::DeliveryFailure(err.to_string()))?;
        self.bus
            .publish(&channels::typing_channel(conversation_id), &payload)
            .await
    }

    /// `send-message` 双写 saga
    ///
    /// 先走正确性关键的持久化入队;只有入队成功才发布到实时
    /// 总线,保证实时路径不会出现未被持久化排队的消息。两步之间
    /// 无原子性:发布失败如实上报,但不回滚已入队的记录。
    pub async fn send_message(
        &self,
        conversation_id: String,
        sender_id: String,
        message_type: MessageType,
        body: String,
    ) -> RippleResult<Message> {
        validate_conversation_id(&conversation_id).map_err(RippleError::InvalidParameter)?;
        validate_user_id(&sender_id).map_err(RippleError::InvalidParameter)?;
        let message = Message::assign(conversation_id, sender_id, message_type, body);

        if let Err(err) = self.queue.enqueue(&message).await {
            self.metrics.enqueue_failure_total.inc();
            warn!(
                message_id = %message.id,
                conversation_id = %message.conversation_id,
                error = %err,
                "durable enqueue failed, skipping realtime publish"
            );
            return Err(err);
        }

        let payload = serde_json::to_vec(&message)
            .map_err(|err| RippleError::DeliveryFailure(err.to_string()))?;
        if let Err(err) = self
            .bus
            .publish(
                &channels::message_channel(&message.conversation_id),
                &payload,
            )
            .await
        {
            self.metrics.publish_failure_total.inc();
            warn!(
                message_id = %message.id,
                error = %err,
                "realtime publish failed after successful enqueue"
            );
            return Err(err);
        }

        self.metrics.messages_sent_total.inc();
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bus::InMemoryFanoutBus;
    use crate::infrastructure::messaging::InMemoryMessageQueue;
    use crate::infrastructure::presence::InMemoryPresenceRegistry;
    use futures::StreamExt;

    struct Fixture {
        presence: Arc<InMemoryPresenceRegistry>,
        bus: Arc<InMemoryFanoutBus>,
        queue: Arc<InMemoryMessageQueue>,
        service: EventService,
    }

    fn fixture() -> Fixture {
        let presence = Arc::new(InMemoryPresenceRegistry::new());
        let bus = Arc::new(InMemoryFanoutBus::new());
        let queue = Arc::new(InMemoryMessageQueue::new());
        let service = EventService::new(
            presence.clone(),
            bus.clone(),
            queue.clone(),
            Arc::new(GatewayMetrics::new()),
        );
        Fixture {
            presence,
            bus,
            queue,
            service,
        }
    }

    #[tokio::test]
    async fn announce_online_sets_presence_and_broadcasts() {
        let fx = fixture();
        let mut stream = fx
            .bus
            .subscribe(&[PRESENCE_CHANNEL.to_string()])
            .await
            .unwrap();

        fx.service.announce_online("u1", "conn-1").await.unwrap();

        assert!(fx.presence.is_online("u1").await.unwrap());
        let event = stream.next().await.unwrap();
        let signal: PresenceSignal = serde_json::from_slice(&event.payload).unwrap();
        assert_eq!(signal.user_id, "u1");
        assert!(signal.is_online);
    }

    #[tokio::test]
    async fn announce_offline_clears_presence_and_broadcasts() {
        let fx = fixture();
        fx.service.announce_online("u1", "conn-1").await.unwrap();

        let mut stream = fx
            .bus
            .subscribe(&[PRESENCE_CHANNEL.to_string()])
            .await
            .unwrap();
        fx.service.announce_offline("u1", "conn-1").await;

        assert!(!fx.presence.is_online("u1").await.unwrap());
        let event = stream.next().await.unwrap();
        let signal: PresenceSignal = serde_json::from_slice(&event.payload).unwrap();
        assert!(!signal.is_online);
    }

    #[tokio::test]
    async fn send_message_enqueues_and_publishes_the_identical_record() {
        let fx = fixture();
        let mut stream = fx.bus.subscribe(&["messages:*".to_string()]).await.unwrap();

        let message = fx
            .service
            .send_message(
                "c1".to_string(),
                "u1".to_string(),
                MessageType::Text,
                "hi".to_string(),
            )
            .await
            .unwrap();

        // 持久化路径与实时路径携带同一份记录
        let enqueued = fx.queue.enqueued();
        assert_eq!(enqueued.len(), 1);
        assert_eq!(enqueued[0], message);

        let event = stream.next().await.unwrap();
        assert_eq!(event.channel, "messages:c1");
        let published: Message = serde_json::from_slice(&event.payload).unwrap();
        assert_eq!(published, message);
        assert_eq!(published.created_at, enqueued[0].created_at);
    }

    #[tokio::test]
    async fn failed_enqueue_suppresses_the_realtime_publish() {
        let fx = fixture();
        let mut stream = fx.bus.subscribe(&["messages:*".to_string()]).await.unwrap();
        fx.queue.fail_next(1);

        let err = fx
            .service
            .send_message(
                "c1".to_string(),
                "u1".to_string(),
                MessageType::Text,
                "hi".to_string(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RippleError::PersistenceFailure(_)));
        assert!(fx.queue.enqueued().is_empty());

        // 入队失败后不得出现实时发布
        fx.bus.publish("messages:c1", b"sentinel").await.unwrap();
        let event = stream.next().await.unwrap();
        assert_eq!(event.payload, b"sentinel");
    }

    #[tokio::test]
    async fn typing_signal_lands_on_the_conversation_channel() {
        let fx = fixture();
        let mut stream = fx.bus.subscribe(&["typing:*".to_string()]).await.unwrap();

        fx.service.typing("c9", "u1").await.unwrap();

        let event = stream.next().await.unwrap();
        assert_eq!(event.channel, "typing:c9");
        let signal: TypingSignal = serde_json::from_slice(&event.payload).unwrap();
        assert_eq!(signal.user_id, "u1");
    }

    #[tokio::test]
    async fn empty_identifiers_are_rejected_before_any_side_effect() {
        let fx = fixture();

        let err = fx
            .service
            .send_message(
                "".to_string(),
                "u1".to_string(),
                MessageType::Text,
                "hi".to_string(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RippleError::InvalidParameter(_)));
        assert!(fx.queue.enqueued().is_empty());

        let err = fx.service.check_online("").await.unwrap_err();
        assert!(matches!(err, RippleError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn check_online_reflects_presence_snapshot() {
        let fx = fixture();
        assert!(!fx.service.check_online("u1").await.unwrap());
        fx.service.announce_online("u1", "conn-1").await.unwrap();
        assert!(fx.service.check_online("u1").await.unwrap());
    }
}
