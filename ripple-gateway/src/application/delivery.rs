//! 总线事件回投
//!
//! 网关实例生命周期内的单个监听任务:订阅 `messages:*`、`typing:*`
//! 与 `presence`,把总线事件翻译为出站帧投递到本地 socket。
//! 单条事件的处理失败只记录,监听循环永不因此退出。

use std::sync::Arc;

use futures::StreamExt;
use ripple_common::models::{Message, PresenceSignal, TypingSignal};
use ripple_common::protocol::ServerFrame;
use ripple_common::typing::TypingTracker;
use tracing::{info, warn};

use crate::domain::channels::{
    MESSAGE_CHANNEL_PREFIX, PRESENCE_CHANNEL, TYPING_CHANNEL_PREFIX, conversation_of,
};
use crate::domain::{BusEvent, BusStream};
use crate::interface::clients::ClientRegistry;
use crate::metrics::GatewayMetrics;

pub struct FanoutListener {
    clients: Arc<ClientRegistry>,
    typing: Arc<TypingTracker>,
    metrics: Arc<GatewayMetrics>,
}

impl FanoutListener {
    pub fn new(
        clients: Arc<ClientRegistry>,
        typing: Arc<TypingTracker>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            clients,
            typing,
            metrics,
        }
    }

    /// 消费总线事件流直至流结束
    pub async fn run(self, mut stream: BusStream) {
        info!("fanout listener started");
        while let Some(event) = stream.next().await {
            self.handle_event(event);
        }
        warn!("fanout listener stream ended");
    }

    fn handle_event(&self, event: BusEvent) {
        if let Some(conversation_id) = conversation_of(&event.channel, MESSAGE_CHANNEL_PREFIX) {
            match serde_json::from_slice::<Message>(&event.payload) {
                Ok(message) => {
                    self.clients.deliver_to_conversation(
                        &conversation_id,
                        &ServerFrame::receive_message(&message),
                    );
                    self.metrics.bus_events_delivered_total.inc();
                }
                Err(err) => {
                    warn!(channel = %event.channel, error = %err, "undecodable message event")
                }
            }
        } else if let Some(conversation_id) = conversation_of(&event.channel, TYPING_CHANNEL_PREFIX)
        {
            match serde_json::from_slice::<TypingSignal>(&event.payload) {
                Ok(signal) => {
                    self.typing.mark(&signal.conversation_id, &signal.user_id);
                    self.clients.deliver_to_conversation(
                        &conversation_id,
                        &ServerFrame::typing(&signal.conversation_id, &signal.user_id),
                    );
                    self.metrics.bus_events_delivered_total.inc();
                }
                Err(err) => {
                    warn!(channel = %event.channel, error = %err, "undecodable typing event")
                }
            }
        } else if event.channel == PRESENCE_CHANNEL {
            match serde_json::from_slice::<PresenceSignal>(&event.payload) {
                Ok(signal) => {
                    let frame = if signal.is_online {
                        ServerFrame::user_connected(&signal.user_id)
                    } else {
                        ServerFrame::user_disconnected(&signal.user_id)
                    };
                    self.clients.broadcast(&frame);
                    self.metrics.bus_events_delivered_total.inc();
                }
                Err(err) => {
                    warn!(channel = %event.channel, error = %err, "undecodable presence event")
                }
            }
        } else {
            warn!(channel = %event.channel, "event on unexpected channel");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::channels::{gateway_patterns, message_channel, typing_channel};
    use crate::domain::FanoutBus;
    use crate::infrastructure::bus::InMemoryFanoutBus;
    use crate::interface::clients::ClientHandle;
    use ripple_common::models::MessageType;
    use tokio::sync::mpsc;

    async fn listener_over_bus(
        bus: &InMemoryFanoutBus,
        clients: Arc<ClientRegistry>,
    ) -> tokio::task::JoinHandle<()> {
        listener_with_tracker(bus, clients, Arc::new(TypingTracker::default())).await
    }

    async fn listener_with_tracker(
        bus: &InMemoryFanoutBus,
        clients: Arc<ClientRegistry>,
        typing: Arc<TypingTracker>,
    ) -> tokio::task::JoinHandle<()> {
        let stream = bus.subscribe(&gateway_patterns()).await.unwrap();
        let listener = FanoutListener::new(clients, typing, Arc::new(GatewayMetrics::new()));
        tokio::spawn(listener.run(stream))
    }

    #[tokio::test]
    async fn message_events_reach_only_joined_connections() {
        let bus = InMemoryFanoutBus::new();
        let clients = Arc::new(ClientRegistry::new());

        let (tx_member, mut rx_member) = mpsc::unbounded_channel();
        let member = Arc::new(ClientHandle::new(
            "conn-a".to_string(),
            "u1".to_string(),
            tx_member,
        ));
        member.join("c1");
        clients.register(member);

        let (tx_outsider, mut rx_outsider) = mpsc::unbounded_channel();
        clients.register(Arc::new(ClientHandle::new(
            "conn-b".to_string(),
            "u2".to_string(),
            tx_outsider,
        )));

        let task = listener_over_bus(&bus, clients).await;

        let message = Message::assign(
            "c1".to_string(),
            "u9".to_string(),
            MessageType::Text,
            "hi".to_string(),
        );
        bus.publish(
            &message_channel("c1"),
            &serde_json::to_vec(&message).unwrap(),
        )
        .await
        .unwrap();

        let frame = rx_member.recv().await.unwrap();
        assert_eq!(frame.event, "receive-message");
        assert_eq!(frame.data["id"], serde_json::json!(message.id));
        assert!(rx_outsider.try_recv().is_err());

        task.abort();
    }

    #[tokio::test]
    async fn presence_events_are_broadcast_to_everyone() {
        let bus = InMemoryFanoutBus::new();
        let clients = Arc::new(ClientRegistry::new());

        let (tx, mut rx) = mpsc::unbounded_channel();
        clients.register(Arc::new(ClientHandle::new(
            "conn-a".to_string(),
            "u1".to_string(),
            tx,
        )));

        let task = listener_over_bus(&bus, clients).await;

        let signal = PresenceSignal {
            user_id: "u9".to_string(),
            is_online: false,
        };
        bus.publish(PRESENCE_CHANNEL, &serde_json::to_vec(&signal).unwrap())
            .await
            .unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event, "u9-disconnected");
        assert_eq!(frame.data["isOnline"], serde_json::json!(false));

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn delivered_typing_signal_is_tracked_until_the_window_lapses() {
        let bus = InMemoryFanoutBus::new();
        let clients = Arc::new(ClientRegistry::new());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let member = Arc::new(ClientHandle::new(
            "conn-a".to_string(),
            "u1".to_string(),
            tx,
        ));
        member.join("c1");
        clients.register(member);

        let typing = Arc::new(TypingTracker::default());
        let task = listener_with_tracker(&bus, clients, typing.clone()).await;

        bus.publish(
            &typing_channel("c1"),
            &serde_json::to_vec(&TypingSignal {
                conversation_id: "c1".to_string(),
                user_id: "u2".to_string(),
            })
            .unwrap(),
        )
        .await
        .unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event, "typing-c1");
        assert!(typing.is_typing("c1", "u2"));

        tokio::time::advance(std::time::Duration::from_millis(2001)).await;
        assert!(!typing.is_typing("c1", "u2"));

        task.abort();
    }

    #[tokio::test]
    async fn presence_announcements_flow_from_service_to_client_frames() {
        use crate::application::EventService;
        use crate::infrastructure::messaging::InMemoryMessageQueue;
        use crate::infrastructure::presence::InMemoryPresenceRegistry;

        let bus = Arc::new(InMemoryFanoutBus::new());
        let clients = Arc::new(ClientRegistry::new());

        let (tx, mut rx) = mpsc::unbounded_channel();
        clients.register(Arc::new(ClientHandle::new(
            "conn-b".to_string(),
            "observer".to_string(),
            tx,
        )));

        let task = listener_over_bus(&bus, clients).await;

        let service = EventService::new(
            Arc::new(InMemoryPresenceRegistry::new()),
            bus.clone(),
            Arc::new(InMemoryMessageQueue::new()),
            Arc::new(GatewayMetrics::new()),
        );

        service.announce_online("u1", "conn-a").await.unwrap();
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event, "u1-connected");
        assert_eq!(frame.data["isOnline"], serde_json::json!(true));

        service.announce_offline("u1", "conn-a").await;
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event, "u1-disconnected");

        task.abort();
    }

    #[tokio::test]
    async fn undecodable_payload_does_not_stop_the_listener() {
        let bus = InMemoryFanoutBus::new();
        let clients = Arc::new(ClientRegistry::new());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let member = Arc::new(ClientHandle::new(
            "conn-a".to_string(),
            "u1".to_string(),
            tx,
        ));
        member.join("c1");
        clients.register(member);

        let task = listener_over_bus(&bus, clients).await;

        bus.publish(&message_channel("c1"), b"{ not json")
            .await
            .unwrap();
        bus.publish(
            &typing_channel("c1"),
            &serde_json::to_vec(&TypingSignal {
                conversation_id: "c1".to_string(),
                user_id: "u2".to_string(),
            })
            .unwrap(),
        )
        .await
        .unwrap();

        // 坏载荷被跳过,后续事件照常投递
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event, "typing-c1");

        task.abort();
    }
}
