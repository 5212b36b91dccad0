//! 内存扇出总线 (测试用)
//!
//! 用进程内 broadcast 通道复刻 Pub/Sub 的至多一次语义:
//! 无订阅者时发布即丢弃,滞后的订阅者丢失被挤出的事件。

use async_trait::async_trait;
use futures::StreamExt;
use ripple_common::RippleResult;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::domain::{BusEvent, BusStream, FanoutBus};

const BUS_CAPACITY: usize = 1024;

pub struct InMemoryFanoutBus {
    sender: broadcast::Sender<BusEvent>,
}

impl Default for InMemoryFanoutBus {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }
}

impl InMemoryFanoutBus {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 模式匹配:尾部 `*` 做前缀匹配,其余精确匹配
fn channel_matches(pattern: &str, channel: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => channel.starts_with(prefix),
        None => channel == pattern,
    }
}

#[async_trait]
impl FanoutBus for InMemoryFanoutBus {
    async fn publish(&self, channel: &str, payload: &[u8]) -> RippleResult<()> {
        let event = BusEvent {
            channel: channel.to_string(),
            payload: payload.to_vec(),
        };
        // 无订阅者时发布即丢弃,符合至多一次语义
        let _ = self.sender.send(event);
        Ok(())
    }

    async fn subscribe(&self, patterns: &[String]) -> RippleResult<BusStream> {
        let patterns = patterns.to_vec();
        let receiver = self.sender.subscribe();
        let stream = BroadcastStream::new(receiver).filter_map(move |item| {
            let patterns = patterns.clone();
            async move {
                match item {
                    Ok(event)
                        if patterns
                            .iter()
                            .any(|pattern| channel_matches(pattern, &event.channel)) =>
                    {
                        Some(event)
                    }
                    _ => None,
                }
            }
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::channels;

    #[test]
    fn pattern_matching_covers_prefix_and_exact_forms() {
        assert!(channel_matches("messages:*", "messages:c1"));
        assert!(channel_matches("presence", "presence"));
        assert!(!channel_matches("messages:*", "typing:c1"));
        assert!(!channel_matches("presence", "presence:extra"));
    }

    #[tokio::test]
    async fn subscriber_receives_only_matching_channels() {
        let bus = InMemoryFanoutBus::new();
        let mut stream = bus
            .subscribe(&[format!("{}:*", channels::MESSAGE_CHANNEL_PREFIX)])
            .await
            .unwrap();

        bus.publish("typing:c1", b"ignored").await.unwrap();
        bus.publish("messages:c1", b"delivered").await.unwrap();

        let event = stream.next().await.unwrap();
        assert_eq!(event.channel, "messages:c1");
        assert_eq!(event.payload, b"delivered");
    }

    #[tokio::test]
    async fn events_published_before_subscribing_are_lost() {
        let bus = InMemoryFanoutBus::new();
        bus.publish("presence", b"early").await.unwrap();

        let mut stream = bus.subscribe(&["presence".to_string()]).await.unwrap();
        bus.publish("presence", b"late").await.unwrap();

        let event = stream.next().await.unwrap();
        assert_eq!(event.payload, b"late");
    }

    #[tokio::test]
    async fn every_subscriber_sees_each_event() {
        let bus = InMemoryFanoutBus::new();
        let mut first = bus.subscribe(&["presence".to_string()]).await.unwrap();
        let mut second = bus.subscribe(&["presence".to_string()]).await.unwrap();

        bus.publish("presence", b"hello").await.unwrap();

        assert_eq!(first.next().await.unwrap().payload, b"hello");
        assert_eq!(second.next().await.unwrap().payload, b"hello");
    }
}
