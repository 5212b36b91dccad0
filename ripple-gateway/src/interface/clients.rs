//! 本地连接注册表
//!
//! 每个网关实例只掌握自己持有的 socket。投递按会话兴趣过滤:
//! 消息与输入中帧只发给 join 过对应会话的连接,在线状态帧发给
//! 全部连接。

use std::collections::HashSet;
use std::sync::RwLock;

use dashmap::DashMap;
use ripple_common::RippleResult;
use ripple_common::error::RippleError;
use ripple_common::protocol::ServerFrame;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// 单个已认证连接的本地句柄
pub struct ClientHandle {
    pub connection_id: String,
    pub user_id: String,
    tx: mpsc::UnboundedSender<ServerFrame>,
    joined: RwLock<HashSet<String>>,
}

impl ClientHandle {
    pub fn new(
        connection_id: String,
        user_id: String,
        tx: mpsc::UnboundedSender<ServerFrame>,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            tx,
            joined: RwLock::new(HashSet::new()),
        }
    }

    /// 投递一帧到该连接的发送通道
    pub fn send(&self, frame: ServerFrame) -> RippleResult<()> {
        self.tx
            .send(frame)
            .map_err(|_| RippleError::DeliveryFailure("connection channel closed".to_string()))
    }

    pub fn join(&self, conversation_id: &str) {
        let mut joined = self.joined.write().expect("joined set poisoned");
        joined.insert(conversation_id.to_string());
    }

    pub fn leave(&self, conversation_id: &str) {
        let mut joined = self.joined.write().expect("joined set poisoned");
        joined.remove(conversation_id);
    }

    pub fn has_joined(&self, conversation_id: &str) -> bool {
        let joined = self.joined.read().expect("joined set poisoned");
        joined.contains(conversation_id)
    }
}

/// 本实例全部活跃连接
#[derive(Default)]
pub struct ClientRegistry {
    clients: DashMap<String, Arc<ClientHandle>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: Arc<ClientHandle>) {
        self.clients.insert(handle.connection_id.clone(), handle);
    }

    pub fn unregister(&self, connection_id: &str) {
        self.clients.remove(connection_id);
    }

    pub fn count(&self) -> usize {
        self.clients.len()
    }

    /// 发给全部本地连接 (在线状态帧)
    pub fn broadcast(&self, frame: &ServerFrame) {
        for entry in self.clients.iter() {
            if entry.value().send(frame.clone()).is_err() {
                debug!(connection_id = %entry.key(), "skipping closed connection");
            }
        }
    }

    /// 只发给 join 过该会话的本地连接
    pub fn deliver_to_conversation(&self, conversation_id: &str, frame: &ServerFrame) {
        for entry in self.clients.iter() {
            let client = entry.value();
            if !client.has_joined(conversation_id) {
                continue;
            }
            if client.send(frame.clone()).is_err() {
                debug!(connection_id = %entry.key(), "skipping closed connection");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(connection_id: &str, user_id: &str) -> (Arc<ClientHandle>, mpsc::UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(ClientHandle::new(
                connection_id.to_string(),
                user_id.to_string(),
                tx,
            )),
            rx,
        )
    }

    #[tokio::test]
    async fn broadcast_reaches_every_local_connection() {
        let registry = ClientRegistry::new();
        let (a, mut rx_a) = handle("conn-a", "u1");
        let (b, mut rx_b) = handle("conn-b", "u2");
        registry.register(a);
        registry.register(b);

        registry.broadcast(&ServerFrame::user_connected("u3"));

        assert_eq!(rx_a.recv().await.unwrap().event, "u3-connected");
        assert_eq!(rx_b.recv().await.unwrap().event, "u3-connected");
    }

    #[tokio::test]
    async fn conversation_delivery_respects_join_state() {
        let registry = ClientRegistry::new();
        let (member, mut rx_member) = handle("conn-a", "u1");
        let (outsider, mut rx_outsider) = handle("conn-b", "u2");
        member.join("c1");
        registry.register(member.clone());
        registry.register(outsider);

        registry.deliver_to_conversation("c1", &ServerFrame::typing("c1", "u9"));

        assert_eq!(rx_member.recv().await.unwrap().event, "typing-c1");
        assert!(rx_outsider.try_recv().is_err());

        member.leave("c1");
        registry.deliver_to_conversation("c1", &ServerFrame::typing("c1", "u9"));
        assert!(rx_member.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_removes_the_connection() {
        let registry = ClientRegistry::new();
        let (a, _rx) = handle("conn-a", "u1");
        registry.register(a);
        assert_eq!(registry.count(), 1);
        registry.unregister("conn-a");
        assert_eq!(registry.count(), 0);
    }
}
