//! 内存系统记录库 (测试用)
//!
//! 以 `id` 为键去重,并记录首次写入顺序;支持注入连续失败,
//! 用于验证退避重试不丢数据。

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ripple_common::RippleResult;
use ripple_common::error::RippleError;
use ripple_common::models::Message;

use crate::domain::MessageStore;

#[derive(Default)]
struct Inner {
    records: HashMap<String, Message>,
    insertion_order: Vec<String>,
    failures_remaining: u32,
    attempts: u64,
}

#[derive(Default)]
pub struct InMemoryMessageStore {
    inner: Mutex<Inner>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 令接下来的 n 次写入失败
    pub fn fail_next(&self, n: u32) {
        self.inner.lock().unwrap().failures_remaining = n;
    }

    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn attempts(&self) -> u64 {
        self.inner.lock().unwrap().attempts
    }

    pub fn get(&self, id: &str) -> Option<Message> {
        self.inner.lock().unwrap().records.get(id).cloned()
    }

    /// 按首次写入顺序返回的消息ID
    pub fn stored_ids(&self) -> Vec<String> {
        self.inner.lock().unwrap().insertion_order.clone()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn store(&self, message: &Message) -> RippleResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.attempts += 1;
        if inner.failures_remaining > 0 {
            inner.failures_remaining -= 1;
            return Err(RippleError::PersistenceFailure(
                "injected store failure".to_string(),
            ));
        }
        if !inner.records.contains_key(&message.id) {
            inner.insertion_order.push(message.id.clone());
        }
        inner.records.insert(message.id.clone(), message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_common::models::MessageType;

    #[tokio::test]
    async fn storing_the_same_id_twice_keeps_one_record() {
        let store = InMemoryMessageStore::new();
        let message = Message::assign(
            "c1".to_string(),
            "u1".to_string(),
            MessageType::Text,
            "hi".to_string(),
        );

        store.store(&message).await.unwrap();
        store.store(&message).await.unwrap();

        assert_eq!(store.count(), 1);
        assert_eq!(store.get(&message.id).unwrap().body, "hi");
    }
}
