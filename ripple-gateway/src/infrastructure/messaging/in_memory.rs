//! 内存消息队列 (测试用)
//!
//! 记录入队顺序,支持注入若干次失败以验证双写 saga 的顺序约束。

use std::sync::Mutex;

use async_trait::async_trait;
use ripple_common::RippleResult;
use ripple_common::error::RippleError;
use ripple_common::models::Message;

use crate::domain::MessageQueue;

#[derive(Default)]
pub struct InMemoryMessageQueue {
    records: Mutex<Vec<Message>>,
    failures_remaining: Mutex<u32>,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 令接下来的 n 次入队失败
    pub fn fail_next(&self, n: u32) {
        *self.failures_remaining.lock().unwrap() = n;
    }

    /// 已入队的消息快照
    pub fn enqueued(&self) -> Vec<Message> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn enqueue(&self, message: &Message) -> RippleResult<()> {
        {
            let mut failures = self.failures_remaining.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(RippleError::PersistenceFailure(
                    "injected enqueue failure".to_string(),
                ));
            }
        }
        self.records.lock().unwrap().push(message.clone());
        Ok(())
    }
}
