//! 持久化重试策略
//!
//! 失败处理契约:写失败时暂停摄入、固定退避、从同一条记录恢复,
//! 不提交失败位点、不丢记录、不让进程崩溃。重试期间消费循环
//! 自然停摆,即为 "暂停摄入"。由于记录库按 `id` 做 upsert,
//! 假阴性确认导致的重复交付是无害的。

use std::sync::Arc;
use std::time::Duration;

use ripple_common::RippleResult;
use ripple_common::models::Message;
use tracing::{debug, warn};

use crate::domain::MessageStore;
use crate::metrics::WriterMetrics;

pub struct PersistService {
    store: Arc<dyn MessageStore>,
    backoff: Duration,
    metrics: Arc<WriterMetrics>,
}

impl PersistService {
    pub fn new(store: Arc<dyn MessageStore>, backoff: Duration, metrics: Arc<WriterMetrics>) -> Self {
        Self {
            store,
            backoff,
            metrics,
        }
    }

    /// 写入一条记录,失败则退避后从同一条记录重试,直到成功
    ///
    /// 只在成功后返回;调用方据此决定何时提交位点。
    pub async fn persist(&self, message: &Message) -> RippleResult<()> {
        loop {
            match self.store.store(message).await {
                Ok(()) => {
                    self.metrics.messages_persisted_total.inc();
                    debug!(message_id = %message.id, "message persisted");
                    return Ok(());
                }
                Err(err) => {
                    self.metrics.persist_retries_total.inc();
                    warn!(
                        message_id = %message.id,
                        backoff_seconds = self.backoff.as_secs(),
                        error = %err,
                        "persist failed, pausing intake before retry"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }

    /// 按交付顺序逐条写入一批记录
    pub async fn persist_batch(&self, messages: &[Message]) -> RippleResult<()> {
        self.metrics.batch_size.observe(messages.len() as f64);
        for message in messages {
            self.persist(message).await?;
        }
        Ok(())
    }
}
