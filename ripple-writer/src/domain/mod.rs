//! 写入器领域层

use async_trait::async_trait;
use ripple_common::RippleResult;
use ripple_common::models::Message;

/// 系统记录库
///
/// 摄入队列是至少一次投递,同一条记录可能被重复交付;写入必须
/// 以 `id` 为键做 upsert 而非裸 insert,保证重复交付只留下一行。
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// 以 `id` 为键幂等写入一条消息
    async fn store(&self, message: &Message) -> RippleResult<()>;
}
