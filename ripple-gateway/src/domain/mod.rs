//! 网关领域层
//!
//! 在线注册表、扇出总线与持久化队列都以注入的 trait 对象形式
//! 进入网关,不允许模块级单例,测试以内存实现替换。

pub mod channels;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use ripple_common::models::Message;
use ripple_common::RippleResult;

/// 在线状态注册表
///
/// 共享于所有网关实例。`is_online` 是时点快照,调用方不得假设
/// 返回后仍然有效;查询从未连接过的用户不是错误,缺失即离线。
#[async_trait]
pub trait PresenceRegistry: Send + Sync {
    /// 绑定用户到连接 (后写覆盖,重连即覆盖)
    async fn set_online(&self, user_id: &str, connection_id: &str) -> RippleResult<()>;

    /// 清除用户的在线表项
    async fn clear_online(&self, user_id: &str) -> RippleResult<()>;

    /// 时点快照查询
    async fn is_online(&self, user_id: &str) -> RippleResult<bool>;
}

/// 扇出总线上的一条事件
#[derive(Debug, Clone)]
pub struct BusEvent {
    pub channel: String,
    pub payload: Vec<u8>,
}

/// 总线订阅得到的事件流
pub type BusStream = Pin<Box<dyn Stream<Item = BusEvent> + Send>>;

/// 扇出总线
///
/// 投递语义为至多一次、跨发布者无序,无回放缓冲:订阅建立前
/// 发布的事件对该订阅者永久丢失。因此总线只承载可被后续事件
/// 取代的信令,聊天消息必须同时走持久化队列。
#[async_trait]
pub trait FanoutBus: Send + Sync {
    /// 发布事件到指定频道
    async fn publish(&self, channel: &str, payload: &[u8]) -> RippleResult<()>;

    /// 按模式订阅 (`messages:*` 等),返回事件流
    async fn subscribe(&self, patterns: &[String]) -> RippleResult<BusStream>;
}

/// 持久化摄入队列 (生产侧)
///
/// 以 `conversation_id` 作为分区键,同会话消息保持入队顺序。
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// 消息入队,返回即表示队列已确认
    async fn enqueue(&self, message: &Message) -> RippleResult<()>;
}
