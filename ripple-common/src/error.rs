//! 消息投递管线错误类型定义

use thiserror::Error;

/// 消息投递管线错误类型
///
/// 对应的传播策略:
/// - `AuthFailure` 终止当前连接,不重试
/// - `DeliveryFailure` 上报给发送方,不重试 (实时路径尽力而为)
/// - `PersistenceFailure` 暂停消费并退避重试,不上报给发送方
/// - `MalformedEvent` 以类型化的 `socket-error` 帧拒绝,连接保持原状态
#[derive(Debug, Error)]
pub enum RippleError {
    /// 凭证缺失或无效
    #[error("Unauthorized: {0}")]
    AuthFailure(String),

    /// 扇出总线发布失败
    #[error("Delivery failure: {0}")]
    DeliveryFailure(String),

    /// 持久化队列或系统记录库写入失败
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// 客户端事件载荷结构不合法
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// 无效的参数
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 消息投递管线结果类型
pub type RippleResult<T> = Result<T, RippleError>;

impl RippleError {
    /// 上报给客户端时使用的错误码
    pub fn code(&self) -> &'static str {
        match self {
            RippleError::AuthFailure(_) => "UNAUTHORIZED",
            RippleError::DeliveryFailure(_) => "DELIVERY_FAILED",
            RippleError::PersistenceFailure(_) => "PERSISTENCE_FAILED",
            RippleError::MalformedEvent(_) => "MALFORMED_EVENT",
            RippleError::InvalidParameter(_) => "INVALID_PARAMETER",
            RippleError::Other(_) => "INTERNAL",
        }
    }
}
