//! 扇出总线频道命名
//!
//! 消息与输入中信号按会话打频道标签,在线状态走单一频道。

/// 在线状态变更频道
pub const PRESENCE_CHANNEL: &str = "presence";

/// 消息频道前缀
pub const MESSAGE_CHANNEL_PREFIX: &str = "messages";

/// 输入中信号频道前缀
pub const TYPING_CHANNEL_PREFIX: &str = "typing";

/// 会话消息频道 `messages:{conversation_id}`
pub fn message_channel(conversation_id: &str) -> String {
    format!("{MESSAGE_CHANNEL_PREFIX}:{conversation_id}")
}

/// 会话输入中频道 `typing:{conversation_id}`
pub fn typing_channel(conversation_id: &str) -> String {
    format!("{TYPING_CHANNEL_PREFIX}:{conversation_id}")
}

/// 网关实例生命周期内订阅的全部模式
pub fn gateway_patterns() -> Vec<String> {
    vec![
        format!("{MESSAGE_CHANNEL_PREFIX}:*"),
        format!("{TYPING_CHANNEL_PREFIX}:*"),
        PRESENCE_CHANNEL.to_string(),
    ]
}

/// 从频道名中取出会话ID (`messages:c1` -> `c1`)
pub fn conversation_of(channel: &str, prefix: &str) -> Option<String> {
    channel
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(':'))
        .map(|id| id.to_string())
}
