//! 管线共享数据模型

use serde::{Deserialize, Serialize};

/// 消息类型 (封闭集合)
///
/// 线上取值与原始客户端保持一致 (`TEXT`、`IMAGE`...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    Image,
    Audio,
    Video,
    Document,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "TEXT",
            MessageType::Image => "IMAGE",
            MessageType::Audio => "AUDIO",
            MessageType::Video => "VIDEO",
            MessageType::Document => "DOCUMENT",
        }
    }
}

/// 管线中流动的消息记录
///
/// `id` 与时间戳由网关在收到消息时一次性生成,实时路径与
/// 持久化路径携带同一份记录 (位相同的 `created_at`)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// 全局唯一消息ID (网关生成,非记录库生成)
    pub id: String,
    /// 目标会话ID (不在本核心内校验)
    pub conversation_id: String,
    /// 发送者用户ID
    pub sender_id: String,
    /// 消息类型
    pub message_type: MessageType,
    /// 文本内容或媒体URI
    pub body: String,
    /// 接收时刻时间戳 (毫秒)
    pub created_at: i64,
    /// 接收时刻时间戳 (毫秒)
    pub updated_at: i64,
}

impl Message {
    /// 在网关接收时刻构建消息记录,分配ID与时间戳
    pub fn assign(
        conversation_id: String,
        sender_id: String,
        message_type: MessageType,
        body: String,
    ) -> Self {
        let now = crate::utils::current_timestamp_ms();
        Self {
            id: crate::utils::generate_id(),
            conversation_id,
            sender_id,
            message_type,
            body,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 在线状态变更广播载荷 (connect / disconnect)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSignal {
    pub user_id: String,
    pub is_online: bool,
}

/// 输入中信号广播载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    pub conversation_id: String,
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_uses_upper_case_wire_values() {
        let json = serde_json::to_string(&MessageType::Document).unwrap();
        assert_eq!(json, "\"DOCUMENT\"");
        let back: MessageType = serde_json::from_str("\"TEXT\"").unwrap();
        assert_eq!(back, MessageType::Text);
    }

    #[test]
    fn message_round_trips_with_camel_case_fields() {
        let message = Message::assign(
            "c1".to_string(),
            "u1".to_string(),
            MessageType::Text,
            "hi".to_string(),
        );
        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("conversationId").is_some());
        assert!(json.get("createdAt").is_some());

        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn assign_sets_identical_created_and_updated_timestamps() {
        let message = Message::assign(
            "c1".to_string(),
            "u1".to_string(),
            MessageType::Image,
            "s3://bucket/photo.png".to_string(),
        );
        assert_eq!(message.created_at, message.updated_at);
        assert!(!message.id.is_empty());
    }
}
