//! 客户端事件协议
//!
//! 入站与出站均为 `{event, data}` JSON 信封。入站事件名是封闭集合,
//! 解析为 [`ClientEvent`];出站事件名部分是动态拼接的
//! (`{userId}-connected`、`typing-{conversationId}`),统一通过
//! [`ServerFrame`] 构建。
//!
//! 结构不合法的入站载荷不再静默丢弃,而是返回
//! [`RippleError::MalformedEvent`],由网关回发 `socket-error` 帧。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RippleError;
use crate::models::{Message, MessageType};

/// 入站事件信封
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// 客户端入站事件
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// 查询指定用户是否在线
    CheckOnline { user_id: String },
    /// 输入中信号 (2 秒窗口内有效,无显式停止事件)
    Typing {
        conversation_id: String,
        user_id: String,
    },
    /// 发送消息 (网关负责分配 id 与时间戳)
    SendMessage {
        conversation_id: String,
        sender_id: String,
        message_type: MessageType,
        body: String,
    },
    /// 声明对某会话的投递兴趣
    JoinConversation { conversation_id: String },
    /// 撤销对某会话的投递兴趣
    LeaveConversation { conversation_id: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckOnlineData {
    user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingData {
    conversation_id: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageData {
    conversation_id: String,
    sender_id: String,
    message_type: MessageType,
    body: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationData {
    conversation_id: String,
}

impl ClientEvent {
    /// 从原始 JSON 文本解析入站事件
    pub fn parse(raw: &str) -> Result<Self, RippleError> {
        let envelope: Envelope = serde_json::from_str(raw)
            .map_err(|err| RippleError::MalformedEvent(format!("invalid envelope: {err}")))?;

        match envelope.event.as_str() {
            "check-online" => {
                let data: CheckOnlineData = parse_data(envelope.data)?;
                Ok(ClientEvent::CheckOnline {
                    user_id: data.user_id,
                })
            }
            "typing" => {
                let data: TypingData = parse_data(envelope.data)?;
                Ok(ClientEvent::Typing {
                    conversation_id: data.conversation_id,
                    user_id: data.user_id,
                })
            }
            "send-message" => {
                let data: SendMessageData = parse_data(envelope.data)?;
                Ok(ClientEvent::SendMessage {
                    conversation_id: data.conversation_id,
                    sender_id: data.sender_id,
                    message_type: data.message_type,
                    body: data.body,
                })
            }
            "join-conversation" => {
                let data: ConversationData = parse_data(envelope.data)?;
                Ok(ClientEvent::JoinConversation {
                    conversation_id: data.conversation_id,
                })
            }
            "leave-conversation" => {
                let data: ConversationData = parse_data(envelope.data)?;
                Ok(ClientEvent::LeaveConversation {
                    conversation_id: data.conversation_id,
                })
            }
            other => Err(RippleError::MalformedEvent(format!(
                "unknown event: {other}"
            ))),
        }
    }
}

fn parse_data<T: serde::de::DeserializeOwned>(data: Value) -> Result<T, RippleError> {
    serde_json::from_value(data)
        .map_err(|err| RippleError::MalformedEvent(format!("invalid payload: {err}")))
}

/// 服务端出站帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFrame {
    pub event: String,
    pub data: Value,
}

impl ServerFrame {
    /// `online-status` 一次性查询回复,只发给提问的连接
    pub fn online_status(is_online: bool) -> Self {
        Self {
            event: "online-status".to_string(),
            data: serde_json::json!({ "isOnline": is_online }),
        }
    }

    /// `{userId}-connected` 上线广播
    pub fn user_connected(user_id: &str) -> Self {
        Self {
            event: format!("{user_id}-connected"),
            data: serde_json::json!({ "isOnline": true }),
        }
    }

    /// `{userId}-disconnected` 离线广播
    pub fn user_disconnected(user_id: &str) -> Self {
        Self {
            event: format!("{user_id}-disconnected"),
            data: serde_json::json!({ "isOnline": false }),
        }
    }

    /// `typing-{conversationId}` 输入中信号,接收端 2 秒自动过期
    pub fn typing(conversation_id: &str, user_id: &str) -> Self {
        Self {
            event: format!("typing-{conversation_id}"),
            data: serde_json::json!({
                "conversationId": conversation_id,
                "userId": user_id,
            }),
        }
    }

    /// `receive-message` 完整消息记录投递
    pub fn receive_message(message: &Message) -> Self {
        Self {
            event: "receive-message".to_string(),
            data: serde_json::to_value(message).unwrap_or(Value::Null),
        }
    }

    /// `socket-error` 类型化拒绝帧
    pub fn socket_error(code: &str, message: &str) -> Self {
        Self {
            event: "socket-error".to_string(),
            data: serde_json::json!({
                "code": code,
                "message": message,
            }),
        }
    }

    /// 序列化为线缆文本
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            "{\"event\":\"socket-error\",\"data\":{\"code\":\"INTERNAL\"}}".to_string()
        })
    }
}
