//! 管线共享工具函数

use chrono::Utc;

/// 获取当前时间戳 (毫秒)
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// 生成全局唯一消息/连接ID
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 验证用户ID有效性
pub fn validate_user_id(user_id: &str) -> Result<(), String> {
    if user_id.is_empty() {
        return Err("User ID cannot be empty".to_string());
    }
    if user_id.len() > 255 {
        return Err("User ID too long (max 255 characters)".to_string());
    }
    Ok(())
}

/// 验证会话ID有效性
pub fn validate_conversation_id(conversation_id: &str) -> Result<(), String> {
    if conversation_id.is_empty() {
        return Err("Conversation ID cannot be empty".to_string());
    }
    if conversation_id.len() > 255 {
        return Err("Conversation ID too long (max 255 characters)".to_string());
    }
    Ok(())
}

/// 读取环境变量并解析,失败时回退默认值
pub fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// 读取环境变量,缺失时回退默认值
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
