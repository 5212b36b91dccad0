//! 输入中状态跟踪
//!
//! 协议中不存在显式的 "停止输入" 事件,接收端必须在固定的
//! 2 秒窗口后自动让 "正在输入" 状态失效。该结构是接收端共用的
//! 状态保持器:网关只转发信号,过期判定发生在查询侧。

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// 默认的输入中信号有效窗口
pub const TYPING_WINDOW: Duration = Duration::from_secs(2);

/// 会话级输入中状态跟踪器
pub struct TypingTracker {
    window: Duration,
    entries: Mutex<HashMap<(String, String), Instant>>,
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new(TYPING_WINDOW)
    }
}

impl TypingTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// 记录一次输入中信号,刷新该用户在该会话的窗口
    pub fn mark(&self, conversation_id: &str, user_id: &str) {
        let mut entries = self.entries.lock().expect("typing tracker poisoned");
        entries.insert(
            (conversation_id.to_string(), user_id.to_string()),
            Instant::now(),
        );
    }

    /// 查询该用户在该会话是否仍处于输入中窗口内
    ///
    /// 过期表项在查询时顺带清除。
    pub fn is_typing(&self, conversation_id: &str, user_id: &str) -> bool {
        let mut entries = self.entries.lock().expect("typing tracker poisoned");
        let key = (conversation_id.to_string(), user_id.to_string());
        match entries.get(&key) {
            Some(marked_at) if marked_at.elapsed() < self.window => true,
            Some(_) => {
                entries.remove(&key);
                false
            }
            None => false,
        }
    }

}
