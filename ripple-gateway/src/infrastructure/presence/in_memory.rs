//! 内存在线状态注册表 (测试用)

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ripple_common::RippleResult;
use tokio::sync::RwLock;

use crate::domain::PresenceRegistry;

#[derive(Default)]
pub struct InMemoryPresenceRegistry {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryPresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前绑定的连接ID (测试断言用)
    pub async fn connection_of(&self, user_id: &str) -> Option<String> {
        let guard = self.inner.read().await;
        guard.get(user_id).cloned()
    }
}

#[async_trait]
impl PresenceRegistry for InMemoryPresenceRegistry {
    async fn set_online(&self, user_id: &str, connection_id: &str) -> RippleResult<()> {
        let mut guard = self.inner.write().await;
        guard.insert(user_id.to_string(), connection_id.to_string());
        Ok(())
    }

    async fn clear_online(&self, user_id: &str) -> RippleResult<()> {
        let mut guard = self.inner.write().await;
        guard.remove(user_id);
        Ok(())
    }

    async fn is_online(&self, user_id: &str) -> RippleResult<bool> {
        let guard = self.inner.read().await;
        Ok(guard.contains_key(user_id))
    }
}
