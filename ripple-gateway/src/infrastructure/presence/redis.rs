//! Redis 在线状态注册表
//!
//! `user:{user_id} -> connection_id`,带 TTL 安全网。注册表无持久化
//! 要求,Redis 重启丢失表项是合法的,查询侧一律把缺失当离线。

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use ripple_common::RippleResult;

use crate::config::GatewayConfig;
use crate::domain::PresenceRegistry;

const PRESENCE_KEY_PREFIX: &str = "user";

pub struct RedisPresenceRegistry {
    conn: ConnectionManager,
    config: Arc<GatewayConfig>,
}

impl RedisPresenceRegistry {
    /// 复用多路复用连接,断线由 ConnectionManager 自动重连
    pub fn new(conn: ConnectionManager, config: Arc<GatewayConfig>) -> Self {
        Self { conn, config }
    }

    fn presence_key(&self, user_id: &str) -> String {
        format!("{PRESENCE_KEY_PREFIX}:{user_id}")
    }
}

#[async_trait]
impl PresenceRegistry for RedisPresenceRegistry {
    async fn set_online(&self, user_id: &str, connection_id: &str) -> RippleResult<()> {
        let mut conn = self.conn.clone();
        let key = self.presence_key(user_id);
        let _: () = conn
            .set_ex(&key, connection_id, self.config.presence_ttl_seconds)
            .await
            .context("failed to store presence entry")?;
        Ok(())
    }

    async fn clear_online(&self, user_id: &str) -> RippleResult<()> {
        let mut conn = self.conn.clone();
        let key = self.presence_key(user_id);
        let _: usize = conn
            .del(&key)
            .await
            .context("failed to delete presence entry")?;
        Ok(())
    }

    async fn is_online(&self, user_id: &str) -> RippleResult<bool> {
        let mut conn = self.conn.clone();
        let key = self.presence_key(user_id);
        let value: Option<String> = conn
            .get(&key)
            .await
            .context("failed to read presence entry")?;
        Ok(value.is_some())
    }
}
