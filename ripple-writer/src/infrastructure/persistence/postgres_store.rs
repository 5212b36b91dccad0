//! PostgreSQL 系统记录库
//!
//! 网关分配的时间戳原样落库:客户端在实时路径看到的
//! `created_at` 与记录库中同一 `id` 的行保持位相同。

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ripple_common::RippleResult;
use ripple_common::error::RippleError;
use ripple_common::models::Message;
use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

use crate::config::WriterConfig;
use crate::domain::MessageStore;

pub struct PostgresMessageStore {
    pool: Pool<Postgres>,
}

impl PostgresMessageStore {
    pub async fn new(config: &WriterConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.postgres_max_connections)
            .acquire_timeout(Duration::from_secs(config.postgres_acquire_timeout_seconds))
            .connect(&config.postgres_url)
            .await
            .context("failed to connect to postgres")?;

        let store = Self { pool };
        store
            .init_schema()
            .await
            .context("failed to initialize postgres schema")?;
        Ok(store)
    }

    /// 初始化数据库表结构 (如果不存在)
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                message_type TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL,
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_messages_conversation_id
            ON messages(conversation_id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_messages_conversation_created
            ON messages(conversation_id, created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_messages_sender_id
            ON messages(sender_id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn to_datetime(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn store(&self, message: &Message) -> RippleResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (
                id, conversation_id, sender_id, message_type, body, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET conversation_id = EXCLUDED.conversation_id,
                sender_id = EXCLUDED.sender_id,
                message_type = EXCLUDED.message_type,
                body = EXCLUDED.body,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.sender_id)
        .bind(message.message_type.as_str())
        .bind(&message.body)
        .bind(Self::to_datetime(message.created_at))
        .bind(Self::to_datetime(message.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|err| RippleError::PersistenceFailure(err.to_string()))?;

        Ok(())
    }
}
