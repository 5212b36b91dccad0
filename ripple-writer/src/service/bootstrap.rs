//! 应用启动器 - 负责依赖注入和服务启动

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::application::PersistService;
use crate::config::WriterConfig;
use crate::domain::MessageStore;
use crate::infrastructure::persistence::PostgresMessageStore;
use crate::interface::messaging::MessageConsumer;
use crate::metrics::WriterMetrics;

pub struct ApplicationBootstrap;

impl ApplicationBootstrap {
    /// 运行应用的主入口点
    pub async fn run(config: WriterConfig) -> Result<()> {
        let config = Arc::new(config);
        let metrics = Arc::new(WriterMetrics::new());

        let store: Arc<dyn MessageStore> =
            Arc::new(PostgresMessageStore::new(config.as_ref()).await?);
        let persist = Arc::new(PersistService::new(
            store,
            Duration::from_secs(config.backoff_seconds),
            metrics.clone(),
        ));
        let consumer = Arc::new(MessageConsumer::new(config, persist, metrics)?);

        info!("persistence writer started, consuming from kafka");

        tokio::select! {
            result = consumer.consume_messages() => {
                if let Err(err) = result {
                    tracing::error!(error = %err, "message consumer failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
            }
        }

        info!("persistence writer stopped");
        Ok(())
    }
}
