//! 应用启动器 - 负责依赖注入和服务启动

use std::sync::Arc;

use anyhow::{Context, Result};
use ripple_common::auth::TokenService;
use ripple_common::typing::TypingTracker;
use tracing::info;

use crate::application::{EventService, FanoutListener};
use crate::config::GatewayConfig;
use crate::domain::channels::gateway_patterns;
use crate::domain::{FanoutBus, MessageQueue, PresenceRegistry};
use crate::infrastructure::bus::RedisFanoutBus;
use crate::infrastructure::messaging::KafkaMessageQueue;
use crate::infrastructure::presence::RedisPresenceRegistry;
use crate::interface::clients::ClientRegistry;
use crate::interface::ws::{GatewayState, create_router};
use crate::metrics::GatewayMetrics;

pub struct ApplicationBootstrap;

impl ApplicationBootstrap {
    /// 运行应用的主入口点
    pub async fn run(config: GatewayConfig) -> Result<()> {
        let config = Arc::new(config);

        let redis_client = Arc::new(
            redis::Client::open(config.redis_url.as_str())
                .context("failed to build redis client")?,
        );
        let redis_conn =
            redis::aio::ConnectionManager::new(redis_client.as_ref().clone())
                .await
                .context("failed to open redis connection")?;

        // 注册表/总线/队列以注入句柄进入网关,不使用模块级单例
        let presence: Arc<dyn PresenceRegistry> = Arc::new(RedisPresenceRegistry::new(
            redis_conn.clone(),
            config.clone(),
        ));
        let bus: Arc<dyn FanoutBus> =
            Arc::new(RedisFanoutBus::new(redis_client, redis_conn));
        let queue: Arc<dyn MessageQueue> = Arc::new(KafkaMessageQueue::new(config.clone())?);

        let metrics = Arc::new(GatewayMetrics::new());
        let clients = Arc::new(ClientRegistry::new());
        let events = Arc::new(EventService::new(
            presence,
            bus.clone(),
            queue,
            metrics.clone(),
        ));
        let tokens = Arc::new(TokenService::new(&config.jwt_secret));

        // 实例生命周期内的总线监听任务
        let stream = bus
            .subscribe(&gateway_patterns())
            .await
            .context("failed to subscribe to fanout bus")?;
        let typing = Arc::new(TypingTracker::default());
        let listener_task = tokio::spawn(
            FanoutListener::new(clients.clone(), typing, metrics.clone()).run(stream),
        );

        let state = Arc::new(GatewayState {
            config: config.clone(),
            clients,
            events,
            tokens,
            metrics,
        });
        let router = create_router(state);

        let listener = tokio::net::TcpListener::bind(&config.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", config.listen_addr))?;
        info!(addr = %config.listen_addr, "gateway listening");

        tokio::select! {
            result = axum::serve(listener, router) => {
                result.context("gateway server failed")?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
            }
        }

        listener_task.abort();
        info!("gateway stopped");
        Ok(())
    }
}
