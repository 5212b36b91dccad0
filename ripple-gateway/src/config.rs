//! 网关服务配置

use ripple_common::utils::{env_or, env_parse_or};

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// websocket 监听地址
    pub listen_addr: String,
    /// Redis 连接串 (在线注册表 + 扇出总线)
    pub redis_url: String,
    /// 在线表项 TTL 安全网 (秒),连接存活期间由心跳续期
    pub presence_ttl_seconds: u64,
    /// Kafka 集群地址
    pub kafka_bootstrap: String,
    /// 持久化摄入主题
    pub kafka_topic: String,
    /// Kafka 发送超时 (毫秒)
    pub kafka_timeout_ms: u64,
    /// 凭证校验密钥
    pub jwt_secret: String,
    /// 空闲超时 (秒),到期连接转入 Disconnected
    pub idle_timeout_seconds: u64,
    /// 保活 ping 间隔 (秒)
    pub ping_interval_seconds: u64,
}

impl GatewayConfig {
    /// 从环境变量加载
    pub fn from_env() -> Self {
        Self {
            listen_addr: env_or("RIPPLE_GATEWAY_LISTEN_ADDR", "0.0.0.0:8080"),
            redis_url: env_or("RIPPLE_REDIS_URL", "redis://127.0.0.1:6379"),
            presence_ttl_seconds: env_parse_or("RIPPLE_PRESENCE_TTL_SECONDS", 300),
            kafka_bootstrap: env_or("RIPPLE_KAFKA_BOOTSTRAP_SERVERS", "127.0.0.1:9092"),
            kafka_topic: env_or("RIPPLE_KAFKA_TOPIC", "messages"),
            kafka_timeout_ms: env_parse_or("RIPPLE_KAFKA_TIMEOUT_MS", 5000),
            jwt_secret: env_or("RIPPLE_JWT_SECRET", "dev-secret"),
            idle_timeout_seconds: env_parse_or("RIPPLE_IDLE_TIMEOUT_SECONDS", 60),
            ping_interval_seconds: env_parse_or("RIPPLE_PING_INTERVAL_SECONDS", 30),
        }
    }
}
