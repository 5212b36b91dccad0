//! # Prometheus 指标收集模块

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// 全局指标注册表
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// 网关服务指标
pub struct GatewayMetrics {
    /// 当前活跃连接数
    pub active_connections: IntGauge,
    /// 成功进入双写的消息总数
    pub messages_sent_total: IntCounter,
    /// 持久化入队失败次数
    pub enqueue_failure_total: IntCounter,
    /// 扇出总线发布失败次数
    pub publish_failure_total: IntCounter,
    /// 被拒绝的入站事件数 (按错误码)
    pub events_rejected_total: IntCounterVec,
    /// 从总线转发到本地连接的事件数
    pub bus_events_delivered_total: IntCounter,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        let active_connections = IntGauge::new(
            "gateway_active_connections",
            "Number of currently connected clients",
        )
        .expect("Failed to create gateway_active_connections metric");

        let messages_sent_total = IntCounter::new(
            "gateway_messages_sent_total",
            "Total number of messages accepted into the dual-write path",
        )
        .expect("Failed to create gateway_messages_sent_total metric");

        let enqueue_failure_total = IntCounter::new(
            "gateway_enqueue_failure_total",
            "Total number of durable enqueue failures",
        )
        .expect("Failed to create gateway_enqueue_failure_total metric");

        let publish_failure_total = IntCounter::new(
            "gateway_publish_failure_total",
            "Total number of fan-out publish failures",
        )
        .expect("Failed to create gateway_publish_failure_total metric");

        let events_rejected_total = IntCounterVec::new(
            Opts::new(
                "gateway_events_rejected_total",
                "Total number of rejected inbound events",
            ),
            &["code"],
        )
        .expect("Failed to create gateway_events_rejected_total metric");

        let bus_events_delivered_total = IntCounter::new(
            "gateway_bus_events_delivered_total",
            "Total number of bus events routed to local sockets",
        )
        .expect("Failed to create gateway_bus_events_delivered_total metric");

        // 注册指标,忽略重复注册错误 (测试中可能重复创建)
        let _ = REGISTRY.register(Box::new(active_connections.clone()));
        let _ = REGISTRY.register(Box::new(messages_sent_total.clone()));
        let _ = REGISTRY.register(Box::new(enqueue_failure_total.clone()));
        let _ = REGISTRY.register(Box::new(publish_failure_total.clone()));
        let _ = REGISTRY.register(Box::new(events_rejected_total.clone()));
        let _ = REGISTRY.register(Box::new(bus_events_delivered_total.clone()));

        Self {
            active_connections,
            messages_sent_total,
            enqueue_failure_total,
            publish_failure_total,
            events_rejected_total,
            bus_events_delivered_total,
        }
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
