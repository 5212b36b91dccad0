//! # Prometheus 指标收集模块

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};

/// 全局指标注册表
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// 持久化写入器指标
pub struct WriterMetrics {
    /// 成功落库的消息总数
    pub messages_persisted_total: IntCounter,
    /// 写失败触发的退避重试次数
    pub persist_retries_total: IntCounter,
    /// 被跳过的坏载荷数
    pub malformed_payload_total: IntCounter,
    /// 单批处理的记录数分布
    pub batch_size: Histogram,
}

impl WriterMetrics {
    pub fn new() -> Self {
        let messages_persisted_total = IntCounter::new(
            "writer_messages_persisted_total",
            "Total number of messages written to the system of record",
        )
        .expect("Failed to create writer_messages_persisted_total metric");

        let persist_retries_total = IntCounter::new(
            "writer_persist_retries_total",
            "Total number of backoff retries after a failed write",
        )
        .expect("Failed to create writer_persist_retries_total metric");

        let malformed_payload_total = IntCounter::new(
            "writer_malformed_payload_total",
            "Total number of undecodable queue payloads skipped",
        )
        .expect("Failed to create writer_malformed_payload_total metric");

        let batch_size = Histogram::with_opts(
            HistogramOpts::new("writer_batch_size", "Number of records per consumed batch")
                .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        )
        .expect("Failed to create writer_batch_size metric");

        // 注册指标,忽略重复注册错误 (测试中可能重复创建)
        let _ = REGISTRY.register(Box::new(messages_persisted_total.clone()));
        let _ = REGISTRY.register(Box::new(persist_retries_total.clone()));
        let _ = REGISTRY.register(Box::new(malformed_payload_total.clone()));
        let _ = REGISTRY.register(Box::new(batch_size.clone()));

        Self {
            messages_persisted_total,
            persist_retries_total,
            malformed_payload_total,
            batch_size,
        }
    }
}

impl Default for WriterMetrics {
    fn default() -> Self {
        Self::new()
    }
}
