//! Ripple Common
//!
//! 消息投递管线共享代码库,包含:
//! - 共享数据模型 (models)
//! - 客户端事件协议 (protocol)
//! - 共享错误类型 (error)
//! - 凭证校验服务 (auth)
//! - 输入中状态跟踪 (typing)
//! - 共享工具函数 (utils)
//!
//! 被 gateway、writer 两个服务共同使用

pub mod auth;
pub mod error;
pub mod models;
pub mod protocol;
pub mod typing;
pub mod utils;

// 导出常用类型
pub use error::{RippleError, RippleResult};
pub use models::*;
