//! 写入器服务装配

pub mod bootstrap;
