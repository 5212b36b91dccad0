//! 网关服务装配

pub mod bootstrap;
