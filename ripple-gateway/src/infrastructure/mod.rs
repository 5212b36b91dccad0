//! 网关基础设施层

pub mod bus;
pub mod messaging;
pub mod presence;
