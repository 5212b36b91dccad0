//! 网关接入层

pub mod clients;
pub mod ws;
