//! 写入器应用层

pub mod persist_service;

pub use persist_service::PersistService;
