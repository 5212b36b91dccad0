//! 写入器基础设施层

pub mod persistence;
