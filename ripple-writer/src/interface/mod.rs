//! 写入器接入层

pub mod messaging;
