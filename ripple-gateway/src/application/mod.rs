//! 网关应用层

pub mod delivery;
pub mod event_service;

pub use delivery::FanoutListener;
pub use event_service::EventService;
