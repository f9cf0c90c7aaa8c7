pub mod config_store;
pub mod date_utils;
pub mod event_bus;
pub mod icons;
pub mod notifications;
pub mod theme;
