pub mod config;
pub mod error;
pub mod event_mapper;
pub mod logging;
pub mod wellness_client;
