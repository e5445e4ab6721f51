pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

pub use application::controller::{BreakSchedulingController, ControllerSnapshot};
pub use infrastructure::error::InfraError;
