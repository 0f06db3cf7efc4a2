mod application;
pub mod data;
mod report;
mod runtime_config;

pub use application::{Application, ApplicationError};
pub use runtime_config::{Action, RuntimeConfig};
