pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod radio;
pub mod relay;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use relay::{RelayController, RouteState};
