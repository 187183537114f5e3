pub mod controller;
pub mod decision;

pub use controller::{RelayController, StopHandle};
pub use decision::{RX1_INPUT, RX2_INPUT, RouteState, next_route};
