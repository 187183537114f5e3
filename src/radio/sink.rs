use num_complex::Complex32;

use crate::error::Result;

/// The transmit hardware endpoint.
///
/// Receives whole batches from the route switch; batches are never
/// interleaved across inputs.
pub trait TransmitSink: Send {
    fn send(&mut self, batch: &[Complex32]) -> anyhow::Result<()>;
}

/// Control-plane handle for retuning the transmit chain.
///
/// The only mutation the controller performs on live hardware. A retune
/// must have completed before the route switch is flipped to the new path
/// (see `relay::RelayController::apply_route`).
pub trait TxRetune: Send {
    fn set_center_frequency(&mut self, hz: f64) -> Result<()>;
}
