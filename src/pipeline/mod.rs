pub mod engine;
pub mod probe;
pub mod switch;

pub use engine::{PipelineEngine, ReceivePath};
pub use probe::PowerProbe;
pub use switch::{NO_ROUTE, RouteSelect, RouteSwitch};

use crate::error::Result;

/// Lifecycle of the streaming topology.
///
/// The controller only ever drives the pipeline through this seam: bring it
/// up once, request a stop, then wait (bounded) for in-flight samples to
/// drain.
pub trait Pipeline: Send {
    fn start(&mut self) -> Result<()>;

    /// Request termination. Returns immediately; workers observe the stop
    /// flag cooperatively.
    fn stop(&mut self);

    /// Wait for workers to finish, up to the configured drain timeout.
    fn await_drain(&mut self) -> Result<()>;
}
