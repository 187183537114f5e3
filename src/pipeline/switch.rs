use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;

/// Selection value meaning "forward nothing" (transmitter effectively muted).
pub const NO_ROUTE: usize = usize::MAX;

/// Control-plane handle for selecting the route switch input.
///
/// Issued by the controller thread only, at most once per tick, and only
/// after the transmit retune for the same transition has completed.
pub trait RouteSelect: Send {
    fn select(&mut self, input: usize) -> Result<()>;
}

/// N-input, 1-output selector.
///
/// The data plane forwards whole batches of exactly one input, so a
/// selection change is atomic at batch granularity: output never interleaves
/// samples from two inputs.
#[derive(Clone)]
pub struct RouteSwitch {
    selected: Arc<AtomicUsize>,
}

impl RouteSwitch {
    /// New switch with no input selected.
    pub fn new() -> Self {
        Self {
            selected: Arc::new(AtomicUsize::new(NO_ROUTE)),
        }
    }

    /// Data-plane check used by pipeline workers.
    pub fn is_selected(&self, input: usize) -> bool {
        self.selected.load(Ordering::Relaxed) == input
    }

    pub fn selected(&self) -> Option<usize> {
        match self.selected.load(Ordering::Relaxed) {
            NO_ROUTE => None,
            input => Some(input),
        }
    }
}

impl Default for RouteSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteSelect for RouteSwitch {
    fn select(&mut self, input: usize) -> Result<()> {
        self.selected.store(input, Ordering::Relaxed);
        Ok(())
    }
}
