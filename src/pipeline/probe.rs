use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use num_complex::Complex32;

/// Shared atomic storing the latest power estimate as f64 bits.
///
/// Written by one pipeline worker, read by the controller's polling loop.
/// A single atomic word can never deliver a torn value; no history is kept,
/// only the estimate from the most recent batch.
#[derive(Clone)]
pub struct PowerProbe {
    level: Arc<AtomicU64>,
}

impl PowerProbe {
    pub fn new() -> Self {
        Self {
            level: Arc::new(AtomicU64::new(0.0f64.to_bits())),
        }
    }

    /// Latest mean magnitude-squared power (non-negative).
    pub fn level(&self) -> f64 {
        f64::from_bits(self.level.load(Ordering::Relaxed))
    }

    /// Update the estimate from one batch of baseband samples.
    ///
    /// An empty batch leaves the previous estimate in place.
    pub fn observe(&self, batch: &[Complex32]) {
        if batch.is_empty() {
            return;
        }
        let sum: f64 = batch.iter().map(|s| s.norm_sqr() as f64).sum();
        let mean = sum / batch.len() as f64;
        self.level.store(mean.to_bits(), Ordering::Relaxed);
    }
}

impl Default for PowerProbe {
    fn default() -> Self {
        Self::new()
    }
}
