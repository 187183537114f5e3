//! Deterministic stand-ins for SDR hardware.
//!
//! `BurstSource` produces seeded carrier bursts over a noise floor so the
//! relay can be exercised end to end without radios; the harness types
//! record every control-plane command for assertions on order and count.

mod harness;
mod source;

pub use harness::{Command, CommandLog, LoggedSwitch, LoggedTuner, MockPipeline, NullSink};
pub use source::{BurstProfile, BurstSource};
