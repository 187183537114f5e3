use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use num_complex::Complex32;

use crate::error::{RelayError, Result};
use crate::pipeline::{Pipeline, RouteSelect};
use crate::radio::{TransmitSink, TxRetune};

/// A control-plane command as observed at the hardware seam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Retune(f64),
    Select(usize),
}

/// Shared, ordered record of every command issued by the controller.
#[derive(Clone, Default)]
pub struct CommandLog {
    inner: Arc<Mutex<Vec<Command>>>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: Command) {
        self.inner.lock().unwrap().push(command);
    }

    pub fn commands(&self) -> Vec<Command> {
        self.inner.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn retunes(&self) -> Vec<f64> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Retune(hz) => Some(hz),
                Command::Select(_) => None,
            })
            .collect()
    }
}

/// Transmit tuner that records retunes; optionally fails every command to
/// exercise the optimistic-state policy.
pub struct LoggedTuner {
    log: CommandLog,
    fail_with: Option<String>,
}

impl LoggedTuner {
    pub fn new(log: CommandLog) -> Self {
        Self {
            log,
            fail_with: None,
        }
    }

    pub fn failing(log: CommandLog, reason: &str) -> Self {
        Self {
            log,
            fail_with: Some(reason.to_string()),
        }
    }
}

impl TxRetune for LoggedTuner {
    fn set_center_frequency(&mut self, hz: f64) -> Result<()> {
        if let Some(ref reason) = self.fail_with {
            return Err(RelayError::Command {
                command: "retune",
                reason: reason.clone(),
            });
        }
        self.log.push(Command::Retune(hz));
        Ok(())
    }
}

/// Route switch that records selections into the shared log; optionally
/// fails every command to exercise the optimistic-state policy.
pub struct LoggedSwitch {
    log: CommandLog,
    fail_with: Option<String>,
}

impl LoggedSwitch {
    pub fn new(log: CommandLog) -> Self {
        Self {
            log,
            fail_with: None,
        }
    }

    pub fn failing(log: CommandLog, reason: &str) -> Self {
        Self {
            log,
            fail_with: Some(reason.to_string()),
        }
    }
}

impl RouteSelect for LoggedSwitch {
    fn select(&mut self, input: usize) -> Result<()> {
        if let Some(ref reason) = self.fail_with {
            return Err(RelayError::Command {
                command: "select",
                reason: reason.clone(),
            });
        }
        self.log.push(Command::Select(input));
        Ok(())
    }
}

/// Transmit sink that discards samples and counts batches.
#[derive(Clone, Default)]
pub struct NullSink {
    batches: Arc<AtomicUsize>,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches_sent(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }
}

impl TransmitSink for NullSink {
    fn send(&mut self, _batch: &[Complex32]) -> anyhow::Result<()> {
        self.batches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Pipeline stub exposing its lifecycle as observable flags.
#[derive(Clone, Default)]
pub struct MockPipeline {
    started: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    drained: Arc<AtomicBool>,
    fail_start: bool,
}

impl MockPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn started(&self) -> bool {
        self.started.load(Ordering::Relaxed)
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    pub fn drained(&self) -> bool {
        self.drained.load(Ordering::Relaxed)
    }
}

impl Pipeline for MockPipeline {
    fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(RelayError::Startup("simulated device open failure".into()));
        }
        self.started.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    fn await_drain(&mut self) -> Result<()> {
        self.drained.store(true, Ordering::Relaxed);
        Ok(())
    }
}
