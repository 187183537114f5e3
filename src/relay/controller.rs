use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;

use super::decision::{RX1_INPUT, RX2_INPUT, RouteState, next_route};
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::output::{TickEvent, iso8601_timestamp};
use crate::pipeline::{Pipeline, PowerProbe, RouteSelect};
use crate::radio::TxRetune;

/// Cloneable handle for requesting a cooperative stop of the polling loop.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// Owns the decision state machine and drives the hardware through narrow
/// seams. Runs on a single logical thread; the only state shared with the
/// pipeline is the pair of power probe scalars.
pub struct RelayController {
    tx1_freq: f64,
    tx2_freq: f64,
    threshold: f64,
    poll_interval: Duration,
    rx1_probe: PowerProbe,
    rx2_probe: PowerProbe,
    tuner: Box<dyn TxRetune>,
    switch: Box<dyn RouteSelect>,
    pipeline: Box<dyn Pipeline>,
    state: RouteState,
    stop: Arc<AtomicBool>,
    events: Sender<TickEvent>,
}

impl RelayController {
    pub fn new(
        config: &RelayConfig,
        rx1_probe: PowerProbe,
        rx2_probe: PowerProbe,
        tuner: Box<dyn TxRetune>,
        switch: Box<dyn RouteSelect>,
        pipeline: Box<dyn Pipeline>,
        events: Sender<TickEvent>,
    ) -> Self {
        Self {
            tx1_freq: config.tx1_freq.as_hz(),
            tx2_freq: config.tx2_freq.as_hz(),
            threshold: config.detection_threshold,
            poll_interval: config.poll_interval,
            rx1_probe,
            rx2_probe,
            tuner,
            switch,
            pipeline,
            state: RouteState::Unset,
            stop: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    pub fn current_route(&self) -> RouteState {
        self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: self.stop.clone(),
        }
    }

    /// Bring up the streaming pipeline. Failure here is fatal; the polling
    /// loop is never entered.
    pub fn start(&mut self) -> Result<()> {
        self.pipeline.start()?;
        log::info!("relay started");
        Ok(())
    }

    /// One decision step: read both probes, apply the routing policy, issue
    /// hardware commands on a state change, and emit a tick event either
    /// way.
    ///
    /// Command failures are contained here: logged, surfaced on the event,
    /// and the state optimistically becomes the intended route. Actual
    /// hardware may lag the state until the next successful transition.
    pub fn poll_tick(&mut self) -> TickEvent {
        let rx1_power = self.rx1_probe.level();
        let rx2_power = self.rx2_probe.level();

        let target = next_route(self.state, rx1_power, rx2_power, self.threshold);

        let mut command_error = None;
        if target != self.state {
            if let Err(e) = self.apply_route(target) {
                log::warn!("route change to {:?} failed: {}", target, e);
                command_error = Some(e.to_string());
            }
            self.state = target;
        }

        let event = TickEvent {
            rx1_power,
            rx2_power,
            route: self.state,
            command_error,
            timestamp: iso8601_timestamp(),
        };
        // A slow consumer must not stall the tick; drop the event instead.
        let _ = self.events.try_send(event.clone());
        event
    }

    /// Retune first, then flip the switch. Briefly carrying the old path on
    /// the new frequency is acceptable; putting the new path on the old,
    /// possibly unlicensed frequency is not.
    fn apply_route(&mut self, target: RouteState) -> Result<()> {
        let (freq, input) = match target {
            RouteState::Rx1 => (self.tx1_freq, RX1_INPUT),
            RouteState::Rx2 => (self.tx2_freq, RX2_INPUT),
            RouteState::Unset => return Ok(()),
        };
        self.tuner.set_center_frequency(freq)?;
        self.switch.select(input)?;
        log::info!("routed input {} -> tx {:.6} MHz", input, freq / 1e6);
        Ok(())
    }

    /// The polling loop. Returns once a stop has been requested and the
    /// pipeline has been torn down; no hardware command is issued after
    /// return.
    pub fn run(&mut self) -> Result<()> {
        while !self.stop.load(Ordering::Relaxed) {
            self.poll_tick();
            thread::sleep(self.poll_interval);
        }

        log::info!("stop requested, draining pipeline");
        self.pipeline.stop();
        match self.pipeline.await_drain() {
            Ok(()) => Ok(()),
            Err(e @ RelayError::Shutdown(_)) => {
                // Best-effort teardown: report it, do not hang the process.
                log::error!("{}", e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}
