use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, bounded};
use num_complex::Complex32;

use super::probe::PowerProbe;
use super::switch::RouteSwitch;
use crate::error::{RelayError, Result};
use crate::pipeline::Pipeline;
use crate::radio::{SampleSource, TransmitSink};

/// One receive branch of the topology: a sample source plus the power tap
/// the controller reads.
pub struct ReceivePath {
    pub source: Box<dyn SampleSource>,
    pub probe: PowerProbe,
}

/// Owns the streaming topology: sources feed power probes and the route
/// switch; the selected path's batches reach the transmit sink.
///
/// One worker thread per receive path plus a mux thread for the sink. All
/// threads observe a shared stop flag; `await_drain` is bounded by the
/// configured timeout so a stalled hardware call cannot hang shutdown.
pub struct PipelineEngine {
    paths: Option<Vec<ReceivePath>>,
    sink: Option<Box<dyn TransmitSink>>,
    switch: RouteSwitch,
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
    drain_timeout: Duration,
}

impl PipelineEngine {
    pub fn new(
        paths: Vec<ReceivePath>,
        switch: RouteSwitch,
        sink: Box<dyn TransmitSink>,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            paths: Some(paths),
            sink: Some(sink),
            switch,
            stop: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
            drain_timeout,
        }
    }
}

impl Pipeline for PipelineEngine {
    fn start(&mut self) -> Result<()> {
        let paths = self
            .paths
            .take()
            .ok_or_else(|| RelayError::Startup("pipeline already started".to_string()))?;
        let mut sink = self
            .sink
            .take()
            .ok_or_else(|| RelayError::Startup("pipeline already started".to_string()))?;

        let (batch_tx, batch_rx) = bounded::<(usize, Vec<Complex32>)>(4);

        for (input, path) in paths.into_iter().enumerate() {
            let ReceivePath { mut source, probe } = path;
            let stop = self.stop.clone();
            let switch = self.switch.clone();
            let tx = batch_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("rx{}-worker", input + 1))
                .spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        match source.next_batch() {
                            Ok(Some(batch)) => {
                                probe.observe(&batch);
                                if switch.is_selected(input) && tx.send((input, batch)).is_err() {
                                    break;
                                }
                            }
                            Ok(None) => {
                                log::warn!("rx{} stream ended", input + 1);
                                break;
                            }
                            Err(e) => {
                                log::error!("rx{} read failed: {}", input + 1, e);
                                break;
                            }
                        }
                    }
                })
                .map_err(|e| RelayError::Startup(format!("spawn failed: {}", e)))?;
            self.handles.push(handle);
        }
        drop(batch_tx);

        let stop = self.stop.clone();
        let switch = self.switch.clone();
        let handle = thread::Builder::new()
            .name("tx-mux".to_string())
            .spawn(move || {
                loop {
                    match batch_rx.recv_timeout(Duration::from_millis(50)) {
                        Ok((input, batch)) => {
                            // Selection may have moved since the batch was
                            // enqueued; stale batches are dropped, not sent.
                            if !switch.is_selected(input) {
                                continue;
                            }
                            if let Err(e) = sink.send(&batch) {
                                log::error!("transmit sink error: {}", e);
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if stop.load(Ordering::Relaxed) {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|e| RelayError::Startup(format!("spawn failed: {}", e)))?;
        self.handles.push(handle);

        log::info!("pipeline started ({} receive paths)", self.handles.len() - 1);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    fn await_drain(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.drain_timeout;
        let mut stuck = Vec::new();

        for handle in std::mem::take(&mut self.handles) {
            let name = handle
                .thread()
                .name()
                .unwrap_or("worker")
                .to_string();
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                if handle.join().is_err() {
                    log::error!("{} panicked", name);
                }
            } else {
                // Likely blocked inside a hardware call; leave it detached
                // rather than hang the process.
                stuck.push(name);
            }
        }

        if stuck.is_empty() {
            Ok(())
        } else {
            Err(RelayError::Shutdown(format!(
                "threads still running: {}",
                stuck.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::switch::RouteSelect;
    use std::sync::Mutex;

    struct VecSource {
        batches: Vec<Vec<Complex32>>,
    }

    impl SampleSource for VecSource {
        fn next_batch(&mut self) -> anyhow::Result<Option<Vec<Complex32>>> {
            if self.batches.is_empty() {
                // Pace the end of stream so workers do not spin
                thread::sleep(Duration::from_millis(1));
                return Ok(None);
            }
            thread::sleep(Duration::from_millis(1));
            Ok(Some(self.batches.remove(0)))
        }

        fn sample_rate(&self) -> u32 {
            2_400_000
        }
    }

    #[derive(Clone)]
    struct CountingSink {
        forwarded: Arc<Mutex<Vec<usize>>>,
    }

    impl TransmitSink for CountingSink {
        fn send(&mut self, batch: &[Complex32]) -> anyhow::Result<()> {
            self.forwarded.lock().unwrap().push(batch.len());
            Ok(())
        }
    }

    fn constant_batches(value: f32, len: usize, count: usize) -> Vec<Vec<Complex32>> {
        (0..count)
            .map(|_| vec![Complex32::new(value, 0.0); len])
            .collect()
    }

    #[test]
    fn test_probes_updated_and_unrouted_forwards_nothing() {
        let rx1_probe = PowerProbe::new();
        let rx2_probe = PowerProbe::new();
        let switch = RouteSwitch::new();
        let forwarded = Arc::new(Mutex::new(Vec::new()));

        let mut engine = PipelineEngine::new(
            vec![
                ReceivePath {
                    source: Box::new(VecSource {
                        batches: constant_batches(0.5, 64, 3),
                    }),
                    probe: rx1_probe.clone(),
                },
                ReceivePath {
                    source: Box::new(VecSource {
                        batches: constant_batches(0.1, 64, 3),
                    }),
                    probe: rx2_probe.clone(),
                },
            ],
            switch,
            Box::new(CountingSink {
                forwarded: forwarded.clone(),
            }),
            Duration::from_secs(1),
        );

        engine.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        engine.stop();
        engine.await_drain().unwrap();

        use approx::assert_abs_diff_eq;
        assert_abs_diff_eq!(rx1_probe.level(), 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(rx2_probe.level(), 0.01, epsilon = 1e-6);
        assert!(forwarded.lock().unwrap().is_empty());
    }

    #[test]
    fn test_selected_input_reaches_sink() {
        let mut switch = RouteSwitch::new();
        switch.select(1).unwrap();
        let forwarded = Arc::new(Mutex::new(Vec::new()));

        let mut engine = PipelineEngine::new(
            vec![
                ReceivePath {
                    source: Box::new(VecSource {
                        batches: constant_batches(0.5, 64, 5),
                    }),
                    probe: PowerProbe::new(),
                },
                ReceivePath {
                    source: Box::new(VecSource {
                        batches: constant_batches(0.2, 32, 5),
                    }),
                    probe: PowerProbe::new(),
                },
            ],
            switch,
            Box::new(CountingSink {
                forwarded: forwarded.clone(),
            }),
            Duration::from_secs(1),
        );

        engine.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        engine.stop();
        engine.await_drain().unwrap();

        let forwarded = forwarded.lock().unwrap();
        assert!(!forwarded.is_empty());
        // Only RX2 batches (len 32) may reach the sink
        assert!(forwarded.iter().all(|&len| len == 32));
    }

    struct BlockedSource;

    impl SampleSource for BlockedSource {
        fn next_batch(&mut self) -> anyhow::Result<Option<Vec<Complex32>>> {
            // A hardware call that never returns
            thread::sleep(Duration::from_secs(3600));
            Ok(None)
        }

        fn sample_rate(&self) -> u32 {
            2_400_000
        }
    }

    #[test]
    fn test_drain_is_bounded_with_stuck_worker() {
        let mut engine = PipelineEngine::new(
            vec![ReceivePath {
                source: Box::new(BlockedSource),
                probe: PowerProbe::new(),
            }],
            RouteSwitch::new(),
            Box::new(CountingSink {
                forwarded: Arc::new(Mutex::new(Vec::new())),
            }),
            Duration::from_millis(300),
        );

        engine.start().unwrap();
        thread::sleep(Duration::from_millis(20));
        engine.stop();

        let begin = Instant::now();
        let err = engine.await_drain().unwrap_err();
        assert!(
            begin.elapsed() < Duration::from_secs(2),
            "drain took {:?}",
            begin.elapsed()
        );
        let msg = err.to_string();
        assert!(msg.contains("Shutdown incomplete"), "{}", msg);
        assert!(msg.contains("rx1-worker"), "{}", msg);
    }

    #[test]
    fn test_double_start_fails() {
        let mut engine = PipelineEngine::new(
            Vec::new(),
            RouteSwitch::new(),
            Box::new(CountingSink {
                forwarded: Arc::new(Mutex::new(Vec::new())),
            }),
            Duration::from_secs(1),
        );
        engine.start().unwrap();
        assert!(engine.start().is_err());
        engine.stop();
        engine.await_drain().unwrap();
    }
}
