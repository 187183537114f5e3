//! Behavioral tests for the relay controller against recorded hardware
//! commands: priority, hold, idempotence, retune-before-switch ordering,
//! failure policy, and cooperative shutdown.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, bounded};
use num_complex::Complex32;

use crossband::config::{ChannelSpec, Frequency, RelayConfig};
use crossband::output::TickEvent;
use crossband::pipeline::PowerProbe;
use crossband::relay::{RX1_INPUT, RX2_INPUT, RelayController, RouteState};
use crossband::simulation::{Command, CommandLog, LoggedSwitch, LoggedTuner, MockPipeline};

const TX1_HZ: f64 = 450.0e6;
const TX2_HZ: f64 = 150.0e6;

fn test_config() -> RelayConfig {
    let spec = |hz: f64, args: &str| ChannelSpec {
        center_freq: Frequency::from_hz(hz),
        sample_rate: 2_400_000,
        gain: 20.0,
        device_args: args.to_string(),
    };
    RelayConfig {
        rx1: spec(150.0e6, "sim"),
        rx2: spec(450.0e6, "sim"),
        tx: spec(TX1_HZ, "sim"),
        tx1_freq: Frequency::from_hz(TX1_HZ),
        tx2_freq: Frequency::from_hz(TX2_HZ),
        detection_threshold: 0.05,
        poll_interval: Duration::from_millis(5),
        drain_timeout: Duration::from_secs(1),
    }
}

struct Harness {
    controller: RelayController,
    rx1: PowerProbe,
    rx2: PowerProbe,
    log: CommandLog,
    pipeline: MockPipeline,
    events: Receiver<TickEvent>,
}

fn harness() -> Harness {
    harness_with_tuner(None)
}

fn harness_with_tuner(fail_retune: Option<&str>) -> Harness {
    let rx1 = PowerProbe::new();
    let rx2 = PowerProbe::new();
    let log = CommandLog::new();
    let pipeline = MockPipeline::new();
    let (tx, events) = bounded(64);

    let tuner = match fail_retune {
        Some(reason) => LoggedTuner::failing(log.clone(), reason),
        None => LoggedTuner::new(log.clone()),
    };

    let controller = RelayController::new(
        &test_config(),
        rx1.clone(),
        rx2.clone(),
        Box::new(tuner),
        Box::new(LoggedSwitch::new(log.clone())),
        Box::new(pipeline.clone()),
        tx,
    );

    Harness {
        controller,
        rx1,
        rx2,
        log,
        pipeline,
        events,
    }
}

/// Drive a probe so it reports the given power (|a|^2 = power).
fn set_power(probe: &PowerProbe, power: f64) {
    probe.observe(&[Complex32::new(power.sqrt() as f32, 0.0)]);
}

#[test]
fn test_detection_scenarios_and_command_ordering() {
    let mut h = harness();

    // Scenario A: RX1 active -> routed to RX1 on TX1
    set_power(&h.rx1, 0.10);
    set_power(&h.rx2, 0.00);
    let event = h.controller.poll_tick();
    assert_eq!(event.route, RouteState::Rx1);
    assert_eq!(
        h.log.commands(),
        vec![Command::Retune(TX1_HZ), Command::Select(RX1_INPUT)]
    );

    // Scenario B: both idle -> hold last route, no commands
    set_power(&h.rx1, 0.01);
    let event = h.controller.poll_tick();
    assert_eq!(event.route, RouteState::Rx1);
    assert_eq!(h.log.len(), 2);

    // Scenario C: RX2 active -> retune to TX2 strictly before the switch
    set_power(&h.rx1, 0.00);
    set_power(&h.rx2, 0.20);
    let event = h.controller.poll_tick();
    assert_eq!(event.route, RouteState::Rx2);
    assert_eq!(
        h.log.commands(),
        vec![
            Command::Retune(TX1_HZ),
            Command::Select(RX1_INPUT),
            Command::Retune(TX2_HZ),
            Command::Select(RX2_INPUT),
        ]
    );
}

#[test]
fn test_rx1_priority_on_simultaneous_detection() {
    let mut h = harness();
    set_power(&h.rx1, 0.06);
    set_power(&h.rx2, 0.90);
    let event = h.controller.poll_tick();
    assert_eq!(event.route, RouteState::Rx1);
}

#[test]
fn test_repeated_detections_issue_no_further_commands() {
    let mut h = harness();
    set_power(&h.rx1, 0.10);
    for _ in 0..5 {
        h.controller.poll_tick();
    }
    assert_eq!(h.log.len(), 2);
}

#[test]
fn test_idle_relay_stays_unset_and_silent() {
    let mut h = harness();
    for _ in 0..3 {
        let event = h.controller.poll_tick();
        assert_eq!(event.route, RouteState::Unset);
        assert!(event.command_error.is_none());
    }
    assert!(h.log.is_empty());
    // One event per tick regardless of transitions
    assert_eq!(h.events.len(), 3);
}

#[test]
fn test_events_carry_readings_and_timestamp() {
    let mut h = harness();
    set_power(&h.rx1, 0.10);
    set_power(&h.rx2, 0.02);
    h.controller.poll_tick();

    let event = h.events.recv_timeout(Duration::from_secs(1)).unwrap();
    assert!((event.rx1_power - 0.10).abs() < 1e-6);
    assert!((event.rx2_power - 0.02).abs() < 1e-6);
    assert_eq!(event.route, RouteState::Rx1);
    assert!(event.timestamp.contains('T'));
}

#[test]
fn test_failed_retune_keeps_intended_state_without_switching() {
    let mut h = harness_with_tuner(Some("device busy"));
    set_power(&h.rx1, 0.10);

    let event = h.controller.poll_tick();
    assert_eq!(event.route, RouteState::Rx1);
    assert!(
        event
            .command_error
            .as_deref()
            .is_some_and(|e| e.contains("device busy"))
    );
    // Retune failed first, so the switch must not have been flipped
    assert!(h.log.is_empty());

    // Optimistic state: no retry while the readings are unchanged
    let event = h.controller.poll_tick();
    assert!(event.command_error.is_none());
    assert!(h.log.is_empty());
    assert_eq!(h.controller.current_route(), RouteState::Rx1);
}

#[test]
fn test_failed_select_keeps_intended_state_after_retune() {
    let rx1 = PowerProbe::new();
    let rx2 = PowerProbe::new();
    let log = CommandLog::new();
    let (tx, _events) = bounded(64);

    let mut controller = RelayController::new(
        &test_config(),
        rx1.clone(),
        rx2,
        Box::new(LoggedTuner::new(log.clone())),
        Box::new(LoggedSwitch::failing(log.clone(), "switch jammed")),
        Box::new(MockPipeline::new()),
        tx,
    );

    set_power(&rx1, 0.10);
    let event = controller.poll_tick();
    assert_eq!(event.route, RouteState::Rx1);
    assert!(
        event
            .command_error
            .as_deref()
            .is_some_and(|e| e.contains("switch jammed"))
    );
    // The retune landed before the switch failed; no select was recorded
    assert_eq!(log.commands(), vec![Command::Retune(TX1_HZ)]);

    // Optimistic state: no retry while the readings are unchanged
    let event = controller.poll_tick();
    assert!(event.command_error.is_none());
    assert_eq!(log.commands(), vec![Command::Retune(TX1_HZ)]);
    assert_eq!(controller.current_route(), RouteState::Rx1);
}

#[test]
fn test_start_failure_is_fatal() {
    let rx1 = PowerProbe::new();
    let rx2 = PowerProbe::new();
    let log = CommandLog::new();
    let (tx, _events) = bounded(4);

    let mut controller = RelayController::new(
        &test_config(),
        rx1,
        rx2,
        Box::new(LoggedTuner::new(log.clone())),
        Box::new(LoggedSwitch::new(log)),
        Box::new(MockPipeline::failing_start()),
        tx,
    );

    let err = controller.start().unwrap_err();
    assert!(err.to_string().contains("Startup failed"));
}

#[test]
fn test_stop_tears_down_and_silences_commands() {
    let mut h = harness();
    set_power(&h.rx1, 0.10);

    let stop = h.controller.stop_handle();
    let pipeline = h.pipeline.clone();
    let log = h.log.clone();
    let mut controller = h.controller;

    let worker = thread::spawn(move || {
        controller.start().unwrap();
        controller.run().unwrap();
    });

    // Let a few ticks happen, then request a cooperative stop
    thread::sleep(Duration::from_millis(30));
    stop.request_stop();
    worker.join().unwrap();

    assert!(pipeline.started());
    assert!(pipeline.stopped());
    assert!(pipeline.drained());

    // Exactly one transition happened; no further commands once run()
    // has returned
    let after = log.len();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(log.len(), after);
    assert_eq!(
        log.commands(),
        vec![Command::Retune(TX1_HZ), Command::Select(RX1_INPUT)]
    );
}
