//! The routing policy.
//!
//! A memoryless level comparison: no hysteresis, no dwell time. Power
//! hovering near the threshold will flap the route (and with it the
//! transmit frequency); see README "Limitations".

use serde::Serialize;

/// Route switch input carrying the RX1 path.
pub const RX1_INPUT: usize = 0;
/// Route switch input carrying the RX2 path.
pub const RX2_INPUT: usize = 1;

/// Which receive path currently feeds the transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteState {
    /// No decision yet; nothing is forwarded and the transmit frequency is
    /// a don't-care.
    Unset,
    Rx1,
    Rx2,
}

impl RouteState {
    pub fn describe(&self) -> &'static str {
        match self {
            RouteState::Unset => "No signal detected yet.",
            RouteState::Rx1 => "RX1 signal detected. Transmitting on TX1 frequency.",
            RouteState::Rx2 => "RX2 signal detected. Transmitting on TX2 frequency.",
        }
    }
}

/// Apply the routing policy for one tick.
///
/// RX1 wins whenever it is above threshold, including simultaneous
/// detections. With neither path active the last route is held rather than
/// reverting to `Unset`, so the relay freezes on the previous path instead
/// of going dark when a transmission ends.
pub fn next_route(
    current: RouteState,
    rx1_power: f64,
    rx2_power: f64,
    threshold: f64,
) -> RouteState {
    if rx1_power > threshold {
        RouteState::Rx1
    } else if rx2_power > threshold {
        RouteState::Rx2
    } else {
        current
    }
}
