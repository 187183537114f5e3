//! Configuration for the crossband relay.
//!
//! ## Frequency pairing
//!
//! The relay listens on two receive frequencies and retransmits whichever
//! one is active on its paired transmit frequency:
//!
//! ```ignore
//! rx1_freq -> tx1_freq   // e.g. VHF in, UHF out
//! rx2_freq -> tx2_freq   // e.g. UHF in, VHF out
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RelayError, Result};

/// Center frequency specification
///
/// Can be given as plain Hz (including scientific notation) or with a
/// metric multiplier suffix, with an optional `Hz` unit.
///
/// # Parsing formats
/// - `450000000` or `450e6` - Hz
/// - `146.52M` or `146.52MHz` - megahertz
/// - `450000k` or `450000kHz` - kilohertz
/// - `1.3G` or `1.3GHz` - gigahertz
///
/// Mega and giga suffixes must be uppercase; a lowercase `m` would read as
/// milli in SI and is rejected rather than guessed at. Kilo is accepted as
/// `k` or `K`.
///
/// # Example
/// ```
/// use crossband::config::Frequency;
///
/// let f: Frequency = "146.52M".parse().unwrap();
/// assert!((f.as_hz() - 146_520_000.0).abs() < 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frequency(f64);

impl Frequency {
    /// Create from frequency in Hz
    pub fn from_hz(hz: f64) -> Self {
        Self(hz)
    }

    /// Get frequency in Hz
    pub fn as_hz(&self) -> f64 {
        self.0
    }

    /// Get frequency in MHz
    pub fn as_mhz(&self) -> f64 {
        self.0 / 1e6
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}MHz", self.as_mhz())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        // Optional unit suffix, case insensitive
        let s = s
            .strip_suffix("hz")
            .or_else(|| s.strip_suffix("Hz"))
            .or_else(|| s.strip_suffix("HZ"))
            .unwrap_or(s)
            .trim();

        // Suffixes follow SI case: lowercase m would read as milli, so
        // mega and giga must be uppercase. Kilo is accepted either way.
        let (num, scale) = match s.chars().last() {
            Some('k') | Some('K') => (&s[..s.len() - 1], 1e3),
            Some('M') => (&s[..s.len() - 1], 1e6),
            Some('G') => (&s[..s.len() - 1], 1e9),
            Some('m') | Some('g') => {
                return Err(format!(
                    "ambiguous suffix in '{}': use uppercase M or G",
                    s
                ));
            }
            _ => (s, 1.0),
        };

        let hz: f64 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid frequency: {}", s))?;
        if hz <= 0.0 {
            return Err("frequency must be positive".to_string());
        }
        Ok(Self::from_hz(hz * scale))
    }
}

/// One hardware endpoint of the relay
///
/// Immutable after construction except for the transmit channel's center
/// frequency, which the controller retunes on every route change.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    /// Center frequency in Hz
    pub center_freq: Frequency,
    /// Sample rate in samples per second
    pub sample_rate: u32,
    /// Front-end gain in dB
    pub gain: f32,
    /// Opaque device-selection string passed to the hardware backend
    pub device_args: String,
}

/// System-wide relay configuration
///
/// Constructed once from the command line before the controller starts and
/// immutable for the controller's lifetime.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Receive channel 1 (priority channel)
    pub rx1: ChannelSpec,
    /// Receive channel 2
    pub rx2: ChannelSpec,
    /// Shared transmit channel; its center frequency is a don't-care at
    /// startup and follows tx1_freq/tx2_freq once routing begins
    pub tx: ChannelSpec,
    /// Transmit frequency paired with RX1
    pub tx1_freq: Frequency,
    /// Transmit frequency paired with RX2
    pub tx2_freq: Frequency,
    /// Power threshold above which a receive channel counts as active
    /// (mean magnitude-squared units)
    pub detection_threshold: f64,
    /// Time between decision ticks
    pub poll_interval: Duration,
    /// Upper bound on waiting for the pipeline to drain at shutdown
    pub drain_timeout: Duration,
}

impl RelayConfig {
    /// Check invariants that clap cannot express.
    ///
    /// Must pass before any hardware is touched.
    pub fn validate(&self) -> Result<()> {
        for (name, spec) in [("rx1", &self.rx1), ("rx2", &self.rx2), ("tx", &self.tx)] {
            if spec.center_freq.as_hz() <= 0.0 {
                return Err(RelayError::Config(format!(
                    "{} frequency must be positive",
                    name
                )));
            }
            if spec.sample_rate == 0 {
                return Err(RelayError::Config(format!(
                    "{} sample rate must be non-zero",
                    name
                )));
            }
        }
        if self.tx1_freq.as_hz() <= 0.0 || self.tx2_freq.as_hz() <= 0.0 {
            return Err(RelayError::Config(
                "tx1/tx2 frequencies must be positive".to_string(),
            ));
        }
        if self.detection_threshold < 0.0 {
            return Err(RelayError::Config(
                "detection threshold must be non-negative".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(RelayError::Config(
                "poll interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

pub const DEFAULT_SAMPLE_RATE: u32 = 2_400_000;
pub const DEFAULT_DETECTION_THRESHOLD: f64 = 0.05;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 2000;

pub const DEFAULT_RX1_GAIN: f32 = 40.0;
pub const DEFAULT_RX2_GAIN: f32 = 30.0;
pub const DEFAULT_TX_GAIN: f32 = 20.0;

pub const DEFAULT_RX1_ARGS: &str = "rtl=0";
pub const DEFAULT_RX2_ARGS: &str = "bladerf=0";
pub const DEFAULT_TX_ARGS: &str = "bladerf=0";
