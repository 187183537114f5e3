//! Resolves opaque device-selection strings to concrete endpoints.
//!
//! Real SDR front ends live behind `SampleSource`/`TransmitSink`/`TxRetune`
//! and are supplied by an external HAL; this crate ships only the
//! simulation backend (`--features simulation`), selected by args of the
//! form `sim` or `sim:on=3,off=3,amp=0.5,delay=1,seed=7` (durations in
//! seconds).

use crate::config::ChannelSpec;
use crate::error::{RelayError, Result};
use crate::radio::{SampleSource, TransmitSink, TxRetune};

/// Samples per batch handed to the pipeline.
pub const BATCH_SIZE: usize = 4096;

/// Open a receive endpoint for the given channel.
pub fn open_source(spec: &ChannelSpec) -> Result<Box<dyn SampleSource>> {
    #[cfg(feature = "simulation")]
    if spec.device_args.starts_with("sim") {
        let (profile, seed) = sim::parse_args(&spec.device_args, spec.sample_rate)?;
        log::info!(
            "simulated rx at {} ({} dB gain ignored)",
            spec.center_freq,
            spec.gain
        );
        let source =
            crate::simulation::BurstSource::new(profile, spec.sample_rate, BATCH_SIZE, seed)
                .realtime();
        return Ok(Box::new(source));
    }

    Err(unknown_device(&spec.device_args))
}

/// Open the shared transmit endpoint: the sample sink plus its retune
/// handle.
pub fn open_transmitter(
    spec: &ChannelSpec,
) -> Result<(Box<dyn TransmitSink>, Box<dyn TxRetune>)> {
    #[cfg(feature = "simulation")]
    if spec.device_args.starts_with("sim") {
        log::info!("simulated tx ({} dB gain ignored)", spec.gain);
        return Ok((
            Box::new(crate::simulation::NullSink::new()),
            Box::new(sim::SimTransmitter::new()),
        ));
    }

    Err(unknown_device(&spec.device_args))
}

fn unknown_device(args: &str) -> RelayError {
    RelayError::Startup(format!(
        "no backend for device args '{}' (this build supports: sim, with --features simulation)",
        args
    ))
}

#[cfg(feature = "simulation")]
mod sim {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::BATCH_SIZE;
    use crate::error::{RelayError, Result};
    use crate::radio::TxRetune;
    use crate::simulation::BurstProfile;

    /// Retune handle for the simulated transmitter; just remembers and logs
    /// the requested frequency.
    pub struct SimTransmitter {
        freq_bits: Arc<AtomicU64>,
    }

    impl SimTransmitter {
        pub fn new() -> Self {
            Self {
                freq_bits: Arc::new(AtomicU64::new(0.0f64.to_bits())),
            }
        }
    }

    impl TxRetune for SimTransmitter {
        fn set_center_frequency(&mut self, hz: f64) -> Result<()> {
            self.freq_bits.store(hz.to_bits(), Ordering::Relaxed);
            log::info!("sim tx retuned to {:.6} MHz", hz / 1e6);
            Ok(())
        }
    }

    pub fn parse_args(args: &str, sample_rate: u32) -> Result<(BurstProfile, u64)> {
        let mut profile = BurstProfile::default();
        let mut seed = 0u64;

        let batches_per_sec = sample_rate as f64 / BATCH_SIZE as f64;
        let to_batches = |secs: f64| (secs * batches_per_sec).round().max(0.0) as usize;

        let Some(params) = args.strip_prefix("sim") else {
            return Err(bad_args(args));
        };
        let params = match params.strip_prefix(':') {
            Some(rest) => rest,
            None if params.is_empty() => return Ok((profile, seed)),
            None => return Err(bad_args(args)),
        };

        for pair in params.split(',').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| bad_args(args))?;
            let value = value.trim();
            match key.trim() {
                "on" => profile.on_batches = to_batches(parse_f64(value, args)?),
                "off" => profile.off_batches = to_batches(parse_f64(value, args)?),
                "delay" => profile.delay_batches = to_batches(parse_f64(value, args)?),
                "amp" => profile.amplitude = parse_f64(value, args)? as f32,
                "noise" => profile.noise_sigma = parse_f64(value, args)? as f32,
                "seed" => {
                    seed = value
                        .parse()
                        .map_err(|_| bad_args(args))?
                }
                _ => return Err(bad_args(args)),
            }
        }

        Ok((profile, seed))
    }

    fn parse_f64(value: &str, args: &str) -> Result<f64> {
        value.parse().map_err(|_| bad_args(args))
    }

    fn bad_args(args: &str) -> RelayError {
        RelayError::Startup(format!("invalid simulation device args '{}'", args))
    }

}
