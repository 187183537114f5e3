use std::thread;
use std::time::Duration;

use num_complex::Complex32;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::radio::SampleSource;

/// Timing and level of a simulated transmission pattern.
///
/// The source idles for `delay_batches`, then repeats `on_batches` of
/// carrier followed by `off_batches` of noise floor, forever.
#[derive(Debug, Clone)]
pub struct BurstProfile {
    pub delay_batches: usize,
    pub on_batches: usize,
    pub off_batches: usize,
    /// Carrier amplitude during a burst; batch power is roughly
    /// amplitude^2 + 2 * noise_sigma^2.
    pub amplitude: f32,
    /// Standard deviation of the Gaussian noise floor per I/Q component
    pub noise_sigma: f32,
}

impl Default for BurstProfile {
    fn default() -> Self {
        Self {
            delay_batches: 0,
            on_batches: 30,
            off_batches: 30,
            amplitude: 0.5,
            noise_sigma: 0.01,
        }
    }
}

/// Seeded burst generator implementing the receive hardware seam.
pub struct BurstSource {
    rng: ChaCha8Rng,
    noise: Normal<f32>,
    profile: BurstProfile,
    sample_rate: u32,
    batch_size: usize,
    position: usize,
    /// Sleep one batch duration per call, so the relay's polling loop sees
    /// a live-paced stream
    realtime: bool,
}

impl BurstSource {
    pub fn new(profile: BurstProfile, sample_rate: u32, batch_size: usize, seed: u64) -> Self {
        let noise = Normal::new(0.0, profile.noise_sigma.max(f32::EPSILON))
            .expect("sigma is finite and positive");
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            noise,
            profile,
            sample_rate,
            batch_size,
            position: 0,
            realtime: false,
        }
    }

    pub fn realtime(mut self) -> Self {
        self.realtime = true;
        self
    }

    fn in_burst(&self) -> bool {
        if self.position < self.profile.delay_batches {
            return false;
        }
        let period = self.profile.on_batches + self.profile.off_batches;
        if period == 0 {
            return false;
        }
        (self.position - self.profile.delay_batches) % period < self.profile.on_batches
    }
}

impl SampleSource for BurstSource {
    fn next_batch(&mut self) -> anyhow::Result<Option<Vec<Complex32>>> {
        let carrier = if self.in_burst() {
            self.profile.amplitude
        } else {
            0.0
        };

        let batch: Vec<Complex32> = (0..self.batch_size)
            .map(|_| {
                Complex32::new(
                    carrier + self.noise.sample(&mut self.rng),
                    self.noise.sample(&mut self.rng),
                )
            })
            .collect();

        self.position += 1;

        if self.realtime {
            let secs = self.batch_size as f64 / self.sample_rate as f64;
            thread::sleep(Duration::from_secs_f64(secs));
        }

        Ok(Some(batch))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
