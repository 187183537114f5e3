use num_complex::Complex32;

/// A receive hardware endpoint delivering complex baseband batches.
///
/// Implementations block until a batch is available. `Ok(None)` means the
/// stream has ended (device unplugged, file exhausted); the pipeline treats
/// that path as silent from then on.
pub trait SampleSource: Send {
    fn next_batch(&mut self) -> anyhow::Result<Option<Vec<Complex32>>>;

    fn sample_rate(&self) -> u32;
}
