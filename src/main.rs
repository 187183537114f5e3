use std::io::Write;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::bounded;

use crossband::config::{
    ChannelSpec, DEFAULT_DETECTION_THRESHOLD, DEFAULT_DRAIN_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_RX1_ARGS, DEFAULT_RX1_GAIN, DEFAULT_RX2_ARGS, DEFAULT_RX2_GAIN, DEFAULT_SAMPLE_RATE,
    DEFAULT_TX_ARGS, DEFAULT_TX_GAIN, Frequency, RelayConfig,
};
use crossband::output::{OutputFormat, create_formatter};
use crossband::pipeline::{PipelineEngine, PowerProbe, ReceivePath, RouteSwitch};
use crossband::radio::backend;
use crossband::relay::RelayController;

const BOLD_RED: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(name = "crossband")]
#[command(about = "Dynamic frequency relay for two receivers and one transmitter")]
#[command(after_help = "Example:\n  crossband --rx1-args \"rtl=0\" --rx1-freq 150M \
                        --rx2-args \"bladerf=0\" --rx2-freq 450M \
                        --tx-args \"bladerf=0\" --tx1-freq 450M --tx2-freq 150M")]
struct Args {
    /// Receiver 1 frequency (e.g. "150M", "150e6")
    #[arg(long)]
    rx1_freq: Frequency,

    /// Transmit frequency used while relaying RX1
    #[arg(long)]
    tx1_freq: Frequency,

    /// Receiver 2 frequency
    #[arg(long)]
    rx2_freq: Frequency,

    /// Transmit frequency used while relaying RX2
    #[arg(long)]
    tx2_freq: Frequency,

    /// Receiver 1 device args
    #[arg(long, default_value = DEFAULT_RX1_ARGS)]
    rx1_args: String,

    /// Receiver 2 device args
    #[arg(long, default_value = DEFAULT_RX2_ARGS)]
    rx2_args: String,

    /// Transmitter device args
    #[arg(long, default_value = DEFAULT_TX_ARGS)]
    tx_args: String,

    /// Sample rate in samples per second
    #[arg(short = 'S', long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Receiver 1 gain in dB
    #[arg(long, default_value_t = DEFAULT_RX1_GAIN)]
    rx1_gain: f32,

    /// Receiver 2 gain in dB
    #[arg(long, default_value_t = DEFAULT_RX2_GAIN)]
    rx2_gain: f32,

    /// Transmitter gain in dB
    #[arg(long, default_value_t = DEFAULT_TX_GAIN)]
    tx_gain: f32,

    /// Signal detection power threshold (mean magnitude-squared)
    #[arg(long, default_value_t = DEFAULT_DETECTION_THRESHOLD)]
    threshold: f64,

    /// Polling interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    /// Maximum time to wait for pipeline drain at shutdown, milliseconds
    #[arg(long, default_value_t = DEFAULT_DRAIN_TIMEOUT_MS)]
    drain_timeout_ms: u64,

    /// Status output format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn to_config(&self) -> RelayConfig {
        RelayConfig {
            rx1: ChannelSpec {
                center_freq: self.rx1_freq,
                sample_rate: self.sample_rate,
                gain: self.rx1_gain,
                device_args: self.rx1_args.clone(),
            },
            rx2: ChannelSpec {
                center_freq: self.rx2_freq,
                sample_rate: self.sample_rate,
                gain: self.rx2_gain,
                device_args: self.rx2_args.clone(),
            },
            tx: ChannelSpec {
                // Don't-care until the first route decision
                center_freq: self.tx1_freq,
                sample_rate: self.sample_rate,
                gain: self.tx_gain,
                device_args: self.tx_args.clone(),
            },
            tx1_freq: self.tx1_freq,
            tx2_freq: self.tx2_freq,
            detection_threshold: self.threshold,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    eprintln!(
        "{}DO NOT TRANSMIT ON FREQUENCIES YOU DO NOT HAVE A LICENSE FOR. Ensure you follow \
         all FCC rules regarding transmit power and digital modes on specific frequencies{}",
        BOLD_RED, RESET
    );

    let config = args.to_config();
    config.validate()?;

    log::info!(
        "relaying {} -> {} and {} -> {}",
        config.rx1.center_freq,
        config.tx1_freq,
        config.rx2.center_freq,
        config.tx2_freq
    );

    // Open hardware before wiring anything; failures here are fatal.
    let rx1_source = backend::open_source(&config.rx1)?;
    let rx2_source = backend::open_source(&config.rx2)?;
    let (tx_sink, tuner) = backend::open_transmitter(&config.tx)?;

    let rx1_probe = PowerProbe::new();
    let rx2_probe = PowerProbe::new();
    let switch = RouteSwitch::new();

    let engine = PipelineEngine::new(
        vec![
            ReceivePath {
                source: rx1_source,
                probe: rx1_probe.clone(),
            },
            ReceivePath {
                source: rx2_source,
                probe: rx2_probe.clone(),
            },
        ],
        switch.clone(),
        tx_sink,
        config.drain_timeout,
    );

    let (event_tx, event_rx) = bounded(64);
    let mut controller = RelayController::new(
        &config,
        rx1_probe,
        rx2_probe,
        tuner,
        Box::new(switch),
        Box::new(engine),
        event_tx,
    );

    let stop = controller.stop_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping relay...");
        stop.request_stop();
    })?;

    let formatter = create_formatter(args.format);
    let printer = thread::spawn(move || {
        let mut stdout = std::io::stdout();
        for event in event_rx {
            if formatter.in_place() {
                let _ = write!(stdout, "\r{}", formatter.format(&event));
                let _ = stdout.flush();
            } else {
                let _ = writeln!(stdout, "{}", formatter.format(&event));
            }
        }
        let _ = writeln!(stdout);
    });

    controller.start()?;
    println!("Relay started");

    let result = controller.run();

    // Dropping the controller closes the event channel and ends the printer.
    drop(controller);
    let _ = printer.join();

    result?;
    Ok(())
}
