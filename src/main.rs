use anyhow::Context;
use clap::Parser;
use crash_sense::{
    config::Mode,
    control::{CancellationToken, SenseLoop},
    detector::{Detector, HostFftDetector, PackedDetector},
    gate::{FileGate, LogGate, TransmitGate},
    replay::{PackedReplay, SampleReplay},
    sim::{BurstPattern, SimulatedFrontEnd},
};
use tracing::{info, warn};

mod args;

use args::{convert_filter, Args};

fn main() -> anyhow::Result<()> {
    // Get the CLI options
    let cli = Args::parse();
    // Get tracing going
    tracing_subscriber::fmt()
        .with_max_level(convert_filter(cli.verbose.log_level_filter()))
        .init();
    // Invalid configuration is fatal
    let config = cli.config()?;

    let plan = config.filter_plan();
    info!(
        mode = ?config.mode,
        threshold = config.threshold,
        fft_size = config.fft_size,
        decimation = config.decimation,
        cic_bypass = plan.cic_bypass,
        halfband_bypass = plan.halfband_bypass,
        cic_decimation = ?plan.cic_decimation,
        rx_gain = plan.gain,
        "Starting spectrum sensing"
    );

    // Acquisition provider, either replayed captures or the simulated front end
    let detector: Box<dyn Detector> = match (config.mode, &cli.replay) {
        (Mode::HostFft, Some(path)) => Box::new(HostFftDetector::new(
            SampleReplay::open(path, config.fft_size)
                .with_context(|| format!("Opening sample capture {path:?}"))?,
            config.fft_size,
            config.threshold,
        )),
        (Mode::FpgaThreshold, Some(path)) => Box::new(PackedDetector::new(
            PackedReplay::open(path, config.fft_size)
                .with_context(|| format!("Opening FFT capture {path:?}"))?,
            config.fft_size,
        )),
        (mode, None) => {
            let pattern = BurstPattern {
                quiet_polls: cli.quiet_polls,
                burst_polls: cli.burst_polls,
            };
            let front_end =
                SimulatedFrontEnd::new(config.fft_size, pattern, config.threshold, cli.seed);
            let simulated: Box<dyn Detector> = match mode {
                Mode::HostFft => Box::new(HostFftDetector::new(
                    front_end,
                    config.fft_size,
                    config.threshold,
                )),
                Mode::FpgaThreshold => Box::new(PackedDetector::new(front_end, config.fft_size)),
            };
            simulated
        }
    };

    let gate: Box<dyn TransmitGate> = match &cli.gate {
        Some(path) => Box::new(
            FileGate::open(path).with_context(|| format!("Opening transmit gate {path:?}"))?,
        ),
        None => Box::new(LogGate::default()),
    };

    // Ctrl-C stops the repeat loop after the current cycle
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupted, finishing the current cycle");
        handler_token.cancel();
    })?;

    let mut sense = SenseLoop::new(detector, gate, config.loop_config());
    if let Some(dir) = &cli.record {
        std::fs::create_dir_all(dir).with_context(|| format!("Creating {dir:?}"))?;
        sense = sense.with_recorder(dir);
    }

    let stats = sense.run(&cancel)?;
    info!(
        cycles = stats.cycles,
        transmitted = stats.transmitted,
        timed_out = stats.timed_out,
        "Done"
    );
    sense.timing().log_summary();
    Ok(())
}
