//! Argument parsing for running from the command line

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use crash_sense::{
    config::{validate_decimation, validate_fft_size, validate_threshold, Config, Mode},
    error::ConfigError,
    DEFAULT_FFT_SIZE, DEFAULT_THRESHOLD, EXCEED_TIMEOUT_POLLS,
};
use tracing::info;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Where the FFT and threshold comparison run
    #[clap(short, long, value_enum, default_value_t = Mode::FpgaThreshold)]
    pub mode: Mode,
    /// Magnitude above which a bin counts as busy (0 means unset)
    #[clap(short, long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
    pub threshold: f32,
    /// FFT size, a power of two from 64 to 4096
    #[clap(short = 'k', long, default_value_t = DEFAULT_FFT_SIZE, value_parser = parse_fft_size)]
    pub fft_size: usize,
    /// Receive decimation rate (1 to 2047, 0 means unset)
    #[clap(short, long, default_value_t = 1, value_parser = parse_decimation)]
    pub decim: u32,
    /// Keep running cycles until Ctrl-C
    #[clap(short, long)]
    pub loop_prog: bool,
    /// Delay between polls while waiting for the threshold to be exceeded
    #[clap(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,
    /// Polls allowed while waiting for a burst before a cycle times out
    #[clap(long, default_value_t = EXCEED_TIMEOUT_POLLS)]
    #[clap(value_parser = clap::value_parser!(u32).range(1..))]
    pub exceed_timeout: u32,
    /// Give up waiting for a clear channel after this many polls
    #[clap(long)]
    #[clap(value_parser = clap::value_parser!(u32).range(1..))]
    pub clear_timeout: Option<u32>,
    /// Replay frames from a capture file instead of the simulated front end
    #[clap(long)]
    pub replay: Option<PathBuf>,
    /// Simulated front end: quiet blocks before each burst
    #[clap(long, default_value_t = 2)]
    pub quiet_polls: u32,
    /// Simulated front end: blocks per burst
    #[clap(long, default_value_t = 3)]
    pub burst_polls: u32,
    /// Seed for the simulated front end's noise
    #[clap(long, default_value_t = 0)]
    pub seed: u64,
    /// Value file driving transmit enable (e.g. a sysfs GPIO), otherwise only logged
    #[clap(short, long)]
    pub gate: Option<PathBuf>,
    /// Directory to save the frame that cleared the channel each cycle
    #[clap(short, long)]
    pub record: Option<PathBuf>,
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,
}

impl Args {
    pub fn config(&self) -> Result<Config, ConfigError> {
        // Zero stands for "not given" on these two flags
        let decimation = if self.decim == 0 {
            info!("Decimation rate not specified, defaulting to 1");
            1
        } else {
            self.decim
        };
        let threshold = if self.threshold == 0.0 {
            info!("Threshold not set, defaulting to {DEFAULT_THRESHOLD}");
            DEFAULT_THRESHOLD
        } else {
            self.threshold
        };
        let config = Config {
            mode: self.mode,
            threshold,
            fft_size: self.fft_size,
            decimation,
            repeat: self.loop_prog,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            exceed_timeout_polls: self.exceed_timeout,
            clear_timeout_polls: self.clear_timeout,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }
}

/// Match verbosity filter with tracing subscriber log levels
pub fn convert_filter(filter: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    match filter {
        log::LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF,
        log::LevelFilter::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        log::LevelFilter::Warn => tracing_subscriber::filter::LevelFilter::WARN,
        log::LevelFilter::Info => tracing_subscriber::filter::LevelFilter::INFO,
        log::LevelFilter::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
        log::LevelFilter::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
    }
}

fn parse_fft_size(s: &str) -> Result<usize, String> {
    let size = s.parse().map_err(|_| format!("Invalid FFT size {s:?}"))?;
    validate_fft_size(size).map_err(|e| e.to_string())
}

fn parse_decimation(s: &str) -> Result<u32, String> {
    let rate = s.parse().map_err(|_| format!("Invalid decimation rate {s:?}"))?;
    if rate == 0 {
        return Ok(0);
    }
    validate_decimation(rate).map_err(|e| e.to_string())
}

fn parse_threshold(s: &str) -> Result<f32, String> {
    let threshold = s.parse().map_err(|_| format!("Invalid threshold {s:?}"))?;
    validate_threshold(threshold).map_err(|e| e.to_string())
}
