//! Run parameters and their validation

use std::time::Duration;

use crate::{
    control::LoopConfig, error::ConfigError, DEFAULT_FFT_SIZE, DEFAULT_THRESHOLD,
    EXCEED_TIMEOUT_POLLS, MAX_DECIMATION, MAX_FFT_SIZE, MIN_FFT_SIZE,
};

/// Where the FFT and the threshold comparison happen
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Acquire raw I/Q, FFT and threshold on the host
    HostFft,
    /// The FPGA computes magnitudes and flags, the host only scans the flags
    FpgaThreshold,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub mode: Mode,
    pub threshold: f32,
    pub fft_size: usize,
    pub decimation: u32,
    pub repeat: bool,
    pub poll_interval: Duration,
    pub exceed_timeout_polls: u32,
    pub clear_timeout_polls: Option<u32>,
    pub cycle_pause: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::FpgaThreshold,
            threshold: DEFAULT_THRESHOLD,
            fft_size: DEFAULT_FFT_SIZE,
            decimation: 1,
            repeat: false,
            poll_interval: Duration::from_secs(1),
            exceed_timeout_polls: EXCEED_TIMEOUT_POLLS,
            clear_timeout_polls: None,
            cycle_pause: Duration::from_secs(1),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_fft_size(self.fft_size)?;
        validate_decimation(self.decimation)?;
        validate_threshold(self.threshold)?;
        if self.exceed_timeout_polls == 0 {
            return Err(ConfigError::ExceedTimeout);
        }
        if self.clear_timeout_polls == Some(0) {
            return Err(ConfigError::ClearTimeout);
        }
        Ok(())
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            poll_interval: self.poll_interval,
            exceed_timeout_polls: self.exceed_timeout_polls,
            clear_timeout_polls: self.clear_timeout_polls,
            cycle_pause: self.cycle_pause,
            repeat: self.repeat,
        }
    }

    pub fn filter_plan(&self) -> RxFilterPlan {
        RxFilterPlan::for_decimation(self.decimation)
    }
}

pub fn validate_fft_size(size: usize) -> Result<usize, ConfigError> {
    if size.is_power_of_two() && (MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(ConfigError::FftSize(size))
    }
}

pub fn validate_decimation(rate: u32) -> Result<u32, ConfigError> {
    if (1..=MAX_DECIMATION).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::Decimation(rate))
    }
}

pub fn validate_threshold(threshold: f32) -> Result<f32, ConfigError> {
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(threshold)
    } else {
        Err(ConfigError::Threshold(threshold))
    }
}

/// Receive chain settings implied by a decimation rate.
///
/// Rates 1 and 2 bypass the CIC. Other even rates split the work between the
/// CIC (rate / 2) and the half-band filter, odd rates use the CIC alone. The
/// 32-bit gain stage after the CIC offsets its bit growth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RxFilterPlan {
    pub cic_bypass: bool,
    pub halfband_bypass: bool,
    pub cic_decimation: Option<u32>,
    pub gain: u32,
}

impl RxFilterPlan {
    pub fn for_decimation(rate: u32) -> Self {
        match rate {
            0 | 1 => Self {
                cic_bypass: true,
                halfband_bypass: true,
                cic_decimation: None,
                gain: 1,
            },
            2 => Self {
                cic_bypass: true,
                halfband_bypass: false,
                cic_decimation: None,
                gain: 1,
            },
            r if r % 2 == 0 => Self {
                cic_bypass: false,
                halfband_bypass: false,
                cic_decimation: Some(r / 2),
                gain: cic_gain(r / 2),
            },
            r => Self {
                cic_bypass: false,
                halfband_bypass: true,
                cic_decimation: Some(r),
                gain: cic_gain(r),
            },
        }
    }
}

// Never let the gain drop to zero
fn cic_gain(cic_rate: u32) -> u32 {
    let exponent = 26.0 - 3.0 * (cic_rate as f64).log2();
    if exponent > 1.0 {
        exponent.exp2().ceil() as u32
    } else {
        1
    }
}
