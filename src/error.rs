//! Error types

use std::{io, path::PathBuf};

use thiserror::Error;

/// Invalid run parameters. These are fatal at startup.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("FFT size must be a power of two between {min} and {max}, got {0}", min = crate::MIN_FFT_SIZE, max = crate::MAX_FFT_SIZE)]
    FftSize(usize),

    #[error("Decimation rate must be between 1 and {max}, got {0}", max = crate::MAX_DECIMATION)]
    Decimation(u32),

    #[error("Threshold must be a finite, non-negative number, got {0}")]
    Threshold(f32),

    #[error("Exceed timeout must allow at least one poll")]
    ExceedTimeout,

    #[error("Clear timeout must allow at least one poll")]
    ClearTimeout,
}

/// Failures from the acquisition provider or the transmit gate
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Capture {path:?} is empty")]
    EmptyCapture { path: PathBuf },

    #[error("Capture {path:?} holds {len} bytes, not a whole number of {frame_bytes} byte frames")]
    PartialFrame {
        path: PathBuf,
        len: u64,
        frame_bytes: usize,
    },

    #[error("Driver error: {0}")]
    Driver(String),
}

/// Failures that end a sensing run. Timeouts are not errors, see
/// [`crate::control::CycleOutcome`].
#[derive(Error, Debug)]
pub enum SenseError {
    #[error("Acquisition failed on poll {poll}: {source}")]
    Acquisition {
        poll: u32,
        #[source]
        source: DeviceError,
    },

    #[error("Transmit gate failed: {0}")]
    Gate(#[source] DeviceError),
}

#[derive(Error, Debug)]
#[error("Failed to write capture {path:?}: {source}")]
pub struct CaptureError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}
