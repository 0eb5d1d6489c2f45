//! Spectrum sensing and transmit gating for the CRASH accelerator.
//!
//! Each cycle acquires an FFT magnitude block, decides whether every bin is
//! below the threshold, and drives the transmit enable accordingly. Sensing
//! runs either on the host ([`detector::HostFftDetector`]) or in the FPGA
//! with only the decision scan on the host ([`detector::PackedDetector`]).

pub mod capture;
pub mod complex;
pub mod config;
pub mod control;
pub mod decision;
pub mod detector;
pub mod device;
pub mod error;
pub mod f_engine;
pub mod gate;
pub mod monitoring;
pub mod replay;
pub mod sim;

pub use complex::{IqSample, PackedBin};
pub use decision::Decision;

// Set by the spectrum sense block
pub const MIN_FFT_SIZE: usize = 64;
pub const MAX_FFT_SIZE: usize = 4096;
pub const DEFAULT_FFT_SIZE: usize = 256;
// CIC decimation register is 11 bits
pub const MAX_DECIMATION: u32 = 2047;
pub const DEFAULT_THRESHOLD: f32 = 1.0;
// Polls allowed while waiting for a burst
pub const EXCEED_TIMEOUT_POLLS: u32 = 11;
