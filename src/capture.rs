//! This module writes acquired frames to disk.
//!
//! The format is the raw buffer the accelerator DMA'd to us, native endian,
//! with no header: 64-bit records for packed FFT data, interleaved `f32` I/Q
//! for sample blocks. [`crate::replay`] reads the same format back.
//! Recording never replaces an existing file.

use std::{fs::OpenOptions, io::Write, path::Path};

use byte_slice_cast::AsByteSlice;
use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::{
    complex::{packed_to_raw, samples_to_interleaved, IqSample, PackedBin},
    error::CaptureError,
};

/// `crash-<kind>-YYYY-MM-DD-HH:MM:SS.dat`
pub fn default_capture_name(kind: &str, time: &DateTime<Utc>) -> String {
    format!(
        "crash-{}-{}-{:02}-{:02}-{:02}:{:02}:{:02}.dat",
        kind,
        time.year(),
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second()
    )
}

/// [`default_capture_name`] with a `-<n>` suffix for every `n` but zero, for
/// frames recorded within the same second
pub fn numbered_capture_name(kind: &str, time: &DateTime<Utc>, n: u32) -> String {
    let name = default_capture_name(kind, time);
    if n == 0 {
        return name;
    }
    match name.strip_suffix(".dat") {
        Some(stem) => format!("{stem}-{n}.dat"),
        None => format!("{name}-{n}"),
    }
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), CaptureError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .and_then(|mut file| file.write_all(bytes))
        .map_err(|source| CaptureError {
            path: path.to_owned(),
            source,
        })
}

pub fn record_packed(path: impl AsRef<Path>, bins: &[PackedBin]) -> Result<(), CaptureError> {
    let mut raw = vec![0u64; bins.len()];
    packed_to_raw(bins, &mut raw);
    write_bytes(path.as_ref(), raw.as_byte_slice())
}

pub fn record_samples(path: impl AsRef<Path>, block: &[IqSample]) -> Result<(), CaptureError> {
    let mut raw = vec![0f32; 2 * block.len()];
    samples_to_interleaved(block, &mut raw);
    write_bytes(path.as_ref(), raw.as_byte_slice())
}
