//! Acquisition providers.
//!
//! Both reads block until a complete buffer is available or the driver
//! reports an error. Buffers are always exactly one FFT frame long.

use crate::{
    complex::{IqSample, PackedBin},
    error::DeviceError,
};

/// Time-domain I/Q blocks, for sensing on the host
pub trait SampleSource {
    fn read_samples(&mut self, buf: &mut [IqSample]) -> Result<(), DeviceError>;
}

/// Magnitude/threshold records from the spectrum sense block
pub trait PackedSource {
    fn read_packed(&mut self, buf: &mut [PackedBin]) -> Result<(), DeviceError>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read_samples(&mut self, buf: &mut [IqSample]) -> Result<(), DeviceError> {
        (**self).read_samples(buf)
    }
}

impl<P: PackedSource + ?Sized> PackedSource for Box<P> {
    fn read_packed(&mut self, buf: &mut [PackedBin]) -> Result<(), DeviceError> {
        (**self).read_packed(buf)
    }
}

pub(crate) fn check_len(expected: usize, actual: usize) -> Result<(), DeviceError> {
    if expected == actual {
        Ok(())
    } else {
        Err(DeviceError::BufferSizeMismatch { expected, actual })
    }
}
