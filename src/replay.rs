//! Serve previously recorded frames as if they came from the accelerator.
//!
//! Files are raw native-endian words exactly as [`crate::capture`] writes them:
//! interleaved `f32` I/Q pairs for sample captures, 64-bit records for packed
//! FFT captures. Frames are served in order and wrap around at the end.

use std::{
    fs::File,
    io::Read,
    mem,
    path::{Path, PathBuf},
};

use byte_slice_cast::{AsMutByteSlice, ToMutByteSlice};
use tracing::debug;

use crate::{
    complex::{packed_from_raw, samples_from_interleaved, IqSample, PackedBin},
    device::{check_len, PackedSource, SampleSource},
    error::DeviceError,
};

#[derive(Debug)]
pub struct Replay<T> {
    path: PathBuf,
    words: Vec<T>,
    frame_words: usize,
    cursor: usize,
}

/// Interleaved I/Q sample captures
pub type SampleReplay = Replay<f32>;
/// Packed magnitude/threshold captures
pub type PackedReplay = Replay<u64>;

impl<T: ToMutByteSlice + Default + Copy> Replay<T> {
    fn load(path: &Path, frame_words: usize) -> Result<Self, DeviceError> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        let frame_bytes = frame_words * mem::size_of::<T>();
        if len == 0 {
            return Err(DeviceError::EmptyCapture {
                path: path.to_owned(),
            });
        }
        if len % frame_bytes as u64 != 0 {
            return Err(DeviceError::PartialFrame {
                path: path.to_owned(),
                len,
                frame_bytes,
            });
        }
        // Read straight into typed storage so the words are aligned
        let mut words = vec![T::default(); len as usize / mem::size_of::<T>()];
        file.read_exact(words.as_mut_byte_slice())?;
        debug!(?path, frames = words.len() / frame_words, "Loaded capture");
        Ok(Self {
            path: path.to_owned(),
            words,
            frame_words,
            cursor: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames(&self) -> usize {
        self.words.len() / self.frame_words
    }

    fn next_frame(&mut self) -> &[T] {
        let start = self.cursor * self.frame_words;
        self.cursor = (self.cursor + 1) % self.frames();
        &self.words[start..start + self.frame_words]
    }
}

impl SampleReplay {
    pub fn open(path: impl AsRef<Path>, fft_size: usize) -> Result<Self, DeviceError> {
        Self::load(path.as_ref(), 2 * fft_size)
    }
}

impl PackedReplay {
    pub fn open(path: impl AsRef<Path>, fft_size: usize) -> Result<Self, DeviceError> {
        Self::load(path.as_ref(), fft_size)
    }
}

impl SampleSource for SampleReplay {
    fn read_samples(&mut self, buf: &mut [IqSample]) -> Result<(), DeviceError> {
        check_len(self.frame_words / 2, buf.len())?;
        samples_from_interleaved(self.next_frame(), buf);
        Ok(())
    }
}

impl PackedSource for PackedReplay {
    fn read_packed(&mut self, buf: &mut [PackedBin]) -> Result<(), DeviceError> {
        check_len(self.frame_words, buf.len())?;
        packed_from_raw(self.next_frame(), buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{record_packed, record_samples};
    use std::io::Write;

    #[test]
    fn test_packed_frames_wrap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fft.dat");
        let quiet: Vec<PackedBin> = (0..64).map(|i| PackedBin::encode(i, 0.1, 1.0)).collect();
        let loud: Vec<PackedBin> = (0..64).map(|i| PackedBin::encode(i, 2.0, 1.0)).collect();
        let both: Vec<PackedBin> = quiet.iter().chain(&loud).copied().collect();
        record_packed(&path, &both).unwrap();

        let mut replay = PackedReplay::open(&path, 64).unwrap();
        assert_eq!(replay.frames(), 2);
        let mut buf = vec![PackedBin::default(); 64];
        replay.read_packed(&mut buf).unwrap();
        assert_eq!(buf, quiet);
        replay.read_packed(&mut buf).unwrap();
        assert_eq!(buf, loud);
        replay.read_packed(&mut buf).unwrap();
        assert_eq!(buf, quiet);
    }

    #[test]
    fn test_sample_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iq.dat");
        let block: Vec<IqSample> = (0..64).map(|i| IqSample::new(i as f32, -(i as f32))).collect();
        record_samples(&path, &block).unwrap();

        let mut replay = SampleReplay::open(&path, 64).unwrap();
        let mut buf = vec![IqSample::default(); 64];
        replay.read_samples(&mut buf).unwrap();
        assert_eq!(buf, block);
    }

    #[test]
    fn test_partial_frame_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.dat");
        File::create(&path).unwrap().write_all(&[0u8; 100]).unwrap();
        assert!(matches!(
            PackedReplay::open(&path, 64),
            Err(DeviceError::PartialFrame { len: 100, frame_bytes: 512, .. })
        ));
    }

    #[test]
    fn test_empty_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.dat");
        File::create(&path).unwrap();
        assert!(matches!(
            SampleReplay::open(&path, 64),
            Err(DeviceError::EmptyCapture { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            PackedReplay::open("/nonexistent/crash.dat", 64),
            Err(DeviceError::Io(_))
        ));
    }
}
