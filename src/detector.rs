//! One acquisition plus one decision.
//!
//! A [`Detector`] pairs an acquisition provider with the evaluator for the
//! representation that provider delivers, and times each stage.

use std::{path::Path, time::Instant};

use tracing::trace;

use crate::{
    capture::{record_packed, record_samples},
    complex::{IqSample, PackedBin},
    decision::{evaluate_batched, evaluate_packed_batched, Decision, LANES},
    device::{PackedSource, SampleSource},
    error::{CaptureError, DeviceError},
    f_engine::Spectrometer,
    monitoring::PollTiming,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Poll {
    pub decision: Decision,
    pub timing: PollTiming,
}

pub trait Detector {
    /// Block for one frame and decide on it
    fn poll(&mut self) -> Result<Poll, DeviceError>;

    /// Short label used in capture file names
    fn capture_kind(&self) -> &'static str;

    /// Write the most recently acquired frame
    fn save_frame(&self, path: &Path) -> Result<(), CaptureError>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn poll(&mut self) -> Result<Poll, DeviceError> {
        (**self).poll()
    }

    fn capture_kind(&self) -> &'static str {
        (**self).capture_kind()
    }

    fn save_frame(&self, path: &Path) -> Result<(), CaptureError> {
        (**self).save_frame(path)
    }
}

/// Raw I/Q from the front end, FFT and threshold on the host
#[derive(Debug)]
pub struct HostFftDetector<S> {
    source: S,
    threshold: f32,
    spectrometer: Spectrometer,
    block: Vec<IqSample>,
    magnitudes: Vec<f32>,
}

impl<S: SampleSource> HostFftDetector<S> {
    pub fn new(source: S, fft_size: usize, threshold: f32) -> Self {
        Self {
            source,
            threshold,
            spectrometer: Spectrometer::new(fft_size),
            block: vec![IqSample::default(); fft_size],
            magnitudes: vec![0.0; fft_size],
        }
    }

    /// Magnitudes from the last poll
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    pub fn into_source(self) -> S {
        self.source
    }
}

impl<S: SampleSource> Detector for HostFftDetector<S> {
    fn poll(&mut self) -> Result<Poll, DeviceError> {
        let start = Instant::now();
        self.source.read_samples(&mut self.block)?;
        let acquired = Instant::now();
        self.spectrometer.process(&self.block, &mut self.magnitudes);
        let sensed = Instant::now();
        let decision = evaluate_batched::<LANES>(&self.magnitudes, self.threshold);
        let decided = Instant::now();
        trace!(?decision, "Host poll");
        Ok(Poll {
            decision,
            timing: PollTiming {
                acquire: acquired - start,
                sense: sensed - acquired,
                decide: decided - sensed,
            },
        })
    }

    fn capture_kind(&self) -> &'static str {
        "samples"
    }

    fn save_frame(&self, path: &Path) -> Result<(), CaptureError> {
        record_samples(path, &self.block)
    }
}

/// Magnitude and exceeded flags computed by the spectrum sense block; the
/// host only scans the flags
#[derive(Debug)]
pub struct PackedDetector<P> {
    source: P,
    bins: Vec<PackedBin>,
}

impl<P: PackedSource> PackedDetector<P> {
    pub fn new(source: P, fft_size: usize) -> Self {
        Self {
            source,
            bins: vec![PackedBin::default(); fft_size],
        }
    }

    /// Records from the last poll
    pub fn bins(&self) -> &[PackedBin] {
        &self.bins
    }

    pub fn into_source(self) -> P {
        self.source
    }
}

impl<P: PackedSource> Detector for PackedDetector<P> {
    fn poll(&mut self) -> Result<Poll, DeviceError> {
        let start = Instant::now();
        self.source.read_packed(&mut self.bins)?;
        let acquired = Instant::now();
        let decision = evaluate_packed_batched::<LANES>(&self.bins);
        let decided = Instant::now();
        trace!(?decision, "Packed poll");
        Ok(Poll {
            decision,
            timing: PollTiming {
                acquire: acquired - start,
                sense: Default::default(),
                decide: decided - acquired,
            },
        })
    }

    fn capture_kind(&self) -> &'static str {
        "fft"
    }

    fn save_frame(&self, path: &Path) -> Result<(), CaptureError> {
        record_packed(path, &self.bins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        replay::PackedReplay,
        sim::{BurstPattern, SimulatedFrontEnd},
    };

    fn pattern() -> BurstPattern {
        BurstPattern {
            quiet_polls: 1,
            burst_polls: 1,
        }
    }

    #[test]
    fn test_host_and_packed_agree_on_simulated_bursts() {
        let mut host = HostFftDetector::new(SimulatedFrontEnd::new(128, pattern(), 1.0, 3), 128, 1.0);
        let mut packed = PackedDetector::new(SimulatedFrontEnd::new(128, pattern(), 1.0, 3), 128);
        for _ in 0..4 {
            let a = host.poll().unwrap().decision;
            let b = packed.poll().unwrap().decision;
            assert_eq!(a.is_exceeded(), b.is_exceeded());
            if let (
                Decision::Exceeded { index: ia, .. },
                Decision::Exceeded { index: ib, .. },
            ) = (a, b)
            {
                assert_eq!(ia, ib);
            }
        }
        assert_eq!(host.into_source().polls(), 4);
    }

    #[test]
    fn test_host_poll_on_quiet_block() {
        let mut host = HostFftDetector::new(SimulatedFrontEnd::new(64, pattern(), 1.0, 3), 64, 1.0);
        let poll = host.poll().unwrap();
        assert!(poll.decision.is_clear());
        assert_eq!(host.magnitudes().len(), 64);
    }

    #[test]
    fn test_saved_frame_replays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.dat");
        let mut packed = PackedDetector::new(
            SimulatedFrontEnd::new(
                64,
                BurstPattern {
                    quiet_polls: 0,
                    burst_polls: 1,
                },
                1.0,
                9,
            ),
            64,
        );
        let live = packed.poll().unwrap().decision;
        assert!(live.is_exceeded());
        packed.save_frame(&path).unwrap();
        assert_eq!(packed.capture_kind(), "fft");

        let mut replayed = PackedDetector::new(PackedReplay::open(&path, 64).unwrap(), 64);
        assert_eq!(replayed.poll().unwrap().decision, live);
        assert_eq!(replayed.bins(), packed.bins());
    }

    #[test]
    fn test_acquisition_error_propagates() {
        struct Broken;
        impl PackedSource for Broken {
            fn read_packed(&mut self, _: &mut [PackedBin]) -> Result<(), DeviceError> {
                Err(DeviceError::Driver("DMA timeout".into()))
            }
        }
        let mut detector = PackedDetector::new(Broken, 64);
        assert!(matches!(detector.poll(), Err(DeviceError::Driver(_))));
    }
}
