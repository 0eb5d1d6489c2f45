//! Simulated front end for running without the accelerator.
//!
//! Mimics the bench setup: a pulsed CW tone that is off for `quiet_polls`
//! blocks and then on for `burst_polls` blocks, repeating, over a low noise
//! floor. Packed records are produced the way the spectrum sense block
//! reports them (magnitude plus exceeded flag against the configured threshold).

use std::f32::consts::PI;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::trace;

use crate::{
    complex::{IqSample, PackedBin},
    device::{check_len, PackedSource, SampleSource},
    error::DeviceError,
    f_engine::Spectrometer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurstPattern {
    pub quiet_polls: u32,
    pub burst_polls: u32,
}

impl Default for BurstPattern {
    fn default() -> Self {
        Self {
            quiet_polls: 2,
            burst_polls: 3,
        }
    }
}

impl BurstPattern {
    fn burst_active(&self, poll: u64) -> bool {
        let period = (self.quiet_polls + self.burst_polls) as u64;
        period != 0 && poll % period >= self.quiet_polls as u64
    }
}

#[derive(Debug)]
pub struct SimulatedFrontEnd {
    pattern: BurstPattern,
    threshold: f32,
    tone_bin: usize,
    tone_amplitude: f32,
    noise_amplitude: f32,
    poll: u64,
    rng: StdRng,
    spectrometer: Spectrometer,
    block: Vec<IqSample>,
    magnitudes: Vec<f32>,
}

impl SimulatedFrontEnd {
    pub fn new(fft_size: usize, pattern: BurstPattern, threshold: f32, seed: u64) -> Self {
        Self {
            pattern,
            threshold,
            // Off-centre so the tone doesn't sit on DC
            tone_bin: fft_size / 8,
            // Same level as the CW test waveform
            tone_amplitude: 0.5,
            noise_amplitude: 1e-3,
            poll: 0,
            rng: StdRng::seed_from_u64(seed),
            spectrometer: Spectrometer::new(fft_size),
            block: vec![IqSample::default(); fft_size],
            magnitudes: vec![0.0; fft_size],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.block.len()
    }

    /// How many blocks have been delivered so far
    pub fn polls(&self) -> u64 {
        self.poll
    }

    fn synthesize(&mut self) {
        let burst = self.pattern.burst_active(self.poll);
        trace!(poll = self.poll, burst, "Synthesizing block");
        let n = self.block.len() as f32;
        for (i, sample) in self.block.iter_mut().enumerate() {
            let noise = IqSample::new(
                self.rng.gen_range(-self.noise_amplitude..=self.noise_amplitude),
                self.rng.gen_range(-self.noise_amplitude..=self.noise_amplitude),
            );
            *sample = if burst {
                let phase = 2.0 * PI * self.tone_bin as f32 * i as f32 / n;
                noise + IqSample::from_polar(self.tone_amplitude, phase)
            } else {
                noise
            };
        }
        self.poll += 1;
    }
}

impl SampleSource for SimulatedFrontEnd {
    fn read_samples(&mut self, buf: &mut [IqSample]) -> Result<(), DeviceError> {
        check_len(self.block.len(), buf.len())?;
        self.synthesize();
        buf.copy_from_slice(&self.block);
        Ok(())
    }
}

impl PackedSource for SimulatedFrontEnd {
    fn read_packed(&mut self, buf: &mut [PackedBin]) -> Result<(), DeviceError> {
        check_len(self.block.len(), buf.len())?;
        self.synthesize();
        self.spectrometer.process(&self.block, &mut self.magnitudes);
        for (i, (bin, &mag)) in buf.iter_mut().zip(&self.magnitudes).enumerate() {
            *bin = PackedBin::encode(i as u32, mag, self.threshold);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{evaluate, evaluate_packed};

    #[test]
    fn test_pattern() {
        let pattern = BurstPattern {
            quiet_polls: 2,
            burst_polls: 1,
        };
        let active: Vec<bool> = (0..6).map(|p| pattern.burst_active(p)).collect();
        assert_eq!(active, [false, false, true, false, false, true]);
    }

    #[test]
    fn test_packed_follows_pattern() {
        let mut fe = SimulatedFrontEnd::new(
            256,
            BurstPattern {
                quiet_polls: 1,
                burst_polls: 1,
            },
            1.0,
            7,
        );
        let mut bins = vec![PackedBin::default(); 256];
        fe.read_packed(&mut bins).unwrap();
        assert!(evaluate_packed(&bins).is_clear());
        fe.read_packed(&mut bins).unwrap();
        match evaluate_packed(&bins) {
            crate::Decision::Exceeded { index, .. } => assert_eq!(index, 32),
            d => panic!("expected burst, got {d:?}"),
        }
        assert_eq!(fe.polls(), 2);
    }

    #[test]
    fn test_samples_follow_pattern() {
        let mut fe = SimulatedFrontEnd::new(64, BurstPattern::default(), 1.0, 1);
        let mut spec = Spectrometer::new(64);
        let mut block = vec![IqSample::default(); 64];
        let mut mags = vec![0f32; 64];
        let mut decisions = Vec::new();
        for _ in 0..5 {
            fe.read_samples(&mut block).unwrap();
            spec.process(&block, &mut mags);
            decisions.push(evaluate(&mags, 1.0).is_exceeded());
        }
        assert_eq!(decisions, [false, false, true, true, true]);
    }

    #[test]
    fn test_wrong_buffer_size() {
        let mut fe = SimulatedFrontEnd::new(64, BurstPattern::default(), 1.0, 1);
        let mut bins = vec![PackedBin::default(); 128];
        assert!(matches!(
            fe.read_packed(&mut bins),
            Err(DeviceError::BufferSizeMismatch {
                expected: 64,
                actual: 128
            })
        ));
    }
}
