//! Timing statistics for the sensing loop.
//!
//! Every completed cycle records how long the final (clear) poll spent in
//! acquisition, sensing, and the decision scan. Only the most recent
//! [`TIMING_HISTORY`] cycles are kept; averages are over what was recorded.

use std::time::Duration;

use tracing::info;

pub const TIMING_HISTORY: usize = 30;

/// Where the time of a single poll went
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollTiming {
    /// Blocking read from the acquisition provider ("DMA" time)
    pub acquire: Duration,
    /// FFT and magnitude computation, zero when the FPGA senses
    pub sense: Duration,
    /// Threshold scan
    pub decide: Duration,
}

/// Fixed-capacity ring of the most recent `N` samples
#[derive(Clone, Debug)]
pub struct SampleRing<const N: usize> {
    samples: [f32; N],
    next: usize,
    len: usize,
}

impl<const N: usize> Default for SampleRing<N> {
    fn default() -> Self {
        Self {
            samples: [0.0; N],
            next: 0,
            len: 0,
        }
    }
}

impl<const N: usize> SampleRing<N> {
    pub fn push(&mut self, sample: f32) {
        self.samples[self.next] = sample;
        self.next = (self.next + 1) % N;
        self.len = (self.len + 1).min(N);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // Until the ring wraps, the valid samples are the first `len`
    pub fn mean(&self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let sum: f32 = self.samples[..self.len].iter().sum();
        Some(sum / self.len as f32)
    }
}

fn micros(d: Duration) -> f32 {
    d.as_secs_f32() * 1e6
}

#[derive(Clone, Debug, Default)]
pub struct TimingReport {
    loops: u64,
    acquire: SampleRing<TIMING_HISTORY>,
    sense: SampleRing<TIMING_HISTORY>,
    decide: SampleRing<TIMING_HISTORY>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingSummary {
    pub loops: u64,
    pub acquire_us: Option<f32>,
    pub sense_us: Option<f32>,
    pub decide_us: Option<f32>,
}

impl TimingReport {
    pub fn record(&mut self, timing: &PollTiming) {
        self.loops += 1;
        self.acquire.push(micros(timing.acquire));
        self.sense.push(micros(timing.sense));
        self.decide.push(micros(timing.decide));
    }

    pub fn summary(&self) -> TimingSummary {
        TimingSummary {
            loops: self.loops,
            acquire_us: self.acquire.mean(),
            sense_us: self.sense.mean(),
            decide_us: self.decide.mean(),
        }
    }

    pub fn log_summary(&self) {
        let s = self.summary();
        info!(
            loops = s.loops,
            avg_acquire_us = s.acquire_us.unwrap_or_default(),
            avg_sense_us = s.sense_us.unwrap_or_default(),
            avg_decide_us = s.decide_us.unwrap_or_default(),
            "Timing summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ring_has_no_mean() {
        let ring = SampleRing::<4>::default();
        assert!(ring.is_empty());
        assert_eq!(ring.mean(), None);
    }

    #[test]
    fn test_partial_ring_averages_recorded_only() {
        let mut ring = SampleRing::<30>::default();
        ring.push(1.0);
        ring.push(3.0);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.mean(), Some(2.0));
    }

    #[test]
    fn test_ring_keeps_most_recent() {
        let mut ring = SampleRing::<3>::default();
        for x in [100.0, 1.0, 2.0, 3.0] {
            ring.push(x);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.mean(), Some(2.0));
    }

    #[test]
    fn test_report() {
        let mut report = TimingReport::default();
        for _ in 0..40 {
            report.record(&PollTiming {
                acquire: Duration::from_micros(10),
                sense: Duration::from_micros(20),
                decide: Duration::from_micros(2),
            });
        }
        let s = report.summary();
        assert_eq!(s.loops, 40);
        assert!((s.acquire_us.unwrap() - 10.0).abs() < 1e-3);
        assert!((s.sense_us.unwrap() - 20.0).abs() < 1e-3);
        assert!((s.decide_us.unwrap() - 2.0).abs() < 1e-3);
    }
}
