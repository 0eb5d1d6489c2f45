//! The spectrum decision: is every FFT bin below the threshold?
//!
//! Two representations reach the same answer. Host sensing produces float
//! magnitudes that are compared against the threshold directly. With FPGA
//! thresholding the block hands us [`PackedBin`] records that already carry
//! the comparison result in bit 31 of the high word, so the scan only needs an
//! unsigned `>= 0x8000_0000` test.
//!
//! Every scan is index-ascending and stops at the first offending bin, so the
//! reported bin is always the lowest exceeding index. The batched variants
//! test `W` bins at a time without branching and then locate the first
//! offending lane inside the group; they are a throughput optimisation only.

use crate::complex::PackedBin;

/// Group width used by the sensing loop, one NEON quad register of high words
pub const LANES: usize = 4;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Decision {
    /// Every bin is at or below the threshold, safe to transmit
    Clear,
    /// The lowest-index bin that exceeded the threshold
    Exceeded { index: usize, magnitude: f32 },
}

impl Decision {
    pub fn is_clear(&self) -> bool {
        matches!(self, Decision::Clear)
    }

    pub fn is_exceeded(&self) -> bool {
        !self.is_clear()
    }

    /// Shift a decision made over a sub-slice back into whole-vector indices
    fn offset(self, base: usize) -> Self {
        match self {
            Decision::Clear => Decision::Clear,
            Decision::Exceeded { index, magnitude } => Decision::Exceeded {
                index: index + base,
                magnitude,
            },
        }
    }
}

/// Scalar scan over float magnitudes. NaN never exceeds.
pub fn evaluate(magnitudes: &[f32], threshold: f32) -> Decision {
    match magnitudes.iter().position(|&m| m > threshold) {
        Some(index) => Decision::Exceeded {
            index,
            magnitude: magnitudes[index],
        },
        None => Decision::Clear,
    }
}

/// Scalar scan over packed hardware records
pub fn evaluate_packed(bins: &[PackedBin]) -> Decision {
    match bins.iter().position(|b| b.exceeded()) {
        Some(index) => Decision::Exceeded {
            index,
            magnitude: bins[index].magnitude(),
        },
        None => Decision::Clear,
    }
}

/// [`evaluate`] in groups of `W` bins
pub fn evaluate_batched<const W: usize>(magnitudes: &[f32], threshold: f32) -> Decision {
    assert!(W > 0, "Group width must be non-zero");
    let mut groups = magnitudes.chunks_exact(W);
    for (n, group) in (&mut groups).enumerate() {
        let any = group.iter().fold(false, |acc, &m| acc | (m > threshold));
        if any {
            return evaluate(group, threshold).offset(n * W);
        }
    }
    let tail = groups.remainder();
    evaluate(tail, threshold).offset(magnitudes.len() - tail.len())
}

/// [`evaluate_packed`] in groups of `W` records. Groups of four use NEON on aarch64.
pub fn evaluate_packed_batched<const W: usize>(bins: &[PackedBin]) -> Decision {
    assert!(W > 0, "Group width must be non-zero");
    let mut groups = bins.chunks_exact(W);
    for (n, group) in (&mut groups).enumerate() {
        if group_exceeded(group) {
            return evaluate_packed(group).offset(n * W);
        }
    }
    let tail = groups.remainder();
    evaluate_packed(tail).offset(bins.len() - tail.len())
}

fn scalar_group_exceeded(group: &[PackedBin]) -> bool {
    group.iter().fold(false, |acc, b| acc | b.exceeded())
}

#[cfg(not(target_arch = "aarch64"))]
fn group_exceeded(group: &[PackedBin]) -> bool {
    scalar_group_exceeded(group)
}

#[cfg(target_arch = "aarch64")]
fn group_exceeded(group: &[PackedBin]) -> bool {
    if let [a, b, c, d] = group {
        let words = [a.high_word(), b.high_word(), c.high_word(), d.high_word()];
        // Safety: NEON is part of the aarch64 baseline
        unsafe { neon_any_flagged(&words) }
    } else {
        scalar_group_exceeded(group)
    }
}

#[cfg(target_arch = "aarch64")]
unsafe fn neon_any_flagged(words: &[u32; 4]) -> bool {
    use std::arch::aarch64::{vcgeq_u32, vdupq_n_u32, vld1q_u32, vmaxvq_u32};
    let lanes = vld1q_u32(words.as_ptr());
    let compares = vcgeq_u32(lanes, vdupq_n_u32(crate::complex::EXCEEDED_FLAG));
    vmaxvq_u32(compares) != 0
}
