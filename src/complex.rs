//! Sample and record types exchanged with the accelerator

use num_complex::Complex;

/// One baseband sample as delivered by the receive chain (fix2float enabled)
pub type IqSample = Complex<f32>;

/// High word bit the spectrum sense block sets when a bin exceeded the threshold
pub const EXCEEDED_FLAG: u32 = 0x8000_0000;

/// The bin index occupies the rest of the high word
pub const INDEX_MASK: u32 = !EXCEEDED_FLAG;

/// The type of magnitude/threshold data out of the FPGA (output mode 1).
///
/// Each bin is a single 64-bit AXI transfer:
/// * low word: magnitude as IEEE-754 single precision
/// * high word: bit 31 is the exceeded flag, bits 30..0 are the FFT bin index
///
/// Because the flag is the top bit, "exceeded" is the same thing as the high
/// word comparing unsigned `>=` against [`EXCEEDED_FLAG`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct PackedBin(u64);

impl PackedBin {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Build a record the way the spectrum sense block would for `magnitude`
    /// compared against `threshold`.
    pub fn encode(index: u32, magnitude: f32, threshold: f32) -> Self {
        let flag = if magnitude > threshold { EXCEEDED_FLAG } else { 0 };
        Self::from_words(flag | (index & INDEX_MASK), magnitude.to_bits())
    }

    pub const fn from_words(high: u32, low: u32) -> Self {
        Self(((high as u64) << 32) | low as u64)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn high_word(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn low_word(self) -> u32 {
        self.0 as u32
    }

    pub const fn exceeded(self) -> bool {
        self.high_word() >= EXCEEDED_FLAG
    }

    pub const fn index(self) -> u32 {
        self.high_word() & INDEX_MASK
    }

    pub fn magnitude(self) -> f32 {
        f32::from_bits(self.low_word())
    }
}

/// Reinterpret raw 64-bit transfers (as read from a DMA buffer or capture file)
pub fn packed_from_raw(raw: &[u64], out: &mut [PackedBin]) {
    assert_eq!(raw.len(), out.len());
    for (bin, word) in out.iter_mut().zip(raw) {
        *bin = PackedBin::from_raw(*word);
    }
}

/// Inverse of [`packed_from_raw`]
pub fn packed_to_raw(bins: &[PackedBin], out: &mut [u64]) {
    assert_eq!(bins.len(), out.len());
    for (word, bin) in out.iter_mut().zip(bins) {
        *word = bin.raw();
    }
}

/// Reinterpret interleaved I/Q floats as complex samples
pub fn samples_from_interleaved(raw: &[f32], out: &mut [IqSample]) {
    assert_eq!(raw.len(), 2 * out.len());
    for (sample, pair) in out.iter_mut().zip(raw.chunks_exact(2)) {
        *sample = IqSample::new(pair[0], pair[1]);
    }
}

/// Inverse of [`samples_from_interleaved`]
pub fn samples_to_interleaved(samples: &[IqSample], out: &mut [f32]) {
    assert_eq!(out.len(), 2 * samples.len());
    for (pair, sample) in out.chunks_exact_mut(2).zip(samples) {
        pair[0] = sample.re;
        pair[1] = sample.im;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_and_index() {
        let bin = PackedBin::encode(17, 2.5, 1.0);
        assert!(bin.exceeded());
        assert_eq!(bin.index(), 17);
        assert_eq!(bin.magnitude(), 2.5);
        assert_eq!(bin.high_word(), 0x8000_0011);

        let quiet = PackedBin::encode(4095, 0.5, 1.0);
        assert!(!quiet.exceeded());
        assert_eq!(quiet.index(), 4095);
    }

    #[test]
    fn test_equal_to_threshold_is_not_exceeded() {
        assert!(!PackedBin::encode(0, 1.0, 1.0).exceeded());
    }

    #[test]
    fn test_hardware_word_layout() {
        // Lower 32 bits magnitude, upper 32 bits flag + index
        let bin = PackedBin::from_raw(0x8000_0003_3f66_6666);
        assert!(bin.exceeded());
        assert_eq!(bin.index(), 3);
        assert!((bin.magnitude() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_interleaved_samples() {
        let raw = [1.0f32, -1.0, 0.5, 0.25];
        let mut samples = [IqSample::default(); 2];
        samples_from_interleaved(&raw, &mut samples);
        assert_eq!(samples[1], IqSample::new(0.5, 0.25));
        let mut back = [0f32; 4];
        samples_to_interleaved(&samples, &mut back);
        assert_eq!(back, raw);
    }
}
