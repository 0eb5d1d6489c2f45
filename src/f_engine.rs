use std::{fmt, sync::Arc};

use num_traits::Float;
use rustfft::{algorithm::Radix4, Fft, FftDirection, Length};

use crate::complex::IqSample;
use num_complex::Complex;

// Host-side spectrum sensing. For each acquired block we
// * FFT the raw I/Q block (no window, same as the FPGA path)
// * take sqrt(I^2 + Q^2) per bin
//
// Block sizes are always powers of two, so a radix-4 plan covers every size
// the front end can produce.

/// Per-bin magnitude of a frequency-domain frame
pub fn magnitudes<T: Float>(frame: &[Complex<T>], out: &mut [T]) {
    assert_eq!(frame.len(), out.len());
    for (mag, bin) in out.iter_mut().zip(frame) {
        *mag = (bin.re * bin.re + bin.im * bin.im).sqrt();
    }
}

/// A planned forward FFT plus the buffers to run it without allocating
pub struct Spectrometer {
    fft: Arc<dyn Fft<f32>>,
    frame: Vec<IqSample>,
    scratch: Vec<IqSample>,
}

impl fmt::Debug for Spectrometer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spectrometer")
            .field("fft_size", &self.fft_size())
            .finish()
    }
}

impl Spectrometer {
    pub fn new(fft_size: usize) -> Self {
        Self::with_plan(Arc::new(Radix4::new(fft_size, FftDirection::Forward)))
    }

    fn with_plan(fft: Arc<dyn Fft<f32>>) -> Self {
        let len = fft.len();
        let scratch_len = fft.get_inplace_scratch_len();
        Self {
            fft,
            frame: vec![IqSample::default(); len],
            scratch: vec![IqSample::default(); scratch_len],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft.len()
    }

    /// Transform `block` and write one magnitude per bin into `out`
    pub fn process(&mut self, block: &[IqSample], out: &mut [f32]) {
        assert_eq!(block.len(), self.fft_size(), "Block size must match the FFT size");
        self.frame.copy_from_slice(block);
        self.fft
            .process_with_scratch(&mut self.frame, &mut self.scratch);
        magnitudes(&self.frame, out);
    }

    /// The frequency-domain frame from the last call to [`Spectrometer::process`]
    pub fn frame(&self) -> &[IqSample] {
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_magnitude() {
        let frame = [Complex::new(3.0f32, 4.0), Complex::new(-1.0, 0.0)];
        let mut out = [0f32; 2];
        magnitudes(&frame, &mut out);
        assert_eq!(out, [5.0, 1.0]);

        let frame = [Complex::new(3.0f64, -4.0)];
        let mut out = [0f64; 1];
        magnitudes(&frame, &mut out);
        assert_eq!(out, [5.0]);
    }

    #[test]
    fn test_tone_lands_in_its_bin() {
        let n = 256;
        let bin = 10;
        let block: Vec<IqSample> = (0..n)
            .map(|i| {
                let phase = 2.0 * PI * bin as f32 * i as f32 / n as f32;
                IqSample::new(phase.cos(), phase.sin())
            })
            .collect();
        let mut spec = Spectrometer::new(n);
        let mut mags = vec![0f32; n];
        spec.process(&block, &mut mags);
        let peak = mags
            .iter()
            .enumerate()
            .fold((0, 0f32), |best, (i, &m)| if m > best.1 { (i, m) } else { best });
        assert_eq!(peak.0, bin);
        // Unnormalised transform, a unit tone sums to N
        assert!((peak.1 - n as f32).abs() < 0.1);
        assert!(mags[bin + 1] < 0.1);
    }

    #[test]
    fn test_dc_block() {
        let mut spec = Spectrometer::new(64);
        let block = vec![IqSample::new(0.5, 0.0); 64];
        let mut mags = vec![0f32; 64];
        spec.process(&block, &mut mags);
        assert!((mags[0] - 32.0).abs() < 1e-4);
        assert!(mags[1..].iter().all(|&m| m < 1e-4));
        assert!((spec.frame()[0].re - 32.0).abs() < 1e-4);
    }
}
