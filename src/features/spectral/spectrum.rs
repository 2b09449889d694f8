//! Magnitude spectrum via real-input FFT
//!
//! Frames are zero-padded up to the next FFT-friendly length before the
//! transform, so the spectrum has `next_fast_len(n) / 2 + 1` bins.

use crate::error::AnalysisError;
use rustfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::fmt;
use std::sync::Arc;

/// Prime factors an FFT length may contain to count as fast
const FAST_FACTORS: [usize; 5] = [2, 3, 5, 7, 11];

/// Smallest length `m >= n` whose prime factors are all in {2, 3, 5, 7, 11}
///
/// # Example
///
/// ```
/// use hpcp_key::features::spectral::spectrum::next_fast_len;
///
/// assert_eq!(next_fast_len(1024), 1024);
/// assert_eq!(next_fast_len(13), 14);
/// assert_eq!(next_fast_len(4097), 4116);
/// ```
pub fn next_fast_len(n: usize) -> usize {
    if n <= 1 {
        return n;
    }
    let mut candidate = n;
    while !is_fast_len(candidate) {
        candidate += 1;
    }
    candidate
}

fn is_fast_len(mut n: usize) -> bool {
    for &factor in &FAST_FACTORS {
        while n % factor == 0 {
            n /= factor;
        }
    }
    n == 1
}

/// Reusable magnitude-spectrum transform for one input length
///
/// Plans the FFT once and keeps the scratch buffers, so converting many
/// frames of the same size does not reallocate.
pub struct SpectrumConverter {
    input_len: usize,
    fft: Arc<dyn RealToComplex<f64>>,
    input: Vec<f64>,
    output: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl fmt::Debug for SpectrumConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumConverter")
            .field("input_len", &self.input_len)
            .field("fft_len", &self.fft.len())
            .finish()
    }
}

impl SpectrumConverter {
    /// Plan a transform for frames of `input_len` samples
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if `input_len` is zero.
    pub fn new(input_len: usize) -> Result<Self, AnalysisError> {
        if input_len == 0 {
            return Err(AnalysisError::InvalidParameter(
                "Spectrum input length must be > 0".to_string(),
            ));
        }

        let fft_len = next_fast_len(input_len);
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_len);

        log::debug!("Planned real FFT: input_len={}, fft_len={}", input_len, fft_len);

        Ok(Self {
            input_len,
            input: fft.make_input_vec(),
            output: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            fft,
        })
    }

    /// Frame length this converter accepts
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Padded transform length
    pub fn fft_len(&self) -> usize {
        self.fft.len()
    }

    /// Number of magnitude bins produced (`fft_len / 2 + 1`)
    pub fn output_len(&self) -> usize {
        self.fft.len() / 2 + 1
    }

    /// Magnitude of each complex bin, 0..=fft_len/2
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if the frame length differs
    /// from the planned input length.
    pub fn compute(&mut self, frame: &[f64]) -> Result<Vec<f64>, AnalysisError> {
        if frame.len() != self.input_len {
            return Err(AnalysisError::InvalidParameter(format!(
                "Frame length {} does not match planned spectrum length {}",
                frame.len(),
                self.input_len
            )));
        }

        self.input[..frame.len()].copy_from_slice(frame);
        self.input[frame.len()..].fill(0.0);

        self.fft
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
            .map_err(|e| AnalysisError::InvalidParameter(format!("FFT failed: {}", e)))?;

        Ok(self.output.iter().map(|c| c.norm()).collect())
    }
}

/// One-shot magnitude spectrum of a real frame
///
/// An empty frame yields an empty spectrum.
///
/// # Example
///
/// ```
/// use hpcp_key::features::spectral::spectrum::magnitude_spectrum;
///
/// let spectrum = magnitude_spectrum(&vec![1.0; 100])?;
/// assert_eq!(spectrum.len(), 51);
/// assert!((spectrum[0] - 100.0).abs() < 1e-9);
/// # Ok::<(), hpcp_key::AnalysisError>(())
/// ```
pub fn magnitude_spectrum(frame: &[f64]) -> Result<Vec<f64>, AnalysisError> {
    if frame.is_empty() {
        return Ok(vec![]);
    }
    SpectrumConverter::new(frame.len())?.compute(frame)
}
