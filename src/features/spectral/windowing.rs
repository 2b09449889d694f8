//! Analysis windows
//!
//! Blackman-Harris family (parameterized plus 62 dB and 92 dB presets) and
//! the square window, with optional normalization, zero padding and
//! zero-phase rotation of the windowed frame.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Blackman-Harris coefficients for 62 dB side-lobe attenuation
pub const BLACKMAN_HARRIS_62DB: [f64; 4] = [0.44959, 0.49364, 0.05677, 0.0];

/// Blackman-Harris coefficients for 92 dB side-lobe attenuation
pub const BLACKMAN_HARRIS_92DB: [f64; 4] = [0.35875, 0.48829, 0.14128, 0.01168];

/// Window function selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WindowType {
    /// Rectangular window (all ones)
    Square,
    /// Blackman-Harris, 62 dB side lobes
    BlackmanHarris62,
    /// Blackman-Harris, 92 dB side lobes
    BlackmanHarris92,
    /// Blackman-Harris with explicit coefficients
    BlackmanHarris {
        /// Constant term
        a0: f64,
        /// First cosine term
        a1: f64,
        /// Second cosine term
        a2: f64,
        /// Third cosine term
        a3: f64,
    },
}

impl WindowType {
    /// Canonical name, as accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        match self {
            WindowType::Square => "square",
            WindowType::BlackmanHarris62 => "blackmanharris62",
            WindowType::BlackmanHarris92 => "blackmanharris92",
            WindowType::BlackmanHarris { .. } => "blackmanharris",
        }
    }

    /// Generate the window coefficients for `length` samples (unnormalized)
    pub fn generate(&self, length: usize) -> Vec<f64> {
        match *self {
            WindowType::Square => vec![1.0; length],
            WindowType::BlackmanHarris62 => blackman_harris_62db(length),
            WindowType::BlackmanHarris92 => blackman_harris_92db(length),
            WindowType::BlackmanHarris { a0, a1, a2, a3 } => blackman_harris(length, a0, a1, a2, a3),
        }
    }
}

impl Default for WindowType {
    fn default() -> Self {
        WindowType::BlackmanHarris62
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "square" | "rectangular" => Ok(WindowType::Square),
            "blackmanharris62" => Ok(WindowType::BlackmanHarris62),
            "blackmanharris92" => Ok(WindowType::BlackmanHarris92),
            _ => Err(AnalysisError::InvalidParameter(format!(
                "Unknown window type: {}",
                s
            ))),
        }
    }
}

/// Generalized four-term cosine-sum window
///
/// `w[i] = a0 - a1·cos(f·i) + a2·cos(2f·i) - a3·cos(3f·i)` with
/// `f = 2π / (length - 1)`. The window is symmetric; a single-sample window
/// is `[1.0]`.
///
/// # Example
///
/// ```
/// use hpcp_key::features::spectral::windowing::blackman_harris;
///
/// let w = blackman_harris(5, 0.5, 0.5, 0.0, 0.0); // Hann
/// assert!((w[2] - 1.0).abs() < 1e-12);
/// assert!(w[0].abs() < 1e-12);
/// ```
pub fn blackman_harris(length: usize, a0: f64, a1: f64, a2: f64, a3: f64) -> Vec<f64> {
    if length == 0 {
        return vec![];
    }
    if length == 1 {
        return vec![1.0];
    }

    let f = 2.0 * PI / (length - 1) as f64;
    let mut window = vec![0.0; length];
    let term = |i: usize| {
        let x = f * i as f64;
        a0 - a1 * x.cos() + a2 * (2.0 * x).cos() - a3 * (3.0 * x).cos()
    };

    // Mirror the first half so the window is exactly symmetric
    for i in 0..length / 2 {
        let value = term(i);
        window[i] = value;
        window[length - i - 1] = value;
    }
    if length % 2 != 0 {
        window[length / 2] = term(length / 2);
    }

    window
}

/// Blackman-Harris window with 62 dB side-lobe attenuation
pub fn blackman_harris_62db(length: usize) -> Vec<f64> {
    let [a0, a1, a2, a3] = BLACKMAN_HARRIS_62DB;
    blackman_harris(length, a0, a1, a2, a3)
}

/// Blackman-Harris window with 92 dB side-lobe attenuation
pub fn blackman_harris_92db(length: usize) -> Vec<f64> {
    let [a0, a1, a2, a3] = BLACKMAN_HARRIS_92DB;
    blackman_harris(length, a0, a1, a2, a3)
}

/// Scale a window to area 2 / Σ|w|
///
/// Half of a real signal's energy sits in the negative frequencies, so the
/// factor of two makes a 0 dB sinusoid read as 1.0 in the magnitude spectrum.
/// An all-zero window is returned unchanged.
pub fn normalize_window(window: &mut [f64]) {
    let sum: f64 = window.iter().map(|w| w.abs()).sum();
    if sum == 0.0 {
        return;
    }
    let scale = 2.0 / sum;
    for w in window.iter_mut() {
        *w *= scale;
    }
}

/// Windowing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowingConfig {
    /// Window function (default: BlackmanHarris62)
    pub window_type: WindowType,

    /// Zeros appended after windowing (default: 0)
    pub zero_padding_size: usize,

    /// Rotate so the frame center lands at index 0 (default: true)
    pub zero_phase: bool,

    /// Normalize the window area (default: true)
    pub normalize: bool,
}

impl Default for WindowingConfig {
    fn default() -> Self {
        Self {
            window_type: WindowType::BlackmanHarris62,
            zero_padding_size: 0,
            zero_phase: true,
            normalize: true,
        }
    }
}

/// Precomputed window for a fixed (type, length) pair
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    coefficients: Vec<f64>,
    window_type: WindowType,
}

impl Window {
    /// Build a window of `length` coefficients
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if `length` is zero.
    pub fn new(window_type: WindowType, length: usize, normalize: bool) -> Result<Self, AnalysisError> {
        if length == 0 {
            return Err(AnalysisError::InvalidParameter(
                "Window length must be > 0".to_string(),
            ));
        }

        let mut coefficients = window_type.generate(length);
        if normalize {
            normalize_window(&mut coefficients);
        }

        Ok(Self {
            coefficients,
            window_type,
        })
    }

    /// Window coefficients
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Window type
    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    /// Number of coefficients
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Always false; windows are never empty
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Multiply `frame` by the window, append `zero_padding_size` zeros and
    /// optionally rotate to zero phase
    ///
    /// With `zero_phase` the output is `frame[N/2..]·w`, then the padding,
    /// then `frame[..N/2]·w`.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if the frame is empty or its
    /// length differs from the window length.
    pub fn apply(
        &self,
        frame: &[f64],
        zero_padding_size: usize,
        zero_phase: bool,
    ) -> Result<Vec<f64>, AnalysisError> {
        if frame.is_empty() {
            return Err(AnalysisError::InvalidParameter(
                "Cannot window an empty frame".to_string(),
            ));
        }
        if frame.len() != self.coefficients.len() {
            return Err(AnalysisError::InvalidParameter(format!(
                "Frame length {} does not match window length {}",
                frame.len(),
                self.coefficients.len()
            )));
        }

        let n = frame.len();
        let mut output = Vec::with_capacity(n + zero_padding_size);
        let windowed = frame.iter().zip(self.coefficients.iter()).map(|(x, w)| x * w);

        if zero_phase {
            let half = n / 2;
            output.extend(windowed.clone().skip(half));
            output.resize(output.len() + zero_padding_size, 0.0);
            output.extend(windowed.take(half));
        } else {
            output.extend(windowed);
            output.resize(n + zero_padding_size, 0.0);
        }

        Ok(output)
    }
}

/// One-shot windowing of a single frame
///
/// Builds the window for `frame.len()` and applies it. For repeated use on
/// frames of the same size, build a [`Window`] once instead.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidParameter` if the frame is empty.
pub fn windowing(frame: &[f64], config: &WindowingConfig) -> Result<Vec<f64>, AnalysisError> {
    if frame.is_empty() {
        return Err(AnalysisError::InvalidParameter(
            "Cannot window an empty frame".to_string(),
        ));
    }
    let window = Window::new(config.window_type, frame.len(), config.normalize)?;
    window.apply(frame, config.zero_padding_size, config.zero_phase)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_blackman_harris_symmetric() {
        for length in [2usize, 7, 64, 101] {
            let w = blackman_harris_92db(length);
            for i in 0..length {
                assert!((w[i] - w[length - 1 - i]).abs() < EPSILON);
            }
        }
    }

    #[test]
    fn test_blackman_harris_62db_values() {
        let w = blackman_harris_62db(5);
        // Ends: a0 - a1 + a2 - a3
        let end = 0.44959 - 0.49364 + 0.05677;
        assert!((w[0] - end).abs() < EPSILON);
        assert!((w[4] - end).abs() < EPSILON);
        // Center: a0 + a1 + a2 + a3
        assert!((w[2] - (0.44959 + 0.49364 + 0.05677)).abs() < EPSILON);
    }

    #[test]
    fn test_single_sample_window() {
        assert_eq!(blackman_harris_62db(1), vec![1.0]);
        assert!(blackman_harris_62db(0).is_empty());
    }

    #[test]
    fn test_normalized_area() {
        let window = Window::new(WindowType::BlackmanHarris92, 1024, true).unwrap();
        let sum: f64 = window.coefficients().iter().map(|w| w.abs()).sum();
        assert!((sum - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_phase_rotation() {
        let window = Window::new(WindowType::Square, 4, false).unwrap();
        let out = window.apply(&[1.0, 2.0, 3.0, 4.0], 2, true).unwrap();
        assert_eq!(out, vec![3.0, 4.0, 0.0, 0.0, 1.0, 2.0]);

        let out = window.apply(&[1.0, 2.0, 3.0, 4.0], 2, false).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_zero_phase_odd_length() {
        let window = Window::new(WindowType::Square, 5, false).unwrap();
        let out = window.apply(&[1.0, 2.0, 3.0, 4.0, 5.0], 0, true).unwrap();
        assert_eq!(out, vec![3.0, 4.0, 5.0, 1.0, 2.0]);
    }

    #[test]
    fn test_windowing_is_linear() {
        let config = WindowingConfig {
            window_type: WindowType::BlackmanHarris62,
            zero_padding_size: 3,
            zero_phase: false,
            normalize: false,
        };
        let a: Vec<f64> = (0..32).map(|i| (i as f64 * 0.3).sin()).collect();
        let b: Vec<f64> = (0..32).map(|i| (i as f64 * 0.7).cos() * 0.5).collect();
        let sum: Vec<f64> = a.iter().zip(b.iter()).map(|(x, y)| x + y).collect();

        let wa = windowing(&a, &config).unwrap();
        let wb = windowing(&b, &config).unwrap();
        let wsum = windowing(&sum, &config).unwrap();

        for i in 0..wsum.len() {
            assert!((wsum[i] - (wa[i] + wb[i])).abs() < EPSILON);
        }
    }

    #[test]
    fn test_windowing_errors() {
        assert!(windowing(&[], &WindowingConfig::default()).is_err());
        assert!(Window::new(WindowType::Square, 0, true).is_err());

        let window = Window::new(WindowType::Square, 4, true).unwrap();
        assert!(window.apply(&[1.0, 2.0], 0, false).is_err());
    }

    #[test]
    fn test_window_type_from_str() {
        assert_eq!("blackmanharris62".parse::<WindowType>().unwrap(), WindowType::BlackmanHarris62);
        assert_eq!("BlackmanHarris92".parse::<WindowType>().unwrap(), WindowType::BlackmanHarris92);
        assert_eq!("square".parse::<WindowType>().unwrap(), WindowType::Square);
        assert!("hamming".parse::<WindowType>().is_err());
    }
}
