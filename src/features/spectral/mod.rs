//! Spectral analysis modules
//!
//! Per-frame spectral front end:
//! - Analysis windows (Blackman-Harris family)
//! - Magnitude spectrum on FFT-friendly lengths
//! - Interpolated spectral peak picking

pub mod peaks;
pub mod spectrum;
pub mod windowing;

pub use peaks::{spectral_peaks, PeakOrder, SpectralPeak, SpectralPeaksConfig};
pub use spectrum::{magnitude_spectrum, next_fast_len, SpectrumConverter};
pub use windowing::{windowing, Window, WindowType, WindowingConfig};
