//! Spectral peak detection
//!
//! Finds local maxima in a magnitude spectrum, refines them by quadratic
//! interpolation, keeps the strongest `max_num_peaks` and orders the result.
//!
//! # Algorithm
//!
//! 1. Scan the bins whose frequency lies in `[min_frequency, max_frequency]`
//! 2. A bin is a candidate if it is strictly greater than both neighbors and
//!    at least `threshold`; a flat top followed by a strict fall is reported
//!    at its midpoint
//! 3. Interior candidates are refined with a parabola through the bin and its
//!    two neighbors; the first and last bin keep their raw values
//! 4. If there are too many peaks, the weakest are dropped
//! 5. The survivors are sorted by `sort_by` (stable, so ties keep bin order)

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A spectral peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralPeak {
    /// Interpolated frequency in Hz
    pub frequency: f64,

    /// Interpolated magnitude
    pub magnitude: f64,
}

/// Ordering of a peak list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeakOrder {
    /// Lowest frequency first
    PositionAscending,
    /// Highest frequency first
    PositionDescending,
    /// Weakest first
    MagnitudeAscending,
    /// Strongest first
    MagnitudeDescending,
}

impl Default for PeakOrder {
    fn default() -> Self {
        PeakOrder::PositionAscending
    }
}

impl PeakOrder {
    /// Canonical name, as accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        match self {
            PeakOrder::PositionAscending => "position",
            PeakOrder::PositionDescending => "position_descending",
            PeakOrder::MagnitudeAscending => "magnitude_ascending",
            PeakOrder::MagnitudeDescending => "magnitude",
        }
    }
}

impl fmt::Display for PeakOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PeakOrder {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "position" | "position_ascending" | "frequency" => Ok(PeakOrder::PositionAscending),
            "position_descending" | "frequency_descending" => Ok(PeakOrder::PositionDescending),
            "height_ascending" | "magnitude_ascending" | "amplitude_ascending" => {
                Ok(PeakOrder::MagnitudeAscending)
            }
            "height" | "magnitude" | "amplitude" | "magnitude_descending" => {
                Ok(PeakOrder::MagnitudeDescending)
            }
            _ => Err(AnalysisError::InvalidParameter(format!(
                "Sorting by '{}' is not supported",
                s
            ))),
        }
    }
}

/// Spectral peak detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralPeaksConfig {
    /// Minimum peak magnitude (default: -1000.0, effectively disabled)
    pub threshold: f64,

    /// Output ordering (default: position ascending)
    pub sort_by: PeakOrder,

    /// Sample rate of the analysed signal in Hz (default: 44100.0)
    pub sample_rate: f64,

    /// Maximum number of peaks kept, 0 for unlimited (default: 100)
    pub max_num_peaks: usize,

    /// Lowest frequency scanned in Hz (default: 0.0)
    pub min_frequency: f64,

    /// Highest frequency scanned in Hz (default: None, the Nyquist frequency)
    pub max_frequency: Option<f64>,

    /// Length of the FFT behind the spectrum (default: None)
    ///
    /// Bins are `sample_rate / fft_size` Hz apart. Without it an even FFT
    /// length of `2(n-1)` is assumed, which misplaces every peak of an odd
    /// length transform.
    pub fft_size: Option<usize>,
}

impl Default for SpectralPeaksConfig {
    fn default() -> Self {
        Self {
            threshold: -1000.0,
            sort_by: PeakOrder::PositionAscending,
            sample_rate: 44100.0,
            max_num_peaks: 100,
            min_frequency: 0.0,
            max_frequency: None,
            fft_size: None,
        }
    }
}

impl SpectralPeaksConfig {
    /// Check the parameters for consistency
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if the sample rate is not
    /// positive, the minimum frequency is negative, the minimum exceeds
    /// the maximum, or the FFT size is zero.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.sample_rate > 0.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "Sample rate must be > 0, got {}",
                self.sample_rate
            )));
        }
        if self.min_frequency < 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "Minimum frequency must be >= 0, got {}",
                self.min_frequency
            )));
        }
        if let Some(max_frequency) = self.max_frequency {
            if self.min_frequency > max_frequency {
                return Err(AnalysisError::InvalidParameter(format!(
                    "Minimum frequency {} exceeds maximum frequency {}",
                    self.min_frequency, max_frequency
                )));
            }
        }
        if self.fft_size == Some(0) {
            return Err(AnalysisError::InvalidParameter("FFT size must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Vertex of the parabola through `(index-1, left)`, `(index, center)`,
/// `(index+1, right)`
///
/// Returns `(position, height)`. When the three points are collinear the raw
/// bin is returned.
///
/// # Example
///
/// ```
/// use hpcp_key::features::spectral::peaks::quadratic_interpolation;
///
/// let (position, height) = quadratic_interpolation(2.0, 3.0, 0.0, 4);
/// assert!((position - 3.75).abs() < 1e-12);
/// assert!((height - 3.125).abs() < 1e-12);
/// ```
pub fn quadratic_interpolation(left: f64, center: f64, right: f64, index: usize) -> (f64, f64) {
    let denominator = left - 2.0 * center + right;
    if denominator == 0.0 {
        return (index as f64, center);
    }
    let p = 0.5 * (left - right) / denominator;
    (index as f64 + p, center - 0.25 * (left - right) * p)
}

/// Detect spectral peaks
///
/// # Arguments
///
/// * `spectrum` - Magnitude spectrum, bins 0..=N/2
/// * `config` - Detection parameters
///
/// # Returns
///
/// Peaks with frequencies in Hz, at most `max_num_peaks` of them (when
/// non-zero), ordered by `sort_by`. An empty spectrum yields no peaks.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidParameter` if the configuration is
/// inconsistent (see [`SpectralPeaksConfig::validate`]) or the spectrum
/// length does not match `fft_size / 2 + 1`.
///
/// # Example
///
/// ```
/// use hpcp_key::features::spectral::peaks::{spectral_peaks, SpectralPeaksConfig};
///
/// let spectrum = vec![0.0, 1.0, 4.0, 1.0, 0.0];
/// let config = SpectralPeaksConfig { sample_rate: 8.0, ..Default::default() };
/// let peaks = spectral_peaks(&spectrum, &config)?;
/// assert_eq!(peaks.len(), 1);
/// assert!((peaks[0].frequency - 2.0).abs() < 1e-12);
/// # Ok::<(), hpcp_key::AnalysisError>(())
/// ```
pub fn spectral_peaks(
    spectrum: &[f64],
    config: &SpectralPeaksConfig,
) -> Result<Vec<SpectralPeak>, AnalysisError> {
    config.validate()?;

    let n = spectrum.len();
    if n < 2 {
        return Ok(vec![]);
    }

    let nyquist = config.sample_rate / 2.0;
    let hz_per_bin = match config.fft_size {
        Some(fft_size) if fft_size / 2 + 1 != n => {
            return Err(AnalysisError::InvalidParameter(format!(
                "Spectrum of {} bins does not come from an FFT of size {}",
                n, fft_size
            )));
        }
        Some(fft_size) => config.sample_rate / fft_size as f64,
        None => nyquist / (n - 1) as f64,
    };
    let max_frequency = config.max_frequency.unwrap_or(nyquist);

    let first = (config.min_frequency / hz_per_bin).ceil() as usize;
    let last = ((max_frequency / hz_per_bin).floor() as usize).min(n - 1);
    if first > last {
        return Ok(vec![]);
    }

    let threshold = config.threshold;
    let mut peaks = Vec::new();
    let mut i = first;

    while i <= last {
        let value = spectrum[i];

        if i == 0 {
            if value > spectrum[1] && value >= threshold {
                peaks.push((i as f64, value));
            }
        } else if i == n - 1 {
            if value > spectrum[i - 1] && value >= threshold {
                peaks.push((i as f64, value));
            }
        } else if value > spectrum[i - 1] {
            if value > spectrum[i + 1] {
                if value >= threshold {
                    peaks.push(quadratic_interpolation(spectrum[i - 1], value, spectrum[i + 1], i));
                }
            } else if value == spectrum[i + 1] {
                let mut j = i + 1;
                while j < n - 1 && spectrum[j + 1] == value {
                    j += 1;
                }
                let midpoint = (i + j) as f64 * 0.5;
                if j < n - 1 && spectrum[j + 1] < value && value >= threshold && midpoint <= last as f64 {
                    peaks.push((midpoint, value));
                }
                i = j;
            }
        }

        i += 1;
    }

    let mut peaks: Vec<SpectralPeak> = peaks
        .into_iter()
        .map(|(position, magnitude)| SpectralPeak {
            frequency: position * hz_per_bin,
            magnitude,
        })
        .collect();

    if config.max_num_peaks > 0 && peaks.len() > config.max_num_peaks {
        // Peaks are in bin order here; a stable sort keeps that order among equals
        peaks.sort_by(|a, b| by_magnitude(b, a));
        peaks.truncate(config.max_num_peaks);
        peaks.sort_by(by_position);
    }

    match config.sort_by {
        PeakOrder::PositionAscending => {}
        PeakOrder::PositionDescending => peaks.sort_by(|a, b| by_position(b, a)),
        PeakOrder::MagnitudeAscending => peaks.sort_by(by_magnitude),
        PeakOrder::MagnitudeDescending => peaks.sort_by(|a, b| by_magnitude(b, a)),
    }

    log::debug!(
        "Detected {} spectral peaks in {} bins ({:.2} Hz/bin)",
        peaks.len(),
        n,
        hz_per_bin
    );

    Ok(peaks)
}

fn by_position(a: &SpectralPeak, b: &SpectralPeak) -> Ordering {
    a.frequency.partial_cmp(&b.frequency).unwrap_or(Ordering::Equal)
}

fn by_magnitude(a: &SpectralPeak, b: &SpectralPeak) -> Ordering {
    a.magnitude.partial_cmp(&b.magnitude).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::spectral::spectrum::magnitude_spectrum;
    use crate::features::spectral::windowing::{windowing, WindowingConfig};
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-4;

    /// Positions in bins: a sample rate of 2(n-1) makes one bin equal 1 Hz
    fn bin_config(n: usize) -> SpectralPeaksConfig {
        SpectralPeaksConfig {
            sample_rate: 2.0 * (n - 1) as f64,
            max_num_peaks: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_interpolated_peaks() {
        let spectrum = [0.0, 2.0, 1.0, 2.0, 1.0, 2.0, 0.0];
        let peaks = spectral_peaks(&spectrum, &bin_config(spectrum.len())).unwrap();

        assert_eq!(peaks.len(), 3);
        assert!((peaks[0].frequency - 1.16667).abs() < EPSILON);
        assert!((peaks[0].magnitude - 2.04167).abs() < EPSILON);
        assert!((peaks[1].frequency - 3.0).abs() < EPSILON);
        assert!((peaks[1].magnitude - 2.0).abs() < EPSILON);
        assert!((peaks[2].frequency - 4.83333).abs() < EPSILON);
    }

    #[test]
    fn test_plateau_without_fall_is_not_a_peak() {
        let spectrum = [1.0, 2.0, 2.0, 2.0, 3.0, 0.0];
        let peaks = spectral_peaks(&spectrum, &bin_config(spectrum.len())).unwrap();
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].frequency - 3.75).abs() < EPSILON);
        assert!((peaks[0].magnitude - 3.125).abs() < EPSILON);
    }

    #[test]
    fn test_flat_peak_midpoint() {
        let spectrum = [1.0, 2.0, 2.0, 2.0, 1.0];
        let peaks = spectral_peaks(&spectrum, &bin_config(spectrum.len())).unwrap();
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].frequency - 2.0).abs() < EPSILON);
        assert!((peaks[0].magnitude - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_edge_peaks_use_raw_values() {
        let spectrum = [1.0, 1.0, 1.0, 1.0, 2.0];
        let peaks = spectral_peaks(&spectrum, &bin_config(spectrum.len())).unwrap();
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].frequency - 4.0).abs() < EPSILON);
        assert!((peaks[0].magnitude - 2.0).abs() < EPSILON);

        let spectrum = [3.0, 1.0, 2.0, 1.0];
        let peaks = spectral_peaks(&spectrum, &bin_config(spectrum.len())).unwrap();
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].frequency, 0.0);
        assert_eq!(peaks[0].magnitude, 3.0);
    }

    #[test]
    fn test_threshold() {
        let spectrum = [0.0, 2.0, 0.0, 5.0, 0.0];
        let mut config = bin_config(spectrum.len());
        config.threshold = 3.0;
        let peaks = spectral_peaks(&spectrum, &config).unwrap();
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].frequency - 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_frequency_range() {
        let spectrum = [0.0, 2.0, 0.0, 5.0, 0.0, 4.0, 0.0];
        let mut config = bin_config(spectrum.len());
        config.min_frequency = 2.0;
        config.max_frequency = Some(4.0);
        let peaks = spectral_peaks(&spectrum, &config).unwrap();
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].frequency - 3.0).abs() < EPSILON);

        config.min_frequency = 5.0;
        assert!(spectral_peaks(&spectrum, &config).is_err());
    }

    #[test]
    fn test_empty_and_short_spectrum() {
        let config = SpectralPeaksConfig::default();
        assert!(spectral_peaks(&[], &config).unwrap().is_empty());
        assert!(spectral_peaks(&[1.0], &config).unwrap().is_empty());
    }

    #[test]
    fn test_truncate_drops_weakest() {
        let spectrum = [0.0, 3.0, 0.0, 1.0, 0.0, 5.0, 0.0, 2.0, 0.0];
        let mut config = bin_config(spectrum.len());
        config.max_num_peaks = 2;
        let peaks = spectral_peaks(&spectrum, &config).unwrap();
        assert_eq!(peaks.len(), 2);
        // Still in position order
        assert!((peaks[0].frequency - 1.0).abs() < EPSILON);
        assert!((peaks[1].frequency - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_sort_orders() {
        let spectrum = [0.0, 3.0, 0.0, 1.0, 0.0, 5.0, 0.0, 3.0, 0.0];
        let mut config = bin_config(spectrum.len());

        config.sort_by = PeakOrder::MagnitudeDescending;
        let peaks = spectral_peaks(&spectrum, &config).unwrap();
        let positions: Vec<f64> = peaks.iter().map(|p| p.frequency.round()).collect();
        // Equal magnitudes at bins 1 and 7 keep bin order
        assert_eq!(positions, vec![5.0, 1.0, 7.0, 3.0]);

        config.sort_by = PeakOrder::MagnitudeAscending;
        let peaks = spectral_peaks(&spectrum, &config).unwrap();
        let positions: Vec<f64> = peaks.iter().map(|p| p.frequency.round()).collect();
        assert_eq!(positions, vec![3.0, 1.0, 7.0, 5.0]);

        config.sort_by = PeakOrder::PositionDescending;
        let peaks = spectral_peaks(&spectrum, &config).unwrap();
        let positions: Vec<f64> = peaks.iter().map(|p| p.frequency.round()).collect();
        assert_eq!(positions, vec![7.0, 5.0, 3.0, 1.0]);
    }

    // The interpolation is exact on a parabola, so this holds the 1/100-bin
    // accuracy bound; windowed sinusoids are only near-parabolic around the
    // peak and get a looser bound below.
    #[test]
    fn test_parabolic_peak_recovery() {
        // Parabola with its vertex between bins 20 and 21
        let n = 64;
        let true_bin = 20.37;
        let spectrum: Vec<f64> = (0..n)
            .map(|k| 100.0 - (k as f64 - true_bin).powi(2))
            .collect();
        let config = SpectralPeaksConfig {
            sample_rate: 44100.0,
            ..Default::default()
        };
        let hz_per_bin = 22050.0 / (n - 1) as f64;

        let peaks = spectral_peaks(&spectrum, &config).unwrap();
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].frequency - true_bin * hz_per_bin).abs() < hz_per_bin / 100.0);
        assert!((peaks[0].magnitude - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_windowed_sinusoid_frequency() {
        let sample_rate = 44100.0;
        let n = 4096;
        let frequency = 1234.5;
        let frame: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * frequency * i as f64 / sample_rate).sin())
            .collect();
        let windowed = windowing(&frame, &WindowingConfig::default()).unwrap();
        let spectrum = magnitude_spectrum(&windowed).unwrap();

        let config = SpectralPeaksConfig {
            sample_rate,
            sort_by: PeakOrder::MagnitudeDescending,
            ..Default::default()
        };
        let peaks = spectral_peaks(&spectrum, &config).unwrap();
        let hz_per_bin = sample_rate / 2.0 / (spectrum.len() - 1) as f64;

        // Blackman-Harris main lobes are not parabolas: the vertex lands
        // within about 0.05 bins
        assert!((peaks[0].frequency - frequency).abs() < 0.1 * hz_per_bin);
        // Normalized window: a unit sinusoid reads close to 1.0
        assert!((peaks[0].magnitude - 1.0).abs() < 0.1);
    }

    #[test]
    fn test_odd_fft_length_bin_width() {
        // 2205 = 3²·5·7² is planned as is, giving 1103 bins of exactly 20 Hz
        let sample_rate = 44100.0;
        let n = 2205;
        let frame: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 100.0 * i as f64 / n as f64).cos())
            .collect();
        let spectrum = magnitude_spectrum(&frame).unwrap();
        assert_eq!(spectrum.len(), 1103);

        let config = SpectralPeaksConfig {
            sample_rate,
            sort_by: PeakOrder::MagnitudeDescending,
            fft_size: Some(n),
            ..Default::default()
        };
        let peaks = spectral_peaks(&spectrum, &config).unwrap();
        assert!((peaks[0].frequency - 2000.0).abs() < 1e-6);

        // Assuming an even transform of 2204 points is almost 1 Hz off
        let assumed = SpectralPeaksConfig { fft_size: None, ..config.clone() };
        let peaks = spectral_peaks(&spectrum, &assumed).unwrap();
        assert!((peaks[0].frequency - 2000.0).abs() > 0.5);

        let mismatched = SpectralPeaksConfig { fft_size: Some(4096), ..config.clone() };
        assert!(spectral_peaks(&spectrum, &mismatched).is_err());

        let zero = SpectralPeaksConfig { fft_size: Some(0), ..config };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_peak_order_from_str() {
        assert_eq!("position".parse::<PeakOrder>().unwrap(), PeakOrder::PositionAscending);
        assert_eq!("height".parse::<PeakOrder>().unwrap(), PeakOrder::MagnitudeDescending);
        assert!("loudness".parse::<PeakOrder>().is_err());
    }
}
