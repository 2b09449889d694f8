//! Harmonic Pitch Class Profile (HPCP)
//!
//! Folds a list of spectral peaks into a circular histogram of `size` bins
//! per octave (a multiple of 12). Each peak is credited to the pitch classes
//! of the fundamentals it could be a harmonic of, spread over a window of
//! `window_size` semitones by a cosine-shaped kernel.
//!
//! Bin 0 is the pitch class of `reference_frequency` (A for 440 Hz).
//!
//! # Reference
//!
//! Gómez, E. (2006). Tonal Description of Polyphonic Audio for Music Content
//! Processing. *INFORMS Journal on Computing*, 18(3), 294-304.
//!
//! # Example
//!
//! ```
//! use hpcp_key::features::chroma::hpcp::{hpcp, HpcpConfig};
//!
//! // E5, a fifth above A4
//! let frequencies = vec![440.0 * 2f64.powf(7.0 / 12.0)];
//! let magnitudes = vec![1.0];
//! let profile = hpcp(&frequencies, &magnitudes, &HpcpConfig::default())?;
//! assert_eq!(profile[7], 1.0);
//! # Ok::<(), hpcp_key::AnalysisError>(())
//! ```

use super::normalization::{apply_non_linear, shift_max_to_front, HpcpNormalization};
use crate::error::AnalysisError;
use crate::features::spectral::peaks::SpectralPeak;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Semitones closer than this are the same harmonic position
const SEMITONE_PRECISION: f64 = 1e-5;

/// Minimum width in Hz of the analysed range and of each band
const MIN_BAND_WIDTH_HZ: f64 = 200.0;

/// Kernel spreading a peak over neighbouring bins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightType {
    /// Nearest bin only (Fujishima style)
    None,
    /// `cos(π·d)` over the window
    Cosine,
    /// `cos²(π·d)` over the window
    SquaredCosine,
}

impl Default for WeightType {
    fn default() -> Self {
        WeightType::SquaredCosine
    }
}

impl WeightType {
    /// Canonical name, as accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        match self {
            WeightType::None => "none",
            WeightType::Cosine => "cosine",
            WeightType::SquaredCosine => "squared cosine",
        }
    }
}

impl fmt::Display for WeightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WeightType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', " ").as_str() {
            "none" => Ok(WeightType::None),
            "cosine" => Ok(WeightType::Cosine),
            "squared cosine" => Ok(WeightType::SquaredCosine),
            _ => Err(AnalysisError::InvalidParameter(format!(
                "Invalid weight type: {}",
                s
            ))),
        }
    }
}

/// Strength decay across harmonics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HarmonicDecay {
    /// Harmonic `h` weighs `1 / max(1, log2(h)/2)`: full weight up to the
    /// fourth harmonic, then falling by octave
    Octave,
    /// Harmonic `h` weighs `slope^(h-1)`
    Geometric(f64),
}

impl Default for HarmonicDecay {
    fn default() -> Self {
        HarmonicDecay::Octave
    }
}

/// One entry of the harmonic contribution table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicPeak {
    /// Position of the harmonic above its fundamental, folded into [0, 12)
    pub semitone: f64,

    /// Summed strength of all harmonics at this position
    pub strength: f64,
}

/// Build the harmonic contribution table for the fundamental plus
/// `harmonics` overtones
///
/// Harmonics that fold onto the same semitone (e.g. 1st, 2nd and 4th) are
/// merged into one entry with their strengths added. The first entry is
/// always the fundamental at semitone 0.
///
/// # Example
///
/// ```
/// use hpcp_key::features::chroma::hpcp::{harmonic_contribution_table, HarmonicDecay};
///
/// let table = harmonic_contribution_table(3, HarmonicDecay::Octave);
/// // Octaves (harmonics 1, 2, 4) merge; the third harmonic is a fifth up
/// assert_eq!(table.len(), 2);
/// assert!((table[0].strength - 3.0).abs() < 1e-12);
/// assert!((table[1].semitone - 7.01955).abs() < 1e-4);
/// ```
pub fn harmonic_contribution_table(harmonics: usize, decay: HarmonicDecay) -> Vec<HarmonicPeak> {
    let mut table: Vec<HarmonicPeak> = Vec::with_capacity(harmonics + 1);

    for i in 0..=harmonics {
        let mut semitone = 12.0 * ((i + 1) as f64).log2();
        let strength = match decay {
            HarmonicDecay::Octave => 1.0 / (semitone / 12.0 * 0.5).max(1.0),
            HarmonicDecay::Geometric(slope) => slope.powi(i as i32),
        };

        while semitone >= 12.0 - SEMITONE_PRECISION {
            semitone -= 12.0;
        }

        match table
            .iter_mut()
            .find(|peak| (peak.semitone - semitone).abs() < SEMITONE_PRECISION)
        {
            Some(peak) => peak.strength += strength,
            None => table.push(HarmonicPeak { semitone, strength }),
        }
    }

    table
}

/// Parameters shared by every contribution of one HPCP computation
#[derive(Debug, Clone, Copy)]
struct ContributionParams {
    reference_frequency: f64,
    window_size: f64,
    weight_type: WeightType,
}

/// Credit one peak, through every harmonic hypothesis, to `profile`
fn add_contribution(
    profile: &mut [f64],
    frequency: f64,
    magnitude: f64,
    params: &ContributionParams,
    table: &[HarmonicPeak],
) {
    let size = profile.len();
    let bins_per_semitone = (size / 12) as f64;
    let energy = magnitude * magnitude;

    for harmonic in table {
        // Frequency of the fundamental this peak would be a harmonic of
        let fundamental = frequency * 2f64.powf(-harmonic.semitone / 12.0);
        if fundamental <= 0.0 {
            continue;
        }
        let contribution = energy * harmonic.strength * harmonic.strength;
        let bin = (fundamental / params.reference_frequency).log2() * size as f64;

        match params.weight_type {
            WeightType::None => {
                let index = (bin.round() as i64).rem_euclid(size as i64) as usize;
                profile[index] += contribution;
            }
            WeightType::Cosine | WeightType::SquaredCosine => {
                let half_width = bins_per_semitone * params.window_size / 2.0;
                let left = (bin - half_width).ceil() as i64;
                let right = (bin + half_width).floor() as i64;

                for i in left..=right {
                    let distance = (bin - i as f64).abs() / bins_per_semitone / params.window_size;
                    let mut weight = (PI * distance).cos();
                    if params.weight_type == WeightType::SquaredCosine {
                        weight *= weight;
                    }
                    profile[i.rem_euclid(size as i64) as usize] += weight * contribution;
                }
            }
        }
    }
}

/// HPCP parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HpcpConfig {
    /// Number of bins per octave, a multiple of 12 (default: 12)
    pub size: usize,

    /// Frequency of bin 0 in Hz (default: 440.0)
    pub reference_frequency: f64,

    /// Overtones considered besides the fundamental (default: 0)
    pub harmonics: usize,

    /// Strength decay across harmonics (default: Octave)
    pub harmonic_decay: HarmonicDecay,

    /// Split point in Hz for independent low/high band normalization
    /// (default: Some(500.0)); None disables band splitting
    pub band_split_frequency: Option<f64>,

    /// Lowest peak frequency considered in Hz (default: 40.0)
    pub min_frequency: f64,

    /// Highest peak frequency considered in Hz (default: 5000.0)
    pub max_frequency: f64,

    /// Kernel spreading each peak (default: SquaredCosine)
    pub weight_type: WeightType,

    /// Kernel width in semitones (default: 1.0)
    pub window_size: f64,

    /// Rotate so the strongest bin is bin 0 (default: false)
    pub max_shifted: bool,

    /// Apply the non-linear contrast step; requires unit-max normalization
    /// (default: false)
    pub non_linear: bool,

    /// Output normalization (default: UnitMax)
    pub normalization: HpcpNormalization,
}

impl Default for HpcpConfig {
    fn default() -> Self {
        Self {
            size: 12,
            reference_frequency: 440.0,
            harmonics: 0,
            harmonic_decay: HarmonicDecay::Octave,
            band_split_frequency: Some(500.0),
            min_frequency: 40.0,
            max_frequency: 5000.0,
            weight_type: WeightType::SquaredCosine,
            window_size: 1.0,
            max_shifted: false,
            non_linear: false,
            normalization: HpcpNormalization::UnitMax,
        }
    }
}

impl HpcpConfig {
    /// Check the parameters for consistency
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if:
    /// - `size` is not a positive multiple of 12
    /// - `reference_frequency` is not positive
    /// - the frequency range, or either band when splitting, is narrower
    ///   than 200 Hz
    /// - the window spans less than one bin
    /// - `non_linear` is set without unit-max normalization
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.size == 0 || self.size % 12 != 0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "HPCP size must be a positive multiple of 12, got {}",
                self.size
            )));
        }
        if !(self.reference_frequency > 0.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "Reference frequency must be > 0, got {}",
                self.reference_frequency
            )));
        }
        if self.max_frequency - self.min_frequency < MIN_BAND_WIDTH_HZ {
            return Err(AnalysisError::InvalidParameter(
                "Minimum and maximum frequencies are too close".to_string(),
            ));
        }
        if let Some(split) = self.band_split_frequency {
            if split - self.min_frequency < MIN_BAND_WIDTH_HZ {
                return Err(AnalysisError::InvalidParameter(
                    "Low band frequency range too small".to_string(),
                ));
            }
            if self.max_frequency - split < MIN_BAND_WIDTH_HZ {
                return Err(AnalysisError::InvalidParameter(
                    "High band frequency range too small".to_string(),
                ));
            }
        }
        if !(self.window_size * self.size as f64 / 12.0 >= 1.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "Window size {} must span at least one bin (>= 12/size)",
                self.window_size
            )));
        }
        if let HarmonicDecay::Geometric(slope) = self.harmonic_decay {
            if !(slope > 0.0) {
                return Err(AnalysisError::InvalidParameter(format!(
                    "Harmonic slope must be > 0, got {}",
                    slope
                )));
            }
        }
        if self.non_linear && self.normalization != HpcpNormalization::UnitMax {
            return Err(AnalysisError::InvalidParameter(
                "Non-linear post-processing requires unit max normalization".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validated HPCP accumulator
///
/// Holds the configuration and the immutable harmonic table, so it can be
/// shared across frames (and threads).
#[derive(Debug, Clone)]
pub struct Hpcp {
    config: HpcpConfig,
    table: Vec<HarmonicPeak>,
}

impl Hpcp {
    /// Validate `config` and precompute the harmonic table
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if the configuration is
    /// inconsistent (see [`HpcpConfig::validate`]).
    pub fn new(config: HpcpConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let table = harmonic_contribution_table(config.harmonics, config.harmonic_decay);
        Ok(Self { config, table })
    }

    /// Configuration in use
    pub fn config(&self) -> &HpcpConfig {
        &self.config
    }

    /// Harmonic contribution table
    pub fn harmonic_table(&self) -> &[HarmonicPeak] {
        &self.table
    }

    /// Compute the profile for parallel frequency/magnitude lists
    ///
    /// Peaks outside `[min_frequency, max_frequency]` are ignored. The result
    /// is never negative; with unit-max normalization its maximum is 1.0
    /// unless no peak contributed, in which case it is all zeros.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if the two lists differ in
    /// length.
    pub fn compute(&self, frequencies: &[f64], magnitudes: &[f64]) -> Result<Vec<f64>, AnalysisError> {
        if frequencies.len() != magnitudes.len() {
            return Err(AnalysisError::InvalidParameter(format!(
                "Frequency and magnitude lists differ in length ({} vs {})",
                frequencies.len(),
                magnitudes.len()
            )));
        }

        let config = &self.config;
        let size = config.size;
        let params = ContributionParams {
            reference_frequency: config.reference_frequency,
            window_size: config.window_size,
            weight_type: config.weight_type,
        };

        let in_range = |f: f64| f > 0.0 && f >= config.min_frequency && f <= config.max_frequency;

        let mut profile = match config.band_split_frequency {
            Some(split) => {
                let mut low = vec![0.0; size];
                let mut high = vec![0.0; size];
                for (&frequency, &magnitude) in frequencies.iter().zip(magnitudes) {
                    if !in_range(frequency) {
                        continue;
                    }
                    let band = if frequency < split { &mut low } else { &mut high };
                    add_contribution(band, frequency, magnitude, &params, &self.table);
                }
                config.normalization.apply(&mut low);
                config.normalization.apply(&mut high);
                low.iter().zip(high.iter()).map(|(l, h)| l + h).collect()
            }
            None => {
                let mut profile = vec![0.0; size];
                for (&frequency, &magnitude) in frequencies.iter().zip(magnitudes) {
                    if in_range(frequency) {
                        add_contribution(&mut profile, frequency, magnitude, &params, &self.table);
                    }
                }
                profile
            }
        };

        config.normalization.apply(&mut profile);

        if config.non_linear {
            apply_non_linear(&mut profile);
        }

        if config.max_shifted {
            shift_max_to_front(&mut profile);
        }

        Ok(profile)
    }

    /// Compute the profile for a peak list
    pub fn compute_peaks(&self, peaks: &[SpectralPeak]) -> Result<Vec<f64>, AnalysisError> {
        let frequencies: Vec<f64> = peaks.iter().map(|p| p.frequency).collect();
        let magnitudes: Vec<f64> = peaks.iter().map(|p| p.magnitude).collect();
        self.compute(&frequencies, &magnitudes)
    }
}

/// One-shot HPCP of parallel frequency/magnitude lists
///
/// # Errors
///
/// Returns `AnalysisError::InvalidParameter` for an inconsistent
/// configuration or mismatched list lengths.
pub fn hpcp(frequencies: &[f64], magnitudes: &[f64], config: &HpcpConfig) -> Result<Vec<f64>, AnalysisError> {
    Hpcp::new(config.clone())?.compute(frequencies, magnitudes)
}

/// One-shot HPCP of a peak list
pub fn hpcp_from_peaks(peaks: &[SpectralPeak], config: &HpcpConfig) -> Result<Vec<f64>, AnalysisError> {
    Hpcp::new(config.clone())?.compute_peaks(peaks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-4;

    fn assert_profile_near(actual: &[f64], expected: &[f64], tolerance: f64) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
            assert!((a - e).abs() < tolerance, "bin {}: {} vs {}", i, a, e);
        }
    }

    fn semitones_above_a(semitones: f64) -> f64 {
        440.0 * 2f64.powf(semitones / 12.0)
    }

    #[test]
    fn test_zero_input() {
        let profile = hpcp(&[0.0; 10], &[0.0; 10], &HpcpConfig::default()).unwrap();
        assert_eq!(profile, vec![0.0; 12]);
    }

    #[test]
    fn test_submediant_position() {
        let profile = hpcp(&[semitones_above_a(9.0)], &[1.0], &HpcpConfig::default()).unwrap();
        let mut expected = vec![0.0; 12];
        expected[9] = 1.0;
        assert_profile_near(&profile, &expected, 1e-9);
    }

    #[test]
    fn test_harmonics() {
        let config = HpcpConfig {
            harmonics: 3,
            band_split_frequency: None,
            min_frequency: 50.0,
            max_frequency: 500.0,
            ..Default::default()
        };
        let profile = hpcp(&[100.0, 200.0, 300.0, 400.0], &[1.0; 4], &config).unwrap();
        let expected = [
            0.0, 0.0, 0.0, 0.1340538263, 0.0, 0.2476127148, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        assert_profile_near(&profile, &expected, EPSILON);
    }

    #[test]
    fn test_max_shifted() {
        let config = HpcpConfig {
            max_shifted: true,
            ..Default::default()
        };
        let profile = hpcp(&[semitones_above_a(7.0)], &[1.0], &config).unwrap();
        let mut expected = vec![0.0; 12];
        expected[0] = 1.0;
        assert_profile_near(&profile, &expected, 1e-9);
    }

    #[test]
    fn test_out_of_range_peaks_ignored() {
        let config = HpcpConfig {
            min_frequency: 100.0,
            max_frequency: 1000.0,
            ..Default::default()
        };
        assert_eq!(hpcp(&[99.0], &[1.0], &config).unwrap(), vec![0.0; 12]);
        assert_eq!(hpcp(&[1001.0], &[1.0], &config).unwrap(), vec![0.0; 12]);
    }

    #[test]
    fn test_reference_tone_single_bin() {
        let config = HpcpConfig {
            size: 36,
            window_size: 0.5,
            ..Default::default()
        };
        let profile = hpcp(&[440.0], &[1.0], &config).unwrap();
        assert_eq!(profile[0], 1.0);
        assert!(profile[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_unit_max_and_non_negative() {
        let config = HpcpConfig {
            size: 36,
            harmonics: 4,
            ..Default::default()
        };
        let frequencies = [130.8, 164.8, 196.0, 261.6, 523.3, 987.7, 1500.0];
        let magnitudes = [0.5, 0.3, 0.8, 1.0, 0.4, 0.2, 0.1];
        let profile = hpcp(&frequencies, &magnitudes, &config).unwrap();

        assert!(profile.iter().all(|&v| v >= 0.0));
        let max = profile.iter().copied().fold(0.0, f64::max);
        assert!((max - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_band_split_balances_bands() {
        // A loud low note and a quiet high note both reach 1.0 in their band
        let config = HpcpConfig {
            normalization: HpcpNormalization::None,
            ..Default::default()
        };
        let frequencies = [220.0, semitones_above_a(3.0)];
        let profile = hpcp(&frequencies, &[10.0, 0.1], &config).unwrap();
        assert!((profile[0] - 100.0).abs() < 1e-9);

        let config = HpcpConfig::default();
        let profile = hpcp(&frequencies, &[10.0, 0.1], &config).unwrap();
        assert!((profile[0] - 1.0).abs() < 1e-9);
        assert!((profile[3] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unit_sum() {
        let config = HpcpConfig {
            normalization: HpcpNormalization::UnitSum,
            band_split_frequency: None,
            ..Default::default()
        };
        let profile = hpcp(&[440.0, semitones_above_a(4.0)], &[1.0, 2.0], &config).unwrap();
        let sum: f64 = profile.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((profile[4] - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_weight_none_nearest_bin() {
        let config = HpcpConfig {
            weight_type: WeightType::None,
            size: 24,
            ..Default::default()
        };
        // 0.4 semitones sharp of A rounds to bin 1 at 24 bins per octave
        let profile = hpcp(&[semitones_above_a(0.4)], &[1.0], &config).unwrap();
        assert_eq!(profile[1], 1.0);
        assert_eq!(profile.iter().filter(|&&v| v > 0.0).count(), 1);
    }

    #[test]
    fn test_cosine_spreads_wider_than_squared() {
        let base = HpcpConfig {
            band_split_frequency: None,
            normalization: HpcpNormalization::None,
            size: 36,
            window_size: 2.0,
            ..Default::default()
        };
        let frequency = [semitones_above_a(0.25)];
        let cosine = hpcp(&frequency, &[1.0], &HpcpConfig { weight_type: WeightType::Cosine, ..base.clone() }).unwrap();
        let squared = hpcp(&frequency, &[1.0], &base).unwrap();
        let cosine_sum: f64 = cosine.iter().sum();
        let squared_sum: f64 = squared.iter().sum();
        assert!(cosine_sum > squared_sum);
    }

    #[test]
    fn test_non_linear() {
        let config = HpcpConfig {
            non_linear: true,
            band_split_frequency: None,
            ..Default::default()
        };
        let profile = hpcp(&[440.0, semitones_above_a(5.0)], &[1.0, 0.5], &config).unwrap();
        assert!((profile[0] - 1.0).abs() < 1e-12);
        // 0.25 -> sin²(π/8) = 0.1464, then × (0.1464/0.6)²
        assert!((profile[5] - 0.008_72).abs() < 1e-4);
    }

    #[test]
    fn test_geometric_decay_table() {
        let table = harmonic_contribution_table(3, HarmonicDecay::Geometric(0.5));
        assert_eq!(table.len(), 2);
        assert!((table[0].strength - (1.0 + 0.5 + 0.125)).abs() < 1e-12);
        assert!((table[1].strength - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_octave_decay_table() {
        let table = harmonic_contribution_table(7, HarmonicDecay::Octave);
        // Harmonics 1, 2, 4, 8 fold onto the fundamental, 3 and 6 onto the fifth
        assert!((table[0].semitone).abs() < 1e-9);
        assert!((table[0].strength - 3.0 - 1.0 / 1.5).abs() < 1e-9);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_validation_errors() {
        let too_close = HpcpConfig {
            min_frequency: 100.0,
            max_frequency: 250.0,
            band_split_frequency: None,
            ..Default::default()
        };
        assert!(hpcp(&[], &[], &too_close).is_err());

        let low_band = HpcpConfig {
            min_frequency: 400.0,
            ..Default::default()
        };
        assert!(hpcp(&[], &[], &low_band).is_err());

        let high_band = HpcpConfig {
            max_frequency: 600.0,
            ..Default::default()
        };
        assert!(hpcp(&[], &[], &high_band).is_err());

        let bad_size = HpcpConfig { size: 13, ..Default::default() };
        assert!(hpcp(&[], &[], &bad_size).is_err());

        let narrow_window = HpcpConfig {
            window_size: 0.5,
            ..Default::default()
        };
        assert!(hpcp(&[], &[], &narrow_window).is_err());

        let non_linear = HpcpConfig {
            non_linear: true,
            normalization: HpcpNormalization::UnitSum,
            ..Default::default()
        };
        assert!(hpcp(&[], &[], &non_linear).is_err());

        assert!(hpcp(&[440.0], &[], &HpcpConfig::default()).is_err());
    }

    #[test]
    fn test_from_peaks_matches_lists() {
        let peaks = vec![
            SpectralPeak { frequency: 261.6, magnitude: 1.0 },
            SpectralPeak { frequency: 659.3, magnitude: 0.5 },
        ];
        let config = HpcpConfig { size: 36, window_size: 0.5, ..Default::default() };
        let from_peaks = hpcp_from_peaks(&peaks, &config).unwrap();
        let from_lists = hpcp(&[261.6, 659.3], &[1.0, 0.5], &config).unwrap();
        assert_eq!(from_peaks, from_lists);
    }

    #[test]
    fn test_weight_type_from_str() {
        assert_eq!("squared cosine".parse::<WeightType>().unwrap(), WeightType::SquaredCosine);
        assert_eq!("cosine".parse::<WeightType>().unwrap(), WeightType::Cosine);
        assert_eq!("none".parse::<WeightType>().unwrap(), WeightType::None);
        assert!("triangle".parse::<WeightType>().is_err());
    }
}
