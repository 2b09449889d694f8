//! Configuration parameters for key detection

use crate::features::chroma::hpcp::{HarmonicDecay, HpcpConfig, WeightType};
use crate::features::chroma::normalization::HpcpNormalization;
use crate::features::key::detector::KeyEstimationConfig;
use crate::features::key::templates::ProfileType;
use crate::features::spectral::peaks::{PeakOrder, SpectralPeaksConfig};
use crate::features::spectral::spectrum::next_fast_len;
use crate::features::spectral::windowing::{WindowType, WindowingConfig};
use crate::preprocessing::framecutter::FrameCutterConfig;
use serde::{Deserialize, Serialize};

/// Key detection configuration parameters
///
/// Covers every stage of the pipeline; the per-stage configurations are
/// derived from it with the `*_config` methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDetectionConfig {
    // Framing
    /// Frame size in samples (default: 4096)
    pub frame_size: usize,

    /// Hop size in samples (default: 2048)
    pub hop_size: usize,

    /// Center the first frame on sample 0 (default: true)
    pub start_from_center: bool,

    /// Let the last frame reach the end of the signal instead of stopping
    /// once a frame starts past it (default: false)
    pub last_frame_to_end_of_file: bool,

    /// Drop frames whose share of real samples is below this ratio
    /// (default: 0.0)
    pub valid_frame_threshold_ratio: f64,

    // Spectrum
    /// Analysis window (default: BlackmanHarris62)
    pub window_type: WindowType,

    /// Zeros appended to each windowed frame before the FFT (default: 0)
    pub zero_padding_size: usize,

    /// Rotate the windowed frame so its centre lands on sample 0
    /// (default: true)
    pub zero_phase: bool,

    /// Scale the window so a unit sinusoid reads close to 1.0 (default: true)
    pub normalize_window: bool,

    /// Minimum spectral peak magnitude (default: -1000.0)
    pub peak_threshold: f64,

    /// Spectral peaks kept per frame (default: 100)
    pub max_num_peaks: usize,

    /// Lowest frequency scanned for peaks in Hz (default: 0.0)
    pub peak_min_frequency: f64,

    /// Highest frequency scanned for peaks in Hz (default: None, Nyquist)
    pub peak_max_frequency: Option<f64>,

    // HPCP
    /// HPCP bins per octave (default: 36)
    pub pcp_size: usize,

    /// Reference frequency of bin 0 in Hz (default: 440.0)
    pub reference_frequency: f64,

    /// HPCP kernel width in semitones (default: 0.5)
    pub window_size: f64,

    /// HPCP kernel shape (default: SquaredCosine)
    pub weight_type: WeightType,

    /// Low/high band split in Hz (default: Some(500.0))
    pub band_split_frequency: Option<f64>,

    /// Lowest peak frequency used in Hz (default: 40.0)
    pub min_frequency: f64,

    /// Highest peak frequency used in Hz (default: 5000.0)
    pub max_frequency: f64,

    /// Harmonic weighting of the HPCP stage (default: Octave)
    pub harmonic_decay: HarmonicDecay,

    /// Rotate each frame's HPCP so its maximum sits in bin 0 (default: false)
    pub max_shifted: bool,

    /// Squash each frame's HPCP with `sin²(v·π/2)`; needs unit-max
    /// normalization (default: false)
    pub non_linear: bool,

    /// Per-frame HPCP normalization (default: UnitMax)
    pub hpcp_normalization: HpcpNormalization,

    // Key estimation
    /// Use chord-based templates (default: true)
    pub use_polyphony: bool,

    /// Restrict chord templates to I, IV and V (default: true)
    pub use_three_chords: bool,

    /// Also try the majmin template (default: true)
    pub use_maj_min: bool,

    /// Harmonics per note, fundamental included (default: 4)
    ///
    /// The HPCP stage uses `num_harmonics - 1` overtones.
    pub num_harmonics: usize,

    /// Weight ratio between consecutive harmonics (default: 0.6)
    pub slope: f64,

    /// Key profile (default: Temperley)
    ///
    /// Bgate and Edma carry a majmin template that outscores the major one on
    /// plain triads, so with `use_maj_min` a C major triad reads "C majmin".
    /// Temperley has no majmin template.
    pub profile_type: ProfileType,

    // Execution
    /// Process frames on the rayon pool when the `parallel` feature is
    /// enabled (default: true)
    pub parallel: bool,
}

impl Default for KeyDetectionConfig {
    fn default() -> Self {
        Self {
            frame_size: 4096,
            hop_size: 2048,
            start_from_center: true,
            last_frame_to_end_of_file: false,
            valid_frame_threshold_ratio: 0.0,
            window_type: WindowType::BlackmanHarris62,
            zero_padding_size: 0,
            zero_phase: true,
            normalize_window: true,
            peak_threshold: -1000.0,
            max_num_peaks: 100,
            peak_min_frequency: 0.0,
            peak_max_frequency: None,
            pcp_size: 36,
            reference_frequency: 440.0,
            window_size: 0.5,
            weight_type: WeightType::SquaredCosine,
            band_split_frequency: Some(500.0),
            min_frequency: 40.0,
            max_frequency: 5000.0,
            harmonic_decay: HarmonicDecay::Octave,
            max_shifted: false,
            non_linear: false,
            hpcp_normalization: HpcpNormalization::UnitMax,
            use_polyphony: true,
            use_three_chords: true,
            use_maj_min: true,
            num_harmonics: 4,
            slope: 0.6,
            profile_type: ProfileType::Temperley,
            parallel: true,
        }
    }
}

impl KeyDetectionConfig {
    /// Framecutter stage parameters
    pub fn framecutter_config(&self) -> FrameCutterConfig {
        FrameCutterConfig {
            frame_size: self.frame_size,
            hop_size: self.hop_size,
            start_from_center: self.start_from_center,
            last_frame_to_end_of_file: self.last_frame_to_end_of_file,
            valid_frame_threshold_ratio: self.valid_frame_threshold_ratio,
        }
    }

    /// Windowing stage parameters
    pub fn windowing_config(&self) -> WindowingConfig {
        WindowingConfig {
            window_type: self.window_type,
            zero_padding_size: self.zero_padding_size,
            zero_phase: self.zero_phase,
            normalize: self.normalize_window,
        }
    }

    /// Spectral peak stage parameters for a given sample rate
    ///
    /// Peaks are ordered by descending magnitude. Bin frequencies follow the
    /// FFT length the spectrum stage plans for a padded frame.
    pub fn peaks_config(&self, sample_rate: u32) -> SpectralPeaksConfig {
        SpectralPeaksConfig {
            threshold: self.peak_threshold,
            sort_by: PeakOrder::MagnitudeDescending,
            sample_rate: sample_rate as f64,
            max_num_peaks: self.max_num_peaks,
            min_frequency: self.peak_min_frequency,
            max_frequency: self.peak_max_frequency,
            fft_size: Some(next_fast_len(self.frame_size + self.zero_padding_size)),
        }
    }

    /// HPCP stage parameters
    pub fn hpcp_config(&self) -> HpcpConfig {
        HpcpConfig {
            size: self.pcp_size,
            reference_frequency: self.reference_frequency,
            harmonics: self.num_harmonics.saturating_sub(1),
            harmonic_decay: self.harmonic_decay,
            band_split_frequency: self.band_split_frequency,
            min_frequency: self.min_frequency,
            max_frequency: self.max_frequency,
            weight_type: self.weight_type,
            window_size: self.window_size,
            max_shifted: self.max_shifted,
            non_linear: self.non_linear,
            normalization: self.hpcp_normalization,
        }
    }

    /// Key estimation stage parameters
    pub fn key_config(&self) -> KeyEstimationConfig {
        KeyEstimationConfig {
            use_polyphony: self.use_polyphony,
            use_three_chords: self.use_three_chords,
            num_harmonics: self.num_harmonics,
            slope: self.slope,
            profile_type: self.profile_type,
            use_maj_min: self.use_maj_min,
        }
    }
}
