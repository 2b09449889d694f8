//! # HPCP Key
//!
//! Musical key estimation from decoded PCM audio, built on harmonic pitch
//! class profiles (HPCP) and key-profile correlation.
//!
//! ## Features
//!
//! - **Spectral front end**: centred framing, Blackman-Harris windowing,
//!   FFT-friendly magnitude spectra and interpolated peak picking
//! - **HPCP**: harmonic-aware pitch-class folding with band splitting and
//!   cosine kernels at 12, 24, 36, ... bins per octave
//! - **Key estimation**: Pearson correlation against 14 published key
//!   profiles, optionally with chord-based polyphonic templates
//! - **Parallel**: optional rayon-backed per-frame processing with a
//!   deterministic, frame-ordered reduction
//!
//! ## Quick Start
//!
//! ```no_run
//! use hpcp_key::{detect_key, KeyDetectionConfig};
//!
//! // Load audio samples (mono, f64, normalized)
//! let samples: Vec<f64> = vec![]; // Your audio data
//! let sample_rate = 44100;
//!
//! let key = detect_key(&samples, sample_rate, KeyDetectionConfig::default())?;
//! println!("Key: {} (strength: {:.2})", key, key.strength);
//! # Ok::<(), hpcp_key::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! The analysis pipeline follows this flow:
//!
//! ```text
//! Samples → Framecutter → Windowing → Spectrum → Peaks → HPCP → Σ frames → Key profile correlation
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod preprocessing;

// Re-export main types
pub use analysis::metadata::AnalysisMetadata;
pub use analysis::result::{KeyAnalysis, KeyEstimate, PitchClass, Scale};
pub use config::KeyDetectionConfig;
pub use error::AnalysisError;
pub use features::chroma::hpcp::{hpcp, HpcpConfig};
pub use features::key::detector::{estimate_key, KeyEstimationConfig};
pub use features::key::templates::ProfileType;
pub use features::spectral::peaks::{spectral_peaks, SpectralPeak, SpectralPeaksConfig};

use features::chroma::hpcp::Hpcp;
use features::chroma::normalization::normalize_unit_max;
use features::spectral::spectrum::SpectrumConverter;
use features::spectral::windowing::{Window, WindowingConfig};
use preprocessing::framecutter::FrameCutter;

/// Frames handed to the worker pool at a time
#[cfg(feature = "parallel")]
const PARALLEL_BATCH_FRAMES: usize = 256;

/// Per-frame stages shared by every frame of a track
struct FrameStages<'a> {
    window: &'a Window,
    windowing: &'a WindowingConfig,
    peaks: &'a SpectralPeaksConfig,
    hpcp: &'a Hpcp,
}

impl FrameStages<'_> {
    /// Window → magnitude spectrum → peaks → HPCP for one frame
    fn profile(&self, frame: &[f64], converter: &mut SpectrumConverter) -> Result<Vec<f64>, AnalysisError> {
        let windowed = self
            .window
            .apply(frame, self.windowing.zero_padding_size, self.windowing.zero_phase)?;
        let spectrum = converter.compute(&windowed)?;
        let peaks = spectral_peaks(&spectrum, self.peaks)?;
        self.hpcp.compute_peaks(&peaks)
    }
}

fn accumulate(sum: &mut [f64], profile: &[f64]) {
    for (s, p) in sum.iter_mut().zip(profile.iter()) {
        *s += p;
    }
}

/// Sum the frame profiles in frame order; returns the frame count
fn accumulate_sequential(
    frames: FrameCutter<'_>,
    stages: &FrameStages<'_>,
    converter_len: usize,
    sum: &mut [f64],
) -> Result<usize, AnalysisError> {
    let mut converter = SpectrumConverter::new(converter_len)?;
    let mut count = 0;
    for frame in frames {
        let profile = stages.profile(&frame, &mut converter)?;
        accumulate(sum, &profile);
        count += 1;
    }
    Ok(count)
}

/// Batches of frames on the rayon pool, reduced in frame order so the sum
/// matches [`accumulate_sequential`] exactly
#[cfg(feature = "parallel")]
fn accumulate_parallel(
    mut frames: FrameCutter<'_>,
    stages: &FrameStages<'_>,
    converter_len: usize,
    sum: &mut [f64],
) -> Result<usize, AnalysisError> {
    use rayon::prelude::*;

    let mut count = 0;
    loop {
        let batch: Vec<Vec<f64>> = frames.by_ref().take(PARALLEL_BATCH_FRAMES).collect();
        if batch.is_empty() {
            break;
        }

        let profiles = batch
            .par_iter()
            .map_init(
                || SpectrumConverter::new(converter_len),
                |converter, frame| match converter {
                    Ok(converter) => stages.profile(frame, converter),
                    Err(e) => Err(e.clone()),
                },
            )
            .collect::<Result<Vec<_>, _>>()?;

        for profile in &profiles {
            accumulate(sum, profile);
        }
        count += profiles.len();
    }
    Ok(count)
}

/// Main analysis function
///
/// Runs the full pipeline and returns the key estimate together with the
/// track-level HPCP and run metadata.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
/// * `config` - Pipeline parameters
///
/// # Errors
///
/// Returns `AnalysisError::EmptyInput` for an empty buffer and
/// `AnalysisError::InvalidParameter` for a zero sample rate or an
/// inconsistent configuration. Silence is not an error: it yields a
/// zero-strength estimate.
///
/// # Example
///
/// ```no_run
/// use hpcp_key::{analyze_key, KeyDetectionConfig};
///
/// let samples = vec![0.0f64; 44100 * 30]; // 30 seconds of silence
/// let analysis = analyze_key(&samples, 44100, KeyDetectionConfig::default())?;
/// assert_eq!(analysis.estimate.strength, 0.0);
/// # Ok::<(), hpcp_key::AnalysisError>(())
/// ```
pub fn analyze_key(
    samples: &[f64],
    sample_rate: u32,
    config: KeyDetectionConfig,
) -> Result<KeyAnalysis, AnalysisError> {
    use std::time::Instant;
    let start_time = Instant::now();

    log::debug!("Starting key analysis: {} samples at {} Hz", samples.len(), sample_rate);

    if samples.is_empty() {
        return Err(AnalysisError::EmptyInput("Empty audio samples".to_string()));
    }

    if sample_rate == 0 {
        return Err(AnalysisError::InvalidParameter("Invalid sample rate".to_string()));
    }

    let windowing = config.windowing_config();
    let window = Window::new(windowing.window_type, config.frame_size, windowing.normalize)?;
    let peaks = config.peaks_config(sample_rate);
    peaks.validate()?;
    let hpcp = Hpcp::new(config.hpcp_config())?;
    let key_config = config.key_config();
    key_config.validate()?;

    let frames = FrameCutter::new(samples, config.framecutter_config())?;
    let stages = FrameStages {
        window: &window,
        windowing: &windowing,
        peaks: &peaks,
        hpcp: &hpcp,
    };
    let converter_len = config.frame_size + windowing.zero_padding_size;

    let mut profile = vec![0.0; config.pcp_size];

    #[cfg(feature = "parallel")]
    let frame_count = if config.parallel {
        accumulate_parallel(frames, &stages, converter_len, &mut profile)?
    } else {
        accumulate_sequential(frames, &stages, converter_len, &mut profile)?
    };

    #[cfg(not(feature = "parallel"))]
    let frame_count = accumulate_sequential(frames, &stages, converter_len, &mut profile)?;

    log::debug!("Accumulated HPCP over {} frames", frame_count);

    normalize_unit_max(&mut profile);
    let estimate = estimate_key(&profile, &key_config)?;

    let processing_time_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    log::debug!(
        "Key analysis finished in {:.1} ms: {} (strength={:.3})",
        processing_time_ms,
        estimate,
        estimate.strength
    );

    Ok(KeyAnalysis {
        estimate,
        hpcp: profile,
        metadata: AnalysisMetadata {
            duration_seconds: samples.len() as f64 / sample_rate as f64,
            sample_rate,
            frame_count,
            processing_time_ms,
            ..Default::default()
        },
    })
}

/// Estimate the key of a mono track
///
/// Same as [`analyze_key`] but returns only the estimate.
///
/// # Example
///
/// ```
/// use hpcp_key::{detect_key, KeyDetectionConfig, PitchClass, Scale};
///
/// // One second of a C major triad
/// let sample_rate = 44100;
/// let samples: Vec<f64> = (0..sample_rate)
///     .map(|i| {
///         let t = i as f64 / sample_rate as f64;
///         [261.63, 329.63, 392.0]
///             .iter()
///             .map(|f| (2.0 * std::f64::consts::PI * f * t).sin() / 3.0)
///             .sum()
///     })
///     .collect();
///
/// let key = detect_key(&samples, sample_rate as u32, KeyDetectionConfig::default())?;
/// assert_eq!(key.key, PitchClass::C);
/// assert_eq!(key.scale, Scale::Major);
/// # Ok::<(), hpcp_key::AnalysisError>(())
/// ```
pub fn detect_key(samples: &[f64], sample_rate: u32, config: KeyDetectionConfig) -> Result<KeyEstimate, AnalysisError> {
    Ok(analyze_key(samples, sample_rate, config)?.estimate)
}

/// Estimate the key of a multi-channel track
///
/// Channels are averaged to mono before analysis.
///
/// # Errors
///
/// Returns `AnalysisError::EmptyInput` if there are no channels and
/// `AnalysisError::InvalidParameter` if channel lengths differ, in addition
/// to the errors of [`detect_key`].
pub fn detect_key_multichannel(
    channels: &[Vec<f64>],
    sample_rate: u32,
    config: KeyDetectionConfig,
) -> Result<KeyEstimate, AnalysisError> {
    let mono = preprocessing::channel_mixer::downmix(channels)?;
    detect_key(&mono, sample_rate, config)
}
