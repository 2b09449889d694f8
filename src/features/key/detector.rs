//! Key detection algorithm
//!
//! Correlates a pitch-class profile against the major, minor and (optionally)
//! majmin templates of a named key profile, across every rotation of the
//! profile. The best-correlating (rotation, mode) pair gives the key.
//!
//! Index 0 of the input profile is the reference pitch class (A for a 440 Hz
//! reference), so a template whose tonic lands on bin `k·size/12` names the
//! pitch class `k` semitones above A.
//!
//! # Reference
//!
//! Gómez, E. (2006). *Tonal Description of Music Audio Signals*. PhD thesis,
//! Universitat Pompeu Fabra.

use super::chords::{polyphonic_major, polyphonic_minor};
use super::templates::{resize_profile, KeyProfile, ProfileType};
use crate::analysis::result::{KeyEstimate, PitchClass, Scale};
use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key estimation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEstimationConfig {
    /// Build templates from diatonic chords and their harmonics
    pub use_polyphony: bool,

    /// Restrict chord templates to the I, IV and V chords
    pub use_three_chords: bool,

    /// Harmonics per chord note (fundamental included)
    pub num_harmonics: usize,

    /// Weight ratio between consecutive harmonics
    pub slope: f64,

    /// Key profile to correlate against
    pub profile_type: ProfileType,

    /// Also try the profile's majmin template, when it has one
    pub use_maj_min: bool,
}

impl Default for KeyEstimationConfig {
    fn default() -> Self {
        Self {
            use_polyphony: true,
            use_three_chords: true,
            num_harmonics: 4,
            slope: 0.6,
            profile_type: ProfileType::Bgate,
            use_maj_min: false,
        }
    }
}

impl KeyEstimationConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.use_polyphony && self.num_harmonics == 0 {
            return Err(AnalysisError::InvalidParameter(
                "Number of harmonics must be at least 1 when polyphony is enabled".to_string(),
            ));
        }
        if !self.slope.is_finite() || self.slope < 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "Harmonic slope must be finite and non-negative, got {}",
                self.slope
            )));
        }
        Ok(())
    }
}

/// Builds the 12-bin templates correlated for one mode
///
/// Every returned template is scored at every rotation; the best template of
/// a mode represents that mode in the vote.
pub trait TemplateStrategy: Send + Sync + fmt::Debug {
    /// Strategy name, for logging
    fn name(&self) -> &'static str;

    /// Templates for `scale` (major or minor), tonic at index 0
    fn templates(&self, scale: Scale, profile: &KeyProfile, config: &KeyEstimationConfig) -> Vec<[f64; 12]>;
}

/// Raw profile, or a single chord-based template when polyphony is enabled
#[derive(Debug, Clone, Copy, Default)]
pub struct PolyphonicTemplates;

impl TemplateStrategy for PolyphonicTemplates {
    fn name(&self) -> &'static str {
        "polyphonic"
    }

    fn templates(&self, scale: Scale, profile: &KeyProfile, config: &KeyEstimationConfig) -> Vec<[f64; 12]> {
        let base = match scale {
            Scale::Major => profile.major,
            Scale::Minor => profile.minor,
            Scale::MajMin => return profile.other.into_iter().collect(),
        };
        if !config.use_polyphony {
            return vec![base];
        }
        let template = match scale {
            Scale::Major => polyphonic_major(&base, config.use_three_chords, config.num_harmonics, config.slope),
            _ => polyphonic_minor(&base, config.use_three_chords, config.num_harmonics, config.slope),
        };
        vec![template]
    }
}

/// Raw profile and the I-IV-V chord composite, best of both
#[derive(Debug, Clone, Copy, Default)]
pub struct CombinedChordTemplates;

impl TemplateStrategy for CombinedChordTemplates {
    fn name(&self) -> &'static str {
        "combined"
    }

    fn templates(&self, scale: Scale, profile: &KeyProfile, config: &KeyEstimationConfig) -> Vec<[f64; 12]> {
        let num_harmonics = config.num_harmonics.max(1);
        match scale {
            Scale::Major => vec![
                profile.major,
                polyphonic_major(&profile.major, true, num_harmonics, config.slope),
            ],
            Scale::Minor => vec![
                profile.minor,
                polyphonic_minor(&profile.minor, true, num_harmonics, config.slope),
            ],
            Scale::MajMin => profile.other.into_iter().collect(),
        }
    }
}

/// Best rotation of one template
#[derive(Debug, Clone)]
struct TemplateScore {
    best: f64,
    best_shift: usize,
    correlations: Vec<f64>,
}

/// Pick the winning mode
///
/// Major needs a strictly higher correlation than both other modes, minor
/// wins when it is at least as high as both, and majmin needs to be strictly
/// higher. Major is kept when it ties with majmin above minor.
fn vote(scores: Vec<(Scale, TemplateScore)>) -> Option<(Scale, TemplateScore)> {
    let best_of = |scale: Scale| {
        scores
            .iter()
            .find(|(s, _)| *s == scale)
            .map_or(f64::NEG_INFINITY, |(_, score)| score.best)
    };
    let major = best_of(Scale::Major);
    let minor = best_of(Scale::Minor);
    let other = best_of(Scale::MajMin);

    let chosen = if minor >= major && minor >= other {
        Scale::Minor
    } else if other > major && other > minor {
        Scale::MajMin
    } else {
        Scale::Major
    };
    scores.into_iter().find(|(s, _)| *s == chosen)
}

/// Key index (semitones above the reference) for a rotation of `size` bins
fn key_index(shift: usize, size: usize) -> usize {
    ((shift * 12) as f64 / size as f64).round() as usize % 12
}

/// Mean and root of the summed squared deviations; a flat input has zero spread
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.iter().all(|&v| v == values[0]) {
        return (values[0], 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let std = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>().sqrt();
    (mean, std)
}

/// Pearson correlation of `pcp` with `template` at every rotation
///
/// At rotation `shift` the template's tonic sits on `pcp[shift]`.
///
/// # Errors
///
/// Returns `AnalysisError::NumericDegenerate` if the template has zero variance.
fn score_template(pcp: &[f64], pcp_mean: f64, pcp_std: f64, template: &[f64]) -> Result<TemplateScore, AnalysisError> {
    let size = pcp.len();
    let (template_mean, template_std) = mean_and_std(template);
    if template_std == 0.0 {
        return Err(AnalysisError::NumericDegenerate(
            "Key template has zero variance".to_string(),
        ));
    }

    let mut correlations = Vec::with_capacity(size);
    let mut best = f64::NEG_INFINITY;
    let mut best_shift = 0;
    for shift in 0..size {
        let mut sum = 0.0;
        for (i, &value) in pcp.iter().enumerate() {
            let t = template[(i + size - shift) % size];
            sum += (value - pcp_mean) * (t - template_mean);
        }
        let correlation = sum / (pcp_std * template_std);
        if correlation > best {
            best = correlation;
            best_shift = shift;
        }
        correlations.push(correlation);
    }

    Ok(TemplateScore {
        best,
        best_shift,
        correlations,
    })
}

/// Best-scoring template among `templates`, skipping degenerate ones
fn best_template(
    pcp: &[f64],
    pcp_mean: f64,
    pcp_std: f64,
    templates: &[[f64; 12]],
) -> Result<Option<TemplateScore>, AnalysisError> {
    let mut best: Option<TemplateScore> = None;
    for template in templates {
        let resized = resize_profile(template, pcp.len())?;
        match score_template(pcp, pcp_mean, pcp_std, &resized) {
            Ok(score) => {
                if best.as_ref().map_or(true, |b| score.best > b.best) {
                    best = Some(score);
                }
            }
            Err(AnalysisError::NumericDegenerate(msg)) => {
                log::debug!("Skipping key template: {}", msg);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(best)
}

/// Estimate the key of a pitch-class profile with the default template strategy
///
/// # Arguments
///
/// * `pcp` - Pitch-class profile; length a multiple of 12, index 0 = A
/// * `config` - Estimation parameters
///
/// # Returns
///
/// The estimated key. A profile with zero variance (silence) gives
/// [`KeyEstimate::zero`].
///
/// # Errors
///
/// Returns `AnalysisError::InvalidParameter` if the profile length is not a
/// positive multiple of 12, a value is not finite, or `config` is invalid.
///
/// # Example
///
/// ```
/// use hpcp_key::features::key::detector::{estimate_key, KeyEstimationConfig};
/// use hpcp_key::features::key::templates::ProfileType;
/// use hpcp_key::analysis::result::{PitchClass, Scale};
///
/// let mut pcp = ProfileType::Temperley.profile().major.to_vec();
/// pcp.rotate_right(3);
/// let config = KeyEstimationConfig {
///     use_polyphony: false,
///     profile_type: ProfileType::Temperley,
///     ..Default::default()
/// };
/// let key = estimate_key(&pcp, &config)?;
/// assert_eq!(key.key, PitchClass::C);
/// assert_eq!(key.scale, Scale::Major);
/// # Ok::<(), hpcp_key::AnalysisError>(())
/// ```
pub fn estimate_key(pcp: &[f64], config: &KeyEstimationConfig) -> Result<KeyEstimate, AnalysisError> {
    estimate_key_with(pcp, config, &PolyphonicTemplates)
}

/// Estimate the key of a pitch-class profile with an explicit template strategy
pub fn estimate_key_with(
    pcp: &[f64],
    config: &KeyEstimationConfig,
    strategy: &dyn TemplateStrategy,
) -> Result<KeyEstimate, AnalysisError> {
    config.validate()?;
    let size = pcp.len();
    if size == 0 || size % 12 != 0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "PCP size must be a positive multiple of 12, got {}",
            size
        )));
    }
    if pcp.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidParameter(
            "PCP contains non-finite values".to_string(),
        ));
    }

    let (pcp_mean, pcp_std) = mean_and_std(pcp);
    if pcp_std == 0.0 {
        log::debug!("PCP has zero variance, returning zero-strength key");
        return Ok(KeyEstimate::zero());
    }

    let profile = config.profile_type.profile();
    log::debug!(
        "Estimating key: profile={}, strategy={}, pcp_size={}",
        profile.name,
        strategy.name(),
        size
    );

    let mut modes = vec![Scale::Major];
    if config.profile_type != ProfileType::Weichai {
        modes.push(Scale::Minor);
    }
    if config.use_maj_min && profile.other.is_some() {
        modes.push(Scale::MajMin);
    }

    let mut scores: Vec<(Scale, TemplateScore)> = Vec::with_capacity(modes.len());
    for scale in modes {
        let templates = strategy.templates(scale, profile, config);
        if let Some(score) = best_template(pcp, pcp_mean, pcp_std, &templates)? {
            log::debug!(
                "  {}: correlation {:.4} at rotation {}",
                scale,
                score.best,
                score.best_shift
            );
            scores.push((scale, score));
        }
    }

    let Some((mut scale, score)) = vote(scores) else {
        log::debug!("No usable key template, returning zero-strength key");
        return Ok(KeyEstimate::zero());
    };

    let best_key = key_index(score.best_shift, size);
    let second = score
        .correlations
        .iter()
        .enumerate()
        .filter(|(shift, _)| key_index(*shift, size) != best_key)
        .map(|(_, &c)| c)
        .fold(f64::NEG_INFINITY, f64::max);
    let relative = if score.best > 0.0 && second.is_finite() {
        (score.best - second) / score.best
    } else {
        0.0
    };

    let mut key = best_key;
    if config.profile_type == ProfileType::Weichai {
        let n = size / 12;
        let fifth = (score.best_shift + 7 * n) % size;
        let sixth = (score.best_shift + 9 * n) % size;
        if pcp[sixth] > pcp[fifth] {
            key = key_index(sixth, size);
            scale = Scale::Minor;
        }
    }

    let estimate = KeyEstimate {
        key: PitchClass::from_index(key),
        scale,
        strength: score.best,
        first_to_second_relative_strength: relative,
    };
    log::debug!(
        "Estimated key: {} (strength={:.4}, relative={:.4})",
        estimate,
        estimate.strength,
        estimate.first_to_second_relative_strength
    );
    Ok(estimate)
}
