//! Pitch-class profile normalization and post-processing
//!
//! All functions work in place and never produce NaN: a zero maximum or sum
//! leaves the vector untouched.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

use crate::error::AnalysisError;

/// Values below this level are pushed further down by [`apply_non_linear`]
const NON_LINEAR_KNEE: f64 = 0.6;

/// Profile normalization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HpcpNormalization {
    /// Leave raw energies
    None,
    /// Divide by the maximum
    UnitMax,
    /// Divide by the sum
    UnitSum,
}

impl Default for HpcpNormalization {
    fn default() -> Self {
        HpcpNormalization::UnitMax
    }
}

impl HpcpNormalization {
    /// Canonical name, as accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        match self {
            HpcpNormalization::None => "none",
            HpcpNormalization::UnitMax => "unit max",
            HpcpNormalization::UnitSum => "unit sum",
        }
    }

    /// Apply this normalization to `profile`
    pub fn apply(&self, profile: &mut [f64]) {
        match self {
            HpcpNormalization::None => {}
            HpcpNormalization::UnitMax => normalize_unit_max(profile),
            HpcpNormalization::UnitSum => normalize_unit_sum(profile),
        }
    }
}

impl fmt::Display for HpcpNormalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HpcpNormalization {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', " ").as_str() {
            "none" => Ok(HpcpNormalization::None),
            "unit max" => Ok(HpcpNormalization::UnitMax),
            "unit sum" => Ok(HpcpNormalization::UnitSum),
            _ => Err(AnalysisError::InvalidParameter(format!(
                "Unknown normalization: {}",
                s
            ))),
        }
    }
}

/// Scale so the largest element is 1.0
///
/// # Example
///
/// ```
/// use hpcp_key::features::chroma::normalization::normalize_unit_max;
///
/// let mut profile = vec![1.0, 4.0, 2.0];
/// normalize_unit_max(&mut profile);
/// assert_eq!(profile, vec![0.25, 1.0, 0.5]);
/// ```
pub fn normalize_unit_max(profile: &mut [f64]) {
    let max = profile.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == 0.0 || !max.is_finite() {
        return;
    }
    for value in profile.iter_mut() {
        *value /= max;
    }
}

/// Scale so the elements sum to 1.0
///
/// Vectors holding a negative element are left untouched.
pub fn normalize_unit_sum(profile: &mut [f64]) {
    if profile.iter().any(|&v| v < 0.0) {
        return;
    }
    let sum: f64 = profile.iter().sum();
    if sum == 0.0 {
        return;
    }
    for value in profile.iter_mut() {
        *value /= sum;
    }
}

/// Non-linear contrast step for unit-max profiles
///
/// Each value becomes `sin²(v·π/2)`; results below 0.6 are further scaled
/// by `(v/0.6)²`. Values near 1 stay near 1 while weak bins shrink.
pub fn apply_non_linear(profile: &mut [f64]) {
    for value in profile.iter_mut() {
        let s = (*value * FRAC_PI_2).sin();
        let mut v = s * s;
        if v < NON_LINEAR_KNEE {
            v *= (v / NON_LINEAR_KNEE) * (v / NON_LINEAR_KNEE);
        }
        *value = v;
    }
}

/// Rotate left so the (first) maximum lands at index 0
///
/// Returns the rotation applied.
pub fn shift_max_to_front(profile: &mut [f64]) -> usize {
    let mut argmax = 0;
    for (i, &value) in profile.iter().enumerate() {
        if value > profile[argmax] {
            argmax = i;
        }
    }
    profile.rotate_left(argmax);
    argmax
}
