//! Key profile library
//!
//! Reference pitch-class profiles for major and minor keys (and, for some
//! profiles, a third "majmin" mode), indexed from the tonic. All profiles
//! have 12 bins; [`resize_profile`] resamples them to any HPCP resolution.
//!
//! # References
//!
//! - Krumhansl, C. L. (1990). *Cognitive Foundations of Musical Pitch*.
//! - Temperley, D. (1999). What's Key for Key? The Krumhansl-Schmuckler
//!   Key-Finding Algorithm Reconsidered. *Music Perception*, 17(1), 65-100.
//! - Chai, W. (2005). *Automated Analysis of Musical Structure* (PhD thesis).
//! - Gómez, E. (2006). *Tonal Description of Music Audio Signals* (PhD thesis).
//! - Faraldo, Á. et al. (2016). Key Estimation in Electronic Dance Music.
//!   *ECIR 2016* (Edma, Edmm, Bgate, Braw).

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Major, minor and optional third-mode profile of one key-finding method
#[derive(Debug, Clone, PartialEq)]
pub struct KeyProfile {
    /// Profile name
    pub name: &'static str,

    /// Major mode, tonic at index 0
    pub major: [f64; 12],

    /// Minor mode, tonic at index 0
    pub minor: [f64; 12],

    /// Third mode ("majmin"), when the method defines one
    pub other: Option<[f64; 12]>,
}

static DIATONIC: KeyProfile = KeyProfile {
    name: "Diatonic",
    major: [1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
    minor: [1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0],
    other: None,
};

static KRUMHANSL: KeyProfile = KeyProfile {
    name: "Krumhansl",
    major: [6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88],
    minor: [6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17],
    other: None,
};

static TEMPERLEY: KeyProfile = KeyProfile {
    name: "Temperley",
    major: [5.0, 2.0, 3.5, 2.0, 4.5, 4.0, 2.0, 4.5, 2.0, 3.5, 1.5, 4.0],
    minor: [5.0, 2.0, 3.5, 4.5, 2.0, 4.0, 2.0, 4.5, 3.5, 2.0, 1.5, 4.0],
    other: None,
};

// Only the major profile is correlated; the minor one is its relative minor
static WEICHAI: KeyProfile = KeyProfile {
    name: "Weichai",
    major: [
        81302.0, 320.0, 65719.0, 1916.0, 77469.0, 40928.0, 2223.0, 83997.0, 1218.0, 39853.0, 1579.0, 28908.0,
    ],
    minor: [
        39853.0, 1579.0, 28908.0, 81302.0, 320.0, 65719.0, 1916.0, 77469.0, 40928.0, 2223.0, 83997.0, 1218.0,
    ],
    other: None,
};

static TONICTRIAD: KeyProfile = KeyProfile {
    name: "Tonictriad",
    major: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
    minor: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
    other: None,
};

static TEMPERLEY2005: KeyProfile = KeyProfile {
    name: "Temperley2005",
    major: [0.748, 0.060, 0.488, 0.082, 0.67, 0.46, 0.096, 0.715, 0.104, 0.366, 0.057, 0.4],
    minor: [0.712, 0.084, 0.474, 0.618, 0.049, 0.46, 0.105, 0.747, 0.404, 0.067, 0.133, 0.33],
    other: None,
};

static THPCP: KeyProfile = KeyProfile {
    name: "Thpcp",
    major: [
        0.95162, 0.20742, 0.71758, 0.22007, 0.71341, 0.48841, 0.31431, 1.00000, 0.20957, 0.53657, 0.22585, 0.55363,
    ],
    minor: [
        0.94409, 0.21742, 0.64525, 0.63229, 0.27897, 0.57709, 0.26428, 1.0000, 0.26428, 0.30633, 0.45924, 0.35929,
    ],
    other: None,
};

static SHAATH: KeyProfile = KeyProfile {
    name: "Shaath",
    major: [6.6, 2.0, 3.5, 2.3, 4.6, 4.0, 2.5, 5.2, 2.4, 3.7, 2.3, 3.4],
    minor: [6.5, 2.7, 3.5, 5.4, 2.6, 3.5, 2.5, 5.2, 4.0, 2.7, 4.3, 3.2],
    other: None,
};

static GOMEZ: KeyProfile = KeyProfile {
    name: "Gomez",
    major: [0.82, 0.00, 0.55, 0.00, 0.53, 0.30, 0.08, 1.00, 0.00, 0.38, 0.00, 0.47],
    minor: [0.81, 0.00, 0.53, 0.54, 0.00, 0.27, 0.07, 1.00, 0.27, 0.07, 0.10, 0.36],
    other: None,
};

static NOLAND: KeyProfile = KeyProfile {
    name: "Noland",
    major: [
        0.0629, 0.0146, 0.061, 0.0121, 0.0623, 0.0414, 0.0248, 0.0631, 0.015, 0.0521, 0.0142, 0.0478,
    ],
    minor: [
        0.0682, 0.0138, 0.0543, 0.0519, 0.0234, 0.0544, 0.0176, 0.067, 0.0349, 0.0297, 0.0401, 0.027,
    ],
    other: None,
};

// The flat major profile has zero variance; only the minor side is usable
static EDMM: KeyProfile = KeyProfile {
    name: "Edmm",
    major: [0.083; 12],
    minor: [
        0.17235348, 0.04, 0.0761009, 0.12, 0.05621498, 0.08527853, 0.0497915, 0.13451001, 0.07458916, 0.05003023,
        0.09187879, 0.05545106,
    ],
    other: None,
};

static BGATE: KeyProfile = KeyProfile {
    name: "Bgate",
    major: [1.00, 0.00, 0.42, 0.00, 0.53, 0.37, 0.00, 0.77, 0.00, 0.38, 0.21, 0.30],
    minor: [1.00, 0.00, 0.36, 0.39, 0.00, 0.38, 0.00, 0.74, 0.27, 0.00, 0.42, 0.23],
    other: Some([1.00, 0.26, 0.35, 0.29, 0.44, 0.36, 0.21, 0.78, 0.26, 0.25, 0.32, 0.26]),
};

static BRAW: KeyProfile = KeyProfile {
    name: "Braw",
    major: [
        1.0000, 0.1573, 0.4200, 0.1570, 0.5296, 0.3669, 0.1632, 0.7711, 0.1676, 0.3827, 0.2113, 0.2965,
    ],
    minor: [
        1.0000, 0.2330, 0.3615, 0.3905, 0.2925, 0.3777, 0.1961, 0.7425, 0.2701, 0.2161, 0.4228, 0.2272,
    ],
    other: Some([
        1.0000, 0.2608, 0.3528, 0.2935, 0.4393, 0.3580, 0.2137, 0.7809, 0.2578, 0.2539, 0.3233, 0.2615,
    ]),
};

static EDMA: KeyProfile = KeyProfile {
    name: "Edma",
    major: [1.00, 0.29, 0.50, 0.40, 0.60, 0.56, 0.32, 0.80, 0.31, 0.45, 0.42, 0.39],
    minor: [1.00, 0.31, 0.44, 0.58, 0.33, 0.49, 0.29, 0.78, 0.43, 0.29, 0.53, 0.32],
    other: Some([1.00, 0.26, 0.35, 0.29, 0.44, 0.36, 0.21, 0.78, 0.26, 0.25, 0.32, 0.26]),
};

/// Named key profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileType {
    /// Binary diatonic scale membership
    Diatonic,
    /// Krumhansl-Kessler probe-tone ratings
    Krumhansl,
    /// Temperley (1999)
    Temperley,
    /// Wei Chai; scale decided by a relative-minor check
    Weichai,
    /// Tonic triad only
    Tonictriad,
    /// Temperley (2005) corpus statistics
    Temperley2005,
    /// Transposed HPCP averages
    Thpcp,
    /// Shaath (2011)
    Shaath,
    /// Gómez (2006)
    Gomez,
    /// Noland (2009)
    Noland,
    /// Electronic dance music, minor-oriented
    Edmm,
    /// Electronic dance music, with a majmin mode
    Edma,
    /// Beatport-trained, with a majmin mode
    Bgate,
    /// Beatport-trained raw profiles, with a majmin mode
    Braw,
}

impl ProfileType {
    /// Every profile in the library
    pub const ALL: [ProfileType; 14] = [
        ProfileType::Diatonic,
        ProfileType::Krumhansl,
        ProfileType::Temperley,
        ProfileType::Weichai,
        ProfileType::Tonictriad,
        ProfileType::Temperley2005,
        ProfileType::Thpcp,
        ProfileType::Shaath,
        ProfileType::Gomez,
        ProfileType::Noland,
        ProfileType::Edmm,
        ProfileType::Edma,
        ProfileType::Bgate,
        ProfileType::Braw,
    ];

    /// Profile coefficients
    pub fn profile(&self) -> &'static KeyProfile {
        match self {
            ProfileType::Diatonic => &DIATONIC,
            ProfileType::Krumhansl => &KRUMHANSL,
            ProfileType::Temperley => &TEMPERLEY,
            ProfileType::Weichai => &WEICHAI,
            ProfileType::Tonictriad => &TONICTRIAD,
            ProfileType::Temperley2005 => &TEMPERLEY2005,
            ProfileType::Thpcp => &THPCP,
            ProfileType::Shaath => &SHAATH,
            ProfileType::Gomez => &GOMEZ,
            ProfileType::Noland => &NOLAND,
            ProfileType::Edmm => &EDMM,
            ProfileType::Edma => &EDMA,
            ProfileType::Bgate => &BGATE,
            ProfileType::Braw => &BRAW,
        }
    }

    /// Profile name, as accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        self.profile().name
    }
}

impl Default for ProfileType {
    fn default() -> Self {
        ProfileType::Bgate
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProfileType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileType::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| AnalysisError::InvalidParameter(format!("'{}' is not a valid profile type", s)))
    }
}

/// Resample a 12-bin profile to `pcp_size` bins
///
/// Original values land on every `pcp_size/12`-th bin; the bins in between
/// are linearly interpolated towards the next pitch class, wrapping from the
/// last pitch class back to the first.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidParameter` if `profile` does not have 12
/// values or `pcp_size` is not a positive multiple of 12.
///
/// # Example
///
/// ```
/// use hpcp_key::features::key::templates::resize_profile;
///
/// let profile = [3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
/// let resized = resize_profile(&profile, 36)?;
/// assert_eq!(&resized[..4], &[3.0, 2.0, 1.0, 0.0]);
/// assert_eq!(&resized[33..], &[0.0, 1.0, 2.0]);
/// # Ok::<(), hpcp_key::AnalysisError>(())
/// ```
pub fn resize_profile(profile: &[f64], pcp_size: usize) -> Result<Vec<f64>, AnalysisError> {
    if profile.len() != 12 {
        return Err(AnalysisError::InvalidParameter(format!(
            "Key profile must have 12 values, got {}",
            profile.len()
        )));
    }
    if pcp_size == 0 || pcp_size % 12 != 0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "PCP size must be a positive multiple of 12, got {}",
            pcp_size
        )));
    }

    let n = pcp_size / 12;
    let mut resized = vec![0.0; pcp_size];
    for i in 0..12 {
        let current = profile[i];
        let next = profile[(i + 1) % 12];
        let step = (current - next) / n as f64;
        for j in 0..n {
            resized[i * n + j] = current - j as f64 * step;
        }
    }

    Ok(resized)
}
