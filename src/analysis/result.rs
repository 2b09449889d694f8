//! Key estimation result types

use super::metadata::AnalysisMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pitch class, indexed from A (the pitch class of the 440 Hz reference)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    /// A
    A,
    /// B flat
    Bb,
    /// B
    B,
    /// C
    C,
    /// C sharp
    #[serde(rename = "C#")]
    CSharp,
    /// D
    D,
    /// E flat
    Eb,
    /// E
    E,
    /// F
    F,
    /// F sharp
    #[serde(rename = "F#")]
    FSharp,
    /// G
    G,
    /// A flat
    Ab,
}

impl PitchClass {
    /// All pitch classes in index order (0 = A)
    pub const ALL: [PitchClass; 12] = [
        PitchClass::A,
        PitchClass::Bb,
        PitchClass::B,
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::Eb,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::Ab,
    ];

    /// Pitch class for an index, taken modulo 12
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Index in semitones above A
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Note name (e.g. "A", "Bb", "C#")
    ///
    /// # Example
    ///
    /// ```
    /// use hpcp_key::analysis::result::PitchClass;
    ///
    /// assert_eq!(PitchClass::from_index(3).name(), "C");
    /// assert_eq!(PitchClass::from_index(13).name(), "Bb");
    /// ```
    pub fn name(&self) -> &'static str {
        match self {
            PitchClass::A => "A",
            PitchClass::Bb => "Bb",
            PitchClass::B => "B",
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::Eb => "Eb",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::Ab => "Ab",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mode of the estimated key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Major
    Major,
    /// Minor
    Minor,
    /// Ambiguous major/minor, from profiles that define a third mode
    #[serde(rename = "majmin")]
    MajMin,
}

impl Scale {
    /// Label ("major", "minor" or "majmin")
    pub fn name(&self) -> &'static str {
        match self {
            Scale::Major => "major",
            Scale::Minor => "minor",
            Scale::MajMin => "majmin",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Circle of fifths in pitch-class indices (A = 0): C, G, D, A, E, B, F#, C#, Ab, Eb, Bb, F
const CIRCLE_OF_FIFTHS_MAJOR: [usize; 12] = [3, 10, 5, 0, 7, 2, 9, 4, 11, 6, 1, 8];
// Relative minors: Am, Em, Bm, F#m, C#m, Abm, Ebm, Bbm, Fm, Cm, Gm, Dm
const CIRCLE_OF_FIFTHS_MINOR: [usize; 12] = [0, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10, 5];

/// Estimated key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEstimate {
    /// Tonic pitch class
    pub key: PitchClass,

    /// Mode
    pub scale: Scale,

    /// Correlation of the winning template, in [-1, 1]
    pub strength: f64,

    /// `(best - second) / best`, where `second` is the best correlation of
    /// the winning template at a different pitch class (0 when best <= 0)
    pub first_to_second_relative_strength: f64,
}

impl KeyEstimate {
    /// Zero-strength estimate reported for silent or flat profiles
    pub fn zero() -> Self {
        Self {
            key: PitchClass::A,
            scale: Scale::Major,
            strength: 0.0,
            first_to_second_relative_strength: 0.0,
        }
    }

    /// Key name (e.g. "C major", "F# minor")
    pub fn name(&self) -> String {
        format!("{} {}", self.key, self.scale)
    }

    /// Key in DJ numerical notation (e.g. "1A", "2B", "12A")
    ///
    /// Steps around the circle of fifths: 1A = C major, 2A = G major, ...,
    /// 12A = F major; 1B = A minor, 2B = E minor, ..., 12B = D minor.
    /// Returns `None` for the majmin scale.
    ///
    /// # Example
    ///
    /// ```
    /// use hpcp_key::analysis::result::{KeyEstimate, PitchClass, Scale};
    ///
    /// let key = KeyEstimate { key: PitchClass::G, scale: Scale::Major, ..KeyEstimate::zero() };
    /// assert_eq!(key.numerical().as_deref(), Some("2A"));
    /// let key = KeyEstimate { key: PitchClass::A, scale: Scale::Minor, ..KeyEstimate::zero() };
    /// assert_eq!(key.numerical().as_deref(), Some("1B"));
    /// ```
    pub fn numerical(&self) -> Option<String> {
        let (circle, suffix) = match self.scale {
            Scale::Major => (&CIRCLE_OF_FIFTHS_MAJOR, "A"),
            Scale::Minor => (&CIRCLE_OF_FIFTHS_MINOR, "B"),
            Scale::MajMin => return None,
        };
        let position = circle.iter().position(|&x| x == self.key.index())?;
        Some(format!("{}{}", position + 1, suffix))
    }

    /// Parse DJ numerical notation back into (key, scale)
    ///
    /// Returns `None` for anything outside 1A-12A / 1B-12B.
    pub fn from_numerical(notation: &str) -> Option<(PitchClass, Scale)> {
        let suffix = notation.chars().last()?;
        let number = &notation[..notation.len() - suffix.len_utf8()];
        let number: usize = number.parse().ok()?;
        if !(1..=12).contains(&number) {
            return None;
        }
        match suffix {
            'A' => Some((PitchClass::from_index(CIRCLE_OF_FIFTHS_MAJOR[number - 1]), Scale::Major)),
            'B' => Some((PitchClass::from_index(CIRCLE_OF_FIFTHS_MINOR[number - 1]), Scale::Minor)),
            _ => None,
        }
    }
}

impl fmt::Display for KeyEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.scale)
    }
}

/// Full result of a track analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyAnalysis {
    /// Estimated key
    pub estimate: KeyEstimate,

    /// Track-level HPCP (unit max) handed to the correlator
    pub hpcp: Vec<f64>,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}
