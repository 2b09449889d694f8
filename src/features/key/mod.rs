//! Key detection modules
//!
//! Detect musical key using:
//! - Named key profiles (Krumhansl, Temperley, EDM and Beatport profiles, ...)
//! - Chord-based polyphonic templates
//! - Rotation-search Pearson correlation

pub mod chords;
pub mod detector;
pub mod templates;

pub use detector::{
    estimate_key, estimate_key_with, CombinedChordTemplates, KeyEstimationConfig, PolyphonicTemplates,
    TemplateStrategy,
};
pub use templates::{resize_profile, KeyProfile, ProfileType};
