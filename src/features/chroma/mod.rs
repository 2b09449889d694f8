//! Chroma extraction modules
//!
//! Fold spectral peaks into a circular pitch-class profile:
//! - Harmonic pitch class profile (HPCP)
//! - Normalization and post-processing

pub mod hpcp;
pub mod normalization;

pub use hpcp::{hpcp, hpcp_from_peaks, HarmonicDecay, Hpcp, HpcpConfig, WeightType};
pub use normalization::HpcpNormalization;
