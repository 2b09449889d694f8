//! Feature extraction modules
//!
//! This module contains all feature extraction algorithms:
//! - Spectral front end (windowing, spectrum, peaks)
//! - Chroma extraction (HPCP)
//! - Key detection

pub mod chroma;
pub mod key;
pub mod spectral;
