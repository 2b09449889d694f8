//! Analysis result modules
//!
//! Types handed back to callers:
//! - Key estimate, pitch classes and scales
//! - Metadata

pub mod metadata;
pub mod result;

pub use metadata::AnalysisMetadata;
pub use result::{KeyAnalysis, KeyEstimate, PitchClass, Scale};
