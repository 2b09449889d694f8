//! Error types for the key estimation engine

use std::fmt;

/// Errors that can occur during key analysis
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid parameter (non-positive sizes, inverted ranges, mismatched
    /// vector lengths, unknown profile or window names)
    InvalidParameter(String),

    /// Input buffer is empty where at least one frame is required
    EmptyInput(String),

    /// Numerically degenerate input (zero variance, all-zero spectrum).
    ///
    /// The public entry points recover from this internally and report a
    /// zero-strength estimate instead.
    NumericDegenerate(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            AnalysisError::EmptyInput(msg) => write!(f, "Empty input: {}", msg),
            AnalysisError::NumericDegenerate(msg) => write!(f, "Numerically degenerate: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}
