//! Frame segmentation
//!
//! Cuts a sample buffer into fixed-size, possibly overlapping frames. Frames
//! that run past either end of the buffer are zero-padded, so every emitted
//! frame has exactly `frame_size` samples.
//!
//! # Example
//!
//! ```
//! use hpcp_key::preprocessing::framecutter::{FrameCutter, FrameCutterConfig};
//!
//! let samples = vec![0.5f64; 4096];
//! let config = FrameCutterConfig {
//!     frame_size: 1024,
//!     hop_size: 512,
//!     ..Default::default()
//! };
//! for frame in FrameCutter::new(&samples, config)? {
//!     assert_eq!(frame.len(), 1024);
//! }
//! # Ok::<(), hpcp_key::AnalysisError>(())
//! ```

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// Framecutter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameCutterConfig {
    /// Output frame size in samples (default: 1024)
    pub frame_size: usize,

    /// Distance between consecutive frame starts in samples (default: 512)
    pub hop_size: usize,

    /// Center the first frame on sample 0 (default: true)
    ///
    /// When false the first frame starts at sample 0.
    pub start_from_center: bool,

    /// Emit one last frame ending exactly on the final sample when the
    /// trailing frame would otherwise be discarded (default: false)
    pub last_frame_to_end_of_file: bool,

    /// Minimum fraction of real (non-padded) samples a frame needs to be
    /// emitted, in [0, 1] (default: 0.0, never discard)
    pub valid_frame_threshold_ratio: f64,
}

impl Default for FrameCutterConfig {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            hop_size: 512,
            start_from_center: true,
            last_frame_to_end_of_file: false,
            valid_frame_threshold_ratio: 0.0,
        }
    }
}

impl FrameCutterConfig {
    /// Check the parameters for consistency
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if:
    /// - `frame_size` or `hop_size` is zero
    /// - `valid_frame_threshold_ratio` is outside [0, 1]
    /// - `valid_frame_threshold_ratio` > 0.5 while `start_from_center` is set
    ///   (the first centered frame only holds half a frame of real samples)
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.frame_size == 0 {
            return Err(AnalysisError::InvalidParameter(
                "Frame size must be > 0".to_string(),
            ));
        }
        if self.hop_size == 0 {
            return Err(AnalysisError::InvalidParameter(
                "Hop size must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.valid_frame_threshold_ratio) {
            return Err(AnalysisError::InvalidParameter(format!(
                "Valid frame threshold ratio must be in [0, 1], got {}",
                self.valid_frame_threshold_ratio
            )));
        }
        if self.start_from_center && self.valid_frame_threshold_ratio > 0.5 {
            return Err(AnalysisError::InvalidParameter(
                "Valid frame threshold ratio cannot exceed 0.5 when starting from center".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lazy, finite sequence of frames over a borrowed sample buffer
///
/// The buffer is never mutated. Once the iterator returns `None` it keeps
/// returning `None`.
#[derive(Debug, Clone)]
pub struct FrameCutter<'a> {
    buffer: &'a [f64],
    config: FrameCutterConfig,
    valid_frame_threshold: usize,
    start_index: i64,
    last_end: Option<i64>,
    finished: bool,
}

impl<'a> FrameCutter<'a> {
    /// Create a framecutter over `buffer`
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if the configuration is
    /// inconsistent (see [`FrameCutterConfig::validate`]).
    pub fn new(buffer: &'a [f64], config: FrameCutterConfig) -> Result<Self, AnalysisError> {
        config.validate()?;

        let valid_frame_threshold =
            (config.valid_frame_threshold_ratio * config.frame_size as f64).round() as usize;
        let start_index = if config.start_from_center {
            -((config.frame_size as i64 + 1) / 2)
        } else {
            0
        };

        log::debug!(
            "Framecutter: {} samples, frame_size={}, hop_size={}, centered={}",
            buffer.len(),
            config.frame_size,
            config.hop_size,
            config.start_from_center
        );

        Ok(Self {
            buffer,
            finished: buffer.is_empty(),
            config,
            valid_frame_threshold,
            start_index,
            last_end: None,
        })
    }

    /// Copy the frame starting at `start` (may be negative), zero-padding
    /// outside the buffer. Returns the frame and its count of real samples.
    fn cut(&self, start: i64) -> (Vec<f64>, usize) {
        let frame_size = self.config.frame_size;
        let len = self.buffer.len() as i64;
        let mut frame = vec![0.0; frame_size];

        let begin = start.max(0);
        let end = (start + frame_size as i64).min(len);
        if end <= begin {
            return (frame, 0);
        }

        let offset = (begin - start) as usize;
        let count = (end - begin) as usize;
        frame[offset..offset + count].copy_from_slice(&self.buffer[begin as usize..end as usize]);
        (frame, count)
    }

    /// Final frame aligned to end on the last sample, unless the previous
    /// frame already did.
    fn frame_to_end_of_file(&mut self) -> Option<Vec<f64>> {
        self.finished = true;
        let len = self.buffer.len() as i64;
        if self.last_end == Some(len) {
            return None;
        }
        let (frame, _) = self.cut(len - self.config.frame_size as i64);
        Some(frame)
    }
}

impl Iterator for FrameCutter<'_> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Vec<f64>> {
        if self.finished {
            return None;
        }

        let len = self.buffer.len() as i64;
        let frame_size = self.config.frame_size as i64;
        let start = self.start_index;

        if start >= len {
            self.finished = true;
            return None;
        }

        let (frame, real) = self.cut(start);

        if real < self.valid_frame_threshold {
            if self.config.last_frame_to_end_of_file {
                return self.frame_to_end_of_file();
            }
            self.finished = true;
            return None;
        }

        let frame_end = start + frame_size;
        if self.config.start_from_center {
            // Stop once the frame center lies at or past the end of the buffer
            if frame_end > len && start + frame_size / 2 >= len {
                self.finished = true;
            }
        } else if frame_end >= len && !self.config.last_frame_to_end_of_file {
            self.finished = true;
        }

        self.last_end = Some(frame_end);
        self.start_index += self.config.hop_size as i64;
        Some(frame)
    }
}
