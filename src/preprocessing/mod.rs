//! Audio preprocessing modules
//!
//! This module contains utilities for preparing audio for analysis:
//! - Channel mixing (multi-channel to mono)
//! - Frame segmentation

pub mod channel_mixer;
pub mod framecutter;

pub use channel_mixer::{deinterleave, downmix};
pub use framecutter::{FrameCutter, FrameCutterConfig};
