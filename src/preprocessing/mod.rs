//! Audio preprocessing modules
//!
//! Utilities for shaping audio before and after analysis:
//! - Peak normalization (with a dedicated silent-signal condition)
//! - Windows and fades
//! - Zero-phase filtering and tremolo
//! - Channel mixing (interleaved to mono and back)

pub mod channel_mixer;
pub mod envelope;
pub mod filters;
pub mod normalization;
