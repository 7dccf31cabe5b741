//! Feature extraction modules
//!
//! - Levels (RMS, peak, bias, crest, dB conversion)
//! - STFT and the shared per-frame spectral features
//! - Spectral flux onset detection
//! - Windowed analysis with cached stability masks
//! - Coarse pitch estimation

pub mod analyzer;
pub mod levels;
pub mod onset;
pub mod pitch;
pub mod spectral;
pub mod stft;
