//! Error types for the texture engine

use thiserror::Error;

/// Errors that can occur while analysing or resynthesising audio
#[derive(Debug, Error)]
pub enum TextureError {
    /// A configuration value or call argument is out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The audio handed to the engine is unusable (empty, NaN, Inf)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Audio peak is below the noise floor, so it cannot be normalized
    #[error("Silent signal: peak {peak:.2e} ({rms_db:.1} dB RMS) is below the noise floor")]
    SilentSignal {
        /// Absolute peak of the rejected buffer
        peak: f32,
        /// RMS level of the rejected buffer in dB
        rms_db: f32,
    },

    /// Processing error inside a DSP stage
    #[error("Processing error: {0}")]
    ProcessingError(String),

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// WAV encode/decode failure
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TextureError {
    /// True for the per-item silent-signal condition that pipelines skip over
    pub fn is_silent(&self) -> bool {
        matches!(self, TextureError::SilentSignal { .. })
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TextureError>;
