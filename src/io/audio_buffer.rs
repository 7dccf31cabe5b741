//! Validated in-memory audio buffer

use crate::error::{Result, TextureError};
use crate::preprocessing::channel_mixer::{downmix_interleaved, upmix_mono, ChannelMixMode};

/// Decoded PCM audio in the engine's canonical layout
///
/// Samples are `f32`, sample-major interleaved when `channels > 1`. A buffer
/// can only be built from non-empty, finite data, so every component
/// downstream may assume clean input.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Create a buffer from interleaved samples
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a zero sample rate or channel count,
    /// `InvalidInput` for empty, ragged or non-finite data.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TextureError::InvalidParameter(
                "Sample rate must be > 0".to_string(),
            ));
        }
        if channels == 0 {
            return Err(TextureError::InvalidParameter(
                "Channel count must be > 0".to_string(),
            ));
        }
        validate_samples(&samples)?;
        if samples.len() % channels as usize != 0 {
            return Err(TextureError::InvalidInput(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                channels
            )));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Create a mono buffer
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, sample_rate, 1)
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consume the buffer and return its samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds
    pub fn duration_sec(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    /// True when the buffer holds a single channel
    pub fn is_mono(&self) -> bool {
        self.channels == 1
    }

    /// Average all channels into a mono buffer
    pub fn to_mono(&self) -> Result<AudioBuffer> {
        if self.is_mono() {
            return Ok(self.clone());
        }
        let mono = downmix_interleaved(
            &self.samples,
            self.channels as usize,
            ChannelMixMode::Average,
        )?;
        AudioBuffer::mono(mono, self.sample_rate)
    }

    /// Duplicate a mono buffer into two channels (no-op for multi-channel input)
    pub fn to_stereo(&self) -> AudioBuffer {
        if !self.is_mono() {
            return self.clone();
        }
        Self {
            samples: upmix_mono(&self.samples, 2),
            sample_rate: self.sample_rate,
            channels: 2,
        }
    }
}

/// Reject empty, NaN-containing or Inf-containing sample data
pub fn validate_samples(samples: &[f32]) -> Result<()> {
    if samples.is_empty() {
        return Err(TextureError::InvalidInput(
            "Empty audio samples".to_string(),
        ));
    }
    if let Some(pos) = samples.iter().position(|s| s.is_nan()) {
        return Err(TextureError::InvalidInput(format!(
            "Audio contains NaN at sample {}",
            pos
        )));
    }
    if let Some(pos) = samples.iter().position(|s| s.is_infinite()) {
        return Err(TextureError::InvalidInput(format!(
            "Audio contains Inf at sample {}",
            pos
        )));
    }
    Ok(())
}
