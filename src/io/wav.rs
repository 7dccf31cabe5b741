//! PCM WAV reading and writing with `hound`
//!
//! This is the only place where file data enters or leaves the engine.
//! Loading validates the decoded samples (no empty, NaN or Inf buffers reach
//! the core); saving clamps to [-1, 1] before quantising.

use std::path::Path;

use super::AudioBuffer;
use crate::error::{Result, TextureError};

/// Output sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavEncoding {
    /// 16-bit signed integer PCM
    Pcm16,
    /// 24-bit signed integer PCM
    Pcm24,
    /// 32-bit IEEE float
    Float32,
}

impl WavEncoding {
    /// Map a configured bit depth (16, 24 or 32) to an encoding
    pub fn from_bit_depth(bits: u16) -> Result<Self> {
        match bits {
            16 => Ok(WavEncoding::Pcm16),
            24 => Ok(WavEncoding::Pcm24),
            32 => Ok(WavEncoding::Float32),
            other => Err(TextureError::InvalidParameter(format!(
                "Unsupported output bit depth: {} (expected 16, 24 or 32)",
                other
            ))),
        }
    }
}

/// Load a WAV file, keeping its channel layout
///
/// # Errors
///
/// Returns `TextureError::Wav` for unreadable files and `InvalidInput` for
/// empty or non-finite audio.
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();
    log::debug!("Loading WAV: {}", path.display());

    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    log::debug!(
        "Decoded {} samples ({} ch, {} Hz, {} bit)",
        samples.len(),
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample
    );

    AudioBuffer::new(samples, spec.sample_rate, spec.channels)
}

/// Load a WAV file and fold it to mono
pub fn load_wav_mono<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    load_wav(path)?.to_mono()
}

/// Write a buffer to disk
pub fn save_wav<P: AsRef<Path>>(path: P, buffer: &AudioBuffer, encoding: WavEncoding) -> Result<()> {
    let path = path.as_ref();
    let (bits_per_sample, sample_format) = match encoding {
        WavEncoding::Pcm16 => (16, hound::SampleFormat::Int),
        WavEncoding::Pcm24 => (24, hound::SampleFormat::Int),
        WavEncoding::Float32 => (32, hound::SampleFormat::Float),
    };

    let spec = hound::WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample,
        sample_format,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    match encoding {
        WavEncoding::Float32 => {
            for &s in buffer.samples() {
                writer.write_sample(s.clamp(-1.0, 1.0))?;
            }
        }
        WavEncoding::Pcm16 | WavEncoding::Pcm24 => {
            let max_value = ((1i64 << (bits_per_sample - 1)) - 1) as f32;
            for &s in buffer.samples() {
                writer.write_sample((s.clamp(-1.0, 1.0) * max_value).round() as i32)?;
            }
        }
    }
    writer.finalize()?;

    log::debug!(
        "Wrote {} ({} frames, {:?})",
        path.display(),
        buffer.frames(),
        encoding
    );
    Ok(())
}
