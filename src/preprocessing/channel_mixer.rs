//! Channel mixing utilities
//!
//! All buffers in the engine use one canonical layout: sample-major
//! interleaved frames (`[L0, R0, L1, R1, ...]`). Conversions between layouts
//! happen here, once, at the I/O boundary.

use crate::error::{Result, TextureError};

/// Channel mixing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMixMode {
    /// Mean of all channels (safest before normalization)
    #[default]
    Average,
    /// Sum of channels scaled by 1/sqrt(channels) (approximately constant power)
    PowerSum,
    /// Keep only the first channel
    First,
}

/// Fold interleaved multi-channel samples down to mono
///
/// # Arguments
///
/// * `samples` - Interleaved samples (sample-major)
/// * `channels` - Channel count (must divide `samples.len()`)
/// * `mode` - Mixing mode
///
/// # Returns
///
/// Mono samples, one per frame
pub fn downmix_interleaved(
    samples: &[f32],
    channels: usize,
    mode: ChannelMixMode,
) -> Result<Vec<f32>> {
    if channels == 0 {
        return Err(TextureError::InvalidParameter(
            "Channel count must be > 0".to_string(),
        ));
    }

    if samples.len() % channels != 0 {
        return Err(TextureError::InvalidInput(format!(
            "{} samples cannot be split into {} channels",
            samples.len(),
            channels
        )));
    }

    if channels == 1 {
        return Ok(samples.to_vec());
    }

    log::debug!(
        "Downmixing {} frames x {} channels using {:?}",
        samples.len() / channels,
        channels,
        mode
    );

    let power_scale = 1.0 / (channels as f32).sqrt();
    let mono = samples
        .chunks_exact(channels)
        .map(|frame| match mode {
            ChannelMixMode::Average => frame.iter().sum::<f32>() / channels as f32,
            ChannelMixMode::PowerSum => frame.iter().sum::<f32>() * power_scale,
            ChannelMixMode::First => frame[0],
        })
        .collect();

    Ok(mono)
}

/// Duplicate mono samples into an interleaved multi-channel layout
pub fn upmix_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .iter()
        .flat_map(|&s| std::iter::repeat(s).take(channels))
        .collect()
}

/// Interleave planar (channel-major) data into the canonical layout
///
/// Every channel must have the same length.
pub fn interleave_planar(planar: &[Vec<f32>]) -> Result<Vec<f32>> {
    let Some(first) = planar.first() else {
        return Err(TextureError::InvalidInput(
            "No channels to interleave".to_string(),
        ));
    };

    let frames = first.len();
    if planar.iter().any(|ch| ch.len() != frames) {
        return Err(TextureError::InvalidInput(
            "Planar channels have different lengths".to_string(),
        ));
    }

    let mut out = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        for ch in planar {
            out.push(ch[i]);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_downmix() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mono = downmix_interleaved(&stereo, 2, ChannelMixMode::Average).unwrap();
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_power_sum_downmix() {
        let stereo = vec![0.5, 0.5];
        let mono = downmix_interleaved(&stereo, 2, ChannelMixMode::PowerSum).unwrap();
        assert!((mono[0] - 1.0 / 2.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_first_channel_downmix() {
        let stereo = vec![0.1, 0.9, 0.2, 0.8];
        let mono = downmix_interleaved(&stereo, 2, ChannelMixMode::First).unwrap();
        assert_eq!(mono, vec![0.1, 0.2]);
    }

    #[test]
    fn test_ragged_input_rejected() {
        let samples = vec![0.0; 5];
        assert!(downmix_interleaved(&samples, 2, ChannelMixMode::Average).is_err());
        assert!(downmix_interleaved(&samples, 0, ChannelMixMode::Average).is_err());
    }

    #[test]
    fn test_upmix_and_interleave_agree() {
        let mono = vec![0.1, 0.2, 0.3];
        let upmixed = upmix_mono(&mono, 2);
        let interleaved = interleave_planar(&[mono.clone(), mono]).unwrap();
        assert_eq!(upmixed, interleaved);
    }

    #[test]
    fn test_interleave_rejects_mismatched_channels() {
        let result = interleave_planar(&[vec![0.0; 3], vec![0.0; 2]]);
        assert!(result.is_err());
    }
}
