//! Tape-speed pitch shifting by resampling
//!
//! Shifting up by `s` semitones resamples the grain to `2^(-s/12)` of its
//! length; played back at the original rate it sounds higher and shorter.
//! This is deliberately not a duration-preserving shift.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use crate::error::{Result, TextureError};

/// Grains shorter than this are never resampled
pub const MIN_SHIFT_SAMPLES: usize = 256;

/// Resample ratio bounds (output length / input length)
pub const MIN_RATIO: f64 = 0.5;
/// Upper resample ratio bound
pub const MAX_RATIO: f64 = 2.0;

/// Output / input length ratio for a shift in semitones, clamped to
/// [`MIN_RATIO`, `MAX_RATIO`]
pub fn semitones_to_ratio(semitones: f32) -> f64 {
    2f64.powf(-(semitones as f64) / 12.0).clamp(MIN_RATIO, MAX_RATIO)
}

/// Resample `grain` by `ratio` (output length / input length)
///
/// # Errors
///
/// `ProcessingError` when rubato rejects the ratio or the block
pub fn resample(grain: &[f32], ratio: f64) -> Result<Vec<f32>> {
    if grain.is_empty() {
        return Ok(Vec::new());
    }

    let mut resampler = FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Cubic, grain.len(), 1)
        .map_err(|e| TextureError::ProcessingError(format!("Resampler init failed: {}", e)))?;

    let delay = resampler.output_delay();
    let mut out = resampler
        .process(&[grain], None)
        .map_err(|e| TextureError::ProcessingError(format!("Resampling failed: {}", e)))?
        .swap_remove(0);
    let tail = resampler
        .process_partial(None::<&[Vec<f32>]>, None)
        .map_err(|e| TextureError::ProcessingError(format!("Resampler flush failed: {}", e)))?
        .swap_remove(0);
    out.extend_from_slice(&tail);

    let target_len = ((grain.len() as f64 * ratio).round() as usize).max(1);
    let mut shifted: Vec<f32> = out.into_iter().skip(delay).take(target_len).collect();
    shifted.resize(target_len, 0.0);
    Ok(shifted)
}

/// Shift `grain` by `semitones`, or return it unchanged
///
/// Grains shorter than [`MIN_SHIFT_SAMPLES`], zero shifts, and resampler
/// failures all yield the original grain.
pub fn pitch_shift_grain(grain: Vec<f32>, semitones: f32) -> Vec<f32> {
    if grain.len() < MIN_SHIFT_SAMPLES || semitones == 0.0 || !semitones.is_finite() {
        return grain;
    }
    let ratio = semitones_to_ratio(semitones);
    match resample(&grain, ratio) {
        Ok(shifted) => shifted,
        Err(e) => {
            log::debug!("Pitch shift of {:.2} st failed, keeping grain: {}", semitones, e);
            grain
        }
    }
}
