//! Cloud synthesis: cyclic overlap-add of pitch-varied grains
//!
//! # Algorithm
//!
//! 1. Shift every grain by a random amount in the pitch range (tape-speed)
//! 2. Shuffle the pool
//! 3. Walk the output buffer with hop = mean grain length × (1 − overlap),
//!    jittered by up to ±25 %, adding grains cyclically until the buffer is full
//! 4. Normalize to 0.95 peak, optionally low-pass, fade both edges
//!
//! The same seed and pool always render the same cloud.

use rand::seq::SliceRandom;
use rand::Rng;

use super::extractor::Grain;
use super::pitch::pitch_shift_grain;
use crate::error::{Result, TextureError};
use crate::features::levels::peak;
use crate::preprocessing::envelope::guarded_edge_fade;
use crate::preprocessing::filters::{apply_filter, FilterKind};

/// Peak level after overlap-add
pub const CLOUD_PEAK: f32 = 0.95;

/// Maximum relative hop jitter
const HOP_JITTER: f32 = 0.25;

/// Rendering parameters for one cloud
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudParams {
    /// Output length in seconds
    pub duration_sec: f32,
    /// Grain overlap in [0, 1)
    pub overlap_ratio: f32,
    /// Semitone shift range `(min, max)`
    pub pitch_range: (f32, f32),
    /// Optional zero-phase low-pass cutoff
    pub lowpass_hz: Option<f32>,
    /// Edge fade length in milliseconds
    pub fade_ms: f32,
}

impl Default for CloudParams {
    fn default() -> Self {
        Self {
            duration_sec: 6.0,
            overlap_ratio: 0.75,
            pitch_range: (-5.0, 5.0),
            lowpass_hz: None,
            fade_ms: 50.0,
        }
    }
}

impl CloudParams {
    /// Check ranges
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a non-positive duration, an overlap outside
    /// [0, 1), an inverted pitch range or a negative fade
    pub fn validate(&self) -> Result<()> {
        if !(self.duration_sec > 0.0) || !self.duration_sec.is_finite() {
            return Err(TextureError::InvalidParameter(format!(
                "Cloud duration must be > 0, got {}",
                self.duration_sec
            )));
        }
        if !(0.0..1.0).contains(&self.overlap_ratio) {
            return Err(TextureError::InvalidParameter(format!(
                "Overlap ratio must be in [0, 1), got {}",
                self.overlap_ratio
            )));
        }
        let (lo, hi) = self.pitch_range;
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(TextureError::InvalidParameter(format!(
                "Invalid pitch range {}..{}",
                lo, hi
            )));
        }
        if !(self.fade_ms >= 0.0) {
            return Err(TextureError::InvalidParameter(format!(
                "Fade must be >= 0 ms, got {}",
                self.fade_ms
            )));
        }
        Ok(())
    }
}

/// Render a cloud from a grain pool
///
/// # Arguments
///
/// * `grains` - Grain pool (not modified)
/// * `params` - Duration, overlap, pitch range, filter and fade
/// * `sample_rate` - Sample rate in Hz
/// * `rng` - Random source
///
/// # Returns
///
/// Exactly `duration_sec × sample_rate` samples (at least 1)
///
/// # Errors
///
/// `InvalidInput` for an empty pool, `InvalidParameter` for bad params or a
/// zero sample rate
pub fn synthesize<R: Rng>(grains: &[Grain], params: &CloudParams, sample_rate: u32, rng: &mut R) -> Result<Vec<f32>> {
    params.validate()?;
    if sample_rate == 0 {
        return Err(TextureError::InvalidParameter(
            "Sample rate must be > 0".to_string(),
        ));
    }
    if grains.iter().all(Grain::is_empty) {
        return Err(TextureError::InvalidInput(
            "Cannot synthesize a cloud from an empty grain pool".to_string(),
        ));
    }

    let (lo, hi) = params.pitch_range;
    let mut pool: Vec<Vec<f32>> = grains
        .iter()
        .filter(|g| !g.is_empty())
        .map(|g| {
            let semitones = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
            pitch_shift_grain(g.samples.clone(), semitones)
        })
        .collect();
    pool.shuffle(rng);

    let out_len = ((params.duration_sec * sample_rate as f32) as usize).max(1);
    let mean_len = pool.iter().map(Vec::len).sum::<usize>() as f32 / pool.len() as f32;
    let base_hop = mean_len * (1.0 - params.overlap_ratio);

    let mut cloud = vec![0.0f32; out_len];
    let mut pos = 0usize;
    let mut placed = 0usize;
    while pos < out_len {
        let grain = &pool[placed % pool.len()];
        let end = (pos + grain.len()).min(out_len);
        for (o, g) in cloud[pos..end].iter_mut().zip(grain) {
            *o += g;
        }
        let jitter = 1.0 + rng.gen_range(-HOP_JITTER..=HOP_JITTER);
        pos += ((base_hop * jitter) as usize).max(1);
        placed += 1;
    }

    log::debug!(
        "Cloud: {} grains placed into {} samples (pool {}, mean len {:.0}, hop {:.0})",
        placed,
        out_len,
        pool.len(),
        mean_len,
        base_hop
    );

    let level = peak(&cloud);
    if level > 0.0 {
        let gain = CLOUD_PEAK / level;
        cloud.iter_mut().for_each(|s| *s *= gain);
    }

    if let Some(cutoff_hz) = params.lowpass_hz.filter(|&hz| hz > 0.0) {
        cloud = apply_filter(&cloud, FilterKind::LowPass { cutoff_hz }, sample_rate)?;
    }

    let fade_len = (params.fade_ms / 1000.0 * sample_rate as f32) as usize;
    guarded_edge_fade(&mut cloud, fade_len);

    Ok(cloud)
}
