//! Grain usability scoring
//!
//! A grain starts at 1.0 and picks up multiplicative penalties for silence,
//! DC bias, clipping or extreme transients, and a lopsided envelope.

use crate::features::levels::{bias, peak, rms};

/// Scores below this are what very short grains get
pub const SHORT_GRAIN_SCORE: f32 = 0.1;

/// Thresholds and penalty factors for [`GrainQualityScorer::score`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainQualityScorer {
    /// RMS below this counts as silence
    pub silence_rms: f32,
    /// Absolute mean above this counts as biased
    pub max_bias: f32,
    /// Factor applied to biased grains
    pub bias_penalty: f32,
    /// Peak above this counts as near-clipping
    pub clip_peak: f32,
    /// Peak / RMS above this counts as an extreme transient
    pub max_peak_ratio: f32,
    /// Factor applied to clipping or transient grains
    pub transient_penalty: f32,
    /// Half-energy imbalance above this counts as lopsided
    pub max_skew: f32,
    /// Factor applied to lopsided grains
    pub skew_penalty: f32,
}

impl Default for GrainQualityScorer {
    fn default() -> Self {
        Self {
            silence_rms: 0.01,
            max_bias: 0.1,
            bias_penalty: 0.7,
            clip_peak: 0.95,
            max_peak_ratio: 10.0,
            transient_penalty: 0.5,
            max_skew: 0.8,
            skew_penalty: 0.6,
        }
    }
}

impl GrainQualityScorer {
    /// Score a grain in [0, 1] (higher is better)
    ///
    /// Never fails: grains shorter than two samples score
    /// [`SHORT_GRAIN_SCORE`] and non-finite grains score 0.0.
    pub fn score(&self, grain: &[f32]) -> f32 {
        if grain.len() < 2 {
            return SHORT_GRAIN_SCORE;
        }
        if grain.iter().any(|x| !x.is_finite()) {
            return 0.0;
        }

        let mut score = 1.0f32;

        let level = rms(grain);
        if level < self.silence_rms {
            // 0.1 for digital silence, approaching 0.3 just under the threshold
            let closeness = if self.silence_rms > 0.0 {
                (level / self.silence_rms).clamp(0.0, 1.0)
            } else {
                0.0
            };
            score *= 0.1 + 0.2 * closeness;
        }

        if bias(grain) > self.max_bias {
            score *= self.bias_penalty;
        }

        let grain_peak = peak(grain);
        let ratio = if level > 1e-10 { grain_peak / level } else { 0.0 };
        if grain_peak > self.clip_peak || ratio > self.max_peak_ratio {
            score *= self.transient_penalty;
        }

        let half = grain.len() / 2;
        let first: f32 = grain[..half].iter().map(|x| x * x).sum();
        let second: f32 = grain[half..].iter().map(|x| x * x).sum();
        let total = first + second;
        if total > 0.0 && (first - second).abs() / total > self.max_skew {
            score *= self.skew_penalty;
        }

        score.clamp(0.0, 1.0)
    }
}
