//! Sustained segment mining
//!
//! # Algorithm
//!
//! Slide a window of the target duration over the buffer. A position is a
//! candidate when:
//! - its RMS level lies inside the energy gates
//! - its onset rate (onsets / duration) is at most the limit
//! - its mean spectral flatness is at most the limit (tonal material)
//! - with pre-analysis, every analyzer window inside it is stable (or, when
//!   none fits inside, the analyzer window containing its start)
//!
//! Candidates are ranked by `−mean onset strength − flatness`: quiet onset
//! activity and tonal content win.
//!
//! Onsets and flatness come from one shared [`SpectralFeatures`], borrowed
//! from the analyzer when one is attached.
//!
//! # Example
//!
//! ```no_run
//! use afterglow_dsp::mining::{MiningGates, SegmentMiner};
//!
//! let samples = vec![0.0f32; 44100 * 10];
//! let miner = SegmentMiner::new(&samples, 44100)?;
//! let candidates = miner.find_sustained_segments(2.0, &MiningGates::default(), 0.5)?;
//! let best = miner.select_top(candidates, 3);
//! # Ok::<(), afterglow_dsp::TextureError>(())
//! ```

use std::borrow::Cow;
use std::rc::Rc;

use crate::error::{Result, TextureError};
use crate::features::analyzer::{FeatureAnalyzer, GateParameters, StabilityMask};
use crate::features::levels::rms_db;
use crate::features::spectral::SpectralFeatures;
use crate::io::validate_samples;

/// Per-segment acceptance thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiningGates {
    /// Quietest accepted RMS (dB)
    pub min_energy_db: f32,
    /// Loudest accepted RMS (dB)
    pub max_energy_db: f32,
    /// Most onsets per second accepted
    pub max_onset_rate: f32,
    /// Highest mean spectral flatness accepted
    pub max_flatness: f32,
}

impl Default for MiningGates {
    fn default() -> Self {
        Self {
            min_energy_db: -40.0,
            max_energy_db: -10.0,
            max_onset_rate: 3.0,
            max_flatness: 0.5,
        }
    }
}

impl MiningGates {
    /// Check bounds
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for inverted energy bounds or negative limits
    pub fn validate(&self) -> Result<()> {
        if !(self.min_energy_db <= self.max_energy_db) {
            return Err(TextureError::InvalidParameter(format!(
                "Energy gate inverted: {} > {} dB",
                self.min_energy_db, self.max_energy_db
            )));
        }
        if !(self.max_onset_rate >= 0.0) || !(self.max_flatness >= 0.0) {
            return Err(TextureError::InvalidParameter(format!(
                "Onset rate and flatness limits must be >= 0, got {} and {}",
                self.max_onset_rate, self.max_flatness
            )));
        }
        Ok(())
    }
}

/// A sustained region of the source
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentCandidate {
    /// First sample
    pub start: usize,
    /// One past the last sample
    pub end: usize,
    /// RMS level (dB)
    pub energy_db: f32,
    /// Onsets per second
    pub transient_rate: f32,
    /// Mean spectral flatness
    pub flatness: f32,
    /// Ranking score, set by [`SegmentMiner::select_top`]
    pub score: Option<f32>,
}

impl SegmentCandidate {
    /// Length in samples
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True for an empty span
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

struct PreAnalysis<'a> {
    analyzer: &'a FeatureAnalyzer<'a>,
    mask: Rc<StabilityMask>,
}

impl PreAnalysis<'_> {
    fn is_stable(&self, start: usize, end: usize) -> bool {
        let hop = self.analyzer.hop();
        let usable = self.mask.len().min(self.analyzer.window_count());

        let mut inside = (start.div_ceil(hop)..usable)
            .take_while(|&i| self.analyzer.window_range(i).end <= end)
            .filter(|&i| self.analyzer.window_range(i).len() == self.analyzer.window_size())
            .peekable();

        if inside.peek().is_none() {
            let idx = start / hop;
            return idx >= usable || self.mask[idx];
        }
        inside.all(|i| self.mask[i])
    }
}

/// Finds and ranks sustained segments in one buffer
pub struct SegmentMiner<'a> {
    samples: &'a [f32],
    sample_rate: u32,
    spectral: Cow<'a, SpectralFeatures>,
    pre_analysis: Option<PreAnalysis<'a>>,
}

impl<'a> SegmentMiner<'a> {
    /// Miner without pre-analysis
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a zero sample rate, `InvalidInput` for empty or
    /// non-finite samples
    pub fn new(samples: &'a [f32], sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TextureError::InvalidParameter(
                "Sample rate must be > 0".to_string(),
            ));
        }
        validate_samples(samples)?;
        let spectral = SpectralFeatures::compute(samples, sample_rate)?;
        Ok(Self {
            samples,
            sample_rate,
            spectral: Cow::Owned(spectral),
            pre_analysis: None,
        })
    }

    /// Miner that also requires stability under `gates`
    ///
    /// Reuses the analyzer's spectral features and stability mask cache.
    ///
    /// # Errors
    ///
    /// Propagates gate validation and feature computation errors
    pub fn with_pre_analysis(analyzer: &'a FeatureAnalyzer<'a>, gates: &GateParameters) -> Result<Self> {
        let mask = analyzer.stability_mask(gates)?;
        let spectral = analyzer.spectral_features()?;
        log::debug!(
            "SegmentMiner: pre-analysis mask {}/{} stable",
            mask.count_stable(),
            mask.len()
        );
        Ok(Self {
            samples: analyzer.samples(),
            sample_rate: analyzer.sample_rate(),
            spectral: Cow::Borrowed(spectral),
            pre_analysis: Some(PreAnalysis { analyzer, mask }),
        })
    }

    /// Whether a stability mask is applied
    pub fn has_pre_analysis(&self) -> bool {
        self.pre_analysis.is_some()
    }

    /// The shared spectral features
    pub fn spectral_features(&self) -> &SpectralFeatures {
        &self.spectral
    }

    /// Find every window of `target_duration_sec` that passes `gates`
    ///
    /// # Arguments
    ///
    /// * `target_duration_sec` - Segment length (> 0)
    /// * `gates` - Energy, onset and flatness limits
    /// * `hop_sec` - Slide step (> 0)
    ///
    /// # Returns
    ///
    /// Candidates in source order; empty when the buffer is shorter than
    /// the target duration
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a non-positive duration or hop, or bad gates
    pub fn find_sustained_segments(
        &self,
        target_duration_sec: f32,
        gates: &MiningGates,
        hop_sec: f32,
    ) -> Result<Vec<SegmentCandidate>> {
        if !(target_duration_sec > 0.0) || !target_duration_sec.is_finite() {
            return Err(TextureError::InvalidParameter(format!(
                "Target duration must be > 0, got {}",
                target_duration_sec
            )));
        }
        if !(hop_sec > 0.0) || !hop_sec.is_finite() {
            return Err(TextureError::InvalidParameter(format!(
                "Mining hop must be > 0, got {}",
                hop_sec
            )));
        }
        gates.validate()?;

        let sr = self.sample_rate as f32;
        let window = ((target_duration_sec * sr) as usize).max(1);
        let hop = ((hop_sec * sr) as usize).max(1);
        if self.samples.len() < window {
            log::debug!(
                "Buffer ({} samples) shorter than mining window ({})",
                self.samples.len(),
                window
            );
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        let mut rejected_by_mask = 0usize;
        for start in (0..=self.samples.len() - window).step_by(hop) {
            let end = start + window;

            let energy_db = rms_db(&self.samples[start..end]);
            if energy_db < gates.min_energy_db || energy_db > gates.max_energy_db {
                continue;
            }

            let transient_rate = self.spectral.onset_count(start, end) as f32 / target_duration_sec;
            if transient_rate > gates.max_onset_rate {
                continue;
            }

            let flatness = self.spectral.mean_flatness(start, end);
            if flatness > gates.max_flatness {
                continue;
            }

            if let Some(pre) = &self.pre_analysis {
                if !pre.is_stable(start, end) {
                    rejected_by_mask += 1;
                    continue;
                }
            }

            candidates.push(SegmentCandidate {
                start,
                end,
                energy_db,
                transient_rate,
                flatness,
                score: None,
            });
        }

        log::debug!(
            "Mining {:.2}s windows: {} candidates ({} rejected by stability mask)",
            target_duration_sec,
            candidates.len(),
            rejected_by_mask
        );
        Ok(candidates)
    }

    /// Score candidates and keep the best `n`, best first
    pub fn select_top(&self, candidates: Vec<SegmentCandidate>, n: usize) -> Vec<SegmentCandidate> {
        let mut scored: Vec<SegmentCandidate> = candidates
            .into_iter()
            .map(|mut c| {
                let onset_mean = self.spectral.mean_onset_strength(c.start, c.end);
                c.score = Some(-onset_mean - c.flatness);
                c
            })
            .collect();

        scored.sort_by(|a, b| {
            let sa = a.score.unwrap_or(f32::NEG_INFINITY);
            let sb = b.score.unwrap_or(f32::NEG_INFINITY);
            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(n);
        scored
    }

    /// Samples of a candidate
    pub fn segment(&self, candidate: &SegmentCandidate) -> &'a [f32] {
        let end = candidate.end.min(self.samples.len());
        let start = candidate.start.min(end);
        &self.samples[start..end]
    }
}
