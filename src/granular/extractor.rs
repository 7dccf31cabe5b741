//! Grain extraction with ordered placement strategies
//!
//! # Algorithm
//!
//! For each attempt:
//! 1. Draw a grain length uniformly in `[min_len, max_len]` samples
//! 2. Ask each placement strategy in turn for a start position:
//!    `StableRun` (a random window inside a long-enough stable run),
//!    `RankedWindows` (a random offset in one of the best-ranked windows),
//!    then `Uniform` (anywhere in the buffer)
//! 3. Slice, zero-pad on the right, score, reject below the quality gate
//! 4. Apply a periodic Hann taper and keep the grain
//!
//! Gated extraction makes up to `count × 10` attempts; ungated extraction
//! makes exactly `count`. Buffers shorter than the longest grain yield
//! `count` tapered copies of the buffer head instead.
//!
//! # Example
//!
//! ```no_run
//! use afterglow_dsp::granular::{GrainExtractionParams, GrainExtractor};
//! use rand::SeedableRng;
//!
//! let samples = vec![0.1f32; 44100];
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let params = GrainExtractionParams::new(40.0, 120.0, 32);
//! let grains = GrainExtractor::default().extract(&samples, &params, 44100, None, &mut rng)?;
//! # Ok::<(), afterglow_dsp::TextureError>(())
//! ```

use std::rc::Rc;

use rand::Rng;

use super::quality::GrainQualityScorer;
use crate::error::{Result, TextureError};
use crate::features::analyzer::{FeatureAnalyzer, GateParameters, StabilityMask};
use crate::io::validate_samples;
use crate::preprocessing::envelope::apply_hann_window;

/// Attempts per requested grain when a quality gate is active
const GATED_ATTEMPTS_PER_GRAIN: usize = 10;

/// Fraction of ranked windows eligible for `RankedWindows` placement
const TOP_WINDOW_FRACTION: f32 = 0.2;

/// A tapered grain plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Grain {
    /// Hann-tapered samples
    pub samples: Vec<f32>,
    /// Quality score of the untapered slice
    pub quality: f32,
    /// Start position in the source buffer
    pub source_offset: usize,
}

impl Grain {
    /// Grain length in samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True for a zero-length grain
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Grain length range, pool size and optional quality gate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainExtractionParams {
    /// Shortest grain in milliseconds
    pub min_len_ms: f32,
    /// Longest grain in milliseconds
    pub max_len_ms: f32,
    /// Number of grains wanted
    pub count: usize,
    /// Reject grains scoring below this (in [0, 1])
    pub quality_gate: Option<f32>,
}

impl GrainExtractionParams {
    /// Ungated parameters
    pub fn new(min_len_ms: f32, max_len_ms: f32, count: usize) -> Self {
        Self {
            min_len_ms,
            max_len_ms,
            count,
            quality_gate: None,
        }
    }

    /// Same parameters with a quality gate
    pub fn with_quality_gate(mut self, gate: f32) -> Self {
        self.quality_gate = Some(gate);
        self
    }

    /// Same parameters with no quality gate
    pub fn ungated(mut self) -> Self {
        self.quality_gate = None;
        self
    }

    /// Check ranges
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the minimum length is not positive, exceeds
    /// the maximum, the count is zero, or the gate lies outside [0, 1]
    pub fn validate(&self) -> Result<()> {
        if !(self.min_len_ms > 0.0) || !self.max_len_ms.is_finite() {
            return Err(TextureError::InvalidParameter(format!(
                "Grain length range must be positive and finite, got {}..{} ms",
                self.min_len_ms, self.max_len_ms
            )));
        }
        if self.min_len_ms > self.max_len_ms {
            return Err(TextureError::InvalidParameter(format!(
                "Minimum grain length {} ms exceeds maximum {} ms",
                self.min_len_ms, self.max_len_ms
            )));
        }
        if self.count == 0 {
            return Err(TextureError::InvalidParameter(
                "Grain count must be > 0".to_string(),
            ));
        }
        if let Some(gate) = self.quality_gate {
            if !(0.0..=1.0).contains(&gate) {
                return Err(TextureError::InvalidParameter(format!(
                    "Quality gate must be in [0, 1], got {}",
                    gate
                )));
            }
        }
        Ok(())
    }

    /// `(min, max)` grain length in samples, both at least 1
    pub fn length_range(&self, sample_rate: u32) -> (usize, usize) {
        let to_samples = |ms: f32| ((ms * sample_rate as f32 / 1000.0) as usize).max(1);
        let min = to_samples(self.min_len_ms);
        let max = to_samples(self.max_len_ms).max(min);
        (min, max)
    }
}

/// Where a grain may start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStrategy {
    /// Inside a run of consecutive stable windows
    StableRun,
    /// Inside one of the top-ranked windows
    RankedWindows,
    /// Anywhere in the buffer
    Uniform,
}

/// Uniform start position for a grain of `grain_len` in a buffer of `buffer_len`
pub fn uniform_start<R: Rng>(buffer_len: usize, grain_len: usize, rng: &mut R) -> usize {
    let max_start = buffer_len.saturating_sub(grain_len);
    rng.gen_range(0..=max_start)
}

/// Analysis-guided placement over one analyzer and gate set
///
/// The mask and the ranked window list are computed once on construction;
/// the strategy list is `StableRun → RankedWindows → Uniform`, with
/// `StableRun` left out when no window passes the gates.
pub struct Placement<'p, 'a> {
    analyzer: &'p FeatureAnalyzer<'a>,
    mask: Rc<StabilityMask>,
    top_windows: Vec<usize>,
    min_consecutive: usize,
    strategies: Vec<PlacementStrategy>,
}

impl<'p, 'a> Placement<'p, 'a> {
    /// Build placement from an analyzer
    ///
    /// # Arguments
    ///
    /// * `analyzer` - Analyzer over the same samples that will be sliced
    /// * `gates` - Gates for the stability mask
    /// * `min_consecutive` - Minimum stable run length in windows
    ///
    /// # Errors
    ///
    /// Propagates gate validation and feature computation errors
    pub fn new(analyzer: &'p FeatureAnalyzer<'a>, gates: &GateParameters, min_consecutive: usize) -> Result<Self> {
        let mask = analyzer.stability_mask(gates)?;
        let ranked = analyzer.ranked_windows(gates)?;
        let keep = ((ranked.len() as f32 * TOP_WINDOW_FRACTION) as usize).max(1);
        let top_windows: Vec<usize> = ranked.into_iter().take(keep).collect();

        let mut strategies = Vec::with_capacity(3);
        if mask.count_stable() > 0 {
            strategies.push(PlacementStrategy::StableRun);
        } else {
            log::warn!("No stable windows; grain placement falls back to ranked windows");
        }
        if !top_windows.is_empty() {
            strategies.push(PlacementStrategy::RankedWindows);
        }
        strategies.push(PlacementStrategy::Uniform);

        log::debug!(
            "Placement: {}/{} stable windows, {} top windows, strategies {:?}",
            mask.count_stable(),
            mask.len(),
            top_windows.len(),
            strategies
        );

        Ok(Self {
            analyzer,
            mask,
            top_windows,
            min_consecutive: min_consecutive.max(1),
            strategies,
        })
    }

    /// Strategies tried, in order
    pub fn strategies(&self) -> &[PlacementStrategy] {
        &self.strategies
    }

    /// The stability mask used for `StableRun`
    pub fn mask(&self) -> &StabilityMask {
        &self.mask
    }

    /// Ask one strategy for a start position
    ///
    /// # Returns
    ///
    /// A start such that `start + grain_len` fits in the buffer whenever the
    /// buffer is long enough, or `None` when the strategy has nothing to offer
    pub fn propose<R: Rng>(&self, strategy: PlacementStrategy, grain_len: usize, rng: &mut R) -> Option<usize> {
        let len = self.analyzer.samples().len();
        let max_start = len.saturating_sub(grain_len);
        match strategy {
            PlacementStrategy::StableRun => {
                let duration_sec = grain_len as f32 / self.analyzer.sample_rate() as f32;
                self.analyzer
                    .sample_from_stable_run(duration_sec, self.min_consecutive, &self.mask, rng)
                    .map(|(start, _)| start.min(max_start))
            }
            PlacementStrategy::RankedWindows => {
                if self.top_windows.is_empty() {
                    return None;
                }
                let idx = self.top_windows[rng.gen_range(0..self.top_windows.len())];
                let range = self.analyzer.window_range(idx);
                if range.is_empty() {
                    return None;
                }
                Some(rng.gen_range(range).min(max_start))
            }
            PlacementStrategy::Uniform => Some(uniform_start(len, grain_len, rng)),
        }
    }

    /// First start offered by the strategy list
    pub fn choose_start<R: Rng>(&self, grain_len: usize, rng: &mut R) -> usize {
        self.strategies
            .iter()
            .find_map(|&s| self.propose(s, grain_len, rng))
            .unwrap_or_else(|| uniform_start(self.analyzer.samples().len(), grain_len, rng))
    }
}

/// Slices, scores and tapers grains
#[derive(Debug, Clone, Copy, Default)]
pub struct GrainExtractor {
    scorer: GrainQualityScorer,
}

impl GrainExtractor {
    /// Extractor with a custom scorer
    pub fn with_scorer(scorer: GrainQualityScorer) -> Self {
        Self { scorer }
    }

    /// The scorer applied to each slice
    pub fn scorer(&self) -> &GrainQualityScorer {
        &self.scorer
    }

    /// Extract up to `params.count` grains
    ///
    /// # Arguments
    ///
    /// * `samples` - Mono source
    /// * `params` - Length range, count and quality gate
    /// * `sample_rate` - Sample rate in Hz
    /// * `placement` - Analysis-guided placement, or `None` for uniform
    /// * `rng` - Random source
    ///
    /// # Returns
    ///
    /// Tapered grains; fewer than requested when the gate rejects too many
    /// attempts, possibly none
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for bad params or a zero sample rate,
    /// `InvalidInput` for empty or non-finite samples
    pub fn extract<R: Rng>(
        &self,
        samples: &[f32],
        params: &GrainExtractionParams,
        sample_rate: u32,
        placement: Option<&Placement<'_, '_>>,
        rng: &mut R,
    ) -> Result<Vec<Grain>> {
        params.validate()?;
        if sample_rate == 0 {
            return Err(TextureError::InvalidParameter(
                "Sample rate must be > 0".to_string(),
            ));
        }
        validate_samples(samples)?;

        let (min_len, max_len) = params.length_range(sample_rate);

        if samples.len() < max_len {
            log::debug!(
                "Source ({} samples) shorter than max grain ({}), slicing the head",
                samples.len(),
                max_len
            );
            return Ok((0..params.count)
                .map(|_| {
                    let grain_len = rng.gen_range(min_len..=max_len);
                    self.cut(samples, 0, grain_len)
                })
                .collect());
        }

        let max_attempts = match params.quality_gate {
            Some(_) => params.count * GATED_ATTEMPTS_PER_GRAIN,
            None => params.count,
        };

        let mut grains = Vec::with_capacity(params.count);
        let mut attempts = 0;
        while grains.len() < params.count && attempts < max_attempts {
            attempts += 1;
            let grain_len = rng.gen_range(min_len..=max_len);
            let start = match placement {
                Some(p) => p.choose_start(grain_len, rng),
                None => uniform_start(samples.len(), grain_len, rng),
            };

            let grain = self.cut(samples, start, grain_len);
            if let Some(gate) = params.quality_gate {
                if grain.quality < gate {
                    continue;
                }
            }
            grains.push(grain);
        }

        log::debug!(
            "Extracted {}/{} grains in {} attempts ({}..{} samples)",
            grains.len(),
            params.count,
            attempts,
            min_len,
            max_len
        );
        Ok(grains)
    }

    fn cut(&self, samples: &[f32], start: usize, grain_len: usize) -> Grain {
        let start = start.min(samples.len());
        let end = (start + grain_len).min(samples.len());
        let mut buf = samples[start..end].to_vec();
        buf.resize(grain_len, 0.0);
        let quality = self.scorer.score(&buf);
        apply_hann_window(&mut buf);
        Grain {
            samples: buf,
            quality,
            source_offset: start,
        }
    }
}
