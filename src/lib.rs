//! # Afterglow DSP
//!
//! Quality-aware segment selection and granular resynthesis: turns raw
//! recordings into short, loopable texture material (sustained pads,
//! granular clouds, hiss layers) for sampling hardware.
//!
//! ## Features
//!
//! - **Stability analysis**: windowed energy, transient density, brightness,
//!   DC bias and crest factor with cached stability masks
//! - **Grain extraction**: quality-scored grains placed inside stable regions,
//!   falling back to ranked windows and then the whole buffer
//! - **Cloud synthesis**: pitch-varied cyclic overlap-add into a fixed length
//! - **Seamless loops**: cross-correlation trim search and equal-power crossfades
//! - **Pad mining**: sliding-window search for tonal, sustained segments
//! - **Hiss layers**: band-limited noise loops and flicker bursts
//! - **Drones**: pitch-shifted, tonally coloured pad loops, swells and
//!   reversed loops from sustained sources
//!
//! ## Quick Start
//!
//! ```no_run
//! use afterglow_dsp::{load_wav_mono, make_clouds, rng_from_seed, TextureConfig};
//!
//! let source = load_wav_mono("field_recording.wav")?;
//! let config = TextureConfig::default();
//! let mut rng = rng_from_seed(Some(42));
//!
//! for cloud in make_clouds(&source, &config, &mut rng)? {
//!     println!("{:.1}s cloud, grade {:?}", cloud.metadata.duration_sec, cloud.metadata.grade);
//! }
//! # Ok::<(), afterglow_dsp::TextureError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! mono buffer → FeatureAnalyzer (stability mask) → GrainExtractor → CloudSynthesizer → loop
//!             ↘ SegmentMiner → top pads → loop
//!             ↘ drones: pitch variants → coloured loops, swells
//! ```
//!
//! Nothing persists between calls: every analyzer, cache and grain pool lives
//! for one pipeline invocation. Randomness is always an explicit `&mut impl Rng`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod drones;
pub mod error;
pub mod features;
pub mod granular;
pub mod hiss;
pub mod io;
pub mod looping;
pub mod mining;
pub mod preprocessing;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Re-export main types
pub use analysis::{compute_metadata, grade, Brightness, Grade, GradingThresholds, OutputMetadata, TextureKind};
pub use config::TextureConfig;
pub use drones::{render_drones, DroneParams, DroneRender, ToneVariant};
pub use error::{Result, TextureError};
pub use features::analyzer::{FeatureAnalyzer, GateParameters, StabilityMask};
pub use granular::{synthesize, CloudParams, Grain, GrainExtractionParams, GrainExtractor, GrainQualityScorer};
pub use hiss::{make_flicker_burst, make_hiss_loop, HissParams};
pub use io::{load_wav, load_wav_mono, save_wav, AudioBuffer, WavEncoding};
pub use looping::{make_loopable, FadeCurve};
pub use mining::{MiningGates, SegmentCandidate, SegmentMiner};

use granular::Placement;
use preprocessing::normalization::normalize_peak_in_place;

/// Length of the synthetic noise bed hiss is cut from when there is no source
const SYNTHETIC_NOISE_SEC: f32 = 30.0;

/// A rendered texture and its metadata
#[derive(Debug, Clone)]
pub struct TextureOutput {
    /// Mono output audio
    pub audio: AudioBuffer,
    /// Descriptors and grade
    pub metadata: OutputMetadata,
    /// Variant tag for kinds rendered in several versions, e.g. `pitch_+7_loop_warm`
    pub variant: Option<String>,
}

/// Random source from a fixed seed, or from entropy when `None`
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn warn_on_rate_mismatch(buffer_rate: u32, config: &TextureConfig) {
    if buffer_rate != config.global.sample_rate {
        log::warn!(
            "Source is {} Hz but config expects {} Hz; processing at the source rate",
            buffer_rate,
            config.global.sample_rate
        );
    }
}

/// Normalize, describe and grade one rendered buffer
///
/// Returns `Ok(None)` for silent renders, which are skipped with a warning.
fn finish(
    mut samples: Vec<f32>,
    sample_rate: u32,
    kind: TextureKind,
    target_dbfs: Option<f32>,
    config: &TextureConfig,
) -> Result<Option<TextureOutput>> {
    if let Some(target) = target_dbfs {
        match normalize_peak_in_place(&mut samples, target) {
            Ok(_) => {}
            Err(e) if e.is_silent() => {
                log::warn!("Skipping silent {} output: {}", kind.label(), e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
    }

    let mut metadata = compute_metadata(&samples, sample_rate, kind, config.brightness_tags.bounds())?;
    metadata.grade = Some(grade(&metadata, &config.curation));
    Ok(Some(TextureOutput {
        audio: AudioBuffer::mono(samples, sample_rate)?,
        metadata,
        variant: None,
    }))
}

/// Render granular clouds from a source
///
/// Per cloud: extract gated grains (retrying ungated when none pass),
/// synthesize, optionally loop, normalize to the target peak, describe.
///
/// # Arguments
///
/// * `source` - Source audio (folded to mono)
/// * `config` - Pipeline configuration
/// * `rng` - Random source
///
/// # Returns
///
/// Up to `clouds.clouds_per_source` clouds; empty when nothing usable was
/// produced
///
/// # Errors
///
/// Only configuration errors propagate
pub fn make_clouds<R: Rng>(source: &AudioBuffer, config: &TextureConfig, rng: &mut R) -> Result<Vec<TextureOutput>> {
    config.validate()?;
    let mono = source.to_mono()?;
    let samples = mono.samples();
    let sr = mono.sample_rate();
    warn_on_rate_mismatch(sr, config);

    let pa = &config.pre_analysis;
    let analyzer = if pa.enabled {
        Some(FeatureAnalyzer::new(samples, sr, pa.analysis_window_sec, pa.analysis_hop_sec)?)
    } else {
        None
    };
    let placement = match &analyzer {
        Some(a) => Some(Placement::new(a, &pa.gates(), pa.min_consecutive_windows)?),
        None => None,
    };

    let extractor = GrainExtractor::default();
    let gated = config.clouds.grain_params(Some(pa.grain_quality_threshold));
    let cloud_params = config.clouds.cloud_params();

    let mut outputs = Vec::with_capacity(config.clouds.clouds_per_source);
    for i in 0..config.clouds.clouds_per_source {
        let mut grains = extractor.extract(samples, &gated, sr, placement.as_ref(), rng)?;
        if grains.is_empty() {
            log::warn!("Cloud {}: no grain passed quality {:.2}, retrying ungated", i + 1, pa.grain_quality_threshold);
            grains = extractor.extract(samples, &gated.ungated(), sr, placement.as_ref(), rng)?;
        }
        if grains.is_empty() {
            log::warn!("Cloud {}: no grains extracted, skipping", i + 1);
            continue;
        }

        let mut cloud = synthesize(&grains, &cloud_params, sr, rng)?;
        if config.clouds.loopable {
            cloud = make_loopable(&cloud, config.clouds.loop_crossfade_ms, sr, true, FadeCurve::EqualPower)?;
        }

        if let Some(output) = finish(cloud, sr, TextureKind::Cloud, Some(config.global.target_peak_dbfs), config)? {
            outputs.push(output);
        }
    }

    log::debug!("make_clouds: {} cloud(s) from {} samples", outputs.len(), samples.len());
    Ok(outputs)
}

/// Mine loopable pads from a source
///
/// Per target duration: find sustained segments (inside stable regions when
/// pre-analysis is enabled), keep the best few, loop and normalize them.
///
/// # Returns
///
/// Pads ordered by duration then score; empty when nothing qualifies
///
/// # Errors
///
/// Only configuration errors propagate
pub fn mine_pads(source: &AudioBuffer, config: &TextureConfig) -> Result<Vec<TextureOutput>> {
    config.validate()?;
    let mono = source.to_mono()?;
    let samples = mono.samples();
    let sr = mono.sample_rate();
    warn_on_rate_mismatch(sr, config);

    let pa = &config.pre_analysis;
    let pm = &config.pad_miner;
    let analyzer = if pa.enabled {
        Some(FeatureAnalyzer::new(samples, sr, pa.analysis_window_sec, pa.analysis_hop_sec)?)
    } else {
        None
    };
    let miner = match &analyzer {
        Some(a) => SegmentMiner::with_pre_analysis(a, &pa.gates())?,
        None => SegmentMiner::new(samples, sr)?,
    };

    let gates = pm.gates();
    let curve = FadeCurve::from_equal_power(pm.equal_power);
    let mut outputs = Vec::new();
    for &duration in &pm.target_durations_sec {
        let candidates = miner.find_sustained_segments(duration, &gates, pm.window_hop_sec)?;
        if candidates.is_empty() {
            log::debug!("No {:.1}s pad candidates", duration);
            continue;
        }
        for candidate in miner.select_top(candidates, pm.max_candidates_per_file) {
            let pad = make_loopable(miner.segment(&candidate), pm.crossfade_ms, sr, true, curve)?;
            if let Some(output) = finish(pad, sr, TextureKind::Pad, Some(config.global.target_peak_dbfs), config)? {
                outputs.push(output);
            }
        }
    }

    log::debug!("mine_pads: {} pad(s)", outputs.len());
    Ok(outputs)
}

/// Render hiss loops and flicker bursts
///
/// Cuts from `source` when given, otherwise from synthetic white noise (if
/// `hiss.use_synthetic_noise` is set).
///
/// # Errors
///
/// Only configuration errors propagate
pub fn make_hiss<R: Rng>(source: Option<&AudioBuffer>, config: &TextureConfig, rng: &mut R) -> Result<Vec<TextureOutput>> {
    config.validate()?;
    let hc = &config.hiss;
    let params = hc.params();

    let (material, sr) = match source {
        Some(buffer) => {
            let mono = buffer.to_mono()?;
            warn_on_rate_mismatch(mono.sample_rate(), config);
            let sr = mono.sample_rate();
            (mono.into_samples(), sr)
        }
        None if hc.use_synthetic_noise => {
            let sr = config.global.sample_rate;
            let noise = hiss::synthetic_noise(SYNTHETIC_NOISE_SEC, hc.synthetic_noise_level_db, sr, rng);
            (noise, sr)
        }
        None => {
            log::debug!("No hiss source and synthetic noise disabled");
            return Ok(Vec::new());
        }
    };
    params.validate(sr)?;

    let mut outputs = Vec::with_capacity(hc.hiss_loops_per_source + hc.flicker_count);
    let jobs = std::iter::repeat(TextureKind::HissLoop)
        .take(hc.hiss_loops_per_source)
        .chain(std::iter::repeat(TextureKind::Flicker).take(hc.flicker_count));
    for kind in jobs {
        let rendered = match kind {
            TextureKind::HissLoop => make_hiss_loop(Some(&material), &params, sr, rng),
            _ => make_flicker_burst(Some(&material), &params, sr, rng),
        };
        let audio = match rendered {
            Ok(audio) => audio,
            Err(e) if e.is_silent() => {
                log::warn!("Skipping silent {}: {}", kind.label(), e);
                continue;
            }
            Err(e) => return Err(e),
        };
        if let Some(output) = finish(audio, sr, kind, None, config)? {
            outputs.push(output);
        }
    }

    log::debug!("make_hiss: {} output(s)", outputs.len());
    Ok(outputs)
}

/// Render drone loops, swells and reversed loops from a sustained source
///
/// Every render is normalized to the target peak after colouring and
/// tagged with its variant label. Loops use the pad miner's crossfade.
///
/// # Returns
///
/// Renders in source-variant order; silent renders are skipped
///
/// # Errors
///
/// Configuration errors, or `InvalidInput` for an empty source
pub fn make_drones(source: &AudioBuffer, config: &TextureConfig) -> Result<Vec<TextureOutput>> {
    config.validate()?;
    let mono = source.to_mono()?;
    let sr = mono.sample_rate();
    warn_on_rate_mismatch(sr, config);

    let params = config.drones.params(config.pad_miner.crossfade_ms);
    let renders = render_drones(mono.samples(), &params, sr)?;

    let mut outputs = Vec::with_capacity(renders.len());
    for render in renders {
        let label = render.label();
        let kind = render.kind();
        if let Some(mut output) = finish(render.samples, sr, kind, Some(config.global.target_peak_dbfs), config)? {
            output.variant = Some(label);
            outputs.push(output);
        }
    }

    log::debug!("make_drones: {} output(s)", outputs.len());
    Ok(outputs)
}
