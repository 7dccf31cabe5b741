//! Configuration for the texture pipelines
//!
//! One [`TextureConfig`] carries every threshold. Each section defaults
//! independently, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! [clouds]
//! grains_per_cloud = 120
//! lowpass_hz = 6000.0
//!
//! [reproducibility]
//! random_seed = 42
//! ```
//!
//! [`TextureConfig::validate`] checks every bound once, so the processing
//! code never has to clamp configuration values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::GradingThresholds;
use crate::drones::{DroneParams, ToneVariant};
use crate::error::{Result, TextureError};
use crate::features::analyzer::GateParameters;
use crate::granular::{CloudParams, GrainExtractionParams};
use crate::hiss::HissParams;
use crate::io::WavEncoding;
use crate::mining::MiningGates;
use crate::preprocessing::filters::FilterKind;

/// Output format settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Processing and output sample rate in Hz (default: 44100)
    pub sample_rate: u32,
    /// Peak level of every output (default: -1.0 dBFS)
    pub target_peak_dbfs: f32,
    /// 16, 24 or 32 (float) (default: 24)
    pub output_bit_depth: u16,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            target_peak_dbfs: -1.0,
            output_bit_depth: 24,
        }
    }
}

/// Windowed stability analysis and grain quality gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreAnalysisConfig {
    /// Use the stability mask for grain placement and pad mining
    pub enabled: bool,
    /// Analysis window (default: 1.0 s)
    pub analysis_window_sec: f32,
    /// Analysis hop (default: 0.5 s, 0 = non-overlapping)
    pub analysis_hop_sec: f32,
    /// Onsets per second allowed in a stable window
    pub max_onset_rate_hz: f32,
    /// Quietest stable window (dB)
    pub min_rms_db: f32,
    /// Loudest stable window (dB)
    pub max_rms_db: f32,
    /// Largest DC offset in a stable window
    pub max_dc_offset: f32,
    /// Largest peak / RMS in a stable window
    pub max_crest_factor: f32,
    /// Minimum grain score (default: 0.4)
    pub grain_quality_threshold: f32,
    /// Shortest stable run used for grain placement (windows)
    pub min_consecutive_windows: usize,
}

impl Default for PreAnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            analysis_window_sec: 1.0,
            analysis_hop_sec: 0.5,
            max_onset_rate_hz: 3.0,
            min_rms_db: -40.0,
            max_rms_db: -10.0,
            max_dc_offset: 0.1,
            max_crest_factor: 10.0,
            grain_quality_threshold: 0.4,
            min_consecutive_windows: 2,
        }
    }
}

impl PreAnalysisConfig {
    /// Stability gates for the analyzer
    pub fn gates(&self) -> GateParameters {
        GateParameters {
            min_energy_db: self.min_rms_db,
            max_energy_db: self.max_rms_db,
            max_bias: self.max_dc_offset,
            max_peak_ratio: self.max_crest_factor,
            max_onset_rate: self.max_onset_rate_hz,
            brightness_hz: None,
        }
    }
}

/// Sustained pad mining
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadMinerConfig {
    /// One mining pass per duration (default: [2.0])
    pub target_durations_sec: Vec<f32>,
    /// Quietest pad (dB)
    pub min_rms_db: f32,
    /// Loudest pad (dB)
    pub max_rms_db: f32,
    /// Onsets per second allowed in a pad
    pub max_onset_rate_per_second: f32,
    /// Highest mean spectral flatness (lower = more tonal)
    pub spectral_flatness_threshold: f32,
    /// Pads kept per duration
    pub max_candidates_per_file: usize,
    /// Loop crossfade (default: 100 ms)
    pub crossfade_ms: f32,
    /// Mining slide step (default: 0.5 s)
    pub window_hop_sec: f32,
    /// Equal-power (true) or linear loop crossfade
    pub equal_power: bool,
}

impl Default for PadMinerConfig {
    fn default() -> Self {
        Self {
            target_durations_sec: vec![2.0],
            min_rms_db: -40.0,
            max_rms_db: -10.0,
            max_onset_rate_per_second: 3.0,
            spectral_flatness_threshold: 0.5,
            max_candidates_per_file: 3,
            crossfade_ms: 100.0,
            window_hop_sec: 0.5,
            equal_power: true,
        }
    }
}

impl PadMinerConfig {
    /// Per-segment mining gates
    pub fn gates(&self) -> MiningGates {
        MiningGates {
            min_energy_db: self.min_rms_db,
            max_energy_db: self.max_rms_db,
            max_onset_rate: self.max_onset_rate_per_second,
            max_flatness: self.spectral_flatness_threshold,
        }
    }
}

/// Granular clouds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudsConfig {
    /// Shortest grain (default: 50 ms)
    pub grain_length_min_ms: f32,
    /// Longest grain (default: 150 ms)
    pub grain_length_max_ms: f32,
    /// Grain pool size per cloud
    pub grains_per_cloud: usize,
    /// Cloud length (default: 6.0 s)
    pub cloud_duration_sec: f32,
    /// Lowest per-grain shift (semitones)
    pub min_pitch_shift_semitones: f32,
    /// Highest per-grain shift (semitones)
    pub max_pitch_shift_semitones: f32,
    /// Grain overlap in [0, 1)
    pub overlap_ratio: f32,
    /// Post low-pass cutoff in Hz; 0 disables the filter (default: 8000)
    pub lowpass_hz: f32,
    /// Edge fade (default: 50 ms)
    pub fade_ms: f32,
    /// Clouds rendered per source
    pub clouds_per_source: usize,
    /// Make clouds loopable
    pub loopable: bool,
    /// Loop crossfade when loopable (default: 50 ms)
    pub loop_crossfade_ms: f32,
}

impl Default for CloudsConfig {
    fn default() -> Self {
        Self {
            grain_length_min_ms: 50.0,
            grain_length_max_ms: 150.0,
            grains_per_cloud: 200,
            cloud_duration_sec: 6.0,
            min_pitch_shift_semitones: -7.0,
            max_pitch_shift_semitones: 7.0,
            overlap_ratio: 0.65,
            lowpass_hz: 8000.0,
            fade_ms: 50.0,
            clouds_per_source: 2,
            loopable: false,
            loop_crossfade_ms: 50.0,
        }
    }
}

impl CloudsConfig {
    /// Extraction parameters, gated at `quality_gate`
    pub fn grain_params(&self, quality_gate: Option<f32>) -> GrainExtractionParams {
        GrainExtractionParams {
            min_len_ms: self.grain_length_min_ms,
            max_len_ms: self.grain_length_max_ms,
            count: self.grains_per_cloud,
            quality_gate,
        }
    }

    /// Synthesis parameters
    pub fn cloud_params(&self) -> CloudParams {
        CloudParams {
            duration_sec: self.cloud_duration_sec,
            overlap_ratio: self.overlap_ratio,
            pitch_range: (self.min_pitch_shift_semitones, self.max_pitch_shift_semitones),
            lowpass_hz: (self.lowpass_hz > 0.0).then_some(self.lowpass_hz),
            fade_ms: self.fade_ms,
        }
    }
}

/// Hiss loops and flicker bursts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HissConfig {
    /// Hiss loop length (default: 1.5 s)
    pub loop_duration_sec: f32,
    /// High-pass cutoff when not band-passing
    pub highpass_hz: f32,
    /// Band-pass low edge
    pub band_low_hz: f32,
    /// Band-pass high edge
    pub band_high_hz: f32,
    /// Band-pass (true) or high-pass
    pub use_bandpass: bool,
    /// Tremolo rate (Hz)
    pub tremolo_rate_hz: f32,
    /// Tremolo depth in [0, 1]
    pub tremolo_depth: f32,
    /// Hiss loops per source
    pub hiss_loops_per_source: usize,
    /// Shortest flicker (ms)
    pub flicker_min_ms: f32,
    /// Longest flicker (ms)
    pub flicker_max_ms: f32,
    /// Flicker bursts per source
    pub flicker_count: usize,
    /// Fall back to white noise when there is no source
    pub use_synthetic_noise: bool,
    /// Synthetic noise level (dB)
    pub synthetic_noise_level_db: f32,
}

impl Default for HissConfig {
    fn default() -> Self {
        Self {
            loop_duration_sec: 1.5,
            highpass_hz: 6000.0,
            band_low_hz: 4000.0,
            band_high_hz: 14000.0,
            use_bandpass: true,
            tremolo_rate_hz: 3.0,
            tremolo_depth: 0.6,
            hiss_loops_per_source: 2,
            flicker_min_ms: 50.0,
            flicker_max_ms: 300.0,
            flicker_count: 4,
            use_synthetic_noise: true,
            synthetic_noise_level_db: -10.0,
        }
    }
}

impl HissConfig {
    /// Hiss generator parameters
    pub fn params(&self) -> HissParams {
        let filter = if self.use_bandpass {
            FilterKind::BandPass {
                low_hz: self.band_low_hz,
                high_hz: self.band_high_hz,
            }
        } else {
            FilterKind::HighPass {
                cutoff_hz: self.highpass_hz,
            }
        };
        HissParams {
            loop_duration_sec: self.loop_duration_sec,
            filter,
            tremolo_rate_hz: self.tremolo_rate_hz,
            tremolo_depth: self.tremolo_depth,
            flicker_min_ms: self.flicker_min_ms,
            flicker_max_ms: self.flicker_max_ms,
            synthetic_noise_level_db: self.synthetic_noise_level_db,
        }
    }
}

/// Drone loops and swells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DronesConfig {
    /// Loop length (default: 2.0 s)
    pub pad_loop_duration_sec: f32,
    /// Loop colours (default: warm, airy, dark)
    pub pad_variants: Vec<ToneVariant>,
    /// Warm low-pass cutoff (Hz)
    pub warm_lowpass_hz: f32,
    /// Airy high-pass cutoff (Hz)
    pub airy_highpass_hz: f32,
    /// Dark high-cut (Hz)
    pub dark_high_cut_hz: f32,
    /// Swell length (default: 6.0 s)
    pub swell_duration_sec: f32,
    /// Swell fade in (s)
    pub fade_in_sec: f32,
    /// Swell fade out (s)
    pub fade_out_sec: f32,
    /// Source shifts in semitones; 0 keeps the original
    pub pitch_shift_semitones: Vec<f32>,
    /// Also render reversed loops
    pub enable_reversal: bool,
}

impl Default for DronesConfig {
    fn default() -> Self {
        let d = DroneParams::default();
        Self {
            pad_loop_duration_sec: d.pad_loop_duration_sec,
            pad_variants: d.variants,
            warm_lowpass_hz: d.warm_lowpass_hz,
            airy_highpass_hz: d.airy_highpass_hz,
            dark_high_cut_hz: d.dark_high_cut_hz,
            swell_duration_sec: d.swell_duration_sec,
            fade_in_sec: d.fade_in_sec,
            fade_out_sec: d.fade_out_sec,
            pitch_shift_semitones: d.pitch_shift_semitones,
            enable_reversal: d.enable_reversal,
        }
    }
}

impl DronesConfig {
    /// Drone parameters, looping with `loop_crossfade_ms`
    pub fn params(&self, loop_crossfade_ms: f32) -> DroneParams {
        DroneParams {
            pad_loop_duration_sec: self.pad_loop_duration_sec,
            variants: self.pad_variants.clone(),
            warm_lowpass_hz: self.warm_lowpass_hz,
            airy_highpass_hz: self.airy_highpass_hz,
            dark_high_cut_hz: self.dark_high_cut_hz,
            swell_duration_sec: self.swell_duration_sec,
            fade_in_sec: self.fade_in_sec,
            fade_out_sec: self.fade_out_sec,
            pitch_shift_semitones: self.pitch_shift_semitones.clone(),
            enable_reversal: self.enable_reversal,
            loop_crossfade_ms,
        }
    }
}

/// Brightness tagging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrightnessConfig {
    /// Tag outputs dark / mid / bright
    pub enabled: bool,
    /// Dark below this centroid (Hz)
    pub centroid_low_hz: f32,
    /// Bright above this centroid (Hz)
    pub centroid_high_hz: f32,
}

impl Default for BrightnessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            centroid_low_hz: 1500.0,
            centroid_high_hz: 3500.0,
        }
    }
}

impl BrightnessConfig {
    /// `(low, high)` bounds when tagging is enabled
    pub fn bounds(&self) -> Option<(f32, f32)> {
        self.enabled.then_some((self.centroid_low_hz, self.centroid_high_hz))
    }
}

/// Random seed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReproducibilityConfig {
    /// Fixed seed, or entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    /// Output format
    pub global: GlobalConfig,
    /// Stability analysis
    pub pre_analysis: PreAnalysisConfig,
    /// Pad mining
    pub pad_miner: PadMinerConfig,
    /// Granular clouds
    pub clouds: CloudsConfig,
    /// Hiss layers
    pub hiss: HissConfig,
    /// Drone loops and swells
    pub drones: DronesConfig,
    /// Brightness tagging
    pub brightness_tags: BrightnessConfig,
    /// Grading thresholds
    pub curation: GradingThresholds,
    /// Random seed
    pub reproducibility: ReproducibilityConfig,
}

impl TextureConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// `Config` for malformed TOML, `InvalidParameter` for out-of-range values
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| TextureError::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read, otherwise as [`Self::from_toml_str`]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded config from {}", path.as_ref().display());
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML
    ///
    /// # Errors
    ///
    /// `Config` if serialization fails
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TextureError::Config(format!("Cannot serialize config: {}", e)))
    }

    /// WAV encoding for outputs
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for an unsupported bit depth
    pub fn output_encoding(&self) -> Result<WavEncoding> {
        WavEncoding::from_bit_depth(self.global.output_bit_depth)
    }

    /// Check every bound
    ///
    /// # Errors
    ///
    /// `InvalidParameter` naming the first offending value
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(TextureError::InvalidParameter(msg));
        let g = &self.global;
        if g.sample_rate == 0 {
            return invalid("global.sample_rate must be > 0".to_string());
        }
        if !(g.target_peak_dbfs <= 0.0) {
            return invalid(format!(
                "global.target_peak_dbfs must be <= 0, got {}",
                g.target_peak_dbfs
            ));
        }
        self.output_encoding()?;

        let pa = &self.pre_analysis;
        if !(pa.analysis_window_sec > 0.0) || !(pa.analysis_hop_sec >= 0.0) {
            return invalid(format!(
                "pre_analysis window/hop must be > 0 / >= 0, got {} / {}",
                pa.analysis_window_sec, pa.analysis_hop_sec
            ));
        }
        pa.gates().validate()?;
        if !(0.0..=1.0).contains(&pa.grain_quality_threshold) {
            return invalid(format!(
                "pre_analysis.grain_quality_threshold must be in [0, 1], got {}",
                pa.grain_quality_threshold
            ));
        }
        if pa.min_consecutive_windows == 0 {
            return invalid("pre_analysis.min_consecutive_windows must be >= 1".to_string());
        }

        let pm = &self.pad_miner;
        if pm.target_durations_sec.iter().any(|&d| !(d > 0.0)) {
            return invalid(format!(
                "pad_miner.target_durations_sec must all be > 0, got {:?}",
                pm.target_durations_sec
            ));
        }
        if !(pm.window_hop_sec > 0.0) || !(pm.crossfade_ms >= 0.0) {
            return invalid(format!(
                "pad_miner hop must be > 0 and crossfade >= 0, got {} / {}",
                pm.window_hop_sec, pm.crossfade_ms
            ));
        }
        pm.gates().validate()?;

        let c = &self.clouds;
        c.grain_params(Some(pa.grain_quality_threshold)).validate()?;
        c.cloud_params().validate()?;
        if !(c.loop_crossfade_ms >= 0.0) {
            return invalid(format!(
                "clouds.loop_crossfade_ms must be >= 0, got {}",
                c.loop_crossfade_ms
            ));
        }
        if !(c.lowpass_hz >= 0.0) || c.lowpass_hz >= g.sample_rate as f32 / 2.0 {
            return invalid(format!(
                "clouds.lowpass_hz must be 0 (off) or below Nyquist, got {}",
                c.lowpass_hz
            ));
        }

        self.hiss.params().validate(g.sample_rate)?;
        self.drones.params(pm.crossfade_ms).validate(g.sample_rate)?;

        let b = &self.brightness_tags;
        if !(b.centroid_low_hz < b.centroid_high_hz) {
            return invalid(format!(
                "brightness_tags bounds inverted: {} >= {}",
                b.centroid_low_hz, b.centroid_high_hz
            ));
        }
        Ok(())
    }
}
