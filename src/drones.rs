//! Drone loops and swells
//!
//! Turns a sustained source into a family of pad material. Each source
//! variant (the original plus tape-speed pitch shifts) yields:
//! - one centre loop per tonal colour: warm (low-pass), airy (high-pass),
//!   dark (steep low-pass)
//! - a swell: the centre region with a long fade in and a longer fade out
//! - optionally the loop played backwards
//!
//! Levels are left alone here; the pipeline normalizes every render.
//!
//! # Example
//!
//! ```no_run
//! use afterglow_dsp::drones::{render_drones, DroneParams};
//!
//! let source = vec![0.2f32; 44100 * 8];
//! for render in render_drones(&source, &DroneParams::default(), 44100)? {
//!     println!("{} ({} samples)", render.label(), render.samples.len());
//! }
//! # Ok::<(), afterglow_dsp::TextureError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::analysis::TextureKind;
use crate::error::{Result, TextureError};
use crate::granular::pitch::{resample, semitones_to_ratio};
use crate::looping::{make_loopable, FadeCurve};
use crate::preprocessing::envelope::{fade_in, fade_out};
use crate::preprocessing::filters::{apply_filter, FilterKind};

/// Largest shift tape-speed resampling can reach in either direction
pub const MAX_SHIFT_SEMITONES: f32 = 12.0;

/// Tonal colour of a drone loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneVariant {
    /// Gentle low-pass
    Warm,
    /// High-pass, keeps the air
    Airy,
    /// Steep, low high-cut
    Dark,
}

impl ToneVariant {
    /// File-name friendly label
    pub fn label(&self) -> &'static str {
        match self {
            ToneVariant::Warm => "warm",
            ToneVariant::Airy => "airy",
            ToneVariant::Dark => "dark",
        }
    }
}

/// Drone settings
#[derive(Debug, Clone, PartialEq)]
pub struct DroneParams {
    /// Loop length in seconds
    pub pad_loop_duration_sec: f32,
    /// Colours rendered per loop
    pub variants: Vec<ToneVariant>,
    /// Warm low-pass cutoff (Hz)
    pub warm_lowpass_hz: f32,
    /// Airy high-pass cutoff (Hz)
    pub airy_highpass_hz: f32,
    /// Dark high-cut (Hz)
    pub dark_high_cut_hz: f32,
    /// Swell length in seconds
    pub swell_duration_sec: f32,
    /// Swell fade in (s)
    pub fade_in_sec: f32,
    /// Swell fade out (s)
    pub fade_out_sec: f32,
    /// Source shifts; 0 stands for the unshifted original
    pub pitch_shift_semitones: Vec<f32>,
    /// Also render each loop backwards
    pub enable_reversal: bool,
    /// Loop crossfade (ms)
    pub loop_crossfade_ms: f32,
}

impl Default for DroneParams {
    fn default() -> Self {
        Self {
            pad_loop_duration_sec: 2.0,
            variants: vec![ToneVariant::Warm, ToneVariant::Airy, ToneVariant::Dark],
            warm_lowpass_hz: 3000.0,
            airy_highpass_hz: 6000.0,
            dark_high_cut_hz: 1500.0,
            swell_duration_sec: 6.0,
            fade_in_sec: 0.5,
            fade_out_sec: 1.5,
            pitch_shift_semitones: vec![0.0, 7.0, 12.0],
            enable_reversal: true,
            loop_crossfade_ms: 100.0,
        }
    }
}

impl DroneParams {
    /// Check ranges against `sample_rate`
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for non-positive durations, negative fades, a
    /// cutoff outside (0, Nyquist) or a shift beyond ±12 semitones
    pub fn validate(&self, sample_rate: u32) -> Result<()> {
        let invalid = |msg: String| Err(TextureError::InvalidParameter(msg));
        if sample_rate == 0 {
            return invalid("Sample rate must be > 0".to_string());
        }
        for (name, sec) in [
            ("pad_loop_duration_sec", self.pad_loop_duration_sec),
            ("swell_duration_sec", self.swell_duration_sec),
        ] {
            if !(sec > 0.0) || !sec.is_finite() {
                return invalid(format!("Drone {} must be > 0, got {}", name, sec));
            }
        }
        if !(self.fade_in_sec >= 0.0) || !(self.fade_out_sec >= 0.0) || !(self.loop_crossfade_ms >= 0.0) {
            return invalid(format!(
                "Drone fades must be >= 0, got in {} s, out {} s, loop {} ms",
                self.fade_in_sec, self.fade_out_sec, self.loop_crossfade_ms
            ));
        }
        let nyquist = sample_rate as f32 / 2.0;
        for (name, hz) in [
            ("warm_lowpass_hz", self.warm_lowpass_hz),
            ("airy_highpass_hz", self.airy_highpass_hz),
            ("dark_high_cut_hz", self.dark_high_cut_hz),
        ] {
            if !(hz > 0.0) || hz >= nyquist {
                return invalid(format!(
                    "Drone {} must be in (0, {}) Hz, got {}",
                    name, nyquist, hz
                ));
            }
        }
        if let Some(&s) = self
            .pitch_shift_semitones
            .iter()
            .find(|s| !s.is_finite() || s.abs() > MAX_SHIFT_SEMITONES)
        {
            return invalid(format!(
                "Drone pitch shift must be within ±{} semitones, got {}",
                MAX_SHIFT_SEMITONES, s
            ));
        }
        Ok(())
    }

    fn filter_for(&self, variant: ToneVariant) -> FilterKind {
        match variant {
            ToneVariant::Warm => FilterKind::LowPass {
                cutoff_hz: self.warm_lowpass_hz,
            },
            ToneVariant::Airy => FilterKind::HighPass {
                cutoff_hz: self.airy_highpass_hz,
            },
            ToneVariant::Dark => FilterKind::LowPass {
                cutoff_hz: self.dark_high_cut_hz,
            },
        }
    }
}

/// What a drone render is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DroneRole {
    /// Coloured loop
    Loop(ToneVariant),
    /// Faded one-shot
    Swell,
    /// Backwards loop
    Reversed,
}

/// One rendered drone buffer
#[derive(Debug, Clone)]
pub struct DroneRender {
    /// `original` or `pitch_+7` style source tag
    pub source_variant: String,
    /// Loop colour, swell or reversed
    pub role: DroneRole,
    /// Unnormalized samples
    pub samples: Vec<f32>,
}

impl DroneRender {
    /// Name suffix such as `pitch_+7_loop_warm` or `original_swell`
    pub fn label(&self) -> String {
        match self.role {
            DroneRole::Loop(v) => format!("{}_loop_{}", self.source_variant, v.label()),
            DroneRole::Swell => format!("{}_swell", self.source_variant),
            DroneRole::Reversed => format!("{}_reversed", self.source_variant),
        }
    }

    /// Metadata kind: swells are one-shots, everything else is a pad
    pub fn kind(&self) -> TextureKind {
        match self.role {
            DroneRole::Swell => TextureKind::Swell,
            _ => TextureKind::Pad,
        }
    }
}

/// The centred `len` samples, or everything when the buffer is shorter
pub fn centre_slice(samples: &[f32], len: usize) -> &[f32] {
    if samples.len() <= len {
        return samples;
    }
    let start = (samples.len() - len) / 2;
    &samples[start..start + len]
}

/// The original plus one tape-speed shifted copy per nonzero shift
///
/// Only the centre region the loop and swell draw from is resampled. A
/// shift the resampler rejects is skipped with a warning.
pub fn source_variants(samples: &[f32], params: &DroneParams, sample_rate: u32) -> Vec<(String, Vec<f32>)> {
    let sr = sample_rate as f32;
    let needed = (params.pad_loop_duration_sec.max(params.swell_duration_sec) * sr) as usize;

    let mut variants = vec![("original".to_string(), samples.to_vec())];
    for &semitones in params.pitch_shift_semitones.iter().filter(|&&s| s != 0.0) {
        let ratio = semitones_to_ratio(semitones);
        let span = centre_slice(samples, (needed as f64 / ratio).ceil() as usize);
        match resample(span, ratio) {
            Ok(shifted) => variants.push((format!("pitch_{:+}", semitones), shifted)),
            Err(e) => log::warn!("Skipping {:+} st drone variant: {}", semitones, e),
        }
    }
    variants
}

/// Colour a buffer
///
/// The dark variant runs its low-pass twice for a steeper slope.
///
/// # Errors
///
/// Propagates filter parameter errors
pub fn tonal_variant(samples: &[f32], variant: ToneVariant, params: &DroneParams, sample_rate: u32) -> Result<Vec<f32>> {
    let filter = params.filter_for(variant);
    let coloured = apply_filter(samples, filter, sample_rate)?;
    match variant {
        ToneVariant::Dark => apply_filter(&coloured, filter, sample_rate),
        _ => Ok(coloured),
    }
}

/// Centre loop of `pad_loop_duration_sec`, crossfaded to wrap
///
/// # Errors
///
/// Propagates loop parameter errors
pub fn make_pad_loop(samples: &[f32], params: &DroneParams, sample_rate: u32) -> Result<Vec<f32>> {
    let len = ((params.pad_loop_duration_sec * sample_rate as f32) as usize).max(1);
    make_loopable(
        centre_slice(samples, len),
        params.loop_crossfade_ms,
        sample_rate,
        false,
        FadeCurve::EqualPower,
    )
}

/// Centre region of `swell_duration_sec` with fades
///
/// Each fade is capped at half the swell, and the fade out gives way so
/// the two never overlap.
pub fn make_swell(samples: &[f32], params: &DroneParams, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f32;
    let len = ((params.swell_duration_sec * sr) as usize).max(1);
    let mut swell = centre_slice(samples, len).to_vec();

    let max_fade = swell.len() / 2;
    let fade_in_len = ((params.fade_in_sec * sr) as usize).min(max_fade);
    let fade_out_len = ((params.fade_out_sec * sr) as usize)
        .min(max_fade)
        .min(swell.len() - fade_in_len);
    fade_in(&mut swell, fade_in_len);
    fade_out(&mut swell, fade_out_len);
    swell
}

/// Render every drone for one source
///
/// # Arguments
///
/// * `samples` - Mono source
/// * `params` - Drone settings
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
///
/// Per source variant: one loop per colour, a swell, then the reversed
/// loop when enabled
///
/// # Errors
///
/// `InvalidParameter` for bad params, `InvalidInput` for an empty source
pub fn render_drones(samples: &[f32], params: &DroneParams, sample_rate: u32) -> Result<Vec<DroneRender>> {
    params.validate(sample_rate)?;
    if samples.is_empty() {
        return Err(TextureError::InvalidInput(
            "Cannot render drones from an empty source".to_string(),
        ));
    }

    let mut renders = Vec::new();
    for (source_variant, audio) in source_variants(samples, params, sample_rate) {
        let pad = make_pad_loop(&audio, params, sample_rate)?;
        for &variant in &params.variants {
            renders.push(DroneRender {
                source_variant: source_variant.clone(),
                role: DroneRole::Loop(variant),
                samples: tonal_variant(&pad, variant, params, sample_rate)?,
            });
        }

        renders.push(DroneRender {
            source_variant: source_variant.clone(),
            role: DroneRole::Swell,
            samples: make_swell(&audio, params, sample_rate),
        });

        if params.enable_reversal {
            let mut reversed = pad;
            reversed.reverse();
            renders.push(DroneRender {
                source_variant,
                role: DroneRole::Reversed,
                samples: reversed,
            });
        }
    }

    log::debug!("Drones: {} render(s) from {} samples", renders.len(), samples.len());
    Ok(renders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pitch::{estimate_pitch_hz, PITCH_MAX_HZ, PITCH_MIN_HZ};
    use crate::features::spectral::SpectralFeatures;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sine(freq: f32, seconds: f32) -> Vec<f32> {
        (0..(seconds * 44100.0) as usize)
            .map(|i| 0.4 * (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    fn noise(seconds: f32, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..(seconds * 44100.0) as usize)
            .map(|_| rng.gen_range(-0.5f32..0.5))
            .collect()
    }

    fn centroid(samples: &[f32]) -> f32 {
        SpectralFeatures::compute(samples, 44100)
            .unwrap()
            .mean_centroid(0, samples.len())
    }

    #[test]
    fn test_centre_slice() {
        let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();
        assert_eq!(centre_slice(&samples, 4), &[3.0, 4.0, 5.0, 6.0]);
        assert_eq!(centre_slice(&samples, 20).len(), 10);
    }

    #[test]
    fn test_octave_shift_doubles_pitch() {
        let params = DroneParams::default();
        let variants = source_variants(&sine(220.0, 3.0), &params, 44100);
        let labels: Vec<&str> = variants.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["original", "pitch_+7", "pitch_+12"]);

        let (_, octave) = &variants[2];
        // whole 3 s source fits inside the 12 s span an octave up needs
        assert!((octave.len() as i64 - 66150).abs() <= 1, "len {}", octave.len());
        let f0 = estimate_pitch_hz(octave, 44100, PITCH_MIN_HZ, PITCH_MAX_HZ).unwrap();
        assert!((f0 - 440.0).abs() < 5.0, "f0 {}", f0);
    }

    #[test]
    fn test_tonal_variants_order_brightness() {
        let params = DroneParams::default();
        let source = noise(2.0, 31);
        let warm = centroid(&tonal_variant(&source, ToneVariant::Warm, &params, 44100).unwrap());
        let airy = centroid(&tonal_variant(&source, ToneVariant::Airy, &params, 44100).unwrap());
        let dark = centroid(&tonal_variant(&source, ToneVariant::Dark, &params, 44100).unwrap());
        assert!(dark < warm, "dark {} warm {}", dark, warm);
        assert!(warm < airy, "warm {} airy {}", warm, airy);
        assert!(airy > 6000.0, "airy {}", airy);
    }

    #[test]
    fn test_swell_fades_from_and_to_silence() {
        let params = DroneParams::default();
        let swell = make_swell(&vec![0.5f32; 44100 * 10], &params, 44100);
        assert_eq!(swell.len(), 264_600);
        assert_eq!(swell[0], 0.0);
        assert_eq!(swell[swell.len() - 1], 0.0);
        // full level between the end of the fade in and the start of the fade out
        assert_eq!(swell[22050], 0.5);
        assert_eq!(swell[264_600 - 66150 - 1], 0.5);
        assert!(swell[264_600 - 33075] < 0.5);
    }

    #[test]
    fn test_short_swell_fades_never_overlap() {
        let params = DroneParams {
            fade_in_sec: 2.0,
            fade_out_sec: 2.0,
            ..DroneParams::default()
        };
        // 1 s source: both fades cap at half the swell
        let swell = make_swell(&vec![0.5f32; 44100], &params, 44100);
        assert_eq!(swell.len(), 44100);
        assert!(swell.iter().all(|&s| (0.0..=0.5).contains(&s)));
        assert!(swell[22049] > 0.45 || swell[22050] > 0.45);
    }

    #[test]
    fn test_render_counts_and_labels() {
        let source = sine(220.0, 8.0);
        let params = DroneParams::default();
        let renders = render_drones(&source, &params, 44100).unwrap();
        // 3 source variants x (3 colours + swell + reversed)
        assert_eq!(renders.len(), 15);
        let labels: Vec<String> = renders.iter().map(DroneRender::label).collect();
        assert_eq!(labels[0], "original_loop_warm");
        assert!(labels.contains(&"pitch_+7_swell".to_string()));
        assert!(labels.contains(&"pitch_+12_reversed".to_string()));
        let mut unique = labels.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), labels.len());

        let swells = renders.iter().filter(|r| r.kind() == TextureKind::Swell).count();
        assert_eq!(swells, 3);

        let without = DroneParams {
            enable_reversal: false,
            pitch_shift_semitones: vec![0.0],
            ..params
        };
        assert_eq!(render_drones(&source, &without, 44100).unwrap().len(), 4);
    }

    #[test]
    fn test_reversed_is_loop_backwards() {
        let source = noise(4.0, 32);
        let params = DroneParams {
            pitch_shift_semitones: vec![0.0],
            variants: vec![],
            ..DroneParams::default()
        };
        let renders = render_drones(&source, &params, 44100).unwrap();
        let reversed = renders.iter().find(|r| r.role == DroneRole::Reversed).unwrap();
        let mut pad = make_pad_loop(&source, &params, 44100).unwrap();
        pad.reverse();
        assert_eq!(reversed.samples, pad);
        // 2 s loop minus the 100 ms crossfade
        assert_eq!(pad.len(), 88200 - 4410);
    }

    #[test]
    fn test_invalid_params() {
        let bad_shift = DroneParams {
            pitch_shift_semitones: vec![0.0, 19.0],
            ..DroneParams::default()
        };
        assert!(bad_shift.validate(44100).is_err());
        let bad_cutoff = DroneParams {
            airy_highpass_hz: 30000.0,
            ..DroneParams::default()
        };
        assert!(bad_cutoff.validate(44100).is_err());
        let bad_duration = DroneParams {
            swell_duration_sec: 0.0,
            ..DroneParams::default()
        };
        assert!(matches!(
            render_drones(&[0.1; 1000], &bad_duration, 44100),
            Err(TextureError::InvalidParameter(_))
        ));
        assert!(matches!(
            render_drones(&[], &DroneParams::default(), 44100),
            Err(TextureError::InvalidInput(_))
        ));
    }
}
