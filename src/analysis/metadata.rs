//! Output metadata
//!
//! Lightweight descriptors attached to every rendered texture: levels,
//! brightness, a rough pitch for pads and swells, and how well the buffer
//! loops.

use serde::{Deserialize, Serialize};

use super::grading::Grade;
use crate::error::{Result, TextureError};
use crate::features::levels::{peak, rms, rms_db};
use crate::features::pitch::{estimate_pitch_hz, PITCH_MAX_HZ, PITCH_MIN_HZ};
use crate::features::spectral::SpectralFeatures;
use crate::io::validate_samples;
use crate::looping::loop_seam_error_db;

/// RMS below this reports an infinite crest factor
const SILENT_RMS: f32 = 1e-9;

/// What a rendered buffer is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureKind {
    /// Mined sustained segment or drone loop
    Pad,
    /// Drone one-shot with long fades
    Swell,
    /// Granular cloud
    Cloud,
    /// Looping hiss layer
    HissLoop,
    /// Short hiss one-shot
    Flicker,
}

impl TextureKind {
    /// File-name friendly label
    pub fn label(&self) -> &'static str {
        match self {
            TextureKind::Pad => "pad",
            TextureKind::Swell => "swell",
            TextureKind::Cloud => "cloud",
            TextureKind::HissLoop => "hiss_loop",
            TextureKind::Flicker => "flicker",
        }
    }
}

/// Coarse brightness class from the mean spectral centroid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Brightness {
    /// Centroid below the low bound
    Dark,
    /// Centroid between the bounds
    Mid,
    /// Centroid above the high bound
    Bright,
}

impl Brightness {
    /// Classify a centroid against `(low_hz, high_hz)`
    pub fn classify(centroid_hz: f32, bounds: (f32, f32)) -> Self {
        let (low, high) = bounds;
        if centroid_hz < low {
            Brightness::Dark
        } else if centroid_hz > high {
            Brightness::Bright
        } else {
            Brightness::Mid
        }
    }

    /// File-name friendly label
    pub fn label(&self) -> &'static str {
        match self {
            Brightness::Dark => "dark",
            Brightness::Mid => "mid",
            Brightness::Bright => "bright",
        }
    }
}

/// Descriptors of one output buffer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputMetadata {
    /// Texture kind
    pub kind: TextureKind,
    /// Length in seconds
    pub duration_sec: f32,
    /// RMS level (dB, floored at -80)
    pub rms_db: f32,
    /// Absolute peak
    pub peak: f32,
    /// Peak / RMS (infinite when silent)
    pub crest_factor: f32,
    /// Mean spectral centroid (Hz)
    pub centroid_hz: f32,
    /// Dominant frequency, pads and swells only
    pub est_freq_hz: Option<f32>,
    /// Head-minus-tail level (dB)
    pub loop_error_db: Option<f32>,
    /// Brightness class when bounds were supplied
    pub brightness: Option<Brightness>,
    /// Grade, filled in by curation
    pub grade: Option<Grade>,
}

/// Compute metadata for a rendered buffer
///
/// # Arguments
///
/// * `samples` - Mono output buffer
/// * `sample_rate` - Sample rate in Hz
/// * `kind` - What the buffer is (pitch is only estimated for pads and swells)
/// * `brightness_bounds` - `(low_hz, high_hz)` for brightness tagging
///
/// # Errors
///
/// `InvalidParameter` for a zero sample rate, `InvalidInput` for empty or
/// non-finite samples
pub fn compute_metadata(
    samples: &[f32],
    sample_rate: u32,
    kind: TextureKind,
    brightness_bounds: Option<(f32, f32)>,
) -> Result<OutputMetadata> {
    if sample_rate == 0 {
        return Err(TextureError::InvalidParameter(
            "Sample rate must be > 0".to_string(),
        ));
    }
    validate_samples(samples)?;

    let level = rms(samples);
    let pk = peak(samples);
    let crest_factor = if level > SILENT_RMS { pk / level } else { f32::INFINITY };

    let spectral = SpectralFeatures::compute(samples, sample_rate)?;
    let centroid_hz = spectral.mean_centroid(0, samples.len());

    let est_freq_hz = match kind {
        TextureKind::Pad | TextureKind::Swell => estimate_pitch_hz(samples, sample_rate, PITCH_MIN_HZ, PITCH_MAX_HZ),
        _ => None,
    };

    Ok(OutputMetadata {
        kind,
        duration_sec: samples.len() as f32 / sample_rate as f32,
        rms_db: rms_db(samples),
        peak: pk,
        crest_factor,
        centroid_hz,
        est_freq_hz,
        loop_error_db: loop_seam_error_db(samples),
        brightness: brightness_bounds.map(|b| Brightness::classify(centroid_hz, b)),
        grade: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, seconds: f32, amplitude: f32) -> Vec<f32> {
        (0..(seconds * 44100.0) as usize)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn test_pad_metadata() {
        let samples = sine(220.0, 1.0, 0.5);
        let meta = compute_metadata(&samples, 44100, TextureKind::Pad, Some((1500.0, 3500.0))).unwrap();
        assert!((meta.duration_sec - 1.0).abs() < 1e-6);
        assert!((meta.peak - 0.5).abs() < 1e-3);
        assert!((meta.crest_factor - std::f32::consts::SQRT_2).abs() < 0.01);
        let f0 = meta.est_freq_hz.unwrap();
        assert!((f0 - 220.0).abs() < 2.0, "f0 {}", f0);
        assert_eq!(meta.brightness, Some(Brightness::Dark));
        assert!(meta.loop_error_db.is_some());
        assert!(meta.grade.is_none());
    }

    #[test]
    fn test_pitch_only_for_pads_and_swells() {
        let samples = sine(220.0, 0.5, 0.5);
        let meta = compute_metadata(&samples, 44100, TextureKind::Cloud, None).unwrap();
        assert!(meta.est_freq_hz.is_none());
        assert!(meta.brightness.is_none());

        let swell = compute_metadata(&samples, 44100, TextureKind::Swell, None).unwrap();
        let f0 = swell.est_freq_hz.unwrap();
        assert!((f0 - 220.0).abs() < 2.0, "f0 {}", f0);
        assert_eq!(TextureKind::Swell.label(), "swell");
    }

    #[test]
    fn test_silence_has_infinite_crest() {
        let meta = compute_metadata(&[0.0; 4096], 44100, TextureKind::HissLoop, None).unwrap();
        assert!(meta.crest_factor.is_infinite());
        assert_eq!(meta.rms_db, crate::features::levels::MIN_DB);
    }

    #[test]
    fn test_brightness_classes() {
        let bounds = (1500.0, 3500.0);
        assert_eq!(Brightness::classify(800.0, bounds), Brightness::Dark);
        assert_eq!(Brightness::classify(1500.0, bounds), Brightness::Mid);
        assert_eq!(Brightness::classify(3500.0, bounds), Brightness::Mid);
        assert_eq!(Brightness::classify(9000.0, bounds), Brightness::Bright);
    }

    #[test]
    fn test_serializes_snake_case() {
        let meta = compute_metadata(&sine(440.0, 0.2, 0.3), 44100, TextureKind::HissLoop, None).unwrap();
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"kind\":\"hiss_loop\""), "{}", json);
    }
}
