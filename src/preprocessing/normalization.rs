//! Peak normalization
//!
//! Every rendered texture passes through here before it leaves the engine.
//! Signals whose peak sits below the noise floor cannot be scaled to a
//! target level; they are reported as [`TextureError::SilentSignal`] so that
//! pipelines can skip the item instead of aborting.
//!
//! # Example
//!
//! ```no_run
//! use afterglow_dsp::preprocessing::normalization::normalize_peak;
//!
//! let samples = vec![0.25f32; 44100];
//! let normalized = normalize_peak(&samples, -1.0)?;
//! # Ok::<(), afterglow_dsp::TextureError>(())
//! ```

use crate::error::{Result, TextureError};
use crate::features::levels::{db_to_linear, linear_to_db, peak, rms_db};
use crate::io::validate_samples;

/// Peaks below this are treated as silence
pub const SILENCE_PEAK: f32 = 1e-8;

/// Loudness information returned from in-place normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainReport {
    /// Peak level in dB before normalization
    pub peak_db: f32,
    /// RMS level in dB before normalization
    pub rms_db: f32,
    /// Gain applied in dB
    pub gain_db: f32,
}

/// Scale `samples` in place so the absolute peak equals `target_dbfs`
///
/// The result is clipped to [-1.0, 1.0], so a positive target saturates
/// at full scale.
///
/// # Errors
///
/// * `InvalidInput` for empty, NaN or Inf samples
/// * `SilentSignal` when the peak is below [`SILENCE_PEAK`]
pub fn normalize_peak_in_place(samples: &mut [f32], target_dbfs: f32) -> Result<GainReport> {
    validate_samples(samples)?;
    if !target_dbfs.is_finite() {
        return Err(TextureError::InvalidParameter(format!(
            "Target peak must be finite, got {}",
            target_dbfs
        )));
    }

    let current_peak = peak(samples);
    let current_rms_db = rms_db(samples);
    if current_peak < SILENCE_PEAK {
        return Err(TextureError::SilentSignal {
            peak: current_peak,
            rms_db: current_rms_db,
        });
    }

    let gain = db_to_linear(target_dbfs) / current_peak;
    for sample in samples.iter_mut() {
        *sample = (*sample * gain).clamp(-1.0, 1.0);
    }

    let report = GainReport {
        peak_db: linear_to_db(current_peak),
        rms_db: current_rms_db,
        gain_db: 20.0 * gain.log10(),
    };
    log::debug!(
        "Peak normalization: peak={:.2} dB, gain={:.2} dB",
        report.peak_db,
        report.gain_db
    );
    Ok(report)
}

/// Return a copy of `samples` normalized to `target_dbfs`
///
/// See [`normalize_peak_in_place`] for the error conditions.
pub fn normalize_peak(samples: &[f32], target_dbfs: f32) -> Result<Vec<f32>> {
    let mut out = samples.to_vec();
    normalize_peak_in_place(&mut out, target_dbfs)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Generate a test signal: sine wave at 440 Hz
    fn generate_test_signal(length: usize, amplitude: f32, sample_rate: f32) -> Vec<f32> {
        let freq = 440.0;
        (0..length)
            .map(|i| {
                let t = i as f32 / sample_rate;
                amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_peak_normalization() {
        let samples = generate_test_signal(44100, 0.5, 44100.0);
        let normalized = normalize_peak(&samples, -1.0).unwrap();

        let new_peak = peak(&normalized);
        let target_peak = 10.0_f32.powf(-1.0 / 20.0);
        assert!(
            (new_peak - target_peak).abs() < 1e-5,
            "Peak normalization failed: expected {:.5}, got {:.5}",
            target_peak,
            new_peak
        );
    }

    #[test]
    fn test_gain_report() {
        let mut samples = generate_test_signal(4410, 0.5, 44100.0);
        let report = normalize_peak_in_place(&mut samples, 0.0).unwrap();
        assert!((report.peak_db - (-6.02)).abs() < 0.05);
        assert!((report.gain_db - 6.02).abs() < 0.05);
    }

    #[test]
    fn test_silent_audio_is_rejected() {
        let samples = vec![0.0f32; 44100];
        let err = normalize_peak(&samples, -1.0).unwrap_err();
        assert!(err.is_silent(), "Silent audio should raise SilentSignal, got {:?}", err);
    }

    #[test]
    fn test_ultra_quiet_audio_still_normalizes() {
        let samples = generate_test_signal(44100, 1e-6, 44100.0);
        let normalized = normalize_peak(&samples, -6.0).unwrap();
        assert!((peak(&normalized) - db_to_linear(-6.0)).abs() < 1e-4);
    }

    #[test]
    fn test_positive_target_clips_to_full_scale() {
        let samples = generate_test_signal(1000, 0.5, 44100.0);
        let normalized = normalize_peak(&samples, 6.0).unwrap();
        assert!(normalized.iter().all(|x| x.abs() <= 1.0));
    }

    #[test]
    fn test_empty_and_nan_samples() {
        assert!(matches!(
            normalize_peak(&[], -1.0),
            Err(TextureError::InvalidInput(_))
        ));
        assert!(matches!(
            normalize_peak(&[0.1, f32::NAN], -1.0),
            Err(TextureError::InvalidInput(_))
        ));
    }
}
