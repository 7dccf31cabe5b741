//! Hiss loops and flicker bursts
//!
//! High-frequency layers cut from a source (usually percussion) or from
//! synthetic white noise:
//! - hiss loop: random chunk → zero-phase band-pass or high-pass →
//!   tremolo → 50 ms loop crossfade → −6 dBFS
//! - flicker burst: random 50–300 ms chunk → same filter → 10 ms fade in,
//!   50 ms fade out → −3 dBFS

use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{Result, TextureError};
use crate::features::levels::db_to_linear;
use crate::looping::{make_loopable, FadeCurve};
use crate::preprocessing::envelope::{fade_in, fade_out};
use crate::preprocessing::filters::{apply_filter, apply_tremolo, FilterKind};
use crate::preprocessing::normalization::normalize_peak_in_place;

/// Loop crossfade for hiss loops
const HISS_CROSSFADE_MS: f32 = 50.0;
/// Peak level of hiss loops
const HISS_PEAK_DBFS: f32 = -6.0;
/// Peak level of flicker bursts
const FLICKER_PEAK_DBFS: f32 = -3.0;
const FLICKER_FADE_IN_SEC: f32 = 0.01;
const FLICKER_FADE_OUT_SEC: f32 = 0.05;
/// Standard deviation of unit synthetic noise before the level is applied
const NOISE_SCALE: f32 = 0.1;

/// Hiss and flicker settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HissParams {
    /// Hiss loop length in seconds
    pub loop_duration_sec: f32,
    /// Band-pass or high-pass applied to every layer
    pub filter: FilterKind,
    /// Tremolo rate in Hz
    pub tremolo_rate_hz: f32,
    /// Tremolo depth in [0, 1]
    pub tremolo_depth: f32,
    /// Shortest flicker in milliseconds
    pub flicker_min_ms: f32,
    /// Longest flicker in milliseconds
    pub flicker_max_ms: f32,
    /// Level of synthetic noise when there is no source
    pub synthetic_noise_level_db: f32,
}

impl Default for HissParams {
    fn default() -> Self {
        Self {
            loop_duration_sec: 1.5,
            filter: FilterKind::BandPass {
                low_hz: 4000.0,
                high_hz: 14000.0,
            },
            tremolo_rate_hz: 3.0,
            tremolo_depth: 0.6,
            flicker_min_ms: 50.0,
            flicker_max_ms: 300.0,
            synthetic_noise_level_db: -10.0,
        }
    }
}

impl HissParams {
    /// Check ranges against `sample_rate`
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for an inverted or out-of-range band, a
    /// non-positive duration, or an inverted flicker range
    pub fn validate(&self, sample_rate: u32) -> Result<()> {
        if sample_rate == 0 {
            return Err(TextureError::InvalidParameter(
                "Sample rate must be > 0".to_string(),
            ));
        }
        let nyquist = sample_rate as f32 / 2.0;
        match self.filter {
            FilterKind::BandPass { low_hz, high_hz } => {
                if !(low_hz > 0.0) || low_hz >= high_hz || high_hz >= nyquist {
                    return Err(TextureError::InvalidParameter(format!(
                        "Invalid hiss band {}..{} Hz (Nyquist {} Hz)",
                        low_hz, high_hz, nyquist
                    )));
                }
            }
            FilterKind::HighPass { cutoff_hz } | FilterKind::LowPass { cutoff_hz } => {
                if !(cutoff_hz > 0.0) || cutoff_hz >= nyquist {
                    return Err(TextureError::InvalidParameter(format!(
                        "Invalid hiss cutoff {} Hz (Nyquist {} Hz)",
                        cutoff_hz, nyquist
                    )));
                }
            }
        }
        if !(self.loop_duration_sec > 0.0) || !self.loop_duration_sec.is_finite() {
            return Err(TextureError::InvalidParameter(format!(
                "Hiss loop duration must be > 0, got {}",
                self.loop_duration_sec
            )));
        }
        if !(self.flicker_min_ms > 0.0) || self.flicker_min_ms > self.flicker_max_ms || !self.flicker_max_ms.is_finite() {
            return Err(TextureError::InvalidParameter(format!(
                "Invalid flicker range {}..{} ms",
                self.flicker_min_ms, self.flicker_max_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.tremolo_depth) || !(self.tremolo_rate_hz >= 0.0) {
            return Err(TextureError::InvalidParameter(format!(
                "Invalid tremolo: rate {} Hz, depth {}",
                self.tremolo_rate_hz, self.tremolo_depth
            )));
        }
        Ok(())
    }
}

/// Gaussian white noise at `level_db` (relative to a 0.1 standard deviation)
pub fn synthetic_noise<R: Rng>(duration_sec: f32, level_db: f32, sample_rate: u32, rng: &mut R) -> Vec<f32> {
    let len = (duration_sec.max(0.0) * sample_rate as f32) as usize;
    let scale = NOISE_SCALE * db_to_linear(level_db);
    (0..len)
        .map(|_| rng.sample::<f32, _>(StandardNormal) * scale)
        .collect()
}

/// A random `len`-sample chunk of `source`, zero-padded when the source is short
fn random_chunk<R: Rng>(source: &[f32], len: usize, rng: &mut R) -> Vec<f32> {
    let mut chunk = if source.len() > len {
        let start = rng.gen_range(0..source.len() - len);
        source[start..start + len].to_vec()
    } else {
        source.to_vec()
    };
    chunk.resize(len, 0.0);
    chunk
}

fn material<R: Rng>(source: Option<&[f32]>, len: usize, params: &HissParams, sample_rate: u32, rng: &mut R) -> Vec<f32> {
    match source {
        Some(src) if !src.is_empty() => random_chunk(src, len, rng),
        _ => {
            let mut noise = synthetic_noise(len as f32 / sample_rate as f32, params.synthetic_noise_level_db, sample_rate, rng);
            noise.resize(len, 0.0);
            noise
        }
    }
}

/// Build one hiss loop
///
/// # Arguments
///
/// * `source` - Source samples, or `None` for synthetic noise
/// * `params` - Filter, tremolo and duration settings
/// * `sample_rate` - Sample rate in Hz
/// * `rng` - Random source
///
/// # Errors
///
/// `InvalidParameter` for bad params, `SilentSignal` when the filtered
/// chunk is silent
pub fn make_hiss_loop<R: Rng>(source: Option<&[f32]>, params: &HissParams, sample_rate: u32, rng: &mut R) -> Result<Vec<f32>> {
    params.validate(sample_rate)?;
    let len = ((params.loop_duration_sec * sample_rate as f32) as usize).max(1);

    let raw = material(source, len, params, sample_rate, rng);
    let mut hiss = apply_filter(&raw, params.filter, sample_rate)?;
    apply_tremolo(&mut hiss, params.tremolo_rate_hz, params.tremolo_depth, sample_rate);
    let mut hiss = make_loopable(&hiss, HISS_CROSSFADE_MS, sample_rate, true, FadeCurve::EqualPower)?;
    normalize_peak_in_place(&mut hiss, HISS_PEAK_DBFS)?;

    log::debug!("Hiss loop: {} samples ({:?})", hiss.len(), params.filter);
    Ok(hiss)
}

/// Build one flicker burst of random length in the flicker range
///
/// # Errors
///
/// `InvalidParameter` for bad params, `SilentSignal` when the filtered
/// chunk is silent
pub fn make_flicker_burst<R: Rng>(source: Option<&[f32]>, params: &HissParams, sample_rate: u32, rng: &mut R) -> Result<Vec<f32>> {
    params.validate(sample_rate)?;
    let duration_ms = if params.flicker_max_ms > params.flicker_min_ms {
        rng.gen_range(params.flicker_min_ms..params.flicker_max_ms)
    } else {
        params.flicker_min_ms
    };
    let len = ((duration_ms / 1000.0 * sample_rate as f32) as usize).max(1);

    let raw = material(source, len, params, sample_rate, rng);
    let mut flicker = apply_filter(&raw, params.filter, sample_rate)?;
    let sr = sample_rate as f32;
    fade_in(&mut flicker, (FLICKER_FADE_IN_SEC * sr) as usize);
    fade_out(&mut flicker, (FLICKER_FADE_OUT_SEC * sr) as usize);
    normalize_peak_in_place(&mut flicker, FLICKER_PEAK_DBFS)?;

    log::debug!("Flicker burst: {:.0} ms", duration_ms);
    Ok(flicker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::levels::{linear_to_db, peak};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_synthetic_hiss_loop() {
        let mut rng = StdRng::seed_from_u64(21);
        let params = HissParams::default();
        let hiss = make_hiss_loop(None, &params, 44100, &mut rng).unwrap();
        assert!(hiss.len() <= 66150 && hiss.len() > 40000, "len {}", hiss.len());
        assert!((linear_to_db(peak(&hiss)) - HISS_PEAK_DBFS).abs() < 0.05);
    }

    #[test]
    fn test_flicker_length_in_range() {
        let mut rng = StdRng::seed_from_u64(22);
        let params = HissParams::default();
        let source = synthetic_noise(2.0, 0.0, 44100, &mut rng);
        for _ in 0..5 {
            let flicker = make_flicker_burst(Some(&source), &params, 44100, &mut rng).unwrap();
            assert!(flicker.len() >= 2205 && flicker.len() <= 13230, "len {}", flicker.len());
            assert_eq!(flicker[0], 0.0, "flicker starts from silence");
            assert!((linear_to_db(peak(&flicker)) - FLICKER_PEAK_DBFS).abs() < 0.05);
        }
    }

    #[test]
    fn test_default_band_keeps_high_tone() {
        let source: Vec<f32> = (0..88200)
            .map(|i| {
                let t = i as f32 / 44100.0;
                0.3 * (2.0 * std::f32::consts::PI * 500.0 * t).sin()
                    + 0.3 * (2.0 * std::f32::consts::PI * 8000.0 * t).sin()
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(25);
        let hiss = make_hiss_loop(Some(&source), &HissParams::default(), 44100, &mut rng).unwrap();

        let spectral = crate::features::spectral::SpectralFeatures::compute(&hiss, 44100).unwrap();
        let centroid = spectral.mean_centroid(0, hiss.len());
        assert!(centroid > 6500.0, "8 kHz should dominate after the band-pass, centroid {}", centroid);
    }

    #[test]
    fn test_silent_source_is_silent_signal() {
        let mut rng = StdRng::seed_from_u64(23);
        let err = make_hiss_loop(Some(&[0.0; 100_000]), &HissParams::default(), 44100, &mut rng).unwrap_err();
        assert!(err.is_silent());
    }

    #[test]
    fn test_invalid_band() {
        let mut rng = StdRng::seed_from_u64(24);
        let inverted = HissParams {
            filter: FilterKind::BandPass {
                low_hz: 9000.0,
                high_hz: 5000.0,
            },
            ..HissParams::default()
        };
        assert!(matches!(
            make_hiss_loop(None, &inverted, 44100, &mut rng),
            Err(TextureError::InvalidParameter(_))
        ));
        let above_nyquist = HissParams {
            filter: FilterKind::BandPass {
                low_hz: 4000.0,
                high_hz: 30000.0,
            },
            ..HissParams::default()
        };
        assert!(make_flicker_burst(None, &above_nyquist, 44100, &mut rng).is_err());
    }
}
