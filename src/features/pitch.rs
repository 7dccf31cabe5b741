//! Coarse fundamental estimate from the dominant FFT bin
//!
//! Good enough for tagging sustained pads with a rough pitch; not a pitch
//! tracker.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use super::levels::peak;

/// Lowest frequency reported
pub const PITCH_MIN_HZ: f32 = 30.0;

/// Highest frequency reported
pub const PITCH_MAX_HZ: f32 = 6000.0;

/// Buffers quieter than this (after DC removal) have no pitch
const MIN_PEAK: f32 = 1e-4;

/// Frequency of the strongest spectral bin, if it lies in `[fmin, fmax]`
///
/// # Returns
///
/// `None` for empty or near-silent input, or when the dominant bin falls
/// outside the band
pub fn estimate_pitch_hz(samples: &[f32], sample_rate: u32, fmin: f32, fmax: f32) -> Option<f32> {
    if samples.is_empty() || sample_rate == 0 {
        return None;
    }

    let mean = samples.iter().sum::<f32>() / samples.len() as f32;
    let centred: Vec<f32> = samples.iter().map(|&x| x - mean).collect();
    if peak(&centred) < MIN_PEAK {
        return None;
    }

    let n = centred.len();
    let mut buffer: Vec<Complex<f32>> = centred.iter().map(|&x| Complex::new(x, 0.0)).collect();
    let mut planner = FftPlanner::<f32>::new();
    planner.plan_fft_forward(n).process(&mut buffer);

    let (peak_bin, _) = buffer[..n / 2 + 1]
        .iter()
        .enumerate()
        .map(|(k, c)| (k, c.norm_sqr()))
        .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    let freq = peak_bin as f32 * sample_rate as f32 / n as f32;
    log::debug!("Dominant bin {} -> {:.1} Hz", peak_bin, freq);

    if freq < fmin || freq > fmax {
        None
    } else {
        Some(freq)
    }
}
