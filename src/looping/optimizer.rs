//! Loop-point optimization
//!
//! # Algorithm
//!
//! 1. Take the first `crossfade_len` samples as the reference (mean removed)
//! 2. Take the last `search_window` samples as the search region (mean removed)
//! 3. Cross-correlate in valid mode via FFT
//! 4. The last maximum wins, giving the smallest trim whose new ending
//!    flows into the loop start
//! 5. Crossfade the (trimmed) tail into the head and drop the tail, so the
//!    output wraps without a seam
//!
//! # Example
//!
//! ```no_run
//! use afterglow_dsp::looping::{make_loopable, FadeCurve};
//!
//! let pad = vec![0.2f32; 88200];
//! let looped = make_loopable(&pad, 80.0, 44100, true, FadeCurve::EqualPower)?;
//! assert!(looped.len() <= pad.len());
//! # Ok::<(), afterglow_dsp::TextureError>(())
//! ```

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use super::crossfade::FadeCurve;
use crate::error::{Result, TextureError};
use crate::features::levels::{linear_to_db_unfloored, rms};

/// Longest seam compared by [`loop_seam_error_db`]
pub const MAX_SEAM_SAMPLES: usize = 2048;

/// Minimum search span when optimizing, in seconds
const MIN_SEARCH_SEC: f32 = 0.5;

/// Trim and crossfade chosen for one loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopCandidate {
    /// Samples removed from the end before crossfading
    pub trim: usize,
    /// Crossfade length in samples
    pub crossfade_len: usize,
}

impl LoopCandidate {
    /// Output length for an input of `input_len` samples
    pub fn output_len(&self, input_len: usize) -> usize {
        input_len.saturating_sub(self.trim).saturating_sub(self.crossfade_len)
    }
}

fn mean_removed(samples: &[f32]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mean = samples.iter().sum::<f32>() / samples.len() as f32;
    samples.iter().map(|&x| x - mean).collect()
}

/// Valid-mode cross-correlation `out[k] = Σ_j signal[k + j] · kernel[j]`
///
/// Returns `signal.len() − kernel.len() + 1` lags, or nothing when the
/// kernel is longer than the signal.
fn correlate_valid(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    if kernel.is_empty() || kernel.len() > signal.len() {
        return Vec::new();
    }
    let n = signal.len();
    let lags = n - kernel.len() + 1;

    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut x: Vec<Complex<f32>> = signal.iter().map(|&s| Complex::new(s, 0.0)).collect();
    let mut y: Vec<Complex<f32>> = kernel.iter().map(|&s| Complex::new(s, 0.0)).collect();
    y.resize(n, Complex::new(0.0, 0.0));
    forward.process(&mut x);
    forward.process(&mut y);

    // Circular correlation does not wrap for lags < n - kernel.len() + 1
    let mut z: Vec<Complex<f32>> = x.iter().zip(&y).map(|(a, b)| a * b.conj()).collect();
    inverse.process(&mut z);

    let scale = 1.0 / n as f32;
    z[..lags].iter().map(|c| c.re * scale).collect()
}

/// Samples to trim from the end so that it flows into the start
///
/// # Arguments
///
/// * `samples` - Mono buffer
/// * `crossfade_len` - Reference length in samples
/// * `search_window` - Tail span to search (default `4 × crossfade_len`)
///
/// # Returns
///
/// Trim in samples, never more than `len / 4`; 0 when the search window is
/// shorter than the reference
pub fn find_best_trim(samples: &[f32], crossfade_len: usize, search_window: Option<usize>) -> usize {
    if crossfade_len == 0 || samples.is_empty() {
        return 0;
    }
    let search_len = search_window
        .unwrap_or(4 * crossfade_len)
        .min(samples.len());
    if search_len < crossfade_len {
        return 0;
    }

    let reference = mean_removed(&samples[..crossfade_len]);
    let region = mean_removed(&samples[samples.len() - search_len..]);
    let corr = correlate_valid(&region, &reference);
    if corr.is_empty() {
        return 0;
    }

    let mut best_offset = 0;
    let mut best = f32::NEG_INFINITY;
    for (k, &c) in corr.iter().enumerate() {
        if c >= best {
            best = c;
            best_offset = k;
        }
    }

    let trim = search_len - (best_offset + crossfade_len);
    let capped = trim.min(samples.len() / 4);
    log::debug!(
        "Loop trim: search {} samples, best lag {}, trim {} (capped {})",
        search_len,
        best_offset,
        trim,
        capped
    );
    capped
}

/// Choose trim and crossfade for a loop without rendering it
pub fn plan_loop(samples: &[f32], crossfade_len: usize, sample_rate: u32, optimize: bool) -> LoopCandidate {
    let crossfade_len = crossfade_len.min(samples.len() / 2);
    let trim = if optimize && crossfade_len > 0 {
        let min_search = (MIN_SEARCH_SEC * sample_rate as f32) as usize;
        let limit = (samples.len() / 2).min((crossfade_len * 4).max(min_search));
        find_best_trim(samples, crossfade_len, Some(limit))
    } else {
        0
    };
    LoopCandidate { trim, crossfade_len }
}

/// Make a buffer loop seamlessly
///
/// The last `crossfade` samples (after an optional trim) are faded out over
/// the faded-in head and then dropped; playback of the result wraps from
/// its last sample straight into the continuation of the old tail.
///
/// # Arguments
///
/// * `samples` - Mono buffer
/// * `crossfade_ms` - Crossfade length (clamped to half the buffer)
/// * `sample_rate` - Sample rate in Hz
/// * `optimize` - Search for a phase-aligned trim first
/// * `curve` - Fade shape
///
/// # Returns
///
/// A buffer no longer than the input; an unmodified copy when the
/// crossfade is shorter than one sample
///
/// # Errors
///
/// `InvalidParameter` for a zero sample rate or a negative or non-finite
/// crossfade
pub fn make_loopable(
    samples: &[f32],
    crossfade_ms: f32,
    sample_rate: u32,
    optimize: bool,
    curve: FadeCurve,
) -> Result<Vec<f32>> {
    if sample_rate == 0 {
        return Err(TextureError::InvalidParameter(
            "Sample rate must be > 0".to_string(),
        ));
    }
    if !(crossfade_ms >= 0.0) || !crossfade_ms.is_finite() {
        return Err(TextureError::InvalidParameter(format!(
            "Crossfade must be >= 0 ms, got {}",
            crossfade_ms
        )));
    }

    let crossfade_len = (crossfade_ms * sample_rate as f32 / 1000.0) as usize;
    if crossfade_len < 1 || samples.len() < 2 {
        return Ok(samples.to_vec());
    }

    let plan = plan_loop(samples, crossfade_len, sample_rate, optimize);
    let cf = plan.crossfade_len;
    if cf == 0 {
        return Ok(samples.to_vec());
    }
    let body = &samples[..samples.len() - plan.trim];
    let tail = &body[body.len() - cf..];

    let mut out = Vec::with_capacity(plan.output_len(samples.len()));
    out.extend(
        body[..cf]
            .iter()
            .zip(tail)
            .zip(curve.ramps(cf))
            .map(|((&head, &end), (g_in, g_out))| head * g_in + end * g_out),
    );
    out.extend_from_slice(&body[cf..body.len() - cf]);

    log::debug!(
        "make_loopable: {} -> {} samples (trim {}, crossfade {})",
        samples.len(),
        out.len(),
        plan.trim,
        cf
    );
    Ok(out)
}

/// Level of the head-minus-tail difference over `min(len / 8, 2048)` samples
///
/// Lower is smoother; `None` for buffers shorter than 8 samples.
pub fn loop_seam_error_db(samples: &[f32]) -> Option<f32> {
    let seam = (samples.len() / 8).min(MAX_SEAM_SAMPLES);
    if seam == 0 {
        return None;
    }
    let head = &samples[..seam];
    let tail = &samples[samples.len() - seam..];
    let diff: Vec<f32> = head.iter().zip(tail).map(|(a, b)| a - b).collect();
    Some(linear_to_db_unfloored(rms(&diff)))
}
