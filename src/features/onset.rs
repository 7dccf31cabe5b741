//! Spectral flux onset detection
//!
//! Detects transients by finding peaks in the frame-by-frame increase of
//! log-compressed spectral magnitude.
//!
//! Algorithm:
//! 1. Log-compress the magnitude spectrogram: `L[t, k] = ln(1 + γ |X[t, k]|)`
//! 2. Half-wave rectified flux, averaged over bins:
//!    `flux[t] = mean_k max(0, L[t, k] - L[t-1, k])`
//! 3. Peak-pick: a frame is an onset when it is the local maximum, exceeds
//!    the local mean by a relative margin plus an absolute floor, and is at
//!    least `wait` after the previous onset
//!
//! The threshold is relative to the local mean rather than to a globally
//! normalized envelope, so stationary noise (a flat, jittery flux) does not
//! produce onsets while sudden broadband changes do.
//!
//! # Reference
//!
//! Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
//! A Tutorial on Onset Detection in Music Signals.
//! *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.
//!
//! # Example
//!
//! ```no_run
//! use afterglow_dsp::features::onset::{detect_onsets, OnsetParams};
//!
//! let samples = vec![0.0f32; 44100 * 30];
//! let onsets = detect_onsets(&samples, 44100, &OnsetParams::default())?;
//! println!("Found {} onsets", onsets.len());
//! # Ok::<(), afterglow_dsp::TextureError>(())
//! ```

use std::ops::Range;

use super::stft::{Stft, DEFAULT_HOP, DEFAULT_N_FFT};
use crate::error::Result;

/// Log compression factor
const LOG_COMPRESSION: f32 = 100.0;

/// Onset peak-picking parameters (times in seconds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnsetParams {
    /// Look-back for the local-maximum test
    pub pre_max_sec: f32,
    /// Look-ahead for the local-maximum test
    pub post_max_sec: f32,
    /// Half-width of the local-mean window
    pub mean_window_sec: f32,
    /// Required excess over the local mean, relative (0.3 = 30 % above)
    pub relative_delta: f32,
    /// Absolute floor added to the threshold
    pub absolute_delta: f32,
    /// Minimum gap between onsets
    pub wait_sec: f32,
}

impl Default for OnsetParams {
    fn default() -> Self {
        Self {
            pre_max_sec: 0.03,
            post_max_sec: 0.03,
            mean_window_sec: 0.1,
            relative_delta: 0.3,
            absolute_delta: 0.01,
            wait_sec: 0.03,
        }
    }
}

/// Running half-wave rectified flux over a stream of magnitude frames
///
/// Keeps only the previous log-compressed frame.
#[derive(Debug, Clone, Default)]
pub struct SpectralFlux {
    previous: Vec<f32>,
}

impl SpectralFlux {
    /// Empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Flux of `magnitudes` against the previous frame (0.0 for the first)
    pub fn push(&mut self, magnitudes: &[f32]) -> f32 {
        let compress = |m: f32| (LOG_COMPRESSION * m).ln_1p();
        if self.previous.len() != magnitudes.len() {
            self.previous = magnitudes.iter().map(|&m| compress(m)).collect();
            return 0.0;
        }

        let mut flux = 0.0f32;
        for (prev, &m) in self.previous.iter_mut().zip(magnitudes) {
            let current = compress(m);
            flux += (current - *prev).max(0.0);
            *prev = current;
        }
        flux / magnitudes.len().max(1) as f32
    }
}

/// Onset strength envelope, one value per STFT frame
///
/// Frame 0 has no predecessor and is 0.0.
pub fn onset_envelope(samples: &[f32], stft: &Stft) -> Vec<f32> {
    let mut flux = SpectralFlux::new();
    let mut envelope = Vec::with_capacity(stft.n_frames(samples.len()));
    stft.for_each_frame(samples, |_, magnitudes| envelope.push(flux.push(magnitudes)));
    envelope
}

/// Peak-pick an onset envelope
///
/// # Arguments
///
/// * `envelope` - Onset strength per frame
/// * `hop` - Hop between frames in samples
/// * `sample_rate` - Sample rate in Hz
/// * `frames` - Frames eligible as onsets; neighbours outside the range
///   still take part in the maximum and mean tests
/// * `params` - Peak-picking parameters
///
/// # Returns
///
/// Onset frame indices, ascending
pub fn pick_onsets(
    envelope: &[f32],
    hop: usize,
    sample_rate: u32,
    frames: Range<usize>,
    params: &OnsetParams,
) -> Vec<usize> {
    let n = envelope.len();
    if n < 3 || hop == 0 {
        return Vec::new();
    }

    let to_frames = |sec: f32| ((sec * sample_rate as f32 / hop as f32).round() as usize).max(1);
    let pre_max = to_frames(params.pre_max_sec);
    let post_max = to_frames(params.post_max_sec);
    let mean_half = to_frames(params.mean_window_sec);
    let wait = to_frames(params.wait_sec);

    let mut prefix = vec![0.0f64; n + 1];
    for (i, &v) in envelope.iter().enumerate() {
        prefix[i + 1] = prefix[i] + v as f64;
    }

    let mut onsets = Vec::new();
    let mut last: Option<usize> = None;

    for t in frames.start.max(1)..frames.end.min(n) {
        let value = envelope[t];

        let lo = t.saturating_sub(pre_max);
        let hi = (t + post_max + 1).min(n);
        if envelope[lo..hi].iter().any(|&v| v > value) {
            continue;
        }

        let mlo = t.saturating_sub(mean_half);
        let mhi = (t + mean_half + 1).min(n);
        let local_mean = ((prefix[mhi] - prefix[mlo]) / (mhi - mlo) as f64) as f32;
        if value < local_mean * (1.0 + params.relative_delta) + params.absolute_delta {
            continue;
        }

        if let Some(prev) = last {
            if t < prev + wait {
                continue;
            }
        }

        onsets.push(t);
        last = Some(t);
    }

    onsets
}

/// Detect onsets in a mono buffer
///
/// Only frames whose window lies fully inside the signal can be onsets;
/// the edge frames see the zero padding as a rising or falling step.
///
/// # Returns
///
/// Onset positions in samples, ascending
///
/// # Errors
///
/// Propagates STFT parameter errors
pub fn detect_onsets(samples: &[f32], sample_rate: u32, params: &OnsetParams) -> Result<Vec<usize>> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    let stft = Stft::new(DEFAULT_N_FFT, DEFAULT_HOP, sample_rate)?;
    let envelope = onset_envelope(samples, &stft);
    let frames = pick_onsets(&envelope, stft.hop, sample_rate, stft.full_frames(samples.len()), params);

    log::debug!("Spectral flux detected {} onsets", frames.len());
    Ok(frames.into_iter().map(|t| stft.frame_to_sample(t)).collect())
}
