//! Short-time Fourier transform
//!
//! One pass over the buffer feeds onset detection, spectral centroid and
//! spectral flatness. Frames are handed to a callback one at a time, so
//! memory stays at one FFT buffer regardless of the signal length.
//!
//! Frames are centred: the signal is treated as zero-padded by `n_fft / 2`
//! on both sides, frame `t` covers samples `[t*hop - n_fft/2, t*hop + n_fft/2)`,
//! and there are `1 + len / hop` frames.

use std::ops::Range;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{Result, TextureError};
use crate::preprocessing::envelope::hann_window;

/// Default FFT size
pub const DEFAULT_N_FFT: usize = 2048;

/// Default hop between frames
pub const DEFAULT_HOP: usize = 512;

/// STFT geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stft {
    /// FFT size
    pub n_fft: usize,
    /// Hop between frames in samples
    pub hop: usize,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Stft {
    /// Geometry with explicit FFT size and hop
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `n_fft` or `hop` is zero
    pub fn new(n_fft: usize, hop: usize, sample_rate: u32) -> Result<Self> {
        if n_fft == 0 || hop == 0 {
            return Err(TextureError::InvalidParameter(format!(
                "STFT needs n_fft > 0 and hop > 0 (got {} / {})",
                n_fft, hop
            )));
        }
        Ok(Self {
            n_fft,
            hop,
            sample_rate,
        })
    }

    /// Default 2048 / 512 geometry
    pub fn with_defaults(sample_rate: u32) -> Self {
        Self {
            n_fft: DEFAULT_N_FFT,
            hop: DEFAULT_HOP,
            sample_rate,
        }
    }

    /// Number of frames for a buffer of `len` samples
    pub fn n_frames(&self, len: usize) -> usize {
        1 + len / self.hop
    }

    /// Number of frequency bins per frame
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Centre frequency of bin `k` in Hz
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / self.n_fft as f32
    }

    /// Sample position of the centre of frame `t`
    pub fn frame_to_sample(&self, t: usize) -> usize {
        t * self.hop
    }

    /// Frames whose analysis window lies entirely inside a `len`-sample signal
    ///
    /// Frames outside this range straddle the zero padding; their spectra
    /// leak and read as spurious rises in flux. Empty when the signal is
    /// shorter than one FFT.
    pub fn full_frames(&self, len: usize) -> Range<usize> {
        let half = self.n_fft / 2;
        let first = half.div_ceil(self.hop);
        if len < self.n_fft {
            return first..first;
        }
        let end = ((len - half) / self.hop + 1).min(self.n_frames(len));
        first..end.max(first)
    }

    /// Run the transform, calling `on_frame(t, magnitudes)` for every frame
    /// in order
    ///
    /// `magnitudes` holds `|X[t, k]|` for the `n_fft / 2 + 1` bins and is
    /// only valid during the call.
    pub fn for_each_frame<F>(&self, samples: &[f32], mut on_frame: F)
    where
        F: FnMut(usize, &[f32]),
    {
        let pad = self.n_fft / 2;
        let n_frames = self.n_frames(samples.len());
        let n_bins = self.n_bins();
        let window = hann_window(self.n_fft);

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(self.n_fft);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut magnitudes = vec![0.0f32; n_bins];

        for t in 0..n_frames {
            let start = t * self.hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let x = (start + i)
                    .checked_sub(pad)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(x * window[i], 0.0);
            }
            fft.process(&mut buffer);
            for (m, c) in magnitudes.iter_mut().zip(&buffer[..n_bins]) {
                *m = c.norm();
            }
            on_frame(t, &magnitudes);
        }

        log::debug!(
            "STFT: {} samples -> {} frames x {} bins (n_fft={}, hop={})",
            samples.len(),
            n_frames,
            n_bins,
            self.n_fft,
            self.hop
        );
    }
}

/// Frames (of `n_frames`, centred every `hop` samples) inside `[start, end)`
///
/// Never empty while `n_frames > 0`: a span shorter than one hop maps to the
/// frame nearest its start.
pub(crate) fn centred_frame_range(start: usize, end: usize, hop: usize, n_frames: usize) -> Range<usize> {
    if n_frames == 0 || hop == 0 {
        return 0..0;
    }
    let first = start.div_ceil(hop).min(n_frames - 1);
    let last = end.div_ceil(hop).clamp(first + 1, n_frames);
    first..last
}
