//! Frame-level spectral features derived from one shared STFT
//!
//! [`SpectralFeatures`] runs the transform once and reduces every frame to
//! three numbers (onset strength, centroid, flatness) as it is produced.
//! No spectrogram is ever stored; the analyzer and the segment miner query
//! sample ranges against the per-frame vectors.

use std::ops::Range;

use super::onset::{pick_onsets, OnsetParams, SpectralFlux};
use super::stft::{centred_frame_range, Stft, DEFAULT_HOP, DEFAULT_N_FFT};
use crate::error::Result;

/// Power floor for flatness
const AMIN: f32 = 1e-10;

/// Per-frame spectral features of a mono buffer
#[derive(Debug, Clone)]
pub struct SpectralFeatures {
    /// Hop between frames in samples
    pub hop: usize,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Onset strength per frame
    pub onset_envelope: Vec<f32>,
    /// Detected onsets, in samples, ascending
    pub onset_samples: Vec<usize>,
    /// Spectral centroid per frame (Hz)
    pub centroid_hz: Vec<f32>,
    /// Spectral flatness per frame (0 = pure tone, 1 = white noise)
    pub flatness: Vec<f32>,
}

impl SpectralFeatures {
    /// Analyse `samples` with the default STFT geometry
    pub fn compute(samples: &[f32], sample_rate: u32) -> Result<Self> {
        Self::compute_with(samples, sample_rate, DEFAULT_N_FFT, DEFAULT_HOP, &OnsetParams::default())
    }

    /// Analyse `samples` with explicit STFT geometry and onset parameters
    pub fn compute_with(
        samples: &[f32],
        sample_rate: u32,
        n_fft: usize,
        hop: usize,
        onset_params: &OnsetParams,
    ) -> Result<Self> {
        let stft = Stft::new(n_fft, hop, sample_rate)?;
        let bin_hz: Vec<f32> = (0..stft.n_bins()).map(|k| stft.bin_frequency(k)).collect();

        let n_frames = stft.n_frames(samples.len());
        let mut onset_envelope = Vec::with_capacity(n_frames);
        let mut centroid_hz = Vec::with_capacity(n_frames);
        let mut flatness = Vec::with_capacity(n_frames);
        let mut flux = SpectralFlux::new();
        stft.for_each_frame(samples, |_, magnitudes| {
            onset_envelope.push(flux.push(magnitudes));
            centroid_hz.push(frame_centroid(magnitudes, &bin_hz));
            flatness.push(frame_flatness(magnitudes));
        });

        let onset_samples = pick_onsets(
            &onset_envelope,
            hop,
            sample_rate,
            stft.full_frames(samples.len()),
            onset_params,
        )
        .into_iter()
        .map(|t| stft.frame_to_sample(t))
        .collect::<Vec<_>>();

        log::debug!(
            "Spectral features: {} frames, {} onsets",
            n_frames,
            onset_samples.len()
        );

        Ok(Self {
            hop,
            sample_rate,
            onset_envelope,
            onset_samples,
            centroid_hz,
            flatness,
        })
    }

    /// Number of frames
    pub fn n_frames(&self) -> usize {
        self.centroid_hz.len()
    }

    /// Frames whose centres fall in the sample span `[start, end)`
    pub fn frame_range(&self, start: usize, end: usize) -> Range<usize> {
        centred_frame_range(start, end, self.hop, self.n_frames())
    }

    /// Number of onsets inside `[start, end)`
    pub fn onset_count(&self, start: usize, end: usize) -> usize {
        let lo = self.onset_samples.partition_point(|&s| s < start);
        let hi = self.onset_samples.partition_point(|&s| s < end);
        hi - lo
    }

    /// Mean onset strength over `[start, end)`
    pub fn mean_onset_strength(&self, start: usize, end: usize) -> f32 {
        mean(&self.onset_envelope[self.frame_range(start, end)])
    }

    /// Mean spectral centroid over `[start, end)`
    pub fn mean_centroid(&self, start: usize, end: usize) -> f32 {
        mean(&self.centroid_hz[self.frame_range(start, end)])
    }

    /// Mean spectral flatness over `[start, end)`
    pub fn mean_flatness(&self, start: usize, end: usize) -> f32 {
        mean(&self.flatness[self.frame_range(start, end)])
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// Magnitude-weighted mean frequency (0.0 for a silent frame)
fn frame_centroid(magnitudes: &[f32], bin_hz: &[f32]) -> f32 {
    let total: f32 = magnitudes.iter().sum();
    if total <= AMIN {
        return 0.0;
    }
    magnitudes.iter().zip(bin_hz).map(|(m, f)| m * f).sum::<f32>() / total
}

/// Geometric / arithmetic mean of the power spectrum
fn frame_flatness(magnitudes: &[f32]) -> f32 {
    if magnitudes.is_empty() {
        return 1.0;
    }
    let n = magnitudes.len() as f64;
    let mut log_sum = 0.0f64;
    let mut sum = 0.0f64;
    for &m in magnitudes {
        let power = (m * m).max(AMIN) as f64;
        log_sum += power.ln();
        sum += power;
    }
    let geometric = (log_sum / n).exp();
    let arithmetic = sum / n;
    (geometric / arithmetic).clamp(0.0, 1.0) as f32
}
