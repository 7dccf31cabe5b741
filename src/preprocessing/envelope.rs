//! Amplitude envelopes: windows and fades
//!
//! Fade ramps run from exactly 0.0 to exactly 1.0 (inclusive endpoints), so
//! a faded buffer starts or ends on true silence.

use std::f32::consts::PI;

/// Periodic Hann window of `length` samples
///
/// Periodic (not symmetric) so that overlapping windows at 50 % hop sum to a
/// constant. A zero-length request yields an empty window and a one-sample
/// request yields `[1.0]`.
pub fn hann_window(length: usize) -> Vec<f32> {
    match length {
        0 => Vec::new(),
        1 => vec![1.0],
        n => (0..n)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n as f32).cos())
            .collect(),
    }
}

/// Multiply `samples` by a Hann window of the same length
pub fn apply_hann_window(samples: &mut [f32]) {
    let window = hann_window(samples.len());
    for (s, w) in samples.iter_mut().zip(window) {
        *s *= w;
    }
}

/// Linear ramp from 0.0 to 1.0 with `len` points
fn ramp(len: usize) -> impl Iterator<Item = f32> {
    let denom = len.saturating_sub(1).max(1) as f32;
    (0..len).map(move |i| if len == 1 { 0.0 } else { i as f32 / denom })
}

/// Linear fade-in over the first `fade_len` samples (clamped to the buffer)
pub fn fade_in(samples: &mut [f32], fade_len: usize) {
    let fade_len = fade_len.min(samples.len());
    for (s, g) in samples[..fade_len].iter_mut().zip(ramp(fade_len)) {
        *s *= g;
    }
}

/// Linear fade-out over the last `fade_len` samples (clamped to the buffer)
pub fn fade_out(samples: &mut [f32], fade_len: usize) {
    let fade_len = fade_len.min(samples.len());
    let start = samples.len() - fade_len;
    for (s, g) in samples[start..].iter_mut().rev().zip(ramp(fade_len)) {
        *s *= g;
    }
}

/// Fade both edges, never spending more than a quarter of the buffer per edge
///
/// Short renders keep at least half their length at full level, so a very
/// short texture still carries signal.
pub fn guarded_edge_fade(samples: &mut [f32], fade_len: usize) {
    let fade_len = fade_len.min(samples.len() / 4);
    if fade_len == 0 {
        return;
    }
    fade_in(samples, fade_len);
    fade_out(samples, fade_len);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_shape() {
        let w = hann_window(8);
        assert_eq!(w.len(), 8);
        assert!(w[0].abs() < 1e-7, "periodic Hann starts at zero");
        assert!((w[4] - 1.0).abs() < 1e-6, "peak at n/2, got {}", w[4]);
        assert!(hann_window(0).is_empty());
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn test_hann_overlap_add_is_constant() {
        let n = 64;
        let w = hann_window(n);
        for i in 0..n / 2 {
            let sum = w[i] + w[i + n / 2];
            assert!((sum - 1.0).abs() < 1e-5, "COLA violated at {}: {}", i, sum);
        }
    }

    #[test]
    fn test_fades_hit_zero_at_edges() {
        let mut samples = vec![1.0f32; 100];
        fade_in(&mut samples, 10);
        fade_out(&mut samples, 10);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[99], 0.0);
        assert_eq!(samples[9], 1.0);
        assert_eq!(samples[50], 1.0);
    }

    #[test]
    fn test_fade_longer_than_buffer_is_clamped() {
        let mut samples = vec![1.0f32; 5];
        fade_in(&mut samples, 50);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[4], 1.0);
    }

    #[test]
    fn test_guarded_fade_keeps_middle() {
        let mut samples = vec![1.0f32; 40];
        guarded_edge_fade(&mut samples, 1000);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[39], 0.0);
        assert!(samples[10..30].iter().all(|&s| s == 1.0));
    }
}
