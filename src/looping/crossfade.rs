//! Crossfade curves
//!
//! Both curves are sampled at `len` evenly spaced points on `[0, 1]`,
//! endpoints included. Equal-power fades (`sqrt(t)`, `sqrt(1 − t)`) keep
//! the summed power of two uncorrelated signals constant; linear fades
//! dip by 3 dB in the middle.

/// Fade shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FadeCurve {
    /// `sqrt(t)` in, `sqrt(1 − t)` out
    #[default]
    EqualPower,
    /// `t` in, `1 − t` out
    Linear,
}

impl FadeCurve {
    /// Curve from a flag (`true` → equal power)
    pub fn from_equal_power(equal_power: bool) -> Self {
        if equal_power {
            FadeCurve::EqualPower
        } else {
            FadeCurve::Linear
        }
    }

    /// `(fade_in, fade_out)` gains at position `t` in [0, 1]
    #[inline]
    pub fn gains(self, t: f32) -> (f32, f32) {
        let t = t.clamp(0.0, 1.0);
        match self {
            FadeCurve::EqualPower => (t.sqrt(), (1.0 - t).sqrt()),
            FadeCurve::Linear => (t, 1.0 - t),
        }
    }

    /// Gains for every point of a `len`-point fade
    pub fn ramps(self, len: usize) -> impl Iterator<Item = (f32, f32)> {
        let denom = len.saturating_sub(1).max(1) as f32;
        (0..len).map(move |i| self.gains(i as f32 / denom))
    }
}

/// Join `a` and `b`, overlapping the last `fade_len` samples of `a` with
/// the first `fade_len` samples of `b`
///
/// `fade_len` is clamped to the shorter input. The result has
/// `a.len() + b.len() − fade_len` samples.
pub fn crossfade(a: &[f32], b: &[f32], fade_len: usize, curve: FadeCurve) -> Vec<f32> {
    let fade_len = fade_len.min(a.len()).min(b.len());
    let split = a.len() - fade_len;

    let mut out = Vec::with_capacity(a.len() + b.len() - fade_len);
    out.extend_from_slice(&a[..split]);
    out.extend(
        a[split..]
            .iter()
            .zip(&b[..fade_len])
            .zip(curve.ramps(fade_len))
            .map(|((&x, &y), (g_in, g_out))| x * g_out + y * g_in),
    );
    out.extend_from_slice(&b[fade_len..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        for curve in [FadeCurve::EqualPower, FadeCurve::Linear] {
            let ramps: Vec<_> = curve.ramps(5).collect();
            assert_eq!(ramps[0], (0.0, 1.0));
            assert_eq!(ramps[4], (1.0, 0.0));
        }
    }

    #[test]
    fn test_equal_power_preserves_power() {
        for (g_in, g_out) in FadeCurve::EqualPower.ramps(101) {
            assert!((g_in * g_in + g_out * g_out - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_crossfade_length_and_edges() {
        let a = vec![1.0f32; 100];
        let b = vec![-1.0f32; 80];
        let out = crossfade(&a, &b, 20, FadeCurve::Linear);
        assert_eq!(out.len(), 160);
        assert_eq!(out[79], 1.0, "overlap starts fully on a");
        assert_eq!(out[99], -1.0, "overlap ends fully on b");
        assert_eq!(out[159], -1.0);
    }

    #[test]
    fn test_fade_clamped_to_shorter_input() {
        let out = crossfade(&[0.5; 10], &[0.5; 4], 50, FadeCurve::EqualPower);
        assert_eq!(out.len(), 10);
    }
}
