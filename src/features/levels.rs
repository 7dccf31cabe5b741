//! Level measurements shared by every stage
//!
//! Feature-table dB conversions floor at [`MIN_DB`] so silent input never
//! produces `-inf`. Seam comparisons use [`linear_to_db_unfloored`] instead,
//! where a perfect match should read far below the floor.

/// Floor for every dB conversion
pub const MIN_DB: f32 = -80.0;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Root-mean-square amplitude (0.0 for empty input)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Absolute peak amplitude (0.0 for empty input)
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|x| x.abs()).fold(0.0f32, f32::max)
}

/// Absolute value of the mean (DC offset)
pub fn bias(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&x| x as f64).sum();
    (sum / samples.len() as f64).abs() as f32
}

/// Peak / RMS ratio (0.0 when the RMS is below epsilon)
pub fn crest_factor(samples: &[f32]) -> f32 {
    let r = rms(samples);
    if r <= EPSILON {
        0.0
    } else {
        peak(samples) / r
    }
}

/// Convert a linear amplitude to dB, floored at [`MIN_DB`]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= EPSILON {
        return MIN_DB;
    }
    (20.0 * linear.log10()).max(MIN_DB)
}

/// `20·log10(linear + 1e-12)`, no floor
pub fn linear_to_db_unfloored(linear: f32) -> f32 {
    20.0 * (linear.max(0.0) as f64 + 1e-12).log10() as f32
}

/// Convert dB to a linear amplitude
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// RMS level in dB, floored at [`MIN_DB`]
pub fn rms_db(samples: &[f32]) -> f32 {
    linear_to_db(rms(samples))
}
