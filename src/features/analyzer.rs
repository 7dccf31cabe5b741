//! Windowed feature analysis with cached stability masks
//!
//! A [`FeatureAnalyzer`] borrows one mono buffer and lazily computes
//! per-window quality signals over fixed `(window, hop)` windows that never
//! cross the buffer end (the trailing partial window is dropped):
//!
//! - energy (RMS dB, floored at -80 dB)
//! - bias (absolute mean)
//! - peak-to-energy ratio (crest factor)
//! - transient count (onsets per window)
//! - brightness (mean spectral centroid)
//!
//! Onsets and centroids come from a single shared STFT pass
//! ([`SpectralFeatures`]), computed at most once per analyzer.
//!
//! Stability masks are cached by their [`GateParameters`]; requesting the
//! same gates again returns the same `Rc` without recomputation.
//!
//! # Example
//!
//! ```no_run
//! use afterglow_dsp::features::analyzer::{FeatureAnalyzer, GateParameters};
//!
//! let samples = vec![0.1f32; 44100 * 5];
//! let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5)?;
//! let mask = analyzer.stability_mask(&GateParameters::default())?;
//! println!("{} of {} windows stable", mask.count_stable(), mask.len());
//! # Ok::<(), afterglow_dsp::TextureError>(())
//! ```

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, Range};
use std::rc::Rc;

use rand::Rng;

use super::levels::{bias, crest_factor, peak, rms, rms_db};
use super::spectral::SpectralFeatures;
use crate::error::{Result, TextureError};
use crate::io::validate_samples;

/// Energy the ranking prefers (dB RMS)
pub const IDEAL_ENERGY_DB: f32 = -24.0;

/// Ranges shorter than this report [`DEFAULT_CENTROID_HZ`]
const MIN_CENTROID_SAMPLES: usize = 512;

/// Neutral mid-range centroid for ranges too short to analyse
pub const DEFAULT_CENTROID_HZ: f32 = 2000.0;

/// Threshold gates for the stability mask
///
/// Equality and hashing are bit-exact on the float fields (with `-0.0`
/// folded into `0.0`), so two gate sets share a cache entry only when every
/// bound is identical.
#[derive(Debug, Clone, Copy)]
pub struct GateParameters {
    /// Minimum window energy (dB RMS)
    pub min_energy_db: f32,
    /// Maximum window energy (dB RMS)
    pub max_energy_db: f32,
    /// Bias must be strictly below this
    pub max_bias: f32,
    /// Peak-to-energy ratio must be strictly below this
    pub max_peak_ratio: f32,
    /// Onsets per second must not exceed this
    pub max_onset_rate: f32,
    /// Optional brightness band (Hz, inclusive)
    pub brightness_hz: Option<(f32, f32)>,
}

impl Default for GateParameters {
    fn default() -> Self {
        Self {
            min_energy_db: -40.0,
            max_energy_db: -10.0,
            max_bias: 0.1,
            max_peak_ratio: 10.0,
            max_onset_rate: 3.0,
            brightness_hz: None,
        }
    }
}

fn key_bits(value: f32) -> u32 {
    if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

impl GateParameters {
    /// Restrict stable windows to a brightness band
    pub fn with_brightness(mut self, low_hz: f32, high_hz: f32) -> Self {
        self.brightness_hz = Some((low_hz, high_hz));
        self
    }

    fn key(&self) -> [u32; 8] {
        let (flag, low, high) = match self.brightness_hz {
            Some((l, h)) => (1, key_bits(l), key_bits(h)),
            None => (0, 0, 0),
        };
        [
            key_bits(self.min_energy_db),
            key_bits(self.max_energy_db),
            key_bits(self.max_bias),
            key_bits(self.max_peak_ratio),
            key_bits(self.max_onset_rate),
            flag,
            low,
            high,
        ]
    }

    /// Check the gates are finite and their bounds ordered
    pub fn validate(&self) -> Result<()> {
        let all = [
            self.min_energy_db,
            self.max_energy_db,
            self.max_bias,
            self.max_peak_ratio,
            self.max_onset_rate,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(TextureError::InvalidParameter(format!(
                "Gate parameters must be finite: {:?}",
                self
            )));
        }
        if self.min_energy_db > self.max_energy_db {
            return Err(TextureError::InvalidParameter(format!(
                "Energy gate inverted: {} dB > {} dB",
                self.min_energy_db, self.max_energy_db
            )));
        }
        if self.max_bias < 0.0 || self.max_peak_ratio < 0.0 || self.max_onset_rate < 0.0 {
            return Err(TextureError::InvalidParameter(
                "Bias, peak-ratio and onset-rate gates must be >= 0".to_string(),
            ));
        }
        if let Some((low, high)) = self.brightness_hz {
            if !low.is_finite() || !high.is_finite() || low > high {
                return Err(TextureError::InvalidParameter(format!(
                    "Brightness gate inverted or non-finite: {} Hz .. {} Hz",
                    low, high
                )));
            }
        }
        Ok(())
    }
}

impl PartialEq for GateParameters {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for GateParameters {}

impl Hash for GateParameters {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Per-window pass/fail flags, aligned 1:1 with analysis windows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilityMask(Vec<bool>);

impl StabilityMask {
    /// Wrap raw flags
    pub fn new(flags: Vec<bool>) -> Self {
        Self(flags)
    }

    /// Number of passing windows
    pub fn count_stable(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    /// Maximal runs of passing windows at least `min_len` long
    pub fn runs(&self, min_len: usize) -> Vec<Range<usize>> {
        let min_len = min_len.max(1);
        let mut runs = Vec::new();
        let mut start: Option<usize> = None;
        for (i, &stable) in self.0.iter().enumerate() {
            match (stable, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= min_len {
                        runs.push(s..i);
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if self.0.len() - s >= min_len {
                runs.push(s..self.0.len());
            }
        }
        runs
    }
}

impl Deref for StabilityMask {
    type Target = [bool];

    fn deref(&self) -> &[bool] {
        &self.0
    }
}

/// Level curves that need no spectral analysis
#[derive(Debug)]
struct LevelCurves {
    energy_db: Vec<f32>,
    bias: Vec<f32>,
    peak_ratio: Vec<f32>,
}

/// Windowed curves derived from the shared STFT
#[derive(Debug)]
struct SpectralCurves {
    transient_count: Vec<usize>,
    brightness_hz: Vec<f32>,
}

/// Borrowed view of every per-window feature
#[derive(Debug, Clone, Copy)]
pub struct FeatureTable<'t> {
    /// RMS energy per window (dB)
    pub energy_db: &'t [f32],
    /// Onset count per window
    pub transient_count: &'t [usize],
    /// Absolute mean per window
    pub bias: &'t [f32],
    /// Peak / RMS per window
    pub peak_to_energy_ratio: &'t [f32],
    /// Mean spectral centroid per window (Hz)
    pub brightness_hz: &'t [f32],
}

/// Summary statistics of an arbitrary sample range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeStats {
    /// RMS level (dB)
    pub rms_db: f32,
    /// Absolute mean
    pub bias: f32,
    /// Peak / (RMS + 1e-6)
    pub crest_factor: f32,
    /// Mean spectral centroid (Hz)
    pub centroid_hz: f32,
}

/// Cached windowed analysis of one mono buffer
#[derive(Debug)]
pub struct FeatureAnalyzer<'a> {
    samples: &'a [f32],
    sample_rate: u32,
    window: usize,
    hop: usize,
    levels: OnceCell<LevelCurves>,
    spectral: OnceCell<SpectralFeatures>,
    spectral_curves: OnceCell<SpectralCurves>,
    masks: RefCell<HashMap<GateParameters, Rc<StabilityMask>>>,
}

impl<'a> FeatureAnalyzer<'a> {
    /// Create an analyzer over `samples`
    ///
    /// # Arguments
    ///
    /// * `samples` - Mono samples (non-empty, finite)
    /// * `sample_rate` - Sample rate in Hz (> 0)
    /// * `window_size_sec` - Window length in seconds (> 0)
    /// * `hop_sec` - Hop in seconds (>= 0; 0 means non-overlapping windows)
    ///
    /// A window longer than the buffer collapses window and hop to the
    /// buffer length (single-window mode).
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a zero sample rate, non-positive window or
    /// negative hop; `InvalidInput` for empty or non-finite samples.
    pub fn new(samples: &'a [f32], sample_rate: u32, window_size_sec: f32, hop_sec: f32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TextureError::InvalidParameter(
                "Sample rate must be > 0".to_string(),
            ));
        }
        if !(window_size_sec > 0.0) || !window_size_sec.is_finite() {
            return Err(TextureError::InvalidParameter(format!(
                "Window size must be > 0 seconds, got {}",
                window_size_sec
            )));
        }
        if !(hop_sec >= 0.0) || !hop_sec.is_finite() {
            return Err(TextureError::InvalidParameter(format!(
                "Hop must be >= 0 seconds, got {}",
                hop_sec
            )));
        }
        validate_samples(samples)?;

        let mut window = ((window_size_sec * sample_rate as f32) as usize).max(1);
        let mut hop = (hop_sec * sample_rate as f32) as usize;
        if hop == 0 {
            hop = window;
        }
        if window > samples.len() {
            window = samples.len();
            hop = samples.len();
        }

        log::debug!(
            "FeatureAnalyzer: {} samples, window={} hop={} ({} windows)",
            samples.len(),
            window,
            hop,
            (samples.len() - window) / hop + 1
        );

        Ok(Self {
            samples,
            sample_rate,
            window,
            hop,
            levels: OnceCell::new(),
            spectral: OnceCell::new(),
            spectral_curves: OnceCell::new(),
            masks: RefCell::new(HashMap::new()),
        })
    }

    /// The analysed samples
    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Window length in samples
    pub fn window_size(&self) -> usize {
        self.window
    }

    /// Hop in samples
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Number of full windows
    pub fn window_count(&self) -> usize {
        (self.samples.len() - self.window) / self.hop + 1
    }

    /// Sample span of window `idx`, clamped to the buffer
    pub fn window_range(&self, idx: usize) -> Range<usize> {
        let start = (idx * self.hop).min(self.samples.len());
        let end = (start + self.window).min(self.samples.len());
        start..end
    }

    fn window_sec(&self) -> f32 {
        self.window as f32 / self.sample_rate as f32
    }

    fn levels(&self) -> &LevelCurves {
        self.levels.get_or_init(|| {
            let n = self.window_count();
            let mut curves = LevelCurves {
                energy_db: Vec::with_capacity(n),
                bias: Vec::with_capacity(n),
                peak_ratio: Vec::with_capacity(n),
            };
            for i in 0..n {
                let segment = &self.samples[self.window_range(i)];
                curves.energy_db.push(rms_db(segment));
                curves.bias.push(bias(segment));
                curves.peak_ratio.push(crest_factor(segment));
            }
            curves
        })
    }

    /// Shared STFT-derived features (computed on first use)
    pub fn spectral_features(&self) -> Result<&SpectralFeatures> {
        if let Some(features) = self.spectral.get() {
            return Ok(features);
        }
        let features = SpectralFeatures::compute(self.samples, self.sample_rate)?;
        Ok(self.spectral.get_or_init(|| features))
    }

    fn spectral_curves(&self) -> Result<&SpectralCurves> {
        if let Some(curves) = self.spectral_curves.get() {
            return Ok(curves);
        }
        let spectral = self.spectral_features()?;
        let n = self.window_count();
        let mut curves = SpectralCurves {
            transient_count: Vec::with_capacity(n),
            brightness_hz: Vec::with_capacity(n),
        };
        for i in 0..n {
            let range = self.window_range(i);
            curves.transient_count.push(spectral.onset_count(range.start, range.end));
            curves.brightness_hz.push(spectral.mean_centroid(range.start, range.end));
        }
        Ok(self.spectral_curves.get_or_init(|| curves))
    }

    /// RMS energy per window in dB (floored at -80 dB)
    pub fn energy_curve(&self) -> &[f32] {
        &self.levels().energy_db
    }

    /// Absolute mean per window
    pub fn bias(&self) -> &[f32] {
        &self.levels().bias
    }

    /// Peak / RMS per window (0.0 for silent windows)
    pub fn peak_to_energy_ratio(&self) -> &[f32] {
        &self.levels().peak_ratio
    }

    /// Onset count per window
    pub fn transient_density(&self) -> Result<&[usize]> {
        Ok(&self.spectral_curves()?.transient_count)
    }

    /// Mean spectral centroid per window (Hz)
    pub fn brightness(&self) -> Result<&[f32]> {
        Ok(&self.spectral_curves()?.brightness_hz)
    }

    /// Every per-window feature at once
    pub fn feature_table(&self) -> Result<FeatureTable<'_>> {
        let spectral = self.spectral_curves()?;
        let levels = self.levels();
        Ok(FeatureTable {
            energy_db: &levels.energy_db,
            transient_count: &spectral.transient_count,
            bias: &levels.bias,
            peak_to_energy_ratio: &levels.peak_ratio,
            brightness_hz: &spectral.brightness_hz,
        })
    }

    /// Windows passing every gate
    ///
    /// Cached per distinct `gates`; a repeated request returns the cached
    /// mask.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the gates are inverted or non-finite
    pub fn stability_mask(&self, gates: &GateParameters) -> Result<Rc<StabilityMask>> {
        gates.validate()?;
        if let Some(mask) = self.masks.borrow().get(gates) {
            log::debug!("Stability mask cache hit");
            return Ok(Rc::clone(mask));
        }

        let table = self.feature_table()?;
        let window_sec = self.window_sec();
        let flags: Vec<bool> = (0..self.window_count())
            .map(|i| {
                let energy = table.energy_db[i];
                let rate = table.transient_count[i] as f32 / window_sec;
                let bright_ok = match gates.brightness_hz {
                    Some((low, high)) => (low..=high).contains(&table.brightness_hz[i]),
                    None => true,
                };
                energy >= gates.min_energy_db
                    && energy <= gates.max_energy_db
                    && table.bias[i] < gates.max_bias
                    && table.peak_to_energy_ratio[i] < gates.max_peak_ratio
                    && rate <= gates.max_onset_rate
                    && bright_ok
            })
            .collect();

        let mask = Rc::new(StabilityMask::new(flags));
        log::debug!(
            "Stability mask: {}/{} windows stable",
            mask.count_stable(),
            mask.len()
        );
        self.masks.borrow_mut().insert(*gates, Rc::clone(&mask));
        Ok(mask)
    }

    /// Window indices, most usable first
    ///
    /// Passing windows are ordered by ascending transient count, then by
    /// distance from [`IDEAL_ENERGY_DB`]. When no window passes, every window
    /// is ranked instead.
    pub fn ranked_windows(&self, gates: &GateParameters) -> Result<Vec<usize>> {
        let mask = self.stability_mask(gates)?;
        let table = self.feature_table()?;

        let mut indices: Vec<usize> = (0..mask.len()).filter(|&i| mask[i]).collect();
        if indices.is_empty() {
            log::debug!("No window passes the gates, ranking all {} windows", mask.len());
            indices = (0..self.window_count()).collect();
        }

        indices.sort_by(|&a, &b| {
            let da = (table.energy_db[a] - IDEAL_ENERGY_DB).abs();
            let db = (table.energy_db[b] - IDEAL_ENERGY_DB).abs();
            table.transient_count[a]
                .cmp(&table.transient_count[b])
                .then(da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal))
        });
        Ok(indices)
    }

    /// Pick a random region that starts inside a long-enough stable run
    ///
    /// # Arguments
    ///
    /// * `duration_sec` - Requested region length
    /// * `min_consecutive_windows` - Minimum run length (in windows)
    /// * `mask` - Mask to search (usually from [`Self::stability_mask`])
    /// * `rng` - Random source
    ///
    /// # Returns
    ///
    /// `(start, end)` sample positions with `start < end`, `end` clamped to
    /// the buffer; `None` when no run qualifies. `start == 0` is a valid
    /// result.
    pub fn sample_from_stable_run<R: Rng>(
        &self,
        duration_sec: f32,
        min_consecutive_windows: usize,
        mask: &StabilityMask,
        rng: &mut R,
    ) -> Option<(usize, usize)> {
        let usable = mask.len().min(self.window_count());
        let truncated = StabilityMask::new(mask[..usable].to_vec());
        let runs = truncated.runs(min_consecutive_windows);
        if runs.is_empty() {
            return None;
        }

        let run = &runs[rng.gen_range(0..runs.len())];
        let window_idx = rng.gen_range(run.clone());
        let start = self.window_range(window_idx).start;
        let duration = ((duration_sec.max(0.0) * self.sample_rate as f32) as usize).max(1);
        let end = (start + duration).min(self.samples.len());
        if end <= start {
            return None;
        }
        Some((start, end))
    }

    /// Statistics of an arbitrary sample range (clamped to the buffer)
    pub fn stats_for_range(&self, start: usize, end: usize) -> Result<RangeStats> {
        let end = end.min(self.samples.len());
        let start = start.min(end);
        let segment = &self.samples[start..end];

        let centroid_hz = if segment.len() >= MIN_CENTROID_SAMPLES {
            self.spectral_features()?.mean_centroid(start, end)
        } else {
            DEFAULT_CENTROID_HZ
        };

        Ok(RangeStats {
            rms_db: rms_db(segment),
            bias: bias(segment),
            crest_factor: peak(segment) / (rms(segment) + 1e-6),
            centroid_hz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::hash_map::DefaultHasher;

    fn tone(seconds: f32, amplitude: f32) -> Vec<f32> {
        let sr = 44100.0;
        (0..(seconds * sr) as usize)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr).sin())
            .collect()
    }

    fn hash_of(gates: &GateParameters) -> u64 {
        let mut h = DefaultHasher::new();
        gates.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_invalid_construction() {
        let samples = tone(1.0, 0.1);
        assert!(FeatureAnalyzer::new(&samples, 0, 1.0, 0.5).is_err());
        assert!(FeatureAnalyzer::new(&samples, 44100, 0.0, 0.5).is_err());
        assert!(FeatureAnalyzer::new(&samples, 44100, 1.0, -0.1).is_err());
        assert!(FeatureAnalyzer::new(&[], 44100, 1.0, 0.5).is_err());
    }

    #[test]
    fn test_window_count_drops_partial_window() {
        let samples = tone(5.2, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();
        // starts at 0, 0.5, ..., 4.0 -> 9 windows; 4.5 would overrun
        assert_eq!(analyzer.window_count(), 9);
        assert_eq!(analyzer.energy_curve().len(), 9);
        assert_eq!(analyzer.window_range(8), 176400..220500);
    }

    #[test]
    fn test_single_window_mode() {
        let samples = tone(0.3, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();
        assert_eq!(analyzer.window_count(), 1);
        assert_eq!(analyzer.window_size(), samples.len());
        assert_eq!(analyzer.hop(), samples.len());
    }

    #[test]
    fn test_zero_hop_means_adjacent_windows() {
        let samples = tone(3.0, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.0).unwrap();
        assert_eq!(analyzer.hop(), 44100);
        assert_eq!(analyzer.window_count(), 3);
    }

    #[test]
    fn test_energy_curve_of_tone() {
        let samples = tone(2.0, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();
        for &e in analyzer.energy_curve() {
            // 0.1 amplitude sine -> -23 dB RMS
            assert!((e - (-23.0)).abs() < 0.2, "energy {}", e);
        }
        for &r in analyzer.peak_to_energy_ratio() {
            assert!((r - std::f32::consts::SQRT_2).abs() < 0.01);
        }
    }

    #[test]
    fn test_mask_cache_is_keyed() {
        let samples = tone(3.0, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();

        let gates = GateParameters::default();
        let first = analyzer.stability_mask(&gates).unwrap();
        let again = analyzer.stability_mask(&gates).unwrap();
        assert!(Rc::ptr_eq(&first, &again), "identical gates must hit the cache");
        assert_eq!(first.len(), analyzer.window_count());

        let strict = GateParameters {
            min_energy_db: -5.0,
            max_energy_db: 0.0,
            ..gates
        };
        let other = analyzer.stability_mask(&strict).unwrap();
        assert!(!Rc::ptr_eq(&first, &other));
        assert_eq!(other.count_stable(), 0);
        assert!(first.count_stable() > 0);
    }

    #[test]
    fn test_gate_equality_and_hash() {
        let a = GateParameters::default();
        let b = GateParameters::default();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let neg_zero = GateParameters { max_bias: -0.0, ..a };
        let pos_zero = GateParameters { max_bias: 0.0, ..a };
        assert_eq!(neg_zero, pos_zero);
        assert_eq!(hash_of(&neg_zero), hash_of(&pos_zero));

        assert_ne!(a, a.with_brightness(0.0, 0.0));
        assert_ne!(a.with_brightness(100.0, 200.0), a.with_brightness(100.0, 300.0));
    }

    #[test]
    fn test_inverted_gates_rejected() {
        let samples = tone(1.0, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();
        let gates = GateParameters {
            min_energy_db: -10.0,
            max_energy_db: -40.0,
            ..Default::default()
        };
        assert!(analyzer.stability_mask(&gates).is_err());
        assert!(analyzer
            .stability_mask(&GateParameters::default().with_brightness(5000.0, 100.0))
            .is_err());
    }

    #[test]
    fn test_spectral_pass_is_shared() {
        let samples = tone(2.0, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();
        let a = analyzer.spectral_features().unwrap() as *const SpectralFeatures;
        analyzer.brightness().unwrap();
        analyzer.transient_density().unwrap();
        analyzer.stats_for_range(0, 10000).unwrap();
        let b = analyzer.spectral_features().unwrap() as *const SpectralFeatures;
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_brightness_gate() {
        let samples = tone(2.0, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();
        let dark = GateParameters::default().with_brightness(0.0, 1000.0);
        let bright = GateParameters::default().with_brightness(3000.0, 20000.0);
        assert!(analyzer.stability_mask(&dark).unwrap().count_stable() > 0);
        assert_eq!(analyzer.stability_mask(&bright).unwrap().count_stable(), 0);
    }

    #[test]
    fn test_ranked_windows_falls_back_to_all() {
        let mut samples = tone(3.0, 0.1);
        // constant-dB fade in over the first two seconds: 40 dB, no onset
        for (i, s) in samples.iter_mut().enumerate().take(88200) {
            *s *= 10f32.powf(-2.0 + 2.0 * i as f32 / 88200.0);
        }
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();
        let impossible = GateParameters {
            min_energy_db: -2.0,
            max_energy_db: -1.0,
            ..Default::default()
        };
        let ranked = analyzer.ranked_windows(&impossible).unwrap();
        assert_eq!(ranked.len(), analyzer.window_count());
        // the quiet first window is furthest from -24 dB
        assert_eq!(*ranked.last().unwrap(), 0);
    }

    #[test]
    fn test_steady_tone_has_no_transients() {
        let samples = tone(3.0, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();
        assert_eq!(analyzer.transient_density().unwrap(), &[0, 0, 0, 0, 0]);
        assert_eq!(
            analyzer.stability_mask(&GateParameters::default()).unwrap().count_stable(),
            5
        );
    }

    #[test]
    fn test_runs() {
        let mask = StabilityMask::new(vec![true, true, false, true, false, true, true, true]);
        assert_eq!(mask.runs(2), vec![0..2, 5..8]);
        assert_eq!(mask.runs(1), vec![0..2, 3..4, 5..8]);
        assert!(mask.runs(4).is_empty());
    }

    #[test]
    fn test_stable_run_can_start_at_zero() {
        let samples = tone(5.0, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();
        let mask = StabilityMask::new(
            (0..analyzer.window_count()).map(|i| i < 2).collect(),
        );
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let (start, end) = analyzer
                .sample_from_stable_run(1.0, 2, &mask, &mut rng)
                .expect("run of two windows qualifies");
            assert!(start == 0 || start == 22050);
            assert!(start < end);
        }
    }

    #[test]
    fn test_stable_run_none_when_runs_too_short() {
        let samples = tone(5.0, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();
        let mask = StabilityMask::new(vec![true, false, true, false, true, false, false, false, false]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(analyzer.sample_from_stable_run(1.0, 2, &mask, &mut rng).is_none());
    }

    #[test]
    fn test_stats_for_short_range_uses_default_centroid() {
        let samples = tone(1.0, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();
        let stats = analyzer.stats_for_range(100, 300).unwrap();
        assert_eq!(stats.centroid_hz, DEFAULT_CENTROID_HZ);
        let stats = analyzer.stats_for_range(0, 44100).unwrap();
        assert!((stats.centroid_hz - 440.0).abs() < 200.0, "centroid {}", stats.centroid_hz);
    }
}
