//! Integration tests for the texture engine

use std::rc::Rc;

use afterglow_dsp::features::levels::{linear_to_db, peak, rms};
use afterglow_dsp::looping::crossfade;
use afterglow_dsp::preprocessing::normalization::normalize_peak;
use afterglow_dsp::{
    load_wav, make_clouds, make_drones, make_hiss, make_loopable, mine_pads, rng_from_seed, save_wav, synthesize,
    AudioBuffer, CloudParams, FadeCurve, FeatureAnalyzer, GateParameters, Grade, GrainExtractionParams,
    GrainExtractor, TextureConfig, TextureError, TextureKind, WavEncoding,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SR: u32 = 44100;

fn tone(freq: f32, seconds: f32, amplitude: f32) -> Vec<f32> {
    (0..(seconds * SR as f32) as usize)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin())
        .collect()
}

fn noise(len: usize, amplitude: f32, rng: &mut StdRng) -> Vec<f32> {
    (0..len).map(|_| rng.gen_range(-amplitude..=amplitude)).collect()
}

/// Small, fast pipeline configuration
fn test_config() -> TextureConfig {
    let mut config = TextureConfig::default();
    config.clouds.grains_per_cloud = 40;
    config.clouds.cloud_duration_sec = 1.0;
    config.clouds.clouds_per_source = 2;
    config.reproducibility.random_seed = Some(1234);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_length_and_caching() {
        let samples = tone(440.0, 4.0, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, SR, 1.0, 0.5).unwrap();

        let gates = GateParameters::default();
        let first = analyzer.stability_mask(&gates).unwrap();
        let again = analyzer.stability_mask(&gates).unwrap();
        assert_eq!(first.len(), analyzer.window_count());
        assert!(Rc::ptr_eq(&first, &again), "identical gates should hit the cache");

        let other = GateParameters {
            max_onset_rate: 1.0,
            ..gates
        };
        let different = analyzer.stability_mask(&other).unwrap();
        assert!(!Rc::ptr_eq(&first, &different), "different gates get their own entry");
    }

    #[test]
    fn test_stable_run_can_start_at_zero() {
        // 5 s sustained tone, window 1.0 s, hop 0.5 s, min run 2
        let samples = tone(440.0, 5.0, 0.1);
        let analyzer = FeatureAnalyzer::new(&samples, SR, 1.0, 0.5).unwrap();
        let mask = analyzer.stability_mask(&GateParameters::default()).unwrap();
        assert!(mask.count_stable() >= 2);

        let mut saw_zero = false;
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (start, end) = analyzer
                .sample_from_stable_run(0.5, 2, &mask, &mut rng)
                .expect("a sustained tone always has a stable run");
            assert!(end > start && end <= samples.len());
            saw_zero |= start == 0;
        }
        assert!(saw_zero, "start == 0 is a valid placement and should occur");
    }

    #[test]
    fn test_noisy_sine_has_stable_window() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut samples = tone(440.0, 3.0, 0.2);
        for (s, n) in samples.iter_mut().zip(noise(3 * SR as usize, 0.005, &mut rng)) {
            *s += n;
        }
        let analyzer = FeatureAnalyzer::new(&samples, SR, 0.5, 0.25).unwrap();
        let generous = GateParameters {
            min_energy_db: -60.0,
            max_energy_db: 0.0,
            max_bias: 0.5,
            max_peak_ratio: 20.0,
            max_onset_rate: 10.0,
            brightness_hz: None,
        };
        let mask = analyzer.stability_mask(&generous).unwrap();
        assert!(mask.count_stable() >= 1);
    }

    #[test]
    fn test_silent_normalization_is_silent_signal() {
        let err = normalize_peak(&[0.0; 1024], -1.0).unwrap_err();
        assert!(matches!(err, TextureError::SilentSignal { .. }));
    }

    #[test]
    fn test_optimized_loop_never_grows() {
        let mut rng = StdRng::seed_from_u64(8);
        for len in [4410usize, 22050, 88200] {
            let mut samples = tone(97.0, len as f32 / SR as f32, 0.3);
            for (s, n) in samples.iter_mut().zip(noise(len, 0.02, &mut rng)) {
                *s += n;
            }
            let cf = (0.05 * SR as f32) as usize;
            let looped = make_loopable(&samples, 50.0, SR, true, FadeCurve::EqualPower).unwrap();
            assert!(looped.len() <= samples.len());
            let clamped_cf = cf.min(len / 2);
            assert!(
                looped.len() + len / 4 + clamped_cf >= len,
                "trim exceeded a quarter: {} -> {}",
                len,
                looped.len()
            );
        }
    }

    #[test]
    fn test_grains_meet_minimum_length() {
        let mut rng = StdRng::seed_from_u64(17);
        let samples = noise(SR as usize, 0.3, &mut rng);
        let params = GrainExtractionParams::new(30.0, 90.0, 50).with_quality_gate(0.2);
        let (min_len, _) = params.length_range(SR);
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grains = GrainExtractor::default()
                .extract(&samples, &params, SR, None, &mut rng)
                .unwrap();
            assert!(!grains.is_empty());
            assert!(grains.iter().all(|g| g.len() >= min_len));
        }
    }

    #[test]
    fn test_very_short_cloud() {
        let samples = tone(330.0, 1.0, 0.3);
        let mut rng = StdRng::seed_from_u64(2);
        let grains = GrainExtractor::default()
            .extract(&samples, &GrainExtractionParams::new(20.0, 60.0, 16), SR, None, &mut rng)
            .unwrap();
        let params = CloudParams {
            duration_sec: 0.05,
            ..CloudParams::default()
        };
        let cloud = synthesize(&grains, &params, SR, &mut rng).unwrap();
        assert!(!cloud.is_empty());
        assert!(peak(&cloud) > 0.0);
    }

    #[test]
    fn test_clouds_same_duration_with_and_without_pre_analysis() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut samples = tone(220.0, 4.0, 0.2);
        for (s, n) in samples.iter_mut().zip(noise(4 * SR as usize, 0.01, &mut rng)) {
            *s += n;
        }
        let source = AudioBuffer::mono(samples, SR).unwrap();

        let mut with = test_config();
        with.pre_analysis.enabled = true;
        let mut without = test_config();
        without.pre_analysis.enabled = false;

        let a = make_clouds(&source, &with, &mut rng_from_seed(Some(1))).unwrap();
        let b = make_clouds(&source, &without, &mut rng_from_seed(Some(1))).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);
        for out in a.iter().chain(&b) {
            assert_eq!(out.audio.frames(), SR as usize);
            assert_eq!(out.metadata.kind, TextureKind::Cloud);
            let target = linear_to_db(out.metadata.peak);
            assert!((target - (-1.0)).abs() < 0.01, "peak {} dBFS", target);
        }
    }

    #[test]
    fn test_silent_source_yields_no_clouds() {
        let source = AudioBuffer::mono(vec![0.0; 2 * SR as usize], SR).unwrap();
        let outputs = make_clouds(&source, &test_config(), &mut rng_from_seed(Some(3))).unwrap();
        assert!(outputs.is_empty());
    }

    #[test]
    fn test_stereo_source_is_folded() {
        let left = tone(220.0, 3.0, 0.2);
        let interleaved: Vec<f32> = left.iter().flat_map(|&s| [s, s]).collect();
        let source = AudioBuffer::new(interleaved, SR, 2).unwrap();
        let outputs = make_clouds(&source, &test_config(), &mut rng_from_seed(Some(4))).unwrap();
        assert!(!outputs.is_empty());
        assert!(outputs.iter().all(|o| o.audio.is_mono()));
    }

    #[test]
    fn test_mine_pads_from_sustained_tone() {
        let source = AudioBuffer::mono(tone(220.0, 6.0, 0.1), SR).unwrap();
        let pads = mine_pads(&source, &test_config()).unwrap();
        assert!(!pads.is_empty() && pads.len() <= 3);
        for pad in &pads {
            assert!(pad.audio.frames() <= 2 * SR as usize);
            assert_eq!(pad.metadata.kind, TextureKind::Pad);
            let f0 = pad.metadata.est_freq_hz.expect("pads carry a pitch estimate");
            assert!((f0 - 220.0).abs() < 3.0, "f0 {}", f0);
            assert_ne!(pad.metadata.grade, Some(Grade::F));
        }
    }

    #[test]
    fn test_mine_pads_short_source_is_empty() {
        let source = AudioBuffer::mono(tone(220.0, 1.0, 0.1), SR).unwrap();
        assert!(mine_pads(&source, &test_config()).unwrap().is_empty());
    }

    #[test]
    fn test_make_drones_from_pad_source() {
        let mut rng = StdRng::seed_from_u64(77);
        let samples: Vec<f32> = tone(220.0, 8.0, 0.2)
            .into_iter()
            .zip(noise(8 * SR as usize, 0.01, &mut rng))
            .map(|(t, n)| t + n)
            .collect();
        let source = AudioBuffer::mono(samples, SR).unwrap();
        let config = test_config();
        let drones = make_drones(&source, &config).unwrap();

        // original, +7, +12, each with 3 colours, a swell and a reversed loop
        assert_eq!(drones.len(), 15);
        for d in &drones {
            let variant = d.variant.as_deref().expect("drones carry a variant tag");
            let level = linear_to_db(peak(d.audio.samples()));
            assert!((level - config.global.target_peak_dbfs).abs() < 0.05, "{} peak {}", variant, level);
            let expected = if variant.ends_with("_swell") { TextureKind::Swell } else { TextureKind::Pad };
            assert_eq!(d.metadata.kind, expected, "{}", variant);
        }

        let octave_swell = drones
            .iter()
            .find(|d| d.variant.as_deref() == Some("pitch_+12_swell"))
            .unwrap();
        let f0 = octave_swell.metadata.est_freq_hz.unwrap();
        assert!((f0 - 440.0).abs() < 10.0, "f0 {}", f0);

        let mut reversal_off = config.clone();
        reversal_off.drones.enable_reversal = false;
        reversal_off.drones.pitch_shift_semitones = vec![0.0];
        assert_eq!(make_drones(&source, &reversal_off).unwrap().len(), 4);
    }

    #[test]
    fn test_synthetic_hiss() {
        let config = test_config();
        let mut rng = rng_from_seed(config.reproducibility.random_seed);
        let outputs = make_hiss(None, &config, &mut rng).unwrap();
        assert_eq!(outputs.len(), config.hiss.hiss_loops_per_source + config.hiss.flicker_count);
        assert!(outputs.iter().any(|o| o.metadata.kind == TextureKind::HissLoop));
        assert!(outputs.iter().any(|o| o.metadata.kind == TextureKind::Flicker));

        let mut disabled = config.clone();
        disabled.hiss.use_synthetic_noise = false;
        assert!(make_hiss(None, &disabled, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_propagates() {
        let mut config = test_config();
        config.clouds.overlap_ratio = 1.5;
        let source = AudioBuffer::mono(tone(220.0, 2.0, 0.2), SR).unwrap();
        assert!(matches!(
            make_clouds(&source, &config, &mut rng_from_seed(Some(0))),
            Err(TextureError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pad.wav");
        let original = AudioBuffer::mono(tone(440.0, 0.5, 0.5), SR).unwrap();
        save_wav(&path, &original, WavEncoding::Pcm24).unwrap();

        let loaded = load_wav(&path).unwrap();
        assert_eq!(loaded.sample_rate(), SR);
        assert_eq!(loaded.frames(), original.frames());
        let max_err = original
            .samples()
            .iter()
            .zip(loaded.samples())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_err < 1e-5, "24-bit round trip error {}", max_err);
    }

    #[test]
    fn test_seeded_pipeline_is_deterministic() {
        let source = AudioBuffer::mono(tone(180.0, 3.0, 0.2), SR).unwrap();
        let config = test_config();
        let a = make_clouds(&source, &config, &mut rng_from_seed(Some(9))).unwrap();
        let b = make_clouds(&source, &config, &mut rng_from_seed(Some(9))).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.audio.samples(), y.audio.samples());
        }
    }
}

/// Level change (dB) of the crossfade midpoint relative to the inputs
fn midpoint_dip_db(curve: FadeCurve, seed: u64) -> f32 {
    let mut rng = StdRng::seed_from_u64(seed);
    let fade = 8192;
    let a = noise(fade, 0.5, &mut rng);
    let b = noise(fade, 0.5, &mut rng);
    let joined = crossfade(&a, &b, fade, curve);
    let mid = fade / 2 - 512..fade / 2 + 512;
    let reference = ((rms(&a[mid.clone()]).powi(2) + rms(&b[mid.clone()]).powi(2)) / 2.0).sqrt();
    20.0 * (rms(&joined[mid]) / reference).log10()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_normalize_hits_target(
        samples in prop::collection::vec(-1.0f32..1.0, 1..2048),
        target in -30.0f32..0.0,
    ) {
        match normalize_peak(&samples, target) {
            Ok(out) => {
                let p = peak(&out);
                prop_assert!((linear_to_db(p) - target).abs() < 0.01);
                prop_assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
            }
            Err(e) => prop_assert!(e.is_silent()),
        }
    }

    #[test]
    fn prop_equal_power_is_flatter_than_linear(seed in any::<u64>()) {
        let equal = midpoint_dip_db(FadeCurve::EqualPower, seed).abs();
        let linear = midpoint_dip_db(FadeCurve::Linear, seed).abs();
        prop_assert!(equal < linear, "equal-power {:.2} dB vs linear {:.2} dB", equal, linear);
    }
}
