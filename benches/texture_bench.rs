//! Performance benchmarks for analysis and cloud synthesis

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use afterglow_dsp::granular::Placement;
use afterglow_dsp::{
    make_loopable, synthesize, CloudParams, FadeCurve, FeatureAnalyzer, GateParameters, GrainExtractionParams,
    GrainExtractor,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn source(seconds: usize) -> Vec<f32> {
    (0..44100 * seconds)
        .map(|i| {
            let t = i as f32 / 44100.0;
            0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin() + 0.1 * (2.0 * std::f32::consts::PI * 331.0 * t).sin()
        })
        .collect()
}

fn bench_analyzer(c: &mut Criterion) {
    let samples = source(30);
    let gates = GateParameters::default();

    c.bench_function("stability_mask_30s", |b| {
        b.iter(|| {
            let analyzer = FeatureAnalyzer::new(black_box(&samples), 44100, 1.0, 0.5).unwrap();
            let mask = analyzer.stability_mask(black_box(&gates)).unwrap();
            black_box(mask.count_stable())
        });
    });
}

fn bench_cloud(c: &mut Criterion) {
    let samples = source(10);
    let analyzer = FeatureAnalyzer::new(&samples, 44100, 1.0, 0.5).unwrap();
    let placement = Placement::new(&analyzer, &GateParameters::default(), 2).unwrap();
    let params = GrainExtractionParams::new(50.0, 150.0, 200).with_quality_gate(0.4);
    let cloud_params = CloudParams {
        lowpass_hz: Some(8000.0),
        ..CloudParams::default()
    };

    c.bench_function("extract_and_synthesize_6s_cloud", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(42);
            let grains = GrainExtractor::default()
                .extract(&samples, &params, 44100, Some(&placement), &mut rng)
                .unwrap();
            black_box(synthesize(&grains, &cloud_params, 44100, &mut rng).unwrap())
        });
    });

    let cloud = {
        let mut rng = StdRng::seed_from_u64(1);
        let grains = GrainExtractor::default()
            .extract(&samples, &params, 44100, Some(&placement), &mut rng)
            .unwrap();
        synthesize(&grains, &cloud_params, 44100, &mut rng).unwrap()
    };
    c.bench_function("make_loopable_6s", |b| {
        b.iter(|| black_box(make_loopable(black_box(&cloud), 50.0, 44100, true, FadeCurve::EqualPower).unwrap()));
    });
}

criterion_group!(benches, bench_analyzer, bench_cloud);
criterion_main!(benches);
