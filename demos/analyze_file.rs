//! Example: Inspect one recording before mining it
//!
//! Prints whole-file metadata and how much of the file passes the default
//! stability gates.
//!
//! Usage: cargo run --example analyze_file -- <file.wav> [config.toml]

use afterglow_dsp::{compute_metadata, load_wav_mono, FeatureAnalyzer, TextureConfig, TextureKind};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = match args.next() {
        Some(p) => p,
        None => {
            eprintln!("Usage: analyze_file <file.wav> [config.toml]");
            std::process::exit(2);
        }
    };
    let config = match args.next() {
        Some(c) => TextureConfig::from_file(c)?,
        None => TextureConfig::default(),
    };

    let source = load_wav_mono(&path)?;
    let samples = source.samples();
    let sr = source.sample_rate();

    let meta = compute_metadata(samples, sr, TextureKind::Pad, config.brightness_tags.bounds())?;
    println!("{}", path);
    println!("  Duration: {:.2} s @ {} Hz", meta.duration_sec, sr);
    println!("  RMS: {:.1} dB, peak {:.3}, crest {:.2}", meta.rms_db, meta.peak, meta.crest_factor);
    println!("  Centroid: {:.0} Hz ({:?})", meta.centroid_hz, meta.brightness);
    if let Some(f0) = meta.est_freq_hz {
        println!("  Dominant pitch: {:.1} Hz", f0);
    }

    let pa = &config.pre_analysis;
    let analyzer = FeatureAnalyzer::new(samples, sr, pa.analysis_window_sec, pa.analysis_hop_sec)?;
    let gates = pa.gates();
    let mask = analyzer.stability_mask(&gates)?;
    let runs = mask.runs(pa.min_consecutive_windows);
    println!(
        "  Stable windows: {}/{} ({} run(s) of >= {} windows)",
        mask.count_stable(),
        mask.len(),
        runs.len(),
        pa.min_consecutive_windows
    );
    for run in runs.iter().take(5) {
        let start = analyzer.window_range(run.start).start;
        let end = analyzer.window_range(run.end - 1).end;
        let stats = analyzer.stats_for_range(start, end)?;
        println!(
            "    {:>7.2}s - {:>7.2}s  rms {:>6.1} dB  crest {:>5.2}  centroid {:>6.0} Hz",
            start as f32 / sr as f32,
            end as f32 / sr as f32,
            stats.rms_db,
            stats.crest_factor,
            stats.centroid_hz
        );
    }

    Ok(())
}
