//! Example: Mine pads and clouds from many files in parallel
//!
//! Each file gets its own RNG derived from the configured seed, so results
//! do not depend on scheduling. Prints one JSON line per file.
//!
//! Usage: cargo run --release --example batch_process -- [--jobs N] [--config cfg.toml] <file1.wav> ...

use std::time::Instant;

use afterglow_dsp::{load_wav, make_clouds, mine_pads, rng_from_seed, Grade, TextureConfig, TextureOutput};
use rayon::prelude::*;

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    n.saturating_sub(1).max(1)
}

fn count_grades(outputs: &[TextureOutput]) -> [usize; 3] {
    let mut counts = [0; 3];
    for o in outputs {
        match o.metadata.grade {
            Some(Grade::A) => counts[0] += 1,
            Some(Grade::B) => counts[1] += 1,
            Some(Grade::F) => counts[2] += 1,
            None => {}
        }
    }
    counts
}

fn process(path: &str, index: usize, config: &TextureConfig) -> serde_json::Value {
    let t0 = Instant::now();
    let seed = config.reproducibility.random_seed.map(|s| s.wrapping_add(index as u64));
    let mut rng = rng_from_seed(seed);

    let result = load_wav(path).and_then(|source| {
        let pads = mine_pads(&source, config)?;
        let clouds = make_clouds(&source, config, &mut rng)?;
        Ok((pads, clouds))
    });

    match result {
        Ok((pads, clouds)) => {
            let mut all = pads;
            let n_pads = all.len();
            all.extend(clouds);
            let [a, b, f] = count_grades(&all);
            serde_json::json!({
                "file": path,
                "pads": n_pads,
                "clouds": all.len() - n_pads,
                "grades": { "A": a, "B": b, "F": f },
                "processing_time_ms": t0.elapsed().as_secs_f64() * 1000.0,
            })
        }
        Err(e) => serde_json::json!({ "file": path, "error": e.to_string() }),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut jobs: Option<usize> = None;
    let mut config = TextureConfig::default();
    let mut paths: Vec<String> = Vec::new();

    while !args.is_empty() {
        let a = args.remove(0);
        match a.as_str() {
            "--jobs" => {
                let v = args.first().ok_or("--jobs requires a value")?.parse::<usize>()?;
                args.remove(0);
                jobs = Some(v.max(1));
            }
            "--config" => {
                let p = args.first().ok_or("--config requires a path")?.clone();
                args.remove(0);
                config = TextureConfig::from_file(p)?;
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: batch_process [--jobs N] [--config cfg.toml] <file1.wav> <file2.wav> ...\n\
                     \n\
                     --jobs N         Parallel workers (default: CPU-1)\n\
                     --config PATH    TOML configuration\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one WAV file. Use --help for usage.");
        std::process::exit(2);
    }
    config.validate()?;

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let lines: Vec<serde_json::Value> = pool.install(|| {
        paths
            .par_iter()
            .enumerate()
            .map(|(i, path)| process(path, i, &config))
            .collect()
    });

    let mut failed = 0;
    for line in &lines {
        if line.get("error").is_some() {
            failed += 1;
        }
        println!("{}", line);
    }
    eprintln!(
        "Done: ok={}/{} wall={:.0}ms",
        lines.len() - failed,
        lines.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
