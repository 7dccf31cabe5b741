//! Example: Render every texture kind from one source
//!
//! Writes pads, drones, clouds, hiss loops and flickers as WAV files plus a
//! JSON manifest of their metadata.
//!
//! Usage: cargo run --example make_textures -- <source.wav> <out_dir> [config.toml]

use std::fs;
use std::path::{Path, PathBuf};

use afterglow_dsp::{
    load_wav, make_clouds, make_drones, make_hiss, mine_pads, rng_from_seed, save_wav, TextureConfig,
    TextureOutput,
};

fn write_outputs(
    outputs: &[TextureOutput],
    stem: &str,
    out_dir: &Path,
    config: &TextureConfig,
    manifest: &mut Vec<serde_json::Value>,
) -> Result<(), Box<dyn std::error::Error>> {
    let encoding = config.output_encoding()?;
    for (i, output) in outputs.iter().enumerate() {
        let meta = &output.metadata;
        let mut name = match &output.variant {
            Some(variant) => format!("{}_{}", stem, variant),
            None => format!("{}_{}_{:02}", stem, meta.kind.label(), i + 1),
        };
        if let Some(b) = meta.brightness {
            name.push('_');
            name.push_str(b.label());
        }
        name.push_str(".wav");

        let path: PathBuf = out_dir.join(&name);
        save_wav(&path, &output.audio, encoding)?;
        log::info!("Wrote {} ({:?})", path.display(), meta.grade);

        let mut entry = serde_json::to_value(meta)?;
        entry["file"] = serde_json::Value::String(name);
        if let Some(variant) = &output.variant {
            entry["variant"] = serde_json::Value::String(variant.clone());
        }
        manifest.push(entry);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("Usage: make_textures <source.wav> <out_dir> [config.toml]");
        std::process::exit(2);
    }
    let config = match args.get(2) {
        Some(c) => TextureConfig::from_file(c)?,
        None => TextureConfig::default(),
    };
    let out_dir = Path::new(&args[1]);
    fs::create_dir_all(out_dir)?;

    let source_path = Path::new(&args[0]);
    let stem = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("source")
        .to_string();
    let source = load_wav(source_path)?;
    let mut rng = rng_from_seed(config.reproducibility.random_seed);

    let pads = mine_pads(&source, &config)?;
    let drones = make_drones(&source, &config)?;
    let clouds = make_clouds(&source, &config, &mut rng)?;
    let hiss = make_hiss(Some(&source), &config, &mut rng)?;
    println!(
        "{}: {} pad(s), {} drone(s), {} cloud(s), {} hiss output(s)",
        stem,
        pads.len(),
        drones.len(),
        clouds.len(),
        hiss.len()
    );

    let mut manifest = Vec::new();
    for outputs in [&pads, &drones, &clouds, &hiss] {
        write_outputs(outputs, &stem, out_dir, &config, &mut manifest)?;
    }

    let manifest_path = out_dir.join(format!("{}_manifest.json", stem));
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
    println!("Manifest: {}", manifest_path.display());

    Ok(())
}
