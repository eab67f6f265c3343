use anyhow::{Context, bail};
use clap::Parser;
use membrane_cli::pgm::{self, Pgm};
use membrane_cli::synth::{
    HexLayout, VoltagePattern, circular_aperture, generate_voltages, hex_electrodes,
    sample_pattern,
};
use membrane_cli::voltages::format_voltages;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Writes a synthetic membrane mirror: aperture mask, hexagonal electrode
/// pattern and a voltage table, ready for `dm-response`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Output directory
    #[arg(long)]
    out: PathBuf,

    /// Grid size N (NxN)
    #[arg(long, default_value_t = 64)]
    n: usize,

    /// Aperture radius as a fraction of N
    #[arg(long, default_value_t = 0.45)]
    radius: f64,

    /// Hexagonal electrode rings around the centre (3 gives 37 electrodes)
    #[arg(long, default_value_t = 3)]
    rings: usize,

    /// Voltage pattern: uniform|random|defocus|tilt (sampled when omitted)
    #[arg(long)]
    pattern: Option<String>,

    /// Lowest voltage
    #[arg(long, default_value_t = 0)]
    v_min: i32,

    /// Highest voltage
    #[arg(long, default_value_t = 255)]
    v_max: i32,

    /// RNG seed (reproducibility)
    #[arg(long, default_value_t = 123)]
    seed: u64,
}

#[derive(Serialize)]
struct SynthMeta {
    n: usize,
    radius: f64,
    rings: usize,
    electrodes: usize,
    pitch: f64,

    seed: u64,
    pattern: String,
    v_min: i32,
    v_max: i32,

    aperture: String,
    electrode_pattern: String,
    voltages: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.n < 3 {
        bail!("n must be >= 3");
    }
    if !(args.radius > 0.0 && args.radius <= 0.5) {
        bail!("radius must lie in (0, 0.5]");
    }
    if !(0..=255).contains(&args.v_min) || !(0..=255).contains(&args.v_max) || args.v_min > args.v_max {
        bail!("need 0 <= v_min <= v_max <= 255");
    }

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let pattern = match args.pattern.as_deref() {
        Some(name) => VoltagePattern::parse(name)
            .with_context(|| format!("unknown pattern {name:?}"))?,
        None => sample_pattern(&mut rng),
    };

    let layout = HexLayout::new(args.rings, args.radius * args.n as f64);
    if layout.count() > u8::MAX as usize {
        bail!("{} electrodes do not fit an 8-bit pattern", layout.count());
    }

    let aperture = circular_aperture(args.n, args.radius)?;
    let electrodes = hex_electrodes(args.n, args.radius, &layout)?;
    let volts = generate_voltages(&mut rng, &layout, pattern, args.v_min, args.v_max);

    fs::create_dir_all(&args.out)
        .with_context(|| format!("cannot create {}", args.out.display()))?;
    let aperture_path = args.out.join("aperture.pgm");
    let electrodes_path = args.out.join("electrodes.pgm");
    let voltages_path = args.out.join("voltages.txt");

    let a = Pgm::from_raster(&aperture, u8::MAX);
    pgm::write_raster_u8(&aperture_path, a.width, a.height, &a.pixels, a.maxval)?;
    let e = Pgm::from_raster(&electrodes, u8::MAX);
    pgm::write_raster_u8(&electrodes_path, e.width, e.height, &e.pixels, e.maxval)?;
    fs::write(&voltages_path, format_voltages(&volts))
        .with_context(|| format!("cannot write {}", voltages_path.display()))?;

    let meta = SynthMeta {
        n: args.n,
        radius: args.radius,
        rings: args.rings,
        electrodes: layout.count(),
        pitch: layout.pitch,

        seed: args.seed,
        pattern: pattern.as_str().to_string(),
        v_min: args.v_min,
        v_max: args.v_max,

        aperture: aperture_path.display().to_string(),
        electrode_pattern: electrodes_path.display().to_string(),
        voltages: voltages_path.display().to_string(),
    };
    let mut meta_file = BufWriter::new(File::create(args.out.join("meta.json"))?);
    serde_json::to_writer_pretty(&mut meta_file, &meta)?;
    meta_file.write_all(b"\n")?;
    meta_file.flush()?;

    log::info!(
        "{} electrodes, pattern {}, written to {}",
        layout.count(),
        pattern.as_str(),
        args.out.display()
    );
    println!(
        "dm-response {} {} {}",
        aperture_path.display(),
        electrodes_path.display(),
        voltages_path.display()
    );

    Ok(())
}
