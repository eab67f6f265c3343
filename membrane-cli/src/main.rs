use anyhow::{Context, bail};
use clap::Parser;
use membrane_cli::{output, pgm, preview, voltages};
use membrane_core::sor::DEFAULT_TOLERANCE;
use membrane_core::tiptilt::DEFAULT_TILT_AMPLITUDE;
use membrane_core::{
    DEFAULT_ELECTRODES, ForcingBuilder, Raster, ResponseDriver, SURFACE_CALIBRATION, SolveParams,
    Termination, apply_tip_tilt,
};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Wavefront of an electrostatic membrane mirror for a set of electrode
/// voltages. Values (um) go to stdout, diagnostics to stderr.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Aperture mask (PGM); non-zero pixels are free membrane
    mask: PathBuf,

    /// Electrode pattern (PGM); a pixel of value k belongs to electrode k
    electrodes: PathBuf,

    /// Voltages, one integer in 0..=255 per electrode
    voltages: PathBuf,

    /// Maximum number of SOR sweeps (default: ceil(2 * sqrt(W * H)))
    iterations: Option<usize>,

    /// Relative change below which the relaxation stops
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Over-relaxation factor in (0, 2) (default: Chebyshev optimum for the grid)
    #[arg(long)]
    omega: Option<f64>,

    /// Number of electrodes on the mirror
    #[arg(long, default_value_t = DEFAULT_ELECTRODES)]
    electrode_count: usize,

    /// Greyscale preview of the wavefront
    #[arg(long, default_value = "response.pgm")]
    preview: PathBuf,

    /// Write a JSON summary of the solve here
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Read linear control signals in [-1, 1] instead of voltages
    #[arg(long)]
    control: bool,

    /// Add a tip-tilt mirror, e.g. "0.2,-0.5"
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    tip_tilt: Option<Vec<f64>>,

    /// Gain on the mirror response, applied before tip-tilt is added
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    dm_gain: f64,

    /// Report the membrane surface instead of the reflected wavefront
    #[arg(long)]
    surface: bool,
}

#[derive(Serialize)]
struct SolveSummary {
    width: usize,
    height: usize,
    interior_pixels: usize,
    electrodes: usize,

    termination: String,
    sweeps: usize,
    residual: f64,
    omega: f64,
    tolerance: f64,
    dm_gain: f64,
    surface: bool,

    min: f64,
    max: f64,
    preview: String,
    preview_flat: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // clap would exit with 2 on bad usage, which is reserved for the iteration cap
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    match run(&args) {
        Ok(Termination::Converged) => ExitCode::SUCCESS,
        Ok(Termination::MaxIterReached) => ExitCode::from(2),
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<Termination> {
    let tip_tilt = match args.tip_tilt.as_deref() {
        None => None,
        Some(&[cx, cy]) => Some([cx, cy]),
        Some(other) => bail!("--tip-tilt takes two values, got {}", other.len()),
    };

    let aperture = pgm::read_raster(&args.mask)
        .context("cannot read boundary mask")?
        .to_raster()?;
    let electrode_map = pgm::read_raster(&args.electrodes)
        .context("cannot read electrode pattern")?
        .to_raster()?;

    if !args.dm_gain.is_finite() {
        bail!("--dm-gain must be finite, got {}", args.dm_gain);
    }

    let mut driver = ResponseDriver::new(&aperture, electrode_map, args.electrode_count)
        .context("aperture and electrode pattern disagree")?;
    if args.surface {
        driver = driver.with_forcing(
            ForcingBuilder::new(args.electrode_count).with_calibration(SURFACE_CALIBRATION),
        );
    }
    let (w, h) = driver.shape();
    log::info!(
        "membrane {w}x{h}, {} interior pixels, {} electrodes",
        driver.mask().interior_count(),
        driver.electrodes()
    );

    let params = SolveParams {
        tolerance: args.tolerance,
        max_iterations: args.iterations,
        omega: args.omega,
    };

    let solution = if args.control {
        let controls = voltages::read_controls(&args.voltages, args.electrode_count)
            .context("cannot read control signals")?;
        driver.respond_control(&controls, params)?
    } else {
        let volts = voltages::read_voltages(&args.voltages, args.electrode_count)
            .context("cannot read voltages file")?;
        driver.respond(&volts, params)?
    };

    let mut wavefront = Raster::new(w, h)?;
    solution.accumulate_into(&mut wavefront, args.dm_gain)?;
    if let Some(control) = tip_tilt {
        apply_tip_tilt(&mut wavefront, control, DEFAULT_TILT_AMPLITUDE);
    }

    {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        output::write_wavefront(&mut out, &wavefront)?;
        out.flush()?;
    }

    let image = preview::render(&wavefront, u8::MAX);
    if image.flat {
        log::warn!("wavefront range is zero, preview is flat grey");
    }
    pgm::write_raster_u8(&args.preview, image.width, image.height, &image.pixels, image.maxval)
        .context("cannot write preview")?;

    if let Some(path) = &args.summary {
        let (min, max) = wavefront.min_max();
        let summary = SolveSummary {
            width: w,
            height: h,
            interior_pixels: driver.mask().interior_count(),
            electrodes: driver.electrodes(),

            termination: solution.termination.to_string(),
            sweeps: solution.sweeps,
            residual: solution.residual,
            omega: solution.omega,
            tolerance: args.tolerance,
            dm_gain: args.dm_gain,
            surface: args.surface,

            min,
            max,
            preview: args.preview.display().to_string(),
            preview_flat: image.flat,
        };
        let mut file = BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        );
        serde_json::to_writer_pretty(&mut file, &summary)?;
        file.write_all(b"\n")?;
        file.flush()?;
    }

    Ok(solution.termination)
}
