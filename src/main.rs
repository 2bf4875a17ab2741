use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};

use fan_beam_tomography::backprojection::inverse_radon_transform;
use fan_beam_tomography::frames;
use fan_beam_tomography::tomo_scan::radon_transform;
use fan_beam_tomography::{Geometry, Image, Reconstruction, ScanConfig, Simulation, Sinogram};

////////////////////////////////////////////////////////////////////////
// Main entry point
//

/// This doc string acts as a help message when the user runs '--help'
/// as do all doc strings on fields
#[derive(Parser)]
#[command(version = "0.1", author = "Simon Frankau <sgf@arbitrary.name>")]
#[command(about = "Fan-beam CT scanner simulation and backprojection")]
struct Opts {
    /// Input image file, which will be scanned.
    #[arg(long)]
    input_image: PathBuf,
    /// Number of emitter positions around the gantry.
    #[arg(long, default_value_t = 180)]
    scans: usize,
    /// Number of detectors in the fan opposite each emitter.
    #[arg(long, default_value_t = 180)]
    detectors: usize,
    /// Angle covered by the detector fan, in degrees.
    #[arg(long, default_value_t = 180.0)]
    angular_span: f64,
    /// Also reconstruct through the ramp filter.
    #[arg(long)]
    filter: bool,
    /// File to write the sinogram to.
    #[arg(long)]
    output_sinogram: Option<PathBuf>,
    /// File to write the (unfiltered) reconstructed image to.
    #[arg(long)]
    output_image: Option<PathBuf>,
    /// File to write the ramp-filtered sinogram to. Needs --filter.
    #[arg(long)]
    output_filtered_sinogram: Option<PathBuf>,
    /// File to write the filtered reconstruction to. Needs --filter.
    #[arg(long)]
    output_filtered_image: Option<PathBuf>,
    /// File to write the histogram-matched filtered reconstruction to.
    /// Needs --filter.
    #[arg(long)]
    output_adjusted_image: Option<PathBuf>,
    /// Directory to write frames of the scan and reconstruction
    /// building up, a slice of scans at a time.
    #[arg(long)]
    frames_dir: Option<PathBuf>,
    /// Number of scans added per frame.
    #[arg(long, default_value_t = 40)]
    scan_step: usize,
}

fn check_opts(opts: &Opts) -> Result<()> {
    ensure!(opts.scan_step > 0, "--scan-step must be at least 1");
    if !opts.filter {
        ensure!(
            opts.output_filtered_sinogram.is_none(),
            "--output-filtered-sinogram can only be used with --filter"
        );
        ensure!(
            opts.output_filtered_image.is_none(),
            "--output-filtered-image can only be used with --filter"
        );
        ensure!(
            opts.output_adjusted_image.is_none(),
            "--output-adjusted-image can only be used with --filter"
        );
    }
    Ok(())
}

fn write_frames(
    dir: &Path,
    step: usize,
    geometry: &Geometry,
    image: &Image,
    simulation: &Simulation,
    reconstruction: &Reconstruction,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut sinogram = Sinogram::for_geometry(geometry);
    let sinogram_frames = frames::animate(
        geometry.scans,
        step,
        &mut sinogram,
        |slice, buf| radon_transform(geometry, image, buf, slice).map(|_| ()),
        |frame, buf| {
            frames::save_frame(dir, "sinogram", frame, &buf.as_image(), simulation.raw_sinogram_max)
        },
    )?;

    let mut tomogram = Image::new(geometry.width, geometry.height);
    let tomogram_frames = frames::animate(
        geometry.scans,
        step,
        &mut tomogram,
        |slice, buf| inverse_radon_transform(geometry, &simulation.sinogram, buf, slice),
        |frame, buf| frames::save_frame(dir, "tomogram", frame, buf, reconstruction.raw_tomogram_max),
    )?;

    info!(
        "Wrote {} sinogram and {} tomogram frames to {}",
        sinogram_frames,
        tomogram_frames,
        dir.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts: Opts = Opts::parse();
    check_opts(&opts)?;

    let image = Image::load(&opts.input_image)?;
    let config = ScanConfig {
        scans: opts.scans,
        detectors: opts.detectors,
        angular_span_degrees: opts.angular_span,
    };
    let geometry = Geometry::new(image.width, image.height, &config)?;
    info!(
        "Gantry centre ({}, {}), radius {:.2}",
        geometry.gantry_center.x, geometry.gantry_center.y, geometry.gantry_radius
    );

    let simulation = Simulation::new(&geometry, &image)?;
    let reconstruction = Reconstruction::new(&geometry, &simulation.sinogram, opts.filter)?;

    info!("RMS of per-pixel error: {}", image.rms_diff(reconstruction.best()));

    if let Some(path) = &opts.output_sinogram {
        simulation.sinogram.save(path)?;
    }

    if let Some(path) = &opts.output_image {
        reconstruction.tomogram.save(path)?;
    }

    if let Some(filtered) = &reconstruction.filtered {
        if let Some(path) = &opts.output_filtered_sinogram {
            filtered.sinogram.save(path)?;
        }
        if let Some(path) = &opts.output_filtered_image {
            filtered.tomogram.save(path)?;
        }
        if let Some(path) = &opts.output_adjusted_image {
            filtered.adjusted_tomogram.save(path)?;
        }
    }

    if let Some(dir) = &opts.frames_dir {
        write_frames(dir, opts.scan_step, &geometry, &image, &simulation, &reconstruction)?;
    }

    Ok(())
}
