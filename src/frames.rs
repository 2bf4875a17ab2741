//
// Incremental frames
//
// Scanning and backprojection can be run a slice of scans at a time
// into a persistent buffer, which lets us watch the sinogram fill in
// and the tomogram build up. The first frame is the blank buffer, and
// every slice after that produces one more frame.
//

use anyhow::{ensure, Context, Result};
use std::ops::Range;
use std::path::Path;

use crate::error::TomoError;
use crate::tomo_image::Image;

// The slices [0, step), [step, 2 * step), ... covering all scans, the
// last one possibly short.
pub fn scan_slices(scans: usize, step: usize) -> Result<Vec<Range<usize>>> {
    ensure!(step > 0, "scan step must be at least 1");
    Ok((0..scans)
        .step_by(step)
        .map(|begin| begin..(begin + step).min(scans))
        .collect())
}

// Run `update` over each slice in turn, handing the buffer to `emit`
// before the first slice and after every one. Returns the number of
// frames emitted.
pub fn animate<B, U, E>(scans: usize, step: usize, buffer: &mut B, mut update: U, mut emit: E) -> Result<usize>
where
    U: FnMut(Range<usize>, &mut B) -> Result<(), TomoError>,
    E: FnMut(usize, &B) -> Result<()>,
{
    let slices = scan_slices(scans, step)?;
    emit(0, buffer)?;
    for (idx, slice) in slices.into_iter().enumerate() {
        update(slice, buffer)?;
        emit(idx + 1, buffer)?;
    }
    Ok(frames_for(scans, step))
}

pub fn frames_for(scans: usize, step: usize) -> usize {
    1 + (scans + step - 1) / step
}

// Save a frame on a fixed scale, so that brightness is comparable
// between frames: raw_max maps to white.
pub fn save_frame(dir: &Path, prefix: &str, frame: usize, image: &Image, raw_max: f64) -> Result<()> {
    ensure!(
        raw_max.is_finite() && raw_max > 0.0,
        "frame scale must be positive, got {}",
        raw_max
    );
    let path = dir.join(format!("{}_{:04}.png", prefix, frame));
    image
        .scale_values(1.0 / raw_max)
        .save(&path)
        .with_context(|| format!("Failed to write frame {}", frame))
}
