//
// Scan-and-reconstruct pipeline
//
// Simulation scans an image into a normalised sinogram. Reconstruction
// backprojects that sinogram, and optionally does it again through the
// ramp filter, compensating for how often each pixel was visited and
// matching the result's histogram back to the unfiltered version.
//

use log::{debug, info};

use crate::backprojection::{compensate_visits, reconstruct, visit_counts};
use crate::error::Result;
use crate::geometry::Geometry;
use crate::histogram::match_histograms;
use crate::ramp_filter::RampFilter;
use crate::tomo_image::Image;
use crate::tomo_scan::{scan, Sinogram};

#[derive(Clone, Debug)]
pub struct Simulation {
    /// Normalised to [0, 1].
    pub sinogram: Sinogram,
    /// Largest value before normalisation.
    pub raw_sinogram_max: f64,
}

impl Simulation {
    pub fn new(geometry: &Geometry, image: &Image) -> Result<Simulation> {
        let raw = scan(geometry, image)?;
        let raw_sinogram_max = raw.max_value();
        let sinogram = raw.normalise_to_unit()?;
        info!(
            "Scanned {} x {} sinogram, raw max {:.4}",
            sinogram.scans, sinogram.detectors, raw_sinogram_max
        );
        Ok(Simulation {
            sinogram,
            raw_sinogram_max,
        })
    }
}

#[derive(Clone, Debug)]
pub struct FilteredReconstruction {
    /// Ramp-filtered sinogram, normalised on its own range.
    pub sinogram: Sinogram,
    /// Visit-compensated backprojection of the filtered sinogram.
    pub tomogram: Image,
    /// `tomogram` with its histogram matched to the unfiltered one.
    pub adjusted_tomogram: Image,
}

#[derive(Clone, Debug)]
pub struct Reconstruction {
    /// Plain backprojection, normalised to [0, 1].
    pub tomogram: Image,
    /// Largest value before normalisation.
    pub raw_tomogram_max: f64,
    pub filtered: Option<FilteredReconstruction>,
}

impl Reconstruction {
    pub fn new(geometry: &Geometry, sinogram: &Sinogram, apply_filter: bool) -> Result<Reconstruction> {
        let raw = reconstruct(geometry, sinogram)?;
        let raw_tomogram_max = raw.max_value();
        let tomogram = raw.normalise_to_unit()?;
        info!("Backprojected tomogram, raw max {:.4}", raw_tomogram_max);

        let filtered = if apply_filter {
            Some(filtered_reconstruction(geometry, sinogram, &tomogram)?)
        } else {
            None
        };

        Ok(Reconstruction {
            tomogram,
            raw_tomogram_max,
            filtered,
        })
    }

    // The image to show: the adjusted one if filtering was done.
    pub fn best(&self) -> &Image {
        match &self.filtered {
            Some(filtered) => &filtered.adjusted_tomogram,
            None => &self.tomogram,
        }
    }
}

fn filtered_reconstruction(
    geometry: &Geometry,
    sinogram: &Sinogram,
    tomogram: &Image,
) -> Result<FilteredReconstruction> {
    let filter = RampFilter::new(geometry.detectors);
    debug!("Ramp filter with {} taps", filter.len());
    let filtered_sinogram = filter.apply(sinogram).normalise_to_unit()?;

    let summed = reconstruct(geometry, &filtered_sinogram)?;
    let visits = visit_counts(geometry);
    let filtered_tomogram = compensate_visits(&summed, &visits)?.normalise_to_unit()?;

    let adjusted_tomogram = match_histograms(&filtered_tomogram, tomogram);
    info!("Filtered reconstruction done");

    Ok(FilteredReconstruction {
        sinogram: filtered_sinogram,
        tomogram: filtered_tomogram,
        adjusted_tomogram,
    })
}
