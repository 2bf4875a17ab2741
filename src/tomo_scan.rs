///
// Scan generation
//
// Given an image, generate a sinogram of it by averaging along every
// emitter-to-detector ray the geometry defines.
//

use anyhow::Result;
use itertools::iproduct;
use log::warn;
use std::ops::{Index, IndexMut, Range};
use std::path::Path;

use crate::error::TomoError;
use crate::geometry::Geometry;
use crate::tomo_image::{normalise_to_unit, Image};

// Only real difference from Image is that the axes are labelled
// "scans" and "detectors". Seems worth separating them so that there's
// no confusion.
#[derive(Clone, Debug, PartialEq)]
pub struct Sinogram {
    pub scans: usize,
    pub detectors: usize,
    pub data: Vec<f64>,
}

impl Index<(usize, usize)> for Sinogram {
    type Output = f64;
    fn index(&self, (scan, detector): (usize, usize)) -> &f64 {
        &self.data[scan * self.detectors + detector]
    }
}

impl IndexMut<(usize, usize)> for Sinogram {
    fn index_mut(&mut self, (scan, detector): (usize, usize)) -> &mut f64 {
        &mut self.data[scan * self.detectors + detector]
    }
}

impl Sinogram {
    pub fn new(scans: usize, detectors: usize) -> Sinogram {
        Sinogram {
            scans,
            detectors,
            data: vec![0.0; scans * detectors],
        }
    }

    // Blank sinogram shaped to fit the geometry.
    pub fn for_geometry(geometry: &Geometry) -> Sinogram {
        Sinogram::new(geometry.scans, geometry.detectors)
    }

    pub fn row(&self, scan: usize) -> &[f64] {
        &self.data[scan * self.detectors..(scan + 1) * self.detectors]
    }

    pub fn max_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn normalise_to_unit(&self) -> Result<Sinogram, TomoError> {
        Ok(Sinogram {
            scans: self.scans,
            detectors: self.detectors,
            data: normalise_to_unit(&self.data)?,
        })
    }

    pub fn as_image(&self) -> Image {
        Image {
            width: self.detectors,
            height: self.scans,
            data: self.data.clone(),
        }
    }

    // Converts a sinogram to an image and saves it, perhaps useful for
    // understanding the transform. Values should already be in [0, 1].
    pub fn save(&self, path: &Path) -> Result<()> {
        self.as_image().save(path)
    }
}

pub(crate) fn check_scan_range(geometry: &Geometry, scans: &Range<usize>) -> Result<(), TomoError> {
    if scans.start > scans.end || scans.end > geometry.scans {
        return Err(TomoError::Configuration(format!(
            "scan range {:?} outside 0..{}",
            scans, geometry.scans
        )));
    }
    Ok(())
}

// Fill in the sinogram entries for the scans in the given range. Each
// entry is the sum of the pixels along the ray divided by the distance
// from emitter to detector.
//
// Writes into the caller's buffer, so a sinogram can be built up a
// slice at a time. A ray whose emitter and detector land on the same
// pixel has no length to divide by: its entry is left alone. Returns
// how many such rays were skipped.
pub fn radon_transform(
    geometry: &Geometry,
    image: &Image,
    sinogram: &mut Sinogram,
    scans: Range<usize>,
) -> Result<usize, TomoError> {
    if (image.height, image.width) != (geometry.height, geometry.width) {
        return Err(TomoError::DimensionMismatch {
            expected: (geometry.height, geometry.width),
            actual: (image.height, image.width),
        });
    }
    if (sinogram.scans, sinogram.detectors) != (geometry.scans, geometry.detectors) {
        return Err(TomoError::DimensionMismatch {
            expected: (geometry.scans, geometry.detectors),
            actual: (sinogram.scans, sinogram.detectors),
        });
    }
    check_scan_range(geometry, &scans)?;

    let mut degenerate = 0;
    for (i, j) in iproduct!(scans, 0..geometry.detectors) {
        let ray_length = geometry.ray_length(i, j);
        if ray_length > 0.0 {
            let integral: f64 = geometry.ray(i, j).iter().map(|&p| image[p]).sum();
            sinogram[(i, j)] = integral / ray_length;
        } else {
            degenerate += 1;
        }
    }

    if degenerate > 0 {
        warn!(
            "Skipped {} zero-length rays (emitter and detector on the same pixel)",
            degenerate
        );
    }
    Ok(degenerate)
}

// Convenience wrapper: scan the whole image into a fresh sinogram.
pub fn scan(geometry: &Geometry, image: &Image) -> Result<Sinogram, TomoError> {
    let mut sinogram = Sinogram::for_geometry(geometry);
    radon_transform(geometry, image, &mut sinogram, 0..geometry.scans)?;
    Ok(sinogram)
}
