//
// Generate a blurred image from a sinogram by backprojection
//
// Every sinogram entry is smeared back along the ray it came from,
// adding its value to each pixel on the way. Pixels crossed by many
// rays soak up more than their share, which is what the visit counts
// are for.
//

use itertools::iproduct;
use std::ops::Range;

use crate::error::{Result, TomoError};
use crate::geometry::Geometry;
use crate::tomo_image::Image;
use crate::tomo_scan::{check_scan_range, Sinogram};

// Accumulate the scans in the given range into the tomogram. Nothing
// is rescaled, and the buffer is only ever added to, so calling this
// slice by slice over a zeroed buffer gives the same result as one
// call over every scan.
pub fn inverse_radon_transform(
    geometry: &Geometry,
    sinogram: &Sinogram,
    tomogram: &mut Image,
    scans: Range<usize>,
) -> Result<()> {
    if (sinogram.scans, sinogram.detectors) != (geometry.scans, geometry.detectors) {
        return Err(TomoError::DimensionMismatch {
            expected: (geometry.scans, geometry.detectors),
            actual: (sinogram.scans, sinogram.detectors),
        });
    }
    if (tomogram.height, tomogram.width) != (geometry.height, geometry.width) {
        return Err(TomoError::DimensionMismatch {
            expected: (geometry.height, geometry.width),
            actual: (tomogram.height, tomogram.width),
        });
    }
    check_scan_range(geometry, &scans)?;

    for (i, j) in iproduct!(scans, 0..geometry.detectors) {
        let value = sinogram[(i, j)];
        for &pixel in geometry.ray(i, j) {
            tomogram[pixel] += value;
        }
    }
    Ok(())
}

// Backproject every scan into a fresh tomogram.
pub fn reconstruct(geometry: &Geometry, sinogram: &Sinogram) -> Result<Image> {
    let mut tomogram = Image::new(geometry.width, geometry.height);
    inverse_radon_transform(geometry, sinogram, &mut tomogram, 0..geometry.scans)?;
    Ok(tomogram)
}

// How many rays pass through each pixel, plus one so that nothing is
// ever zero.
pub fn visit_counts(geometry: &Geometry) -> Vec<u32> {
    let mut visits = vec![1u32; geometry.width * geometry.height];
    for (i, j) in iproduct!(0..geometry.scans, 0..geometry.detectors) {
        for &(row, col) in geometry.ray(i, j) {
            visits[row * geometry.width + col] += 1;
        }
    }
    visits
}

// Divide each pixel by its visit count, turning the sum of the rays
// through it into something like their average.
pub fn compensate_visits(tomogram: &Image, visits: &[u32]) -> Result<Image> {
    // Counts are flat, so sizes are compared as single rows.
    if tomogram.data.len() != visits.len() {
        return Err(TomoError::DimensionMismatch {
            expected: (1, tomogram.data.len()),
            actual: (1, visits.len()),
        });
    }
    Ok(Image {
        width: tomogram.width,
        height: tomogram.height,
        data: tomogram
            .data
            .iter()
            .zip(visits.iter())
            .map(|(value, &count)| value / count as f64)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ScanConfig;
    use crate::tomo_scan::scan;

    fn geometry(size: usize, scans: usize, detectors: usize, span: f64) -> Geometry {
        let config = ScanConfig {
            scans,
            detectors,
            angular_span_degrees: span,
        };
        Geometry::new(size, size, &config).unwrap()
    }

    #[test]
    fn test_single_ray_smear() {
        let geometry = geometry(4, 4, 3, 90.0);
        let mut sinogram = Sinogram::for_geometry(&geometry);
        sinogram[(0, 1)] = 0.5;

        let tomogram = reconstruct(&geometry, &sinogram).unwrap();
        let ray = [(0, 2), (1, 2), (2, 1), (3, 1)];
        for row in 0..4 {
            for col in 0..4 {
                let expected = if ray.contains(&(row, col)) { 0.5 } else { 0.0 };
                assert_eq!(tomogram[(row, col)], expected);
            }
        }
    }

    #[test]
    fn test_accumulates_shared_pixels() {
        // Rays 0 and 1 of scan 0 share pixels (0, 2) and (1, 2).
        let geometry = geometry(4, 4, 3, 90.0);
        let mut sinogram = Sinogram::for_geometry(&geometry);
        sinogram[(0, 0)] = 1.0;
        sinogram[(0, 1)] = 2.0;
        sinogram[(0, 2)] = 4.0;

        let tomogram = reconstruct(&geometry, &sinogram).unwrap();
        assert_eq!(tomogram[(0, 2)], 3.0);
        assert_eq!(tomogram[(1, 2)], 3.0);
        assert_eq!(tomogram[(3, 3)], 1.0);
        assert_eq!(tomogram[(0, 1)], 4.0);
        assert_eq!(tomogram[(3, 0)], 0.0);
    }

    #[test]
    fn test_incremental_matches_full() {
        let geometry = geometry(10, 7, 5, 120.0);
        let sinogram = Sinogram {
            scans: 7,
            detectors: 5,
            data: (0..35).map(|x| x as f64 / 35.0).collect(),
        };

        let full = reconstruct(&geometry, &sinogram).unwrap();

        let mut sliced = Image::new(10, 10);
        for range in [0..3, 3..3, 3..6, 6..7] {
            inverse_radon_transform(&geometry, &sinogram, &mut sliced, range).unwrap();
        }
        for (a, b) in full.data.iter().zip(sliced.data.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_mismatched_buffers() {
        let geometry = geometry(6, 3, 4, 90.0);
        let sinogram = Sinogram::for_geometry(&geometry);
        assert!(matches!(
            inverse_radon_transform(&geometry, &sinogram, &mut Image::new(5, 6), 0..3),
            Err(TomoError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            reconstruct(&geometry, &Sinogram::new(3, 3)),
            Err(TomoError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_visit_counts() {
        // A single scan with two detectors: each pixel is visited once
        // per ray through it, on top of the starting count of 1.
        let geometry = geometry(8, 1, 2, 90.0);
        let visits = visit_counts(&geometry);

        let mut expected = vec![1u32; 64];
        for j in 0..2 {
            for &(row, col) in geometry.ray(0, j) {
                expected[row * 8 + col] += 1;
            }
        }
        assert_eq!(visits, expected);
        assert!(visits.iter().all(|&v| v >= 1));
        // Pixels off both rays keep a count of exactly 1.
        assert_eq!(visits[0], 1);
        assert_eq!(visits.iter().filter(|&&v| v > 1).count(),
                   geometry.ray(0, 0).len() + geometry.ray(0, 1).len());
    }

    #[test]
    fn test_visit_counts_match_backprojected_ones() {
        // Backprojecting all-ones counts the rays through each pixel.
        let geometry = geometry(12, 9, 7, 160.0);
        let mut ones = Sinogram::for_geometry(&geometry);
        ones.data.iter_mut().for_each(|x| *x = 1.0);
        let counted = reconstruct(&geometry, &ones).unwrap();

        let visits = visit_counts(&geometry);
        for (count, visit) in counted.data.iter().zip(visits.iter()) {
            assert_eq!(*count + 1.0, *visit as f64);
        }
    }

    #[test]
    fn test_compensate_visits() {
        let tomogram = Image {
            width: 2,
            height: 1,
            data: vec![6.0, 6.0],
        };
        let compensated = compensate_visits(&tomogram, &[1, 3]).unwrap();
        assert_eq!(compensated.data, vec![6.0, 2.0]);
    }

    #[test]
    fn test_compensate_visits_mismatch() {
        let geometry = geometry(6, 3, 4, 90.0);
        let visits = visit_counts(&geometry);
        assert!(matches!(
            compensate_visits(&Image::new(5, 6), &visits),
            Err(TomoError::DimensionMismatch {
                expected: (1, 30),
                actual: (1, 36),
            })
        ));
    }

    // Scan a uniform disc-ish image and backproject: the centre region
    // should come out roughly flat, and brighter than the corners that
    // fewer rays reach.
    #[test]
    fn test_uniform_round_trip() {
        let size = 64;
        let geometry = geometry(size, 90, 90, 180.0);
        let image = Image {
            width: size,
            height: size,
            data: vec![1.0; size * size],
        };
        let sinogram = scan(&geometry, &image).unwrap().normalise_to_unit().unwrap();
        let tomogram = reconstruct(&geometry, &sinogram)
            .unwrap()
            .normalise_to_unit()
            .unwrap();

        let centre = (size as f64 - 1.0) / 2.0;
        let mut inner = Vec::new();
        let mut outer = Vec::new();
        for row in 0..size {
            for col in 0..size {
                let (dr, dc) = (row as f64 - centre, col as f64 - centre);
                let r = (dr * dr + dc * dc).sqrt();
                if r < 20.0 {
                    inner.push(tomogram[(row, col)]);
                } else if r > 32.0 {
                    outer.push(tomogram[(row, col)]);
                }
            }
        }

        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        let inner_mean = mean(&inner);
        let inner_sd =
            (inner.iter().map(|x| (x - inner_mean) * (x - inner_mean)).sum::<f64>() / inner.len() as f64).sqrt();

        assert!(inner_mean > mean(&outer));
        assert!(inner_sd < 0.1);
    }
}
