///
// Scanner geometry
//
// Places the emitter and the fan of detectors on a circular gantry
// around the image for each scan angle, and works out which pixels
// every emitter-to-detector ray passes through. Everything is computed
// once up front and only read afterwards.
//

use log::debug;
use nalgebra::{Point2, Vector2};
use std::f32::consts::PI;

use crate::error::{Result, TomoError};

/// Integer pixel position on the gantry, as (row, col). May lie
/// outside the image.
pub type GantryPoint = Point2<i64>;

#[derive(Clone, Debug, PartialEq)]
pub struct ScanConfig {
    /// Number of emitter positions, evenly spread over a full turn.
    pub scans: usize,
    /// Number of detectors in the fan opposite each emitter.
    pub detectors: usize,
    /// Angle covered by the detector fan, in degrees.
    pub angular_span_degrees: f64,
}

impl ScanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scans == 0 {
            return Err(TomoError::Configuration(
                "scans must be at least 1".to_string(),
            ));
        }
        // Detector spacing divides by (detectors - 1).
        if self.detectors < 2 {
            return Err(TomoError::Configuration(format!(
                "detectors must be at least 2, got {}",
                self.detectors
            )));
        }
        let span = self.angular_span_degrees;
        if !span.is_finite() || span <= 0.0 || span > 360.0 {
            return Err(TomoError::Configuration(format!(
                "angular span must be in (0, 360] degrees, got {}",
                span
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Geometry {
    pub width: usize,
    pub height: usize,
    pub scans: usize,
    pub detectors: usize,
    pub gantry_center: Vector2<f64>,
    pub gantry_radius: f64,
    emitter_points: Vec<GantryPoint>,
    // Flattened, scans * detectors.
    detector_points: Vec<GantryPoint>,
    ray_points: Vec<Vec<(usize, usize)>>,
}

// Place a point on the gantry circle. The first component uses -cos
// and the second sin, so angle 0 sits above the image and angles
// increase clockwise. Coordinates are floored, not rounded.
//
// Emitters are placed entirely in f32. Points on the gantry often land
// within rounding error of a pixel boundary, so the precision decides
// which pixel they floor to.
fn emitter_point(center: &Vector2<f32>, radius: f32, alpha: f32) -> GantryPoint {
    let offset = Vector2::new(-alpha.cos(), alpha.sin());
    let point = (center + offset * radius).map(|c| c.floor() as i64);
    Point2::from(point)
}

// Detector angles carry an f64 fan offset, so these are placed in f64
// around the (widened) f32 centre and radius.
fn detector_point(center: &Vector2<f64>, radius: f64, beta: f64) -> GantryPoint {
    let offset = Vector2::new(-beta.cos(), beta.sin());
    let point = (center + offset * radius).map(|c| c.floor() as i64);
    Point2::from(point)
}

// All the integer points on the straight line from start to stop,
// both ends included. One point per step along the major axis, with
// the minor axis rounded half-to-even.
pub fn trace_line(start: GantryPoint, stop: GantryPoint) -> Vec<(i64, i64)> {
    let delta = stop - start;
    let steps = delta.x.abs().max(delta.y.abs());
    if steps == 0 {
        return vec![(start.x, start.y)];
    }

    let step_row = delta.x as f64 / steps as f64;
    let step_col = delta.y as f64 / steps as f64;
    let mut points: Vec<(i64, i64)> = (0..steps)
        .map(|k| {
            let row = k as f64 * step_row + start.x as f64;
            let col = k as f64 * step_col + start.y as f64;
            (row.round_ties_even() as i64, col.round_ties_even() as i64)
        })
        .collect();
    points.push((stop.x, stop.y));
    points
}

// Trace the ray and keep only the pixels inside a height x width
// image.
fn clipped_ray(start: GantryPoint, stop: GantryPoint, width: usize, height: usize) -> Vec<(usize, usize)> {
    trace_line(start, stop)
        .into_iter()
        .filter(|&(row, col)| 0 <= row && row < height as i64 && 0 <= col && col < width as i64)
        .map(|(row, col)| (row as usize, col as usize))
        .collect()
}

impl Geometry {
    pub fn new(width: usize, height: usize, config: &ScanConfig) -> Result<Geometry> {
        if width == 0 || height == 0 {
            return Err(TomoError::Configuration(format!(
                "image must be non-empty, got {}x{}",
                width, height
            )));
        }
        config.validate()?;

        let (scans, detectors) = (config.scans, config.detectors);
        let (hf32, wf32) = (height as f32, width as f32);
        let radius = ((height * height + width * width) as f32).sqrt() / 2.0;
        let center = Vector2::new(hf32 / 2.0, wf32 / 2.0);
        let phi = (config.angular_span_degrees as f32).to_radians();

        // Scan angles are spaced in f64, then stored as f32.
        let alpha_step = 2.0 * std::f64::consts::PI / scans as f64;
        let alphas = (0..scans)
            .map(|i| (i as f64 * alpha_step) as f32)
            .collect::<Vec<_>>();

        let emitter_points = alphas
            .iter()
            .map(|&alpha| emitter_point(&center, radius, alpha))
            .collect::<Vec<_>>();

        // The fan is centred on the point opposite the emitter. Its start
        // angle is worked out in f32; the step along the fan is f64.
        let gantry_center = center.map(f64::from);
        let gantry_radius = f64::from(radius);
        let spacing = (detectors - 1) as f64;
        let phi_f64 = f64::from(phi);
        let detector_points = alphas
            .iter()
            .flat_map(|&alpha| {
                let fan_start = f64::from(alpha + PI - phi / 2.0);
                (0..detectors).map(move |j| fan_start + j as f64 * phi_f64 / spacing)
            })
            .map(|beta| detector_point(&gantry_center, gantry_radius, beta))
            .collect::<Vec<_>>();

        let ray_points = detector_points
            .iter()
            .enumerate()
            .map(|(idx, &detector)| clipped_ray(emitter_points[idx / detectors], detector, width, height))
            .collect::<Vec<_>>();

        debug!(
            "Geometry {}x{}: {} scans x {} detectors, gantry radius {:.3}, {} ray pixels",
            width,
            height,
            scans,
            detectors,
            gantry_radius,
            ray_points.iter().map(Vec::len).sum::<usize>()
        );

        Ok(Geometry {
            width,
            height,
            scans,
            detectors,
            gantry_center,
            gantry_radius,
            emitter_points,
            detector_points,
            ray_points,
        })
    }

    pub fn emitter(&self, scan: usize) -> GantryPoint {
        self.emitter_points[scan]
    }

    pub fn detector(&self, scan: usize, detector: usize) -> GantryPoint {
        self.detector_points[scan * self.detectors + detector]
    }

    /// In-bounds pixels on the ray from the emitter of `scan` to the
    /// given detector, in order from emitter to detector.
    pub fn ray(&self, scan: usize, detector: usize) -> &[(usize, usize)] {
        &self.ray_points[scan * self.detectors + detector]
    }

    // Euclidean distance between the emitter and detector positions
    // (before clipping to the image).
    pub fn ray_length(&self, scan: usize, detector: usize) -> f64 {
        let delta = self.detector(scan, detector) - self.emitter(scan);
        ((delta.x * delta.x + delta.y * delta.y) as f64).sqrt()
    }
}
