///
// Image management
//
// Load and save into a vector of floats in [0, 1], plus basic image
// manipulation. Pixels are addressed as (row, col).
//

use anyhow::{Context, Result};
use image::{GrayImage, Pixel};
use itertools::{Itertools, MinMaxResult};
use std::ops::{Index, IndexMut};
use std::path::Path;

use crate::error::TomoError;

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl Index<(usize, usize)> for Image {
    type Output = f64;
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.width + col]
    }
}

impl IndexMut<(usize, usize)> for Image {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[row * self.width + col]
    }
}

// Rescale so the smallest value becomes 0.0 and the largest 1.0. A
// constant array has no range to stretch, and dividing by zero would
// hand NaNs to whoever displays the result, so that's an error.
pub fn normalise_to_unit(data: &[f64]) -> Result<Vec<f64>, TomoError> {
    if let Some(index) = data.iter().position(|x| !x.is_finite()) {
        return Err(TomoError::NonFinite { index });
    }

    let (lo, hi) = match data.iter().copied().minmax() {
        MinMaxResult::NoElements => return Ok(Vec::new()),
        MinMaxResult::OneElement(x) => return Err(TomoError::Normalisation { value: x }),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };
    if lo == hi {
        return Err(TomoError::Normalisation { value: lo });
    }

    let range = hi - lo;
    Ok(data.iter().map(|x| (x - lo) / range).collect())
}

impl Image {
    // Blank (all-zero) image, as used for accumulation buffers.
    pub fn new(width: usize, height: usize) -> Image {
        Image {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn load(path: &Path) -> Result<Image> {
        let orig_img = image::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?;
        let grey_img = orig_img.into_luma8();

        let width = grey_img.width() as usize;
        let height = grey_img.height() as usize;

        Ok(Image {
            width,
            height,
            data: grey_img
                .pixels()
                .map(|p| p.channels()[0] as f64 / 255.0)
                .collect(),
        })
    }

    // Values are expected in [0, 1]; anything outside is clamped.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data_as_u8: Vec<u8> = self
            .data
            .iter()
            .map(|x| (x.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        let img = GrayImage::from_vec(self.width as u32, self.height as u32, data_as_u8)
            .context("Image buffer does not match its dimensions")?;
        img.save(path)
            .with_context(|| format!("Failed to write image {}", path.display()))?;
        Ok(())
    }

    pub fn max_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn scale_values(&self, factor: f64) -> Image {
        Image {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|x| x * factor).collect(),
        }
    }

    // Min-max normalise the whole image into [0, 1].
    pub fn normalise_to_unit(&self) -> Result<Image, TomoError> {
        Ok(Image {
            width: self.width,
            height: self.height,
            data: normalise_to_unit(&self.data)?,
        })
    }

    // Root-mean-square of the per-pixel differences. Images must be
    // the same size.
    pub fn rms_diff(&self, other: &Image) -> f64 {
        assert_eq!((self.width, self.height), (other.width, other.height));
        let total: f64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        (total / self.data.len() as f64).sqrt()
    }
}
