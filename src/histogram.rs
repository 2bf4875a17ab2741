//
// Histogram matching
//
// Remap one image's intensities so their distribution follows a
// reference image. Each distinct source value is placed at its
// cumulative density, then given the reference value found at the same
// cumulative density, interpolating linearly between the reference's
// distinct values.
//

use itertools::Itertools;

use crate::tomo_image::Image;

// Distinct values in increasing order, with the fraction of all
// values that are less than or equal to each.
fn quantiles(data: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let total = data.len() as f64;
    let sorted = data.iter().copied().sorted_by(f64::total_cmp);

    let mut values = Vec::new();
    let mut cumulative = Vec::new();
    let mut seen = 0usize;
    for (value, group) in &sorted.chunk_by(|x| *x) {
        seen += group.count();
        values.push(value);
        cumulative.push(seen as f64 / total);
    }
    (values, cumulative)
}

// Piecewise-linear lookup of x on the curve through (xs, ys), holding
// the end values outside it. xs must be increasing.
fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let last = xs.len() - 1;
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[last] {
        return ys[last];
    }
    let idx = xs.partition_point(|&q| q <= x) - 1;
    let slope = (ys[idx + 1] - ys[idx]) / (xs[idx + 1] - xs[idx]);
    slope * (x - xs[idx]) + ys[idx]
}

pub fn match_histograms(source: &Image, reference: &Image) -> Image {
    assert!(!source.data.is_empty() && !reference.data.is_empty());

    let (src_values, src_quantiles) = quantiles(&source.data);
    let (ref_values, ref_quantiles) = quantiles(&reference.data);

    let mapped = src_quantiles
        .iter()
        .map(|&q| interpolate(q, &ref_quantiles, &ref_values))
        .collect::<Vec<_>>();

    let data = source
        .data
        .iter()
        .map(|x| {
            // Every source value is one of src_values.
            let idx = src_values.partition_point(|v| v < x);
            mapped[idx]
        })
        .collect();

    Image {
        width: source.width,
        height: source.height,
        data,
    }
}
