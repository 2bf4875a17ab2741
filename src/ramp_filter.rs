//
// Ramp filter
//
// Plain backprojection blurs everything with a 1/r-shaped kernel. The
// classic fix is to high-pass each projection before smearing it back.
// Rather than going through the frequency domain we use the
// spatial-domain form of the discrete ramp filter directly: 1 at the
// centre, -4/(pi^2 k^2) at odd offsets k, and zero at even ones,
// truncated to a small window.
//

use std::f64::consts::PI;

use crate::tomo_scan::Sinogram;

// Taps either side of the centre, when there are enough detectors.
const HALF_WIDTH: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct RampFilter {
    // Offset of the first tap from the centre (zero or negative).
    first_offset: isize,
    taps: Vec<f64>,
}

fn tap_value(offset: isize) -> f64 {
    if offset == 0 {
        1.0
    } else if offset % 2 != 0 {
        let k = offset as f64;
        -4.0 / (PI * PI * k * k)
    } else {
        0.0
    }
}

impl RampFilter {
    // The window is 21 taps, cut down to the number of detectors if
    // there are fewer. An even-sized window has one more tap on the
    // negative side.
    pub fn new(detectors: usize) -> RampFilter {
        let len = detectors.min(2 * HALF_WIDTH + 1);
        let first_offset = -((len / 2) as isize);
        let taps = (0..len as isize)
            .map(|idx| tap_value(first_offset + idx))
            .collect();
        RampFilter { first_offset, taps }
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    // Look a tap up by its offset from the centre.
    pub fn tap(&self, offset: isize) -> Option<f64> {
        let idx = offset - self.first_offset;
        if idx < 0 {
            return None;
        }
        self.taps.get(idx as usize).copied()
    }

    // Convolve, keeping the output the same length as the input and
    // treating everything off the ends as zero. The output is aligned
    // so that output[s] pairs with tap (len - 1) / 2.
    pub fn convolve(&self, row: &[f64]) -> Vec<f64> {
        let n = row.len();
        let m = self.taps.len();
        let shift = (m as isize - 1) / 2;

        (0..n as isize)
            .map(|s| {
                row.iter()
                    .enumerate()
                    .filter_map(|(t, x)| {
                        let k = s + shift - t as isize;
                        if 0 <= k && (k as usize) < m {
                            Some(x * self.taps[k as usize])
                        } else {
                            None
                        }
                    })
                    .sum::<f64>()
            })
            .collect()
    }

    // Filter each scan on its own. Rows never mix.
    pub fn apply(&self, sinogram: &Sinogram) -> Sinogram {
        let data = (0..sinogram.scans)
            .flat_map(|i| self.convolve(sinogram.row(i)))
            .collect();
        Sinogram {
            scans: sinogram.scans,
            detectors: sinogram.detectors,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_values() {
        let filter = RampFilter::new(180);
        assert_eq!(filter.len(), 21);
        assert_eq!(filter.tap(0), Some(1.0));
        for k in 1..=10isize {
            let kf = k as f64;
            let expected = if k % 2 == 0 {
                0.0
            } else {
                -4.0 / (PI * PI * kf * kf)
            };
            assert_eq!(filter.tap(k), Some(expected));
            assert_eq!(filter.tap(-k), Some(expected));
        }
        assert_eq!(filter.tap(11), None);
        assert_eq!(filter.tap(-11), None);
    }

    #[test]
    fn test_kernel_clipped() {
        let odd = RampFilter::new(7);
        assert_eq!(odd.len(), 7);
        assert_eq!(odd.tap(-3), odd.tap(3));
        assert_eq!(odd.tap(-4), None);
        assert_eq!(odd.tap(4), None);
        assert_eq!(odd.taps()[3], 1.0);

        // Even windows run -4..=3.
        let even = RampFilter::new(8);
        assert_eq!(even.len(), 8);
        assert_eq!(even.tap(-4), Some(0.0));
        assert_eq!(even.tap(4), None);
        assert_eq!(even.taps()[4], 1.0);

        assert_eq!(RampFilter::new(21).len(), 21);
        assert_eq!(RampFilter::new(2).len(), 2);
    }

    #[test]
    fn test_convolve_impulse() {
        let c = -4.0 / (PI * PI);
        let filter = RampFilter::new(3);
        assert_eq!(filter.convolve(&[0.0, 1.0, 0.0]), vec![c, 1.0, c]);

        // An even kernel shifts by half a tap, as a "same" convolution does.
        let filter = RampFilter::new(4);
        assert_eq!(filter.convolve(&[0.0, 1.0, 0.0, 0.0]), vec![0.0, c, 1.0, c]);
    }

    #[test]
    fn test_convolve_zero_padded() {
        let c = -4.0 / (PI * PI);
        let filter = RampFilter::new(3);
        let out = filter.convolve(&[1.0, 1.0, 1.0]);
        let expected = [1.0 + c, 1.0 + 2.0 * c, 1.0 + c];
        for (a, b) in out.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-14);
        }
    }

    // A flat projection is mostly flattened out, leaving the edges.
    #[test]
    fn test_high_pass() {
        let filter = RampFilter::new(64);
        let out = filter.convolve(&[1.0; 64]);
        let centre = out[32];
        // sum over odd k of 8/(pi^2 k^2) tends to 1; with |k| <= 9 it's ~0.96.
        assert!(centre > 0.0 && centre < 0.05);
        assert!(out[0] > centre);
    }

    #[test]
    fn test_apply_rows_independent() {
        let filter = RampFilter::new(5);
        let sinogram = Sinogram {
            scans: 2,
            detectors: 5,
            data: vec![0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        };
        let filtered = filter.apply(&sinogram);
        assert_eq!((filtered.scans, filtered.detectors), (2, 5));
        assert_eq!(filtered.row(0), filter.convolve(sinogram.row(0)).as_slice());
        assert!(filtered.row(1).iter().all(|x| *x == 0.0));
    }
}
