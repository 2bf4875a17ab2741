//
// Fan-beam CT simulation
//
// Scan an image into a sinogram by casting rays from emitters on a
// circular gantry to a fan of detectors, then reconstruct it by
// backprojection, optionally sharpened with a ramp filter.
//

pub mod backprojection;
pub mod error;
pub mod frames;
pub mod geometry;
pub mod histogram;
pub mod ramp_filter;
pub mod reconstruction;
pub mod tomo_image;
pub mod tomo_scan;

pub use error::{Result, TomoError};
pub use geometry::{Geometry, ScanConfig};
pub use reconstruction::{FilteredReconstruction, Reconstruction, Simulation};
pub use tomo_image::Image;
pub use tomo_scan::Sinogram;
