//
// Error kinds
//
// Everything that can go wrong in the core is structural - bad
// configuration or data that can't be displayed - so there's nothing
// to retry. Zero-length rays aren't errors, see tomo_scan.
//

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TomoError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("cannot normalise a constant array (every value is {value})")]
    Normalisation { value: f64 },
    #[error("non-finite value at index {index}")]
    NonFinite { index: usize },
    #[error("buffer is {actual:?}, geometry expects {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

pub type Result<T> = std::result::Result<T, TomoError>;
