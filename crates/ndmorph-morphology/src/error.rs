use ndmorph_image::ImageError;
use thiserror::Error;

use crate::parallel::ParallelError;

/// Errors related to morphological operations.
#[derive(Error, Debug, PartialEq)]
pub enum MorphologyError {
    /// An error raised by the image substrate.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The parallel executor could not run.
    #[error(transparent)]
    Parallel(#[from] ParallelError),

    /// The structuring element has no pixels.
    #[error("The structuring element is empty")]
    EmptyKernel,

    /// The structuring element parameters are not valid for the shape.
    #[error("Invalid structuring element parameters {params:?} for shape {shape}")]
    InvalidSeParameters {
        /// The shape name
        shape: String,
        /// The offending parameters
        params: Vec<f64>,
    },

    /// The structuring element cannot be expressed as a neighborhood table.
    #[error("A {0} structuring element cannot be converted to a kernel")]
    NoKernel(String),

    /// The image has fewer dimensions than the operation requires.
    #[error("Operation requires at least {required} dimensions, got {actual}")]
    DimensionalityNotSupported {
        /// The minimal dimensionality
        required: usize,
        /// The image dimensionality
        actual: usize,
    },

    /// The operation only accepts flat structuring elements.
    #[error("The structuring element must be flat")]
    NotFlat,

    /// A numeric parameter is outside its valid range.
    #[error("Parameter {name} out of range: {value}")]
    ParameterOutOfRange {
        /// The parameter name
        name: &'static str,
        /// The offending value
        value: f64,
    },

    /// A string flag was not recognized.
    #[error("Flag not recognized: {0:?}")]
    InvalidFlag(String),
}
