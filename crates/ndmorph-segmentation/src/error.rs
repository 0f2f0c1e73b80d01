use ndmorph_image::ImageError;
use ndmorph_morphology::MorphologyError;
use thiserror::Error;

/// Errors related to segmentation and connected filters.
#[derive(Error, Debug, PartialEq)]
pub enum SegmentationError {
    /// An error raised by the image substrate.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// An error raised by a morphological filter.
    #[error(transparent)]
    Morphology(#[from] MorphologyError),

    /// No more region labels can be created.
    #[error("Cannot create more than {max} regions")]
    LabelSpaceExhausted {
        /// The largest usable label
        max: u32,
    },

    /// The seed image holds labels that collide with the reserved ones.
    #[error("The seed image has too many seeds: largest label {0}")]
    TooManySeeds(u32),

    /// An image dimension is smaller than the algorithm needs.
    #[error("Input image is too small: every dimension must be at least {min}, got {sizes:?}")]
    ImageTooSmall {
        /// The smallest allowed size
        min: usize,
        /// The image sizes
        sizes: Vec<usize>,
    },

    /// The image has fewer dimensions than the algorithm requires.
    #[error("Operation requires at least {required} dimensions, got {actual}")]
    DimensionalityNotSupported {
        /// The minimal dimensionality
        required: usize,
        /// The image dimensionality
        actual: usize,
    },

    /// A numeric parameter is out of range.
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
