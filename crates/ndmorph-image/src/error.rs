use thiserror::Error;

/// An error type for image creation and manipulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    /// The number of elements does not match the requested sizes.
    #[error("Shape mismatch: expected {expected} elements for sizes, but got {actual} elements in data")]
    InvalidShape {
        /// Expected number of elements based on the sizes
        expected: usize,
        /// Actual number of elements in the data
        actual: usize,
    },

    /// Two images that must have the same sizes do not.
    #[error("Image sizes do not match: expected {expected:?}, got {actual:?}")]
    SizeMismatch {
        /// Sizes of the reference image
        expected: Vec<usize>,
        /// Sizes of the offending image
        actual: Vec<usize>,
    },

    /// A coordinate exceeds the image bounds.
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index that was attempted
        index: usize,
        /// The size of the dimension being indexed
        size: usize,
    },

    /// A coordinate or parameter array has the wrong number of dimensions.
    #[error("Dimensionality mismatch: expected {expected} dimensions, got {actual}")]
    DimensionalityMismatch {
        /// Dimensionality of the image
        expected: usize,
        /// Length of the array given
        actual: usize,
    },

    /// The connectivity is not in `1..=ndims`.
    #[error("Illegal connectivity {connectivity} for a {ndims}-dimensional image")]
    IllegalConnectivity {
        /// Requested connectivity
        connectivity: usize,
        /// Dimensionality of the image
        ndims: usize,
    },

    /// A string flag was not recognized.
    #[error("Flag not recognized: {0:?}")]
    InvalidFlag(String),

    /// A numeric parameter is out of its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ImageError {
    /// Build a [`ImageError::SizeMismatch`] from two size arrays.
    pub fn size_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::SizeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

/// Returns an error if `actual` is not equal to `expected`.
pub fn check_sizes(expected: &[usize], actual: &[usize]) -> Result<(), ImageError> {
    if expected != actual {
        return Err(ImageError::size_mismatch(expected, actual));
    }
    Ok(())
}
