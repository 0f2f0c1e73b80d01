#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// boundary extension module.
pub mod boundary;

/// runtime pixel type dispatch module.
pub mod dyn_image;

/// image error types.
pub mod error;

/// N-dimensional image container module.
pub mod image;

/// pixel neighborhood module.
pub mod neighbors;

/// point-wise image arithmetic module.
pub mod ops;

/// pixel sample types.
pub mod pixel;

/// image skew module.
pub mod skew;

pub use crate::boundary::BoundaryCondition;
pub use crate::dyn_image::{DataType, DynImage};
pub use crate::error::ImageError;
pub use crate::image::Image;
pub use crate::neighbors::NeighborList;
pub use crate::pixel::Pixel;
