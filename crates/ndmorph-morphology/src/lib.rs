#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// dilation, erosion, opening, closing and derived filters.
pub mod basic;

/// algorithm selection thresholds.
pub mod config;

/// diamond and octagon decompositions.
pub mod decomposition;

/// morphology error types.
pub mod error;

/// threshold, gist, Lee, smoothing and Laplace filters.
pub mod filters;

/// neighborhood kernels.
pub mod kernel;

/// straight line structuring elements.
pub mod line;

/// one-dimensional running extremum filters.
pub mod line_filter;

/// operation and polarity types.
pub mod operation;

/// parabolic structuring functions.
pub mod parabolic;

/// parallel line processing.
pub mod parallel;

/// pixel table filters for arbitrary neighborhoods.
pub mod pixel_table;

/// rank filters and rank-based openings and closings.
pub mod rank;

/// separable rectangular filters.
pub mod separable;

/// structuring element descriptions.
pub mod structuring_element;

pub use crate::basic::{
    basic_morphology, basic_morphology_dyn, closing, closing_dyn, closing_with, dilation,
    dilation_dyn, dilation_with, erosion, erosion_dyn, erosion_with,
    morphological_gradient_magnitude, morphological_range, opening, opening_dyn, opening_with,
    tophat, EdgeType, MorphologyOptions, TophatPolarity,
};
pub use crate::error::MorphologyError;
pub use crate::filters::{
    lee, morphological_gist, morphological_laplace, morphological_smoothing,
    morphological_threshold, multi_scale_morphological_gradient, LeeSign, SmoothingMode,
};
pub use crate::kernel::Kernel;
pub use crate::operation::{BasicOperation, Polarity};
pub use crate::parallel::ExecutionStrategy;
pub use crate::rank::{rank_filter, rank_max_opening, rank_min_closing, RankOrder};
pub use crate::structuring_element::{SeShape, StructuringElement};
