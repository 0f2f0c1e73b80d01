#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// area and volume openings.
pub mod area_opening;

/// segmentation error types.
pub mod error;

/// regional extrema.
pub mod extrema;

/// connected component labelling.
pub mod label;

/// sorted pixel offsets.
pub mod offsets;

/// path openings.
pub mod path_opening;

/// morphological reconstruction and derived filters.
pub mod reconstruction;

/// stochastic watershed with random seed grids.
pub mod stochastic_watershed;

/// flooding order, output and polarity types.
pub mod types;

/// union-find with region payloads.
pub mod union_find;

/// watershed segmentation.
pub mod watershed;

pub use crate::area_opening::{area_opening, volume_opening};
pub use crate::error::SegmentationError;
pub use crate::extrema::{maxima, minima, watershed_maxima, watershed_minima, ExtremaOptions};
pub use crate::label::label_binary;
pub use crate::path_opening::{
    directed_path_opening, path_opening, PathConstraint, PathOpeningOptions,
};
pub use crate::reconstruction::{
    closing_by_reconstruction, h_maxima, h_minima, impose_minima, leveling,
    limited_morphological_reconstruction, morphological_reconstruction,
    opening_by_reconstruction,
};
pub use crate::stochastic_watershed::{
    stochastic_watershed, SeedGrid, StochasticWatershedOptions,
};
pub use crate::types::{FilterPolarity, FloodOrder, OutputKind, SegmentationImage};
pub use crate::union_find::{UnionFind, MAX_LABEL};
pub use crate::watershed::{
    compact_watershed, fast_watershed, seeded_watershed, watershed, Seeds, WatershedOptions,
};
