#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use ndmorph_image as image;

#[doc(inline)]
pub use ndmorph_morphology as morphology;

#[doc(inline)]
pub use ndmorph_segmentation as segmentation;
