use std::str::FromStr;

use ndmorph_image::Image;

use crate::error::SegmentationError;

/// The order in which pixels are flooded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloodOrder {
    /// Start at the minima, basins grow upwards.
    #[default]
    LowFirst,
    /// Start at the maxima, basins grow downwards.
    HighFirst,
}

impl FloodOrder {
    /// Whether `a` is flooded before `b`.
    #[inline]
    pub fn precedes<T: PartialOrd>(self, a: T, b: T) -> bool {
        match self {
            FloodOrder::LowFirst => a < b,
            FloodOrder::HighFirst => a > b,
        }
    }

    /// Whether `value` marks the end of the flooding: `+inf` low first, `-inf` high first.
    #[inline]
    pub fn is_last<T: ndmorph_image::Pixel>(self, value: T) -> bool {
        match self {
            FloodOrder::LowFirst => value.is_pos_infinity(),
            FloodOrder::HighFirst => value.is_neg_infinity(),
        }
    }
}

impl FromStr for FloodOrder {
    type Err = SegmentationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low first" => Ok(FloodOrder::LowFirst),
            "high first" => Ok(FloodOrder::HighFirst),
            _ => Err(SegmentationError::InvalidFlag(s.to_string())),
        }
    }
}

/// The kind of image a segmentation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputKind {
    /// A binary image of watershed lines or extrema.
    #[default]
    Binary,
    /// A densely labelled region image.
    Labels,
}

impl FromStr for OutputKind {
    type Err = SegmentationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(OutputKind::Binary),
            "labels" => Ok(OutputKind::Labels),
            _ => Err(SegmentationError::InvalidFlag(s.to_string())),
        }
    }
}

/// Whether a connected filter removes bright or dark structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterPolarity {
    /// Remove bright structures.
    #[default]
    Opening,
    /// Remove dark structures.
    Closing,
}

impl FromStr for FilterPolarity {
    type Err = SegmentationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opening" => Ok(FilterPolarity::Opening),
            "closing" => Ok(FilterPolarity::Closing),
            _ => Err(SegmentationError::InvalidFlag(s.to_string())),
        }
    }
}

/// The result of a segmentation: watershed lines or extrema as a binary image, or labelled
/// regions.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationImage {
    /// A binary image.
    Binary(Image<bool>),
    /// A label image; 0 is background.
    Labels(Image<u32>),
}

impl SegmentationImage {
    /// The extent of each dimension.
    pub fn sizes(&self) -> &[usize] {
        match self {
            SegmentationImage::Binary(image) => image.sizes(),
            SegmentationImage::Labels(image) => image.sizes(),
        }
    }

    /// The binary image, if this is one.
    pub fn as_binary(&self) -> Option<&Image<bool>> {
        match self {
            SegmentationImage::Binary(image) => Some(image),
            SegmentationImage::Labels(_) => None,
        }
    }

    /// The label image, if this is one.
    pub fn as_labels(&self) -> Option<&Image<u32>> {
        match self {
            SegmentationImage::Binary(_) => None,
            SegmentationImage::Labels(image) => Some(image),
        }
    }

    /// The binary image; labels are converted by marking every nonzero label.
    pub fn into_binary(self) -> Image<bool> {
        match self {
            SegmentationImage::Binary(image) => image,
            SegmentationImage::Labels(image) => image.map(|&l| l > 0),
        }
    }

    /// The label image; binary images are converted to labels 0 and 1.
    pub fn into_labels(self) -> Image<u32> {
        match self {
            SegmentationImage::Binary(image) => image.map(|&b| u32::from(b)),
            SegmentationImage::Labels(image) => image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() -> Result<(), SegmentationError> {
        assert_eq!("high first".parse::<FloodOrder>()?, FloodOrder::HighFirst);
        assert_eq!("labels".parse::<OutputKind>()?, OutputKind::Labels);
        assert_eq!("closing".parse::<FilterPolarity>()?, FilterPolarity::Closing);
        assert_eq!(
            "sideways".parse::<FloodOrder>(),
            Err(SegmentationError::InvalidFlag("sideways".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_flood_order() {
        assert!(FloodOrder::LowFirst.precedes(1, 2));
        assert!(FloodOrder::HighFirst.precedes(2.5, 1.0));
        assert!(!FloodOrder::LowFirst.precedes(2, 2));
        assert!(FloodOrder::LowFirst.is_last(f32::INFINITY));
        assert!(!FloodOrder::HighFirst.is_last(f32::INFINITY));
        assert!(!FloodOrder::LowFirst.is_last(u8::MAX));
    }
}
