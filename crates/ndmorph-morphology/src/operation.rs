use std::str::FromStr;

use ndmorph_image::{BoundaryCondition, Pixel};

use crate::error::MorphologyError;

/// Whether a filter propagates the maximum or the minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Maximum filter.
    Dilation,
    /// Minimum filter.
    Erosion,
}

impl Polarity {
    /// The dual polarity.
    pub fn invert(self) -> Self {
        match self {
            Polarity::Dilation => Polarity::Erosion,
            Polarity::Erosion => Polarity::Dilation,
        }
    }

    /// The value that never wins the comparison: the type minimum for dilation.
    #[inline]
    pub fn identity<T: Pixel>(self) -> T {
        match self {
            Polarity::Dilation => T::min_value(),
            Polarity::Erosion => T::max_value(),
        }
    }

    /// The boundary condition equivalent to ignoring out-of-image pixels.
    pub fn identity_boundary(self) -> BoundaryCondition {
        match self {
            Polarity::Dilation => BoundaryCondition::AddMinValue,
            Polarity::Erosion => BoundaryCondition::AddMaxValue,
        }
    }

    /// Whether `a` strictly beats `b`.
    #[inline]
    pub fn better<T: Pixel>(self, a: T, b: T) -> bool {
        match self {
            Polarity::Dilation => a > b,
            Polarity::Erosion => a < b,
        }
    }

    /// The winner of `a` and `b`.
    #[inline]
    pub fn pick<T: Pixel>(self, a: T, b: T) -> T {
        match self {
            Polarity::Dilation => a.sup(b),
            Polarity::Erosion => a.inf(b),
        }
    }
}

impl FromStr for Polarity {
    type Err = MorphologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dilation" => Ok(Polarity::Dilation),
            "erosion" => Ok(Polarity::Erosion),
            _ => Err(MorphologyError::InvalidFlag(s.to_string())),
        }
    }
}

/// The four basic morphological operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicOperation {
    /// Maximum over the structuring element.
    Dilation,
    /// Minimum over the structuring element.
    Erosion,
    /// Erosion followed by dilation with the mirrored structuring element.
    Opening,
    /// Dilation followed by erosion with the mirrored structuring element.
    Closing,
}

impl BasicOperation {
    /// The first and second step of a compound operation.
    ///
    /// Returns `None` for dilation and erosion.
    pub fn steps(self) -> Option<(Polarity, Polarity)> {
        match self {
            BasicOperation::Dilation | BasicOperation::Erosion => None,
            BasicOperation::Opening => Some((Polarity::Erosion, Polarity::Dilation)),
            BasicOperation::Closing => Some((Polarity::Dilation, Polarity::Erosion)),
        }
    }

    /// The polarity of the first step.
    pub fn first_polarity(self) -> Polarity {
        match self {
            BasicOperation::Dilation | BasicOperation::Closing => Polarity::Dilation,
            BasicOperation::Erosion | BasicOperation::Opening => Polarity::Erosion,
        }
    }
}

impl From<Polarity> for BasicOperation {
    fn from(polarity: Polarity) -> Self {
        match polarity {
            Polarity::Dilation => BasicOperation::Dilation,
            Polarity::Erosion => BasicOperation::Erosion,
        }
    }
}

impl FromStr for BasicOperation {
    type Err = MorphologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dilation" => Ok(BasicOperation::Dilation),
            "erosion" => Ok(BasicOperation::Erosion),
            "opening" => Ok(BasicOperation::Opening),
            "closing" => Ok(BasicOperation::Closing),
            _ => Err(MorphologyError::InvalidFlag(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_pick_and_identity() {
        assert_eq!(Polarity::Dilation.pick(3u8, 9), 9);
        assert_eq!(Polarity::Erosion.pick(3u8, 9), 3);
        assert_eq!(Polarity::Dilation.identity::<i16>(), i16::MIN);
        assert_eq!(Polarity::Erosion.identity::<f32>(), f32::MAX);
        assert!(Polarity::Erosion.better(1.0f64, 2.0));
        assert_eq!(Polarity::Dilation.invert(), Polarity::Erosion);
    }

    #[test]
    fn test_parse_operations() -> Result<(), MorphologyError> {
        assert_eq!("closing".parse::<BasicOperation>()?, BasicOperation::Closing);
        assert_eq!("erosion".parse::<Polarity>()?, Polarity::Erosion);
        assert!("tophat".parse::<BasicOperation>().is_err());
        assert_eq!(
            BasicOperation::Opening.steps(),
            Some((Polarity::Erosion, Polarity::Dilation))
        );
        Ok(())
    }
}
