use std::fmt;
use std::str::FromStr;

use ndmorph_image::{image::array_use_parameter, Image, Pixel};

use crate::error::MorphologyError;
use crate::kernel::Kernel;

/// The shape of a structuring element.
#[derive(Debug, Clone, PartialEq)]
pub enum SeShape {
    /// A box, computed with separable running extremum filters.
    Rectangular,
    /// An ellipsoid, computed with the pixel table.
    Elliptic,
    /// A diamond, decomposed into lines when isotropic.
    Diamond,
    /// An octagon, decomposed into a diamond and a rectangle.
    Octagonal,
    /// A quadratic grey-weighted function; parameters are the curvatures per dimension.
    Parabolic,
    /// A discrete line, decomposed into a periodic line and a short discrete line.
    DiscreteLine,
    /// A Bresenham line that tessellates the image; fast but not translation invariant.
    FastLine,
    /// A line of isolated points at a regular interval.
    PeriodicLine,
    /// A line computed on a skewed, linearly interpolated image.
    InterpolatedLine,
    /// An arbitrary flat or grey-weighted neighborhood.
    Custom(Kernel),
}

impl SeShape {
    /// The name the shape is parsed from.
    pub fn name(&self) -> &'static str {
        match self {
            SeShape::Rectangular => "rectangular",
            SeShape::Elliptic => "elliptic",
            SeShape::Diamond => "diamond",
            SeShape::Octagonal => "octagonal",
            SeShape::Parabolic => "parabolic",
            SeShape::DiscreteLine => "discrete line",
            SeShape::FastLine => "fast line",
            SeShape::PeriodicLine => "periodic line",
            SeShape::InterpolatedLine => "interpolated line",
            SeShape::Custom(_) => "custom",
        }
    }
}

impl fmt::Display for SeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SeShape {
    type Err = MorphologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rectangular" => Ok(SeShape::Rectangular),
            "elliptic" => Ok(SeShape::Elliptic),
            "diamond" => Ok(SeShape::Diamond),
            "octagonal" => Ok(SeShape::Octagonal),
            "parabolic" => Ok(SeShape::Parabolic),
            "discrete line" | "line" => Ok(SeShape::DiscreteLine),
            "fast line" => Ok(SeShape::FastLine),
            "periodic line" => Ok(SeShape::PeriodicLine),
            "interpolated line" => Ok(SeShape::InterpolatedLine),
            _ => Err(MorphologyError::InvalidFlag(s.to_string())),
        }
    }
}

/// A structuring element: a shape, its sizes and whether it is reflected.
///
/// The descriptor is never mutated by the filters; they derive mirrored or decomposed copies.
///
/// # Examples
///
/// ```
/// use ndmorph_morphology::{SeShape, StructuringElement};
///
/// let se = StructuringElement::new(vec![5.0, 3.0], SeShape::Rectangular);
/// assert_eq!(se.params(&[64, 64]).unwrap(), vec![5.0, 3.0]);
/// assert!(se.is_flat());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StructuringElement {
    shape: SeShape,
    params: Vec<f64>,
    mirror: bool,
}

impl Default for StructuringElement {
    fn default() -> Self {
        Self::new(vec![7.0], SeShape::Elliptic)
    }
}

impl StructuringElement {
    /// Create a structuring element from its sizes and shape.
    ///
    /// `params` holds one value used for all dimensions or one value per dimension.
    pub fn new(params: Vec<f64>, shape: SeShape) -> Self {
        Self {
            shape,
            params,
            mirror: false,
        }
    }

    /// Create a structuring element from a shape name, see [`SeShape`].
    pub fn from_name(params: Vec<f64>, shape: &str) -> Result<Self, MorphologyError> {
        Ok(Self::new(params, shape.parse()?))
    }

    /// A flat structuring element with the set pixels of `mask`.
    pub fn from_mask(mask: &Image<bool>) -> Self {
        Self::from_kernel(Kernel::from_mask(mask))
    }

    /// A grey-weighted structuring element; infinite weights mark pixels outside of it.
    pub fn from_weights<T: Pixel>(weights: &Image<T>) -> Self {
        Self::from_kernel(Kernel::from_weights(weights))
    }

    /// A custom structuring element.
    pub fn from_kernel(kernel: Kernel) -> Self {
        let ndims = kernel.ndims();
        Self::new(vec![1.0; ndims], SeShape::Custom(kernel))
    }

    /// The shape.
    pub fn shape(&self) -> &SeShape {
        &self.shape
    }

    /// Whether the structuring element is reflected through its origin.
    pub fn is_mirrored(&self) -> bool {
        self.mirror
    }

    /// Reflect the structuring element through its origin.
    pub fn mirror(&mut self) {
        self.mirror = !self.mirror;
    }

    /// A reflected copy.
    pub fn mirrored(&self) -> Self {
        let mut se = self.clone();
        se.mirror();
        se
    }

    /// Whether the structuring element has no grey weights.
    pub fn is_flat(&self) -> bool {
        match &self.shape {
            SeShape::Parabolic => false,
            SeShape::Custom(kernel) => !kernel.has_weights(),
            _ => true,
        }
    }

    /// The sizes of the structuring element for an image with the given sizes.
    ///
    /// A single parameter is used for every dimension. Sizes of the rectangular, elliptic,
    /// diamond and octagonal shapes are taken as absolute values.
    ///
    /// # Errors
    ///
    /// Fails if the number of parameters is neither 1 nor the image dimensionality, or if any
    /// parameter is not finite.
    pub fn params(&self, image_sizes: &[usize]) -> Result<Vec<f64>, MorphologyError> {
        let ndims = image_sizes.len();
        if let SeShape::Custom(kernel) = &self.shape {
            if kernel.ndims() > ndims {
                return Err(ndmorph_image::ImageError::DimensionalityMismatch {
                    expected: ndims,
                    actual: kernel.ndims(),
                }
                .into());
            }
            return Ok(vec![1.0; ndims]);
        }
        if self.params.is_empty() || self.params.iter().any(|p| !p.is_finite()) {
            return Err(MorphologyError::InvalidSeParameters {
                shape: self.shape.to_string(),
                params: self.params.clone(),
            });
        }
        let mut params = array_use_parameter(&self.params, ndims, 1.0)?;
        if matches!(
            self.shape,
            SeShape::Rectangular | SeShape::Elliptic | SeShape::Diamond | SeShape::Octagonal
        ) {
            for p in params.iter_mut() {
                *p = p.abs();
            }
        }
        Ok(params)
    }

    /// The neighborhood of this structuring element in `ndims` dimensions.
    ///
    /// Lines of any kind are given as their discrete (Bresenham) approximation. The kernel is
    /// mirrored if the structuring element is.
    ///
    /// # Errors
    ///
    /// Octagonal, parabolic and periodic line elements have no single neighborhood
    /// representation.
    pub fn kernel(&self, ndims: usize) -> Result<Kernel, MorphologyError> {
        let params = || self.params(&vec![1; ndims]);
        let mut kernel = match &self.shape {
            SeShape::Rectangular => Kernel::rectangular(&params()?),
            SeShape::Elliptic => Kernel::elliptic(&params()?),
            SeShape::Diamond => Kernel::diamond(&params()?),
            SeShape::DiscreteLine | SeShape::FastLine | SeShape::InterpolatedLine => {
                Kernel::line(&params()?)
            }
            SeShape::Custom(kernel) => kernel.clone().expand_dims(ndims)?,
            SeShape::Octagonal | SeShape::Parabolic | SeShape::PeriodicLine => {
                return Err(MorphologyError::NoKernel(self.shape.to_string()))
            }
        };
        if self.mirror {
            kernel.mirror();
        }
        Ok(kernel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_se() -> Result<(), MorphologyError> {
        let se = StructuringElement::default();
        assert_eq!(se.shape(), &SeShape::Elliptic);
        assert_eq!(se.params(&[10, 10, 10])?, vec![7.0; 3]);
        assert!(se.is_flat());
        assert!(!se.is_mirrored());
        Ok(())
    }

    #[test]
    fn test_params_validation() -> Result<(), MorphologyError> {
        let se = StructuringElement::new(vec![-3.0, 5.0], SeShape::Rectangular);
        assert_eq!(se.params(&[8, 8])?, vec![3.0, 5.0]);
        assert!(se.params(&[8, 8, 8]).is_err());
        let se = StructuringElement::new(vec![-3.0, 5.0], SeShape::FastLine);
        assert_eq!(se.params(&[8, 8])?, vec![-3.0, 5.0]);
        let se = StructuringElement::new(vec![f64::NAN], SeShape::Diamond);
        assert!(matches!(
            se.params(&[8]),
            Err(MorphologyError::InvalidSeParameters { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_shape_names() -> Result<(), MorphologyError> {
        for name in [
            "rectangular",
            "elliptic",
            "diamond",
            "octagonal",
            "parabolic",
            "discrete line",
            "fast line",
            "periodic line",
            "interpolated line",
        ] {
            assert_eq!(name.parse::<SeShape>()?.name(), name);
        }
        assert!("hexagonal".parse::<SeShape>().is_err());
        Ok(())
    }

    #[test]
    fn test_kernel_mirroring() -> Result<(), MorphologyError> {
        let se = StructuringElement::new(vec![2.0, 1.0], SeShape::Rectangular);
        assert_eq!(se.kernel(2)?.coords(), &[vec![-1, 0], vec![0, 0]]);
        assert_eq!(se.mirrored().kernel(2)?.coords(), &[vec![1, 0], vec![0, 0]]);
        let parabolic = StructuringElement::new(vec![2.0], SeShape::Parabolic);
        assert!(!parabolic.is_flat());
        assert!(matches!(
            parabolic.kernel(2),
            Err(MorphologyError::NoKernel(_))
        ));
        Ok(())
    }

    #[test]
    fn test_custom_se() -> Result<(), Box<dyn std::error::Error>> {
        let weights = Image::new(&[3], vec![0.0f64, 1.0, f64::NEG_INFINITY])?;
        let se = StructuringElement::from_weights(&weights);
        assert!(!se.is_flat());
        assert_eq!(se.params(&[5, 5])?, vec![1.0, 1.0]);
        let kernel = se.kernel(2)?;
        assert_eq!(kernel.coords(), &[vec![-1, 0], vec![0, 0]]);
        assert!(se.params(&[]).is_err());
        Ok(())
    }
}
