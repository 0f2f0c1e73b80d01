use std::str::FromStr;

use ndmorph_image::{
    boundary::boundary_array, dispatch_image, ops, BoundaryCondition, DynImage, Image, Pixel,
};

use crate::decomposition::{diamond_morphology, octagonal_morphology};
use crate::error::MorphologyError;
use crate::line::{discrete_line_morphology, fast_line_morphology, skew_line_morphology};
use crate::operation::{BasicOperation, Polarity};
use crate::parabolic::parabolic_morphology;
use crate::parallel::ExecutionStrategy;
use crate::pixel_table::pixel_table_morphology;
use crate::separable::rectangular_morphology;
use crate::structuring_element::{SeShape, StructuringElement};

/// Options shared by the morphological filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MorphologyOptions {
    /// How image lines are distributed over threads.
    pub strategy: ExecutionStrategy,
}

/// Apply a basic morphological operation.
///
/// The algorithm is chosen from the shape of the structuring element: separable running
/// extremum filters for rectangles, line filters for lines, the pixel table for ellipses and
/// custom neighborhoods, decompositions for diamonds and octagons, and envelope passes for
/// parabolas.
///
/// # Arguments
///
/// * `image` - The input image.
/// * `se` - The structuring element.
/// * `bcs` - The boundary conditions, none, one, or one per dimension. Without boundary
///   conditions, pixels outside the image are ignored.
/// * `operation` - The operation.
/// * `options` - The execution options.
///
/// # Errors
///
/// Fails if the structuring element parameters or the boundary conditions do not match the
/// image dimensionality.
pub fn basic_morphology<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
    operation: BasicOperation,
    options: &MorphologyOptions,
) -> Result<Image<T>, MorphologyError> {
    let params = se.params(image.sizes())?;
    let bcs = boundary_array(bcs, image.ndims())?;
    if image.is_empty() || image.ndims() == 0 {
        return Ok(image.clone());
    }
    let strategy = options.strategy;
    let mirror = se.is_mirrored();
    log::debug!(
        "{operation:?} with {} structuring element {params:?}",
        se.shape()
    );

    match se.shape() {
        SeShape::Rectangular => {
            rectangular_morphology(image, &params, mirror, &bcs, operation, strategy)
        }
        SeShape::FastLine => {
            fast_line_morphology(image, &params, false, mirror, &bcs, operation, strategy)
        }
        SeShape::PeriodicLine => {
            fast_line_morphology(image, &params, true, mirror, &bcs, operation, strategy)
        }
        SeShape::InterpolatedLine => {
            skew_line_morphology(image, &params, mirror, &bcs, operation, strategy)
        }
        _ => match operation.steps() {
            None => single_step(
                image,
                se,
                &params,
                &bcs,
                operation.first_polarity(),
                mirror,
                strategy,
            ),
            Some((first, second)) => {
                let tmp = single_step(image, se, &params, &bcs, first, mirror, strategy)?;
                single_step(&tmp, se, &params, &bcs, second, !mirror, strategy)
            }
        },
    }
}

/// Dilation or erosion with a structuring element that is not separable into line filters.
fn single_step<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    params: &[f64],
    bcs: &[BoundaryCondition],
    polarity: Polarity,
    mirror: bool,
    strategy: ExecutionStrategy,
) -> Result<Image<T>, MorphologyError> {
    match se.shape() {
        SeShape::Diamond => diamond_morphology(image, params, bcs, polarity, strategy),
        SeShape::Octagonal => octagonal_morphology(image, params, bcs, polarity, strategy),
        SeShape::Parabolic => parabolic_morphology(image, params, polarity, strategy),
        SeShape::DiscreteLine => {
            discrete_line_morphology(image, params, mirror, bcs, polarity, strategy)
        }
        _ => {
            let mut kernel = se.kernel(image.ndims())?;
            if mirror != se.is_mirrored() {
                kernel.mirror();
            }
            pixel_table_morphology(image, &kernel, polarity, bcs, strategy)
        }
    }
}

/// Dilation: the maximum over the structuring element.
///
/// # Examples
///
/// ```
/// use ndmorph_image::Image;
/// use ndmorph_morphology::{dilation, SeShape, StructuringElement};
///
/// let mut image = Image::from_size_val(&[7, 5], 0u8);
/// *image.get_mut(&[3, 2]).unwrap() = 9;
/// let se = StructuringElement::new(vec![3.0], SeShape::Rectangular);
/// let out = dilation(&image, &se, &[]).unwrap();
/// assert_eq!(out.as_slice().iter().filter(|&&v| v == 9).count(), 9);
/// ```
pub fn dilation<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    dilation_with(image, se, bcs, &MorphologyOptions::default())
}

/// Erosion: the minimum over the structuring element.
pub fn erosion<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    erosion_with(image, se, bcs, &MorphologyOptions::default())
}

/// Opening: erosion followed by dilation with the mirrored structuring element.
pub fn opening<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    opening_with(image, se, bcs, &MorphologyOptions::default())
}

/// Closing: dilation followed by erosion with the mirrored structuring element.
pub fn closing<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    closing_with(image, se, bcs, &MorphologyOptions::default())
}

/// [`dilation`] with explicit options.
pub fn dilation_with<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
    options: &MorphologyOptions,
) -> Result<Image<T>, MorphologyError> {
    basic_morphology(image, se, bcs, BasicOperation::Dilation, options)
}

/// [`erosion`] with explicit options.
pub fn erosion_with<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
    options: &MorphologyOptions,
) -> Result<Image<T>, MorphologyError> {
    basic_morphology(image, se, bcs, BasicOperation::Erosion, options)
}

/// [`opening`] with explicit options.
pub fn opening_with<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
    options: &MorphologyOptions,
) -> Result<Image<T>, MorphologyError> {
    basic_morphology(image, se, bcs, BasicOperation::Opening, options)
}

/// [`closing`] with explicit options.
pub fn closing_with<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
    options: &MorphologyOptions,
) -> Result<Image<T>, MorphologyError> {
    basic_morphology(image, se, bcs, BasicOperation::Closing, options)
}

/// Apply a basic operation to an image of any sample type.
pub fn basic_morphology_dyn(
    image: &DynImage,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
    operation: BasicOperation,
) -> Result<DynImage, MorphologyError> {
    let options = MorphologyOptions::default();
    dispatch_image!(image, img => {
        basic_morphology(img, se, bcs, operation, &options).map(DynImage::from)
    })
}

/// [`dilation`] of an image of any sample type.
pub fn dilation_dyn(
    image: &DynImage,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
) -> Result<DynImage, MorphologyError> {
    basic_morphology_dyn(image, se, bcs, BasicOperation::Dilation)
}

/// [`erosion`] of an image of any sample type.
pub fn erosion_dyn(
    image: &DynImage,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
) -> Result<DynImage, MorphologyError> {
    basic_morphology_dyn(image, se, bcs, BasicOperation::Erosion)
}

/// [`opening`] of an image of any sample type.
pub fn opening_dyn(
    image: &DynImage,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
) -> Result<DynImage, MorphologyError> {
    basic_morphology_dyn(image, se, bcs, BasicOperation::Opening)
}

/// [`closing`] of an image of any sample type.
pub fn closing_dyn(
    image: &DynImage,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
) -> Result<DynImage, MorphologyError> {
    basic_morphology_dyn(image, se, bcs, BasicOperation::Closing)
}

/// Which edges a derived filter responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeType {
    /// Structures smaller than the structuring element.
    Texture,
    /// Edges of objects larger than the structuring element.
    Object,
    /// Both texture and object edges.
    #[default]
    Both,
}

impl FromStr for EdgeType {
    type Err = MorphologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "texture" => Ok(EdgeType::Texture),
            "object" => Ok(EdgeType::Object),
            "both" | "dynamic" => Ok(EdgeType::Both),
            _ => Err(MorphologyError::InvalidFlag(s.to_string())),
        }
    }
}

/// Whether a top-hat finds bright or dark structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TophatPolarity {
    /// Bright peaks, using erosion and opening.
    #[default]
    White,
    /// Dark valleys, using dilation and closing.
    Black,
}

impl FromStr for TophatPolarity {
    type Err = MorphologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" => Ok(TophatPolarity::White),
            "black" => Ok(TophatPolarity::Black),
            _ => Err(MorphologyError::InvalidFlag(s.to_string())),
        }
    }
}

/// The top-hat: the difference between the image and a filtered version of it.
///
/// | edge | white | black |
/// |---|---|---|
/// | texture | `in - opening(in)` | `closing(in) - in` |
/// | object | `dilation(erosion(in)) - erosion(in)` | `dilation(in) - erosion(dilation(in))` |
/// | both | `in - erosion(in)` | `dilation(in) - in` |
///
/// Differences saturate for unsigned types.
pub fn tophat<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    edge: EdgeType,
    polarity: TophatPolarity,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    let out = match (edge, polarity) {
        (EdgeType::Both, TophatPolarity::White) => {
            ops::subtract(image, &erosion(image, se, bcs)?)?
        }
        (EdgeType::Both, TophatPolarity::Black) => {
            ops::subtract(&dilation(image, se, bcs)?, image)?
        }
        (EdgeType::Texture, TophatPolarity::White) => {
            ops::subtract(image, &opening(image, se, bcs)?)?
        }
        (EdgeType::Texture, TophatPolarity::Black) => {
            ops::subtract(&closing(image, se, bcs)?, image)?
        }
        (EdgeType::Object, TophatPolarity::White) => {
            let eroded = erosion(image, se, bcs)?;
            ops::subtract(&dilation(&eroded, se, bcs)?, &eroded)?
        }
        (EdgeType::Object, TophatPolarity::Black) => {
            let dilated = dilation(image, se, bcs)?;
            ops::subtract(&dilated, &erosion(&dilated, se, bcs)?)?
        }
    };
    Ok(out)
}

/// The morphological range: the difference between a larger and a smaller filtered image.
///
/// * both: `dilation(in) - erosion(in)`;
/// * texture: `closing(in) - opening(in)`;
/// * object: `(dilation(in) - erosion(dilation(in))) - erosion(in) + dilation(erosion(in))`.
pub fn morphological_range<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    edge: EdgeType,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    let out = match edge {
        EdgeType::Both => ops::subtract(&dilation(image, se, bcs)?, &erosion(image, se, bcs)?)?,
        EdgeType::Texture => ops::subtract(&closing(image, se, bcs)?, &opening(image, se, bcs)?)?,
        EdgeType::Object => {
            let dilated = dilation(image, se, bcs)?;
            let out = ops::subtract(&dilated, &erosion(&dilated, se, bcs)?)?;
            let eroded = erosion(image, se, bcs)?;
            let out = ops::subtract(&out, &eroded)?;
            ops::add(&out, &dilation(&eroded, se, bcs)?)?
        }
    };
    Ok(out)
}

/// The morphological gradient magnitude, `dilation(in) - erosion(in)`.
pub fn morphological_gradient_magnitude<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    morphological_range(image, se, EdgeType::Both, bcs)
}
