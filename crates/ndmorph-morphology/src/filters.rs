use std::str::FromStr;

use ndmorph_image::{error::check_sizes, BoundaryCondition, Image, ImageError, Pixel};
use rayon::prelude::*;

use crate::basic::{closing, dilation, erosion, opening, EdgeType};
use crate::error::MorphologyError;
use crate::structuring_element::{SeShape, StructuringElement};

/// Combine corresponding samples of equally sized images in `f64`, saturating the result.
fn combine<T: Pixel, const N: usize, F>(
    images: [&Image<T>; N],
    f: F,
) -> Result<Image<T>, ImageError>
where
    F: Fn([f64; N]) -> f64 + Send + Sync,
{
    let Some(first) = images.first() else {
        return Err(ImageError::DimensionalityMismatch {
            expected: 1,
            actual: 0,
        });
    };
    for image in &images {
        check_sizes(first.sizes(), image.sizes())?;
    }
    let mut out = (*first).clone();
    out.as_slice_mut()
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, o)| {
            *o = T::clamp_from_f64(f(images.map(|image| image.as_slice()[i].to_f64())));
        });
    Ok(out)
}

/// The morphological threshold: the value halfway between a larger and a smaller filtered image.
///
/// * both: `(dilation(in) + erosion(in)) / 2`;
/// * texture: `(closing(in) + opening(in)) / 2`;
/// * object: `in` plus half of
///   `dilation(in) - erosion(dilation(in)) + erosion(in) - dilation(erosion(in))`.
///
/// The arithmetic is exact; the result is rounded and saturated to the pixel type.
pub fn morphological_threshold<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    edge: EdgeType,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    let out = match edge {
        EdgeType::Both => {
            let dilated = dilation(image, se, bcs)?;
            let eroded = erosion(image, se, bcs)?;
            combine([&dilated, &eroded], |[d, e]| (d + e) / 2.0)?
        }
        EdgeType::Texture => {
            let closed = closing(image, se, bcs)?;
            let opened = opening(image, se, bcs)?;
            combine([&closed, &opened], |[c, o]| (c + o) / 2.0)?
        }
        EdgeType::Object => {
            let [dilated, eroded, de, ed] = object_parts(image, se, bcs)?;
            combine(
                [image, &dilated, &eroded, &de, &ed],
                |[v, d, e, de, ed]| (d - de + e - ed) / 2.0 + v,
            )?
        }
    };
    Ok(out)
}

/// The morphological gist: the image minus its [`morphological_threshold`].
pub fn morphological_gist<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    edge: EdgeType,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    let out = match edge {
        EdgeType::Both => {
            let dilated = dilation(image, se, bcs)?;
            let eroded = erosion(image, se, bcs)?;
            combine([image, &dilated, &eroded], |[v, d, e]| v - (d + e) / 2.0)?
        }
        EdgeType::Texture => {
            let closed = closing(image, se, bcs)?;
            let opened = opening(image, se, bcs)?;
            combine([image, &closed, &opened], |[v, c, o]| v - (c + o) / 2.0)?
        }
        EdgeType::Object => {
            let [dilated, eroded, de, ed] = object_parts(image, se, bcs)?;
            combine([&dilated, &eroded, &de, &ed], |[d, e, de, ed]| {
                (de - d - e + ed) / 2.0
            })?
        }
    };
    Ok(out)
}

/// The dilation, the erosion, the erosion of the dilation and the dilation of the erosion.
fn object_parts<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
) -> Result<[Image<T>; 4], MorphologyError> {
    let dilated = dilation(image, se, bcs)?;
    let eroded = erosion(image, se, bcs)?;
    let de = erosion(&dilated, se, bcs)?;
    let ed = dilation(&eroded, se, bcs)?;
    Ok([dilated, eroded, de, ed])
}

/// Whether the Lee edge detector keeps the side of the smaller response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeeSign {
    /// The smaller response, negated when it comes from the lower side of the edge.
    Signed,
    /// The smaller response.
    #[default]
    Unsigned,
}

impl FromStr for LeeSign {
    type Err = MorphologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signed" => Ok(LeeSign::Signed),
            "unsigned" => Ok(LeeSign::Unsigned),
            _ => Err(MorphologyError::InvalidFlag(s.to_string())),
        }
    }
}

/// The Lee edge detector: the smaller of the upper and lower edge responses.
///
/// | edge | upper | lower |
/// |---|---|---|
/// | both | `dilation(in) - in` | `in - erosion(in)` |
/// | texture | `closing(in) - in` | `in - opening(in)` |
/// | object | `dilation(in) - erosion(dilation(in))` | `dilation(erosion(in)) - erosion(in)` |
///
/// The signed variant returns `-lower` where `upper > lower`. Negative values saturate to zero
/// for unsigned pixel types.
pub fn lee<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    edge: EdgeType,
    sign: LeeSign,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    let pick = move |upper: f64, lower: f64| match sign {
        LeeSign::Unsigned => upper.min(lower),
        LeeSign::Signed if upper > lower => -lower,
        LeeSign::Signed => upper,
    };
    let out = match edge {
        EdgeType::Both => {
            let dilated = dilation(image, se, bcs)?;
            let eroded = erosion(image, se, bcs)?;
            combine([image, &dilated, &eroded], |[v, d, e]| pick(d - v, v - e))?
        }
        EdgeType::Texture => {
            let closed = closing(image, se, bcs)?;
            let opened = opening(image, se, bcs)?;
            combine([image, &closed, &opened], |[v, c, o]| pick(c - v, v - o))?
        }
        EdgeType::Object => {
            let [dilated, eroded, de, ed] = object_parts(image, se, bcs)?;
            combine([&dilated, &eroded, &de, &ed], |[d, e, de, ed]| {
                pick(d - de, ed - e)
            })?
        }
    };
    Ok(out)
}

/// The order of the opening and closing in [`morphological_smoothing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmoothingMode {
    /// An opening followed by a closing.
    OpenClose,
    /// A closing followed by an opening.
    CloseOpen,
    /// The mean of both orders.
    #[default]
    Average,
}

impl FromStr for SmoothingMode {
    type Err = MorphologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open-close" => Ok(SmoothingMode::OpenClose),
            "close-open" => Ok(SmoothingMode::CloseOpen),
            "average" => Ok(SmoothingMode::Average),
            _ => Err(MorphologyError::InvalidFlag(s.to_string())),
        }
    }
}

/// Remove both bright and dark structures smaller than the structuring element.
pub fn morphological_smoothing<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    mode: SmoothingMode,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    let open_close = |image: &Image<T>| closing(&opening(image, se, bcs)?, se, bcs);
    let close_open = |image: &Image<T>| opening(&closing(image, se, bcs)?, se, bcs);
    match mode {
        SmoothingMode::OpenClose => open_close(image),
        SmoothingMode::CloseOpen => close_open(image),
        SmoothingMode::Average => {
            let a = open_close(image)?;
            let b = close_open(image)?;
            Ok(combine([&a, &b], |[a, b]| (a + b) / 2.0)?)
        }
    }
}

/// The morphological gradient averaged over a range of scales.
///
/// For every size `s` in `lower..=upper`, the gradient with a structuring element of diameter
/// `2 s + 1` is eroded with one of diameter `2 s - 1`, which suppresses the thick responses of
/// the larger elements. The result is the mean over all scales.
///
/// # Errors
///
/// Fails if `lower` is zero or larger than `upper`, and for shapes that have no size.
pub fn multi_scale_morphological_gradient<T: Pixel>(
    image: &Image<T>,
    upper: usize,
    lower: usize,
    shape: &SeShape,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    if lower == 0 {
        return Err(MorphologyError::ParameterOutOfRange {
            name: "lower",
            value: 0.0,
        });
    }
    if lower > upper {
        return Err(MorphologyError::ParameterOutOfRange {
            name: "upper",
            value: upper as f64,
        });
    }
    let mut sum = image.similar(0.0f64);
    for size in lower..=upper {
        let outer = StructuringElement::new(vec![(2 * size + 1) as f64], shape.clone());
        let inner = StructuringElement::new(vec![(2 * size - 1) as f64], shape.clone());
        let dilated = dilation(image, &outer, bcs)?;
        let eroded = erosion(image, &outer, bcs)?;
        let gradient = combine([&dilated, &eroded], |[d, e]| d - e)?;
        let gradient = erosion(&gradient, &inner, bcs)?;
        sum.as_slice_mut()
            .par_iter_mut()
            .zip(gradient.as_slice().par_iter())
            .for_each(|(s, &g)| *s += g.to_f64());
    }
    let count = (upper - lower + 1) as f64;
    Ok(sum.map(|&s| T::clamp_from_f64(s / count)))
}

/// The morphological Laplace: `(dilation(in) + erosion(in)) / 2 - in`.
pub fn morphological_laplace<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    let dilated = dilation(image, se, bcs)?;
    let eroded = erosion(image, se, bcs)?;
    Ok(combine([image, &dilated, &eroded], |[v, d, e]| {
        (d + e) / 2.0 - v
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::morphological_gradient_magnitude;

    fn plateau() -> Result<Image<i16>, MorphologyError> {
        Ok(Image::new(&[7], vec![0, 0, 10, 10, 10, 0, 0])?)
    }

    fn rect(size: f64) -> StructuringElement {
        StructuringElement::new(vec![size], SeShape::Rectangular)
    }

    #[test]
    fn test_threshold_and_gist() -> Result<(), MorphologyError> {
        let image = plateau()?;
        let se = rect(3.0);
        let both = morphological_threshold(&image, &se, EdgeType::Both, &[])?;
        assert_eq!(both.as_slice(), &[0, 5, 5, 10, 5, 5, 0]);
        let object = morphological_threshold(&image, &se, EdgeType::Object, &[])?;
        assert_eq!(object, both);
        // the plateau survives both the opening and the closing
        let texture = morphological_threshold(&image, &se, EdgeType::Texture, &[])?;
        assert_eq!(texture, image);

        let gist = morphological_gist(&image, &se, EdgeType::Both, &[])?;
        assert_eq!(gist.as_slice(), &[0, -5, 5, 0, 5, -5, 0]);
        let gist = morphological_gist(&image, &se, EdgeType::Object, &[])?;
        assert_eq!(gist.as_slice(), &[0, -5, 5, 0, 5, -5, 0]);
        let gist = morphological_gist(&image, &se, EdgeType::Texture, &[])?;
        assert!(gist.as_slice().iter().all(|&v| v == 0));
        Ok(())
    }

    #[test]
    fn test_laplace_is_negated_gist() -> Result<(), MorphologyError> {
        let image = plateau()?;
        let laplace = morphological_laplace(&image, &rect(3.0), &[])?;
        assert_eq!(laplace.as_slice(), &[0, 5, -5, 0, -5, 5, 0]);
        let constant = Image::from_size_val(&[6, 4], 7.5f32);
        let laplace = morphological_laplace(&constant, &rect(3.0), &[])?;
        assert!(laplace.as_slice().iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test]
    fn test_lee_on_ramp() -> Result<(), MorphologyError> {
        let image = Image::new(&[6], vec![0i16, 0, 2, 6, 8, 8])?;
        let se = rect(3.0);
        let out = lee(&image, &se, EdgeType::Both, LeeSign::Unsigned, &[])?;
        assert_eq!(out.as_slice(), &[0, 0, 2, 2, 0, 0]);
        let out = lee(&image, &se, EdgeType::Both, LeeSign::Signed, &[])?;
        assert_eq!(out.as_slice(), &[0, 0, -2, 2, 0, 0]);
        // unsigned pixels lose the sign
        let out = lee(&image.cast::<u8>(), &se, EdgeType::Both, LeeSign::Signed, &[])?;
        assert_eq!(out.as_slice(), &[0, 0, 0, 2, 0, 0]);
        assert_eq!("signed".parse::<LeeSign>()?, LeeSign::Signed);
        assert!("both".parse::<LeeSign>().is_err());
        Ok(())
    }

    #[test]
    fn test_smoothing_removes_spike_and_pit() -> Result<(), MorphologyError> {
        let image = Image::new(&[9], vec![5u8, 5, 5, 9, 5, 5, 1, 5, 5])?;
        for mode in ["open-close", "close-open", "average"] {
            let out = morphological_smoothing(&image, &rect(3.0), mode.parse()?, &[])?;
            assert!(out.as_slice().iter().all(|&v| v == 5), "{mode}");
        }
        assert!(matches!(
            "open".parse::<SmoothingMode>(),
            Err(MorphologyError::InvalidFlag(_))
        ));
        Ok(())
    }

    #[test]
    fn test_multi_scale_gradient() -> Result<(), MorphologyError> {
        let image = Image::new(&[8], vec![0i16, 0, 0, 0, 10, 10, 10, 10])?;
        let out = multi_scale_morphological_gradient(&image, 2, 1, &SeShape::Rectangular, &[])?;
        assert_eq!(out.as_slice(), &[0, 0, 0, 10, 10, 0, 0, 0]);

        // a single scale of 1 is the plain gradient with a 3 pixel element
        let out = multi_scale_morphological_gradient(&image, 1, 1, &SeShape::Elliptic, &[])?;
        let se = StructuringElement::new(vec![3.0], SeShape::Elliptic);
        assert_eq!(out, morphological_gradient_magnitude(&image, &se, &[])?);

        assert!(matches!(
            multi_scale_morphological_gradient(&image, 1, 2, &SeShape::Rectangular, &[]),
            Err(MorphologyError::ParameterOutOfRange { name: "upper", .. })
        ));
        assert!(matches!(
            multi_scale_morphological_gradient(&image, 3, 0, &SeShape::Rectangular, &[]),
            Err(MorphologyError::ParameterOutOfRange { name: "lower", .. })
        ));
        Ok(())
    }
}
