//! Diamond and octagon structuring elements built from smaller ones.

use ndmorph_image::{BoundaryCondition, Image, Pixel};

use crate::config::DIAMOND_DECOMPOSITION_MIN_SIZE;
use crate::error::MorphologyError;
use crate::kernel::Kernel;
use crate::line::fast_line_morphology;
use crate::operation::Polarity;
use crate::parallel::ExecutionStrategy;
use crate::pixel_table::pixel_table_morphology;
use crate::separable::rectangular_morphology;

/// Dilation or erosion with a diamond of diameters `params`.
///
/// An isotropic diamond in 2D of size 5 or more is the Minkowski sum of a small diamond and two
/// diagonal lines; the lines are computed with running extremum filters so the cost does not
/// grow with the size. Other diamonds use the pixel table.
///
/// Near the image edge the decomposed filter only sees pixels it can reach through the image,
/// which can differ from the pixel table when `bcs` is empty.
pub fn diamond_morphology<T: Pixel>(
    image: &Image<T>,
    params: &[f64],
    bcs: &[BoundaryCondition],
    polarity: Polarity,
    strategy: ExecutionStrategy,
) -> Result<Image<T>, MorphologyError> {
    let isotropic = params.windows(2).all(|w| w[0] == w[1]);
    let size = params.first().copied().unwrap_or(1.0);
    if params.len() != 2 || !isotropic || size.round() < DIAMOND_DECOMPOSITION_MIN_SIZE as f64 {
        return pixel_table_morphology(image, &Kernel::diamond(params), polarity, bcs, strategy);
    }

    let unit = ((size / 4.0).floor() * 2.0 + 1.0).max(3.0);
    let line = ((size - unit) as usize + 1) / 2 + 1;
    let mut kernel = Kernel::diamond(&[unit, unit]);
    if line % 2 == 0 {
        // even lines are off-centre by half a pixel each along dimension 0
        kernel.shift(&[1, 0]);
    }
    log::debug!("diamond {size} as unit diamond {unit} and diagonal lines of {line}");

    let mut out = pixel_table_morphology(image, &kernel, polarity, bcs, strategy)?;
    let length = line as f64;
    for params in [[length, length], [length, -length]] {
        out = fast_line_morphology(
            &out,
            &params,
            false,
            false,
            bcs,
            polarity.into(),
            strategy,
        )?;
    }
    Ok(out)
}

/// Dilation or erosion with an octagon: a diamond followed by a rectangle.
///
/// Sizes are rounded down to odd values; sizes below 3 are treated as 1. The diamond takes its
/// size from the smallest dimension of at least 3, the rectangle makes up the rest.
pub fn octagonal_morphology<T: Pixel>(
    image: &Image<T>,
    params: &[f64],
    bcs: &[BoundaryCondition],
    polarity: Polarity,
    strategy: ExecutionStrategy,
) -> Result<Image<T>, MorphologyError> {
    let sizes = params
        .iter()
        .map(|&p| {
            let odd = ((p - 1.0) / 2.0).floor() * 2.0 + 1.0;
            if odd < 3.0 {
                1.0
            } else {
                odd
            }
        })
        .collect::<Vec<_>>();
    let Some(smallest) = sizes
        .iter()
        .copied()
        .filter(|&s| s >= 3.0)
        .min_by(f64::total_cmp)
    else {
        return Ok(image.clone());
    };

    let n = 2.0 * ((smallest + 1.0) / 4.0).floor() + 1.0;
    let diamond = sizes
        .iter()
        .map(|&s| if s >= 3.0 { n } else { 1.0 })
        .collect::<Vec<_>>();
    let rect = sizes
        .iter()
        .map(|&s| if s >= 3.0 { s - n + 1.0 } else { 1.0 })
        .collect::<Vec<_>>();

    let out = diamond_morphology(image, &diamond, bcs, polarity, strategy)?;
    if rect.iter().any(|&r| r > 1.0) {
        rectangular_morphology(&out, &rect, false, bcs, polarity.into(), strategy)
    } else {
        Ok(out)
    }
}
