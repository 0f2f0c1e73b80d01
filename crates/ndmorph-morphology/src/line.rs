//! Morphology with line structuring elements at arbitrary angles.

use ndmorph_image::{
    boundary::boundary_array,
    image::increment_coords,
    skew::{skew, unskew},
    BoundaryCondition, Image, ImageError, Pixel,
};

use crate::config::LINE_EPSILON;
use crate::error::MorphologyError;
use crate::kernel::{line_axis, line_steps, Kernel};
use crate::line_filter::{filter_line, LineBuffers, LineFilter, LineOperation};
use crate::operation::{BasicOperation, Polarity};
use crate::parallel::ExecutionStrategy;
use crate::pixel_table::pixel_table_morphology;
use crate::separable::rectangular_morphology;

/// The length and number of points of the periodic line described by `params`.
///
/// The number of points is the greatest common divisor of all lengths `round(|p|)` larger than
/// one; the points are spaced `max_length / points` pixels apart along the dominant dimension.
/// Returns `(1, 1)` when no length is larger than one.
pub fn periodic_line_parameters(params: &[f64]) -> (usize, usize) {
    let mut max_length = 0;
    let mut points = 0;
    for p in params {
        let length = p.abs().round() as usize;
        max_length = max_length.max(length);
        if length > 1 {
            points = if points > 0 {
                gcd(points, length)
            } else {
                length
            };
        }
    }
    if points == 0 {
        (1, 1)
    } else {
        (max_length, points)
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn count_longer_than_one(params: &[f64]) -> usize {
    params.iter().filter(|p| p.abs().round() > 1.0).count()
}

fn check_params(image: &Image<impl Pixel>, params: &[f64]) -> Result<(), MorphologyError> {
    if params.len() != image.ndims() {
        return Err(ImageError::DimensionalityMismatch {
            expected: image.ndims(),
            actual: params.len(),
        }
        .into());
    }
    Ok(())
}

fn line_operation(operation: BasicOperation, mirror: bool) -> LineOperation {
    match operation.steps() {
        Some((first, _)) => LineOperation::Fused { first },
        None => LineOperation::Extremum {
            polarity: operation.first_polarity(),
            mirror,
        },
    }
}

/// Morphology along Bresenham lines that tessellate the image.
///
/// Each image pixel belongs to exactly one line, and each line is filtered as a one-dimensional
/// signal. This is fast, but the neighborhood of a pixel depends on where its line starts, so the
/// operation is not translation invariant for lines that are not horizontal, vertical or
/// diagonal. With `periodic`, the window samples every `max_length / points`-th line pixel, see
/// [`periodic_line_parameters`].
///
/// Only the first boundary condition is used, for all lines.
pub fn fast_line_morphology<T: Pixel>(
    image: &Image<T>,
    params: &[f64],
    periodic: bool,
    mirror: bool,
    bcs: &[BoundaryCondition],
    operation: BasicOperation,
    strategy: ExecutionStrategy,
) -> Result<Image<T>, MorphologyError> {
    check_params(image, params)?;
    let ndims = image.ndims();
    let (axis, mut length) = line_axis(params);
    let mut n_larger = count_longer_than_one(params);

    let mut step = 1;
    if periodic {
        let (max_length, points) = periodic_line_parameters(params);
        if points == 1 {
            // a single point
            n_larger = 1;
            length = 1.0;
        } else {
            step = max_length / points;
        }
    }

    if length <= 1.0 || image.is_empty() {
        return Ok(image.clone());
    }
    if n_larger == 1 {
        let mut rect = vec![1.0; ndims];
        rect[axis] = length;
        return rectangular_morphology(image, &rect, mirror, bcs, operation, strategy);
    }

    let length = length as usize;
    let filter = LineFilter::periodic(length / step, step);
    let op = line_operation(operation, mirror);
    let bc = boundary_array(bcs, ndims)?.first().copied();
    log::debug!("fast line {params:?} as {filter:?} along dimension {axis}");

    // frame: the dominant axis first, every other dimension stepping backwards
    let steps = line_steps(params, axis, length as f64);
    let mut perm = (0..ndims).collect::<Vec<_>>();
    perm.swap(0, axis);
    let sizes = perm.iter().map(|&d| image.sizes()[d]).collect::<Vec<_>>();
    let strides = perm.iter().map(|&d| image.strides()[d]).collect::<Vec<_>>();
    let mut slopes = perm.iter().map(|&d| steps[d]).collect::<Vec<_>>();
    let mut flipped = vec![false; ndims];
    for k in 1..ndims {
        if slopes[k] > 0.0 {
            flipped[k] = true;
            slopes[k] = -slopes[k];
        }
    }

    let delta = 1.0 - LINE_EPSILON;
    let width = sizes[0];
    // lines start at x = 0 from positions beyond the image so that every pixel is covered
    let starts = (1..ndims)
        .map(|k| {
            let reach = (delta + (width as f64 - 1.0) * slopes[k]).floor() as isize;
            (sizes[k] as isize - reach) as usize
        })
        .collect::<Vec<_>>();

    let mut out = image.clone();
    let src = image.as_slice();
    let mut buffers = LineBuffers::new();
    let mut offsets: Vec<usize> = Vec::with_capacity(width);
    let mut input: Vec<T> = Vec::with_capacity(width);
    let mut output: Vec<T> = Vec::with_capacity(width);
    let mut start = vec![0usize; ndims - 1];
    loop {
        let (first, last) = line_range(&start, &sizes, &slopes, width, delta);
        offsets.clear();
        for x in first..=last {
            let mut offset = 0isize;
            let mut inside = true;
            for k in 0..ndims {
                let f = if k == 0 {
                    x
                } else {
                    start[k - 1] as isize + (delta + x as f64 * slopes[k]).floor() as isize
                };
                if f < 0 || f >= sizes[k] as isize {
                    inside = false;
                    break;
                }
                let real = if flipped[k] {
                    sizes[k] as isize - 1 - f
                } else {
                    f
                };
                offset += real * strides[k];
            }
            if inside {
                offsets.push(offset as usize);
            }
        }

        if offsets.len() > 1 {
            input.clear();
            input.extend(offsets.iter().map(|&o| src[o]));
            output.clear();
            output.resize(input.len(), T::zero());
            filter_line(&input, &mut output, filter, op, bc, &mut buffers);
            let data = out.as_slice_mut();
            for (&o, &v) in offsets.iter().zip(&output) {
                data[o] = v;
            }
        }

        if !increment_coords(&mut start, &starts) {
            break;
        }
    }
    Ok(out)
}

/// The first and last `x` at which the line starting at `start` lies inside the image.
fn line_range(
    start: &[usize],
    sizes: &[usize],
    slopes: &[f64],
    width: usize,
    delta: f64,
) -> (isize, isize) {
    let mut first = 0isize;
    let mut last = width as isize - 1;
    for k in 1..sizes.len() {
        let s = slopes[k];
        if s == 0.0 {
            continue;
        }
        let n = start[k - 1];
        if n >= sizes[k] {
            let x = (n as f64 - sizes[k] as f64 + delta) / -s;
            first = first.max(x.ceil() as isize);
        }
        let x = (n as f64 + delta) / -s;
        last = last.min(x.ceil() as isize - 1);
    }
    (first, last)
}

/// Morphology with a line computed on a skewed image.
///
/// The image is sheared so that the line becomes parallel to its dominant dimension, filtered
/// with a one-dimensional rectangle and sheared back. Shearing interpolates linearly, so the
/// result is only approximately a flat operation. Without boundary conditions, an opening or
/// closing is computed as two separate steps, each shearing the image with the boundary value
/// that never wins that step.
pub fn skew_line_morphology<T: Pixel>(
    image: &Image<T>,
    params: &[f64],
    mirror: bool,
    bcs: &[BoundaryCondition],
    operation: BasicOperation,
    strategy: ExecutionStrategy,
) -> Result<Image<T>, MorphologyError> {
    check_params(image, params)?;
    let ndims = image.ndims();
    let (axis, length) = line_axis(params);
    let mut rect = vec![1.0; ndims];
    rect[axis] = length;

    if count_longer_than_one(params) <= 1 {
        if length > 1.0 {
            return rectangular_morphology(image, &rect, mirror, bcs, operation, strategy);
        }
        return Ok(image.clone());
    }

    if let (Some((first, second)), true) = (operation.steps(), bcs.is_empty()) {
        let tmp = skew_line_morphology(image, params, mirror, bcs, first.into(), strategy)?;
        return skew_line_morphology(&tmp, params, !mirror, bcs, second.into(), strategy);
    }

    let skew_bc = bcs
        .first()
        .copied()
        .unwrap_or_else(|| operation.first_polarity().identity_boundary());
    let shears = line_steps(params, axis, length);
    let skewed_dims = (0..ndims)
        .filter(|&d| d != axis && shears[d] != 0.0)
        .collect::<Vec<_>>();

    let mut tmp = image.clone();
    for &d in &skewed_dims {
        tmp = skew(&tmp, shears[d], d, axis, skew_bc)?;
    }
    tmp = rectangular_morphology(&tmp, &rect, mirror, bcs, operation, strategy)?;
    for &d in skewed_dims.iter().rev() {
        tmp = unskew(&tmp, shears[d], d, axis, image.sizes()[d])?;
    }
    Ok(tmp)
}

/// Morphology with a discrete (Bresenham) line.
///
/// Lines with a step larger than one are split into a periodic line, computed with
/// [`fast_line_morphology`], and a short discrete line computed with the pixel table.
pub fn discrete_line_morphology<T: Pixel>(
    image: &Image<T>,
    params: &[f64],
    mirror: bool,
    bcs: &[BoundaryCondition],
    polarity: Polarity,
    strategy: ExecutionStrategy,
) -> Result<Image<T>, MorphologyError> {
    check_params(image, params)?;
    if count_longer_than_one(params) <= 1 {
        let rect = params.iter().map(|p| p.abs()).collect::<Vec<_>>();
        return rectangular_morphology(image, &rect, mirror, bcs, polarity.into(), strategy);
    }

    let (_, points) = periodic_line_parameters(params);
    if points > 1 {
        let tmp = fast_line_morphology(
            image,
            params,
            true,
            mirror,
            bcs,
            polarity.into(),
            strategy,
        )?;
        let reduced = params
            .iter()
            .map(|p| p.round() / points as f64)
            .collect::<Vec<_>>();
        let mut kernel = Kernel::line(&reduced);
        if kernel.len() <= 1 {
            return Ok(tmp);
        }
        if mirror {
            kernel.mirror();
        }
        return pixel_table_morphology(&tmp, &kernel, polarity, bcs, strategy);
    }

    let mut kernel = Kernel::line(params);
    if mirror {
        kernel.mirror();
    }
    pixel_table_morphology(image, &kernel, polarity, bcs, strategy)
}
