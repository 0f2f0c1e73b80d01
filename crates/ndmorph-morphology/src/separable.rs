use ndmorph_image::{boundary::boundary_array, BoundaryCondition, Image, ImageError, Pixel};

use crate::error::MorphologyError;
use crate::line_filter::{filter_line, LineBuffers, LineFilter, LineOperation};
use crate::operation::BasicOperation;
use crate::parallel::{execute_chunks_with, ExecutionStrategy};

/// Replace every image line along `dim` by `f(line)`.
///
/// Lines along dimension 0 are filtered in place in the output buffer. Other lines are gathered
/// into a line-major buffer, filtered in parallel and scattered back.
pub(crate) fn filter_lines<T, S, I, F>(
    image: &Image<T>,
    dim: usize,
    strategy: ExecutionStrategy,
    init: I,
    f: F,
) -> Result<Image<T>, MorphologyError>
where
    T: Pixel,
    I: Fn() -> S + Sync + Send,
    F: Fn(&[T], &mut [T], &mut S) + Sync + Send,
{
    let mut out = image.clone();
    if image.is_empty() || dim >= image.ndims() {
        return Ok(out);
    }
    let n = image.sizes()[dim];
    let src = image.as_slice();

    if dim == 0 {
        execute_chunks_with(strategy, out.as_slice_mut(), n, &init, |state, index, line| {
            let start = index * n;
            f(&src[start..start + n], line, state)
        })?;
        return Ok(out);
    }

    let starts = image.line_starts(dim);
    let stride = image.strides()[dim] as usize;
    let mut lines = vec![T::zero(); n * starts.len()];
    execute_chunks_with(
        strategy,
        &mut lines,
        n,
        || (Vec::with_capacity(n), init()),
        |scratch: &mut (Vec<T>, S), index, line| {
            let (input, state) = scratch;
            let start = starts[index];
            input.clear();
            input.extend((0..n).map(|k| src[start + k * stride]));
            f(input, line, state)
        },
    )?;

    let data = out.as_slice_mut();
    for (line, &start) in lines.chunks_exact(n).zip(&starts) {
        for (k, &v) in line.iter().enumerate() {
            data[start + k * stride] = v;
        }
    }
    Ok(out)
}

/// Apply one line filter per listed dimension, one dimension after the other.
pub(crate) fn line_passes<T: Pixel>(
    image: &Image<T>,
    passes: &[(usize, LineFilter)],
    operation: LineOperation,
    bcs: &[BoundaryCondition],
    strategy: ExecutionStrategy,
) -> Result<Image<T>, MorphologyError> {
    let mut current: Option<Image<T>> = None;
    for &(dim, filter) in passes {
        let bc = bcs.get(dim).copied();
        let src = current.as_ref().unwrap_or(image);
        current = Some(filter_lines(
            src,
            dim,
            strategy,
            LineBuffers::new,
            |input, output, buffers| filter_line(input, output, filter, operation, bc, buffers),
        )?);
    }
    Ok(current.unwrap_or_else(|| image.clone()))
}

/// Morphology with a rectangular structuring element, one running extremum filter per dimension.
///
/// A dimension is filtered when its size parameter is larger than 1 and the image is larger than
/// one pixel along it; the window is `round(p)` samples wide. An opening or closing along a single
/// dimension runs both steps within each line.
///
/// # Arguments
///
/// * `image` - The input image.
/// * `params` - The rectangle sizes, one per dimension.
/// * `mirror` - Whether the rectangle is reflected; only matters for even sizes.
/// * `bcs` - The boundary conditions; empty means out-of-image pixels are ignored.
/// * `operation` - The basic operation.
/// * `strategy` - How lines are distributed over threads.
pub fn rectangular_morphology<T: Pixel>(
    image: &Image<T>,
    params: &[f64],
    mirror: bool,
    bcs: &[BoundaryCondition],
    operation: BasicOperation,
    strategy: ExecutionStrategy,
) -> Result<Image<T>, MorphologyError> {
    let ndims = image.ndims();
    if params.len() != ndims {
        return Err(ImageError::DimensionalityMismatch {
            expected: ndims,
            actual: params.len(),
        }
        .into());
    }
    let bcs = boundary_array(bcs, ndims)?;
    let passes = params
        .iter()
        .zip(image.sizes())
        .enumerate()
        .filter(|(_, (&p, &size))| p > 1.0 && size > 1)
        .map(|(d, (&p, _))| (d, LineFilter::contiguous(p.round() as usize)))
        .collect::<Vec<_>>();
    if passes.is_empty() {
        return Ok(image.clone());
    }
    log::debug!("rectangular {operation:?} over dimensions {passes:?}");

    match operation.steps() {
        Some((first, _)) if passes.len() == 1 => line_passes(
            image,
            &passes,
            LineOperation::Fused { first },
            &bcs,
            strategy,
        ),
        Some((first, second)) => {
            let tmp = line_passes(
                image,
                &passes,
                LineOperation::Extremum {
                    polarity: first,
                    mirror,
                },
                &bcs,
                strategy,
            )?;
            line_passes(
                &tmp,
                &passes,
                LineOperation::Extremum {
                    polarity: second,
                    mirror: !mirror,
                },
                &bcs,
                strategy,
            )
        }
        None => line_passes(
            image,
            &passes,
            LineOperation::Extremum {
                polarity: operation.first_polarity(),
                mirror,
            },
            &bcs,
            strategy,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_lines_along_each_dim() -> Result<(), MorphologyError> {
        let image = Image::new(&[3, 2, 2], (0u8..12).collect())?;
        for dim in 0..3 {
            for strategy in [ExecutionStrategy::Serial, ExecutionStrategy::ParallelLines] {
                // reverse every line
                let out = filter_lines(&image, dim, strategy, || (), |input, output, _| {
                    for (o, i) in output.iter_mut().zip(input.iter().rev()) {
                        *o = *i;
                    }
                })?;
                let twice = filter_lines(&out, dim, strategy, || (), |input, output, _| {
                    for (o, i) in output.iter_mut().zip(input.iter().rev()) {
                        *o = *i;
                    }
                })?;
                assert_eq!(twice, image);
                let mut coords = vec![0, 0, 0];
                coords[dim] = image.sizes()[dim] - 1;
                assert_eq!(out.get(&[0, 0, 0]), image.get(&coords));
            }
        }
        Ok(())
    }

    #[test]
    fn test_rect_impulse() -> Result<(), MorphologyError> {
        let mut image = Image::from_size_val(&[64, 41], 0u8);
        if let Some(v) = image.get_mut(&[32, 20]) {
            *v = 9;
        }
        let dilated = rectangular_morphology(
            &image,
            &[2.0, 1.0],
            false,
            &[],
            BasicOperation::Dilation,
            ExecutionStrategy::Serial,
        )?;
        let set = dilated.as_slice().iter().filter(|&&v| v == 9).count();
        assert_eq!(set, 2);
        assert_eq!(dilated.get(&[33, 20]), Some(&9));
        let eroded = rectangular_morphology(
            &dilated,
            &[2.0, 1.0],
            true,
            &[],
            BasicOperation::Erosion,
            ExecutionStrategy::Serial,
        )?;
        assert_eq!(eroded, image);
        Ok(())
    }

    #[test]
    fn test_rect_params_dimensionality() {
        let image = Image::from_size_val(&[4, 4], 0u8);
        let res = rectangular_morphology(
            &image,
            &[3.0],
            false,
            &[],
            BasicOperation::Dilation,
            ExecutionStrategy::Serial,
        );
        assert!(res.is_err());
    }
}
