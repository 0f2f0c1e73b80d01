use crate::boundary::{expand_line, BoundaryCondition};
use crate::error::ImageError;
use crate::image::Image;
use crate::pixel::Pixel;

fn check_axes(ndims: usize, skew_dim: usize, axis: usize) -> Result<(), ImageError> {
    if skew_dim >= ndims || axis >= ndims || skew_dim == axis {
        return Err(ImageError::InvalidParameter(format!(
            "cannot skew dimension {skew_dim} along axis {axis} of a {ndims}-dimensional image"
        )));
    }
    Ok(())
}

#[inline]
fn sample_linear<T: Pixel>(buffer: &[T], pos: f64) -> T {
    let last = buffer.len() - 1;
    let pos = pos.clamp(0.0, last as f64);
    let i0 = (pos.floor() as usize).min(last);
    let i1 = (i0 + 1).min(last);
    let frac = pos - i0 as f64;
    let v = buffer[i0].to_f64() * (1.0 - frac) + buffer[i1].to_f64() * frac;
    T::clamp_from_f64(v)
}

/// The number of pixels added on each side of `skew_dim` by [`skew`].
pub fn skew_extent(axis_size: usize, shear: f64) -> usize {
    ((axis_size / 2) as f64 * shear.abs()).ceil() as usize
}

/// Skew an image: every line along `skew_dim` is shifted by `shear * (x[axis] - origin)`.
///
/// The origin is the central pixel along `axis`. The image grows by [`skew_extent`] pixels on
/// both sides of `skew_dim` so no data are lost; samples read from outside the input are taken
/// from its extension by `bc`. Values are interpolated linearly.
///
/// A line through the origin with slope `shear` (in `skew_dim` per unit step along `axis`) is
/// mapped onto a line parallel to `axis`.
pub fn skew<T: Pixel>(
    image: &Image<T>,
    shear: f64,
    skew_dim: usize,
    axis: usize,
    bc: BoundaryCondition,
) -> Result<Image<T>, ImageError> {
    check_axes(image.ndims(), skew_dim, axis)?;
    let n = image.sizes()[skew_dim];
    let origin = (image.sizes()[axis] / 2) as f64;
    let extra = skew_extent(image.sizes()[axis], shear);
    let mut out_sizes = image.sizes().to_vec();
    out_sizes[skew_dim] = n + 2 * extra;
    let mut out = Image::from_size_val(&out_sizes, T::zero());
    if image.is_empty() {
        return Ok(out);
    }

    let margin = extra + 2;
    let in_stride = image.strides()[skew_dim] as usize;
    let out_stride = out.strides()[skew_dim] as usize;
    let mut buffer = vec![T::zero(); n + 2 * margin];
    for (in_start, out_start) in image
        .line_starts(skew_dim)
        .into_iter()
        .zip(out.line_starts(skew_dim))
    {
        let a = image.coords(in_start)[axis] as f64;
        for k in 0..n {
            buffer[margin + k] = image.as_slice()[in_start + k * in_stride];
        }
        expand_line(&mut buffer, margin, bc);
        let shift = shear * (a - origin);
        let data = out.as_slice_mut();
        for x in 0..n + 2 * extra {
            let pos = x as f64 - extra as f64 + shift + margin as f64;
            data[out_start + x * out_stride] = sample_linear(&buffer, pos);
        }
    }
    Ok(out)
}

/// Undo [`skew`] and crop `skew_dim` back to `size` pixels.
///
/// `image` must be the output of `skew(.., shear, skew_dim, axis, ..)` applied to an image with
/// `size` pixels along `skew_dim` (possibly processed in between).
pub fn unskew<T: Pixel>(
    image: &Image<T>,
    shear: f64,
    skew_dim: usize,
    axis: usize,
    size: usize,
) -> Result<Image<T>, ImageError> {
    check_axes(image.ndims(), skew_dim, axis)?;
    let n = image.sizes()[skew_dim];
    if size > n {
        return Err(ImageError::InvalidParameter(format!(
            "cannot crop {n} skewed pixels to {size}"
        )));
    }
    let extra = ((n - size) / 2) as f64;
    let origin = (image.sizes()[axis] / 2) as f64;
    let mut out_sizes = image.sizes().to_vec();
    out_sizes[skew_dim] = size;
    let mut out = Image::from_size_val(&out_sizes, T::zero());
    if out.is_empty() {
        return Ok(out);
    }

    let in_stride = image.strides()[skew_dim] as usize;
    let out_stride = out.strides()[skew_dim] as usize;
    let mut buffer = vec![T::zero(); n];
    for (in_start, out_start) in image
        .line_starts(skew_dim)
        .into_iter()
        .zip(out.line_starts(skew_dim))
    {
        let a = image.coords(in_start)[axis] as f64;
        for (k, b) in buffer.iter_mut().enumerate() {
            *b = image.as_slice()[in_start + k * in_stride];
        }
        let shift = shear * (a - origin);
        let data = out.as_slice_mut();
        for y in 0..size {
            let pos = y as f64 + extra - shift;
            data[out_start + y * out_stride] = sample_linear(&buffer, pos);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skew_straightens_diagonal() -> Result<(), ImageError> {
        // a diagonal line through the centre of a 7x7 image
        let mut image = Image::from_size_val(&[7, 7], 0.0f32);
        for i in 0..7 {
            if let Some(v) = image.get_mut(&[i, i]) {
                *v = 1.0;
            }
        }
        let skewed = skew(&image, 1.0, 0, 1, BoundaryCondition::AddZeros)?;
        assert_eq!(skewed.sizes(), &[13, 7]);
        // every row has its pixel in the same column
        for y in 0..7 {
            assert_eq!(skewed.get(&[6, y]), Some(&1.0));
        }
        Ok(())
    }

    #[test]
    fn test_unskew_recovers_input() -> Result<(), ImageError> {
        let data = (0..35).map(|v| v as f64).collect();
        let image = Image::new(&[5, 7], data)?;
        let skewed = skew(&image, -1.0, 0, 1, BoundaryCondition::ZeroOrderExtrapolate)?;
        assert_eq!(skewed.sizes(), &[11, 7]);
        let back = unskew(&skewed, -1.0, 0, 1, 5)?;
        assert_eq!(back.sizes(), image.sizes());
        for (a, b) in back.as_slice().iter().zip(image.as_slice()) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_skew_rejects_same_axis() {
        let image = Image::from_size_val(&[3, 3], 0u8);
        assert!(skew(&image, 1.0, 1, 1, BoundaryCondition::AddZeros).is_err());
    }
}
