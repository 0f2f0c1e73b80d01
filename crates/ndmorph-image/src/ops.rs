use rayon::prelude::*;

use crate::error::{check_sizes, ImageError};
use crate::image::Image;
use crate::pixel::Pixel;

/// Apply a function to every pair of samples of two images in parallel.
fn zip_map<T1, T2, U, F>(a: &Image<T1>, b: &Image<T2>, f: F) -> Result<Image<U>, ImageError>
where
    T1: Sync,
    T2: Sync,
    U: Send,
    F: Fn(&T1, &T2) -> U + Send + Sync,
{
    check_sizes(a.sizes(), b.sizes())?;
    let data = a
        .as_slice()
        .par_iter()
        .zip(b.as_slice().par_iter())
        .map(|(x, y)| f(x, y))
        .collect();
    Image::new(a.sizes(), data)
}

/// Apply a function to every sample of `dst` together with the matching sample of `src`.
fn zip_assign<T, U, F>(dst: &mut Image<T>, src: &Image<U>, f: F) -> Result<(), ImageError>
where
    T: Send,
    U: Sync,
    F: Fn(&mut T, &U) + Send + Sync,
{
    check_sizes(dst.sizes(), src.sizes())?;
    dst.as_slice_mut()
        .par_iter_mut()
        .zip(src.as_slice().par_iter())
        .for_each(|(d, s)| f(d, s));
    Ok(())
}

/// The point-wise minimum of two images.
pub fn infimum<T: Pixel>(a: &Image<T>, b: &Image<T>) -> Result<Image<T>, ImageError> {
    zip_map(a, b, |&x, &y| x.inf(y))
}

/// The point-wise maximum of two images.
pub fn supremum<T: Pixel>(a: &Image<T>, b: &Image<T>) -> Result<Image<T>, ImageError> {
    zip_map(a, b, |&x, &y| x.sup(y))
}

/// Replace `dst` by the point-wise minimum of `dst` and `other`.
pub fn infimum_assign<T: Pixel>(dst: &mut Image<T>, other: &Image<T>) -> Result<(), ImageError> {
    zip_assign(dst, other, |d, &o| *d = d.inf(o))
}

/// Replace `dst` by the point-wise maximum of `dst` and `other`.
pub fn supremum_assign<T: Pixel>(dst: &mut Image<T>, other: &Image<T>) -> Result<(), ImageError> {
    zip_assign(dst, other, |d, &o| *d = d.sup(o))
}

/// Add a constant to every sample, saturating to the type range.
pub fn add_constant<T: Pixel>(image: &Image<T>, value: f64) -> Image<T> {
    image.map(|&v| T::clamp_from_f64(v.to_f64() + value))
}

/// The saturated point-wise sum `a + b`.
pub fn add<T: Pixel>(a: &Image<T>, b: &Image<T>) -> Result<Image<T>, ImageError> {
    zip_map(a, b, |&x, &y| T::clamp_from_f64(x.to_f64() + y.to_f64()))
}

/// The saturated point-wise difference `a - b`.
pub fn subtract<T: Pixel>(a: &Image<T>, b: &Image<T>) -> Result<Image<T>, ImageError> {
    zip_map(a, b, |&x, &y| T::clamp_from_f64(x.to_f64() - y.to_f64()))
}

/// The complement of every sample, see [`Pixel::invert`].
pub fn invert<T: Pixel>(image: &Image<T>) -> Image<T> {
    image.map(|&v| v.invert())
}

/// The binary image `a < b`.
pub fn lesser<T: Pixel>(a: &Image<T>, b: &Image<T>) -> Result<Image<bool>, ImageError> {
    zip_map(a, b, |x, y| x < y)
}

/// Take samples from `a` where `mask` is set and from `b` elsewhere.
pub fn select<T: Pixel>(
    mask: &Image<bool>,
    a: &Image<T>,
    b: &Image<T>,
) -> Result<Image<T>, ImageError> {
    check_sizes(mask.sizes(), a.sizes())?;
    check_sizes(mask.sizes(), b.sizes())?;
    let mut out = b.clone();
    out.as_slice_mut()
        .par_iter_mut()
        .zip(a.as_slice().par_iter())
        .zip(mask.as_slice().par_iter())
        .for_each(|((o, &x), &m)| {
            if m {
                *o = x;
            }
        });
    Ok(out)
}

/// Set the samples of `dst` where `mask` is set to `value`.
pub fn fill_where<T: Pixel>(
    dst: &mut Image<T>,
    mask: &Image<bool>,
    value: T,
) -> Result<(), ImageError> {
    zip_assign(dst, mask, |d, &m| {
        if m {
            *d = value;
        }
    })
}

/// The number of set pixels in a binary image.
pub fn count_set(mask: &Image<bool>) -> usize {
    mask.as_slice().par_iter().filter(|&&m| m).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infimum_supremum() -> Result<(), ImageError> {
        let a = Image::new(&[4], vec![1u8, 5, 3, 0])?;
        let b = Image::new(&[4], vec![2u8, 4, 3, 9])?;
        assert_eq!(infimum(&a, &b)?.as_slice(), &[1, 4, 3, 0]);
        assert_eq!(supremum(&a, &b)?.as_slice(), &[2, 5, 3, 9]);
        let mut c = a.clone();
        supremum_assign(&mut c, &b)?;
        infimum_assign(&mut c, &a)?;
        assert_eq!(c, a);
        Ok(())
    }

    #[test]
    fn test_size_mismatch() {
        let a = Image::from_size_val(&[4], 0u8);
        let b = Image::from_size_val(&[5], 0u8);
        assert!(matches!(
            infimum(&a, &b),
            Err(ImageError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_saturating_arithmetic() -> Result<(), ImageError> {
        let a = Image::new(&[3], vec![250u8, 10, 0])?;
        assert_eq!(add_constant(&a, 10.0).as_slice(), &[255, 20, 10]);
        assert_eq!(add_constant(&a, -20.0).as_slice(), &[230, 0, 0]);
        let b = Image::new(&[3], vec![1u8, 20, 0])?;
        assert_eq!(subtract(&a, &b)?.as_slice(), &[249, 0, 0]);
        assert_eq!(add(&a, &b)?.as_slice(), &[251, 30, 0]);
        Ok(())
    }

    #[test]
    fn test_select_and_fill() -> Result<(), ImageError> {
        let mask = Image::new(&[3], vec![true, false, true])?;
        let a = Image::new(&[3], vec![1i16, 2, 3])?;
        let b = Image::new(&[3], vec![7i16, 8, 9])?;
        assert_eq!(select(&mask, &a, &b)?.as_slice(), &[1, 8, 3]);
        let mut c = b.clone();
        fill_where(&mut c, &mask, 0)?;
        assert_eq!(c.as_slice(), &[0, 8, 0]);
        assert_eq!(count_set(&mask), 2);
        assert_eq!(lesser(&a, &b)?.as_slice(), &[true, true, true]);
        Ok(())
    }
}
