use rayon::prelude::*;

use crate::boundary::{boundary_array, expand_line, BoundaryCondition};
use crate::error::ImageError;
use crate::pixel::Pixel;

/// Compute the strides of a contiguous buffer where dimension 0 varies fastest.
///
/// # Arguments
///
/// * `sizes` - The extent of each dimension.
///
/// # Returns
///
/// One stride per dimension, in elements.
pub fn get_strides_from_sizes(sizes: &[usize]) -> Vec<isize> {
    let mut strides = Vec::with_capacity(sizes.len());
    let mut stride = 1isize;
    for &size in sizes {
        strides.push(stride);
        stride *= size as isize;
    }
    strides
}

/// Advance `coords` to the next pixel in raster order (dimension 0 fastest).
///
/// Returns `false` once every coordinate wrapped around, i.e. after the last pixel.
#[inline]
pub fn increment_coords(coords: &mut [usize], sizes: &[usize]) -> bool {
    for (c, &s) in coords.iter_mut().zip(sizes.iter()) {
        *c += 1;
        if *c < s {
            return true;
        }
        *c = 0;
    }
    false
}

/// Expand a parameter array with one or `ndims` elements to exactly `ndims` elements.
///
/// An empty array is expanded with `default`.
pub fn array_use_parameter<T: Clone>(
    values: &[T],
    ndims: usize,
    default: T,
) -> Result<Vec<T>, ImageError> {
    match values.len() {
        0 => Ok(vec![default; ndims]),
        1 => Ok(vec![values[0].clone(); ndims]),
        n if n == ndims => Ok(values.to_vec()),
        n => Err(ImageError::DimensionalityMismatch {
            expected: ndims,
            actual: n,
        }),
    }
}

/// An owned N-dimensional image of scalar samples.
///
/// The samples are stored contiguously with dimension 0 varying fastest, so a pixel at
/// `coords` lives at linear offset `sum(coords[d] * strides[d])`. Algorithms precompute these
/// offsets once and then address the buffer without bounds-checked coordinate indexing.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T> {
    data: Vec<T>,
    sizes: Vec<usize>,
    strides: Vec<isize>,
}

impl<T> Image<T> {
    /// Create a new image from sample data.
    ///
    /// # Arguments
    ///
    /// * `sizes` - The extent of each dimension, dimension 0 first.
    /// * `data` - The samples, dimension 0 varying fastest.
    ///
    /// # Errors
    ///
    /// If the length of the data does not match the product of the sizes, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndmorph_image::Image;
    ///
    /// let image = Image::<u8>::new(&[3, 2], vec![0, 1, 2, 3, 4, 5]).unwrap();
    /// assert_eq!(image.sizes(), &[3, 2]);
    /// assert_eq!(image.get(&[1, 1]), Some(&4));
    /// ```
    pub fn new(sizes: &[usize], data: Vec<T>) -> Result<Self, ImageError> {
        let expected = sizes.iter().product::<usize>();
        if data.len() != expected {
            return Err(ImageError::InvalidShape {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            sizes: sizes.to_vec(),
            strides: get_strides_from_sizes(sizes),
        })
    }

    /// Create a new image with every sample set to `val`.
    pub fn from_size_val(sizes: &[usize], val: T) -> Self
    where
        T: Clone,
    {
        let data = vec![val; sizes.iter().product::<usize>()];
        Self {
            data,
            sizes: sizes.to_vec(),
            strides: get_strides_from_sizes(sizes),
        }
    }

    /// Create an image of the same sizes as `self`, filled with `val`.
    pub fn similar<U: Clone>(&self, val: U) -> Image<U> {
        Image::from_size_val(&self.sizes, val)
    }

    /// The extent of each dimension.
    #[inline]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// The stride of each dimension, in samples.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// The number of dimensions.
    #[inline]
    pub fn ndims(&self) -> usize {
        self.sizes.len()
    }

    /// The number of pixels.
    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.data.len()
    }

    /// Whether the image holds no pixels at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The samples as a flat slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The samples as a flat mutable slice.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the image and return its samples.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// The linear offset of the pixel at `coords`.
    ///
    /// # Errors
    ///
    /// Fails if `coords` has the wrong length or lies outside the image.
    pub fn offset(&self, coords: &[usize]) -> Result<usize, ImageError> {
        if coords.len() != self.ndims() {
            return Err(ImageError::DimensionalityMismatch {
                expected: self.ndims(),
                actual: coords.len(),
            });
        }
        let mut offset = 0isize;
        for ((&c, &size), &stride) in coords.iter().zip(&self.sizes).zip(&self.strides) {
            if c >= size {
                return Err(ImageError::IndexOutOfBounds { index: c, size });
            }
            offset += c as isize * stride;
        }
        Ok(offset as usize)
    }

    /// The coordinates of the pixel at linear offset `offset`.
    pub fn coords(&self, offset: usize) -> Vec<usize> {
        let mut rest = offset;
        self.sizes
            .iter()
            .map(|&size| {
                let c = rest % size.max(1);
                rest /= size.max(1);
                c
            })
            .collect()
    }

    /// A reference to the sample at `coords`, or `None` if out of bounds.
    pub fn get(&self, coords: &[usize]) -> Option<&T> {
        let offset = self.offset(coords).ok()?;
        self.data.get(offset)
    }

    /// A mutable reference to the sample at `coords`, or `None` if out of bounds.
    pub fn get_mut(&mut self, coords: &[usize]) -> Option<&mut T> {
        let offset = self.offset(coords).ok()?;
        self.data.get_mut(offset)
    }

    /// The offsets of the first pixel of every image line along `dim`.
    ///
    /// The lines are listed in raster order of the remaining dimensions.
    pub fn line_starts(&self, dim: usize) -> Vec<usize> {
        if self.is_empty() || dim >= self.ndims() {
            return Vec::new();
        }
        let mut sizes = self.sizes.clone();
        sizes[dim] = 1;
        let n_lines = sizes.iter().product::<usize>();
        let mut starts = Vec::with_capacity(n_lines);
        let mut coords = vec![0usize; self.ndims()];
        loop {
            let offset = coords
                .iter()
                .zip(&self.strides)
                .map(|(&c, &s)| c as isize * s)
                .sum::<isize>();
            starts.push(offset as usize);
            if !increment_coords(&mut coords, &sizes) {
                break;
            }
        }
        starts
    }

    /// Apply `f` to every sample in parallel, producing a new image of the same sizes.
    pub fn map<U, F>(&self, f: F) -> Image<U>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Send + Sync,
    {
        Image {
            data: self.data.par_iter().map(f).collect(),
            sizes: self.sizes.clone(),
            strides: self.strides.clone(),
        }
    }
}

impl<T: Pixel> Image<T> {
    /// Convert the image to another pixel type, saturating out-of-range values.
    pub fn cast<U: Pixel>(&self) -> Image<U> {
        self.map(|&v| U::clamp_from_f64(v.to_f64()))
    }

    /// Copy the block of `sizes` pixels starting at `origin` into a new image.
    ///
    /// # Errors
    ///
    /// Fails if the block does not fit inside the image.
    pub fn crop(&self, origin: &[usize], sizes: &[usize]) -> Result<Image<T>, ImageError> {
        if origin.len() != self.ndims() || sizes.len() != self.ndims() {
            return Err(ImageError::DimensionalityMismatch {
                expected: self.ndims(),
                actual: origin.len().min(sizes.len()),
            });
        }
        for d in 0..self.ndims() {
            if origin[d] + sizes[d] > self.sizes[d] {
                return Err(ImageError::IndexOutOfBounds {
                    index: origin[d] + sizes[d],
                    size: self.sizes[d],
                });
            }
        }
        if self.ndims() == 0 {
            return Ok(self.clone());
        }
        let mut out = Image::from_size_val(sizes, T::zero());
        if out.is_empty() {
            return Ok(out);
        }
        let width = sizes[0];
        let base = self.offset(origin)?;
        for start in out.line_starts(0) {
            let coords = out.coords(start);
            let src = base
                + coords
                    .iter()
                    .zip(&self.strides)
                    .map(|(&c, &s)| c as isize * s)
                    .sum::<isize>() as usize;
            out.data[start..start + width].copy_from_slice(&self.data[src..src + width]);
        }
        Ok(out)
    }

    /// Return a copy of the image with `border` extra pixels on both sides of every dimension.
    ///
    /// The new pixels are filled according to the boundary condition of each dimension.
    ///
    /// # Arguments
    ///
    /// * `border` - The border width, one value or one per dimension.
    /// * `bcs` - The boundary conditions, none (default), one, or one per dimension.
    ///
    /// # Returns
    ///
    /// The extended image; the original pixel `coords` lives at `coords + border`.
    pub fn extend(
        &self,
        border: &[usize],
        bcs: &[BoundaryCondition],
    ) -> Result<Image<T>, ImageError> {
        let ndims = self.ndims();
        let border = array_use_parameter(border, ndims, 0)?;
        let bcs = boundary_array(bcs, ndims)?;
        let new_sizes = self
            .sizes
            .iter()
            .zip(&border)
            .map(|(&s, &b)| s + 2 * b)
            .collect::<Vec<_>>();
        let mut out = Image::from_size_val(&new_sizes, T::zero());
        if ndims == 0 {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(out);
        }

        // copy the original samples into the interior
        let width = self.sizes[0];
        let shift = border
            .iter()
            .zip(&out.strides)
            .map(|(&b, &s)| b as isize * s)
            .sum::<isize>() as usize;
        for start in self.line_starts(0) {
            let coords = self.coords(start);
            let dst = shift
                + coords
                    .iter()
                    .zip(&out.strides)
                    .map(|(&c, &s)| c as isize * s)
                    .sum::<isize>() as usize;
            out.data[dst..dst + width].copy_from_slice(&self.data[start..start + width]);
        }

        // expand one dimension at a time; lines along later dimensions that still hold garbage are
        // overwritten when their own dimension is expanded
        for d in 0..ndims {
            let b = border[d];
            if b == 0 {
                continue;
            }
            let n = self.sizes[d];
            let stride = out.strides[d] as usize;
            let bc = bcs.get(d).copied().unwrap_or_default();
            let mut buffer = vec![T::zero(); n + 2 * b];
            for start in out.line_starts(d) {
                for k in 0..n {
                    buffer[b + k] = out.data[start + (b + k) * stride];
                }
                expand_line(&mut buffer, b, bc);
                for k in (0..b).chain(b + n..n + 2 * b) {
                    out.data[start + k * stride] = buffer[k];
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_new_checks_length() {
        let err = Image::<u8>::new(&[3, 3], vec![0; 8]).unwrap_err();
        assert_eq!(
            err,
            ImageError::InvalidShape {
                expected: 9,
                actual: 8
            }
        );
    }

    #[test]
    fn test_strides_dimension_zero_fastest() {
        assert_eq!(get_strides_from_sizes(&[4, 3, 2]), vec![1, 4, 12]);
        assert!(get_strides_from_sizes(&[]).is_empty());
    }

    #[test]
    fn test_offset_and_coords() -> Result<(), ImageError> {
        let image = Image::from_size_val(&[5, 4, 3], 0u8);
        let offset = image.offset(&[2, 3, 1])?;
        assert_eq!(offset, 2 + 3 * 5 + 20);
        assert_eq!(image.coords(offset), vec![2, 3, 1]);
        assert!(image.offset(&[5, 0, 0]).is_err());
        Ok(())
    }

    #[test]
    fn test_line_starts() {
        let image = Image::from_size_val(&[3, 2], 0u8);
        assert_eq!(image.line_starts(0), vec![0, 3]);
        assert_eq!(image.line_starts(1), vec![0, 1, 2]);
    }

    #[test]
    fn test_crop() -> Result<(), ImageError> {
        let image = Image::new(&[4, 3], (0u8..12).collect())?;
        let crop = image.crop(&[1, 1], &[2, 2])?;
        assert_eq!(crop.as_slice(), &[5, 6, 9, 10]);
        assert!(image.crop(&[3, 0], &[2, 1]).is_err());
        Ok(())
    }

    #[test]
    fn test_extend_mirror_and_constant() -> Result<(), ImageError> {
        let image = Image::new(&[3, 2], vec![1u8, 2, 3, 4, 5, 6])?;
        let ext = image.extend(&[1], &[BoundaryCondition::SymmetricMirror])?;
        assert_eq!(ext.sizes(), &[5, 4]);
        assert_eq!(
            ext.as_slice(),
            &[
                1, 1, 2, 3, 3, //
                1, 1, 2, 3, 3, //
                4, 4, 5, 6, 6, //
                4, 4, 5, 6, 6,
            ]
        );
        let ext = image.extend(&[1, 0], &[BoundaryCondition::AddMaxValue])?;
        assert_eq!(ext.as_slice(), &[255, 1, 2, 3, 255, 255, 4, 5, 6, 255]);
        Ok(())
    }

    #[test]
    fn test_cast_saturates() -> Result<(), ImageError> {
        let image = Image::new(&[3], vec![-5.0f32, 10.4, 400.0])?;
        assert_eq!(image.cast::<u8>().as_slice(), &[0, 10, 255]);
        Ok(())
    }
}
