//! Linear offsets of pixels, sorted by grey value, and the neighbor bookkeeping shared by the
//! flooding algorithms.

use std::cmp::Ordering;

use ndmorph_image::{error::check_sizes, Image, ImageError, Pixel};

use crate::types::FloodOrder;

/// Move a linear offset by a signed neighbor offset.
#[inline]
pub(crate) fn shift(offset: usize, delta: isize) -> usize {
    offset.wrapping_add_signed(delta)
}

/// Visit the offsets of the interior of an image, dimension 0 fastest.
///
/// The interior excludes a border of `margin` pixels in every dimension.
fn for_each_interior<F: FnMut(usize)>(sizes: &[usize], strides: &[isize], margin: usize, mut f: F) {
    if sizes.is_empty() || sizes.iter().any(|&s| s <= 2 * margin) {
        return;
    }
    let ndims = sizes.len();
    let mut coords = vec![margin; ndims];
    loop {
        let start = coords
            .iter()
            .zip(strides)
            .map(|(&c, &s)| c as isize * s)
            .sum::<isize>() as usize;
        for x in 0..sizes[0] - 2 * margin {
            f(start + x * strides[0] as usize);
        }
        let mut d = 1;
        while d < ndims {
            coords[d] += 1;
            if coords[d] < sizes[d] - margin {
                break;
            }
            coords[d] = margin;
            d += 1;
        }
        if d >= ndims {
            break;
        }
    }
}

/// The offsets of all pixels at least one pixel away from the image border.
///
/// # Examples
///
/// ```
/// use ndmorph_segmentation::offsets::build_offsets;
///
/// assert_eq!(build_offsets(&[4, 3]), vec![5, 6]);
/// ```
pub fn build_offsets(sizes: &[usize]) -> Vec<usize> {
    let strides = ndmorph_image::image::get_strides_from_sizes(sizes);
    let capacity = sizes.iter().map(|&s| s.saturating_sub(2)).product();
    let mut offsets = Vec::with_capacity(capacity);
    for_each_interior(sizes, &strides, 1, |o| offsets.push(o));
    offsets
}

/// The offsets of the set pixels of `mask` at least one pixel away from the image border.
///
/// The result is empty if no interior pixel is set.
pub fn build_offsets_masked(mask: &Image<bool>) -> Vec<usize> {
    let data = mask.as_slice();
    let mut offsets = Vec::new();
    for_each_interior(mask.sizes(), mask.strides(), 1, |o| {
        if data[o] {
            offsets.push(o);
        }
    });
    offsets
}

/// The interior offsets of an image, restricted to `mask` if one is given.
///
/// # Errors
///
/// Fails if the mask sizes differ from `sizes`.
pub fn interior_offsets(
    sizes: &[usize],
    mask: Option<&Image<bool>>,
) -> Result<Vec<usize>, ImageError> {
    match mask {
        Some(mask) => {
            check_sizes(sizes, mask.sizes())?;
            Ok(build_offsets_masked(mask))
        }
        None => Ok(build_offsets(sizes)),
    }
}

/// Sort offsets by the value they point at, in flooding order.
///
/// The sort is stable: offsets with equal values keep their input order. NaN values compare
/// equal to everything.
pub fn sort_offsets<T: Pixel>(offsets: &mut [usize], data: &[T], order: FloodOrder) {
    offsets.sort_by(|&a, &b| {
        let ord = data[a].partial_cmp(&data[b]).unwrap_or(Ordering::Equal);
        match order {
            FloodOrder::LowFirst => ord,
            FloodOrder::HighFirst => ord.reverse(),
        }
    });
}

/// Flags the pixels on the image border, where not every neighbor is inside the image.
pub fn border_flags(sizes: &[usize]) -> Vec<bool> {
    let mut flags = vec![true; sizes.iter().product()];
    let strides = ndmorph_image::image::get_strides_from_sizes(sizes);
    for_each_interior(sizes, &strides, 1, |o| flags[o] = false);
    flags
}

/// The distinct region labels found around a pixel.
///
/// Holds at most one entry per neighbor; label 0 is never stored.
#[derive(Debug, Default, Clone)]
pub struct NeighborLabels {
    labels: Vec<u32>,
}

impl NeighborLabels {
    /// Create an empty set with room for `capacity` labels.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            labels: Vec::with_capacity(capacity),
        }
    }

    /// Remove all labels.
    #[inline]
    pub fn reset(&mut self) {
        self.labels.clear();
    }

    /// Add a label unless it is 0 or already present.
    #[inline]
    pub fn push(&mut self, label: u32) {
        if label != 0 && !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    /// The number of distinct labels.
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no label was added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The labels in insertion order.
    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.labels
    }
}
