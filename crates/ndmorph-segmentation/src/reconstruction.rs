use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndmorph_image::{error::check_sizes, ops, BoundaryCondition, Image, NeighborList, Pixel};
use ndmorph_morphology::{dilation, erosion, Polarity, SeShape, StructuringElement};

use crate::error::SegmentationError;
use crate::offsets::{border_flags, shift};

/// A pixel waiting to propagate its value; the most extreme value pops first.
#[derive(Debug, Clone, Copy)]
struct Propagation<T> {
    value: T,
    offset: usize,
    direction: Polarity,
}

impl<T: Pixel> PartialEq for Propagation<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Pixel> Eq for Propagation<T> {}

impl<T: Pixel> PartialOrd for Propagation<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Pixel> Ord for Propagation<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        let ord = self.value.partial_cmp(&other.value).unwrap_or(Ordering::Equal);
        match self.direction {
            Polarity::Dilation => ord,
            Polarity::Erosion => ord.reverse(),
        }
    }
}

/// Reconstruct `marker` under (or, for erosion, above) `image`.
///
/// Reconstruction by dilation repeatedly dilates the marker and clamps it by `image` until
/// nothing changes; reconstruction by erosion is the dual. The result is computed with a forward
/// and a backward raster pass followed by a priority-queue pass over the pixels that can still
/// propagate.
///
/// # Arguments
///
/// * `marker` - The marker image, clamped by `image` before propagating.
/// * `image` - The grey-value mask.
/// * `connectivity` - The neighborhood, between 1 and the dimensionality.
/// * `direction` - Reconstruction by dilation or by erosion.
///
/// # Errors
///
/// Fails if the sizes differ or the connectivity is invalid.
///
/// # Examples
///
/// ```
/// use ndmorph_image::Image;
/// use ndmorph_morphology::Polarity;
/// use ndmorph_segmentation::morphological_reconstruction;
///
/// let image = Image::new(&[6], vec![0u8, 4, 6, 0, 5, 5]).unwrap();
/// let marker = Image::new(&[6], vec![0u8, 9, 0, 0, 0, 0]).unwrap();
/// let out = morphological_reconstruction(&marker, &image, 1, Polarity::Dilation).unwrap();
/// assert_eq!(out.as_slice(), &[0, 4, 4, 0, 0, 0]);
/// ```
pub fn morphological_reconstruction<T: Pixel>(
    marker: &Image<T>,
    image: &Image<T>,
    connectivity: usize,
    direction: Polarity,
) -> Result<Image<T>, SegmentationError> {
    if image.ndims() < 1 {
        return Err(SegmentationError::DimensionalityNotSupported {
            required: 1,
            actual: 0,
        });
    }
    check_sizes(image.sizes(), marker.sizes())?;
    let list = NeighborList::new(connectivity, image.ndims())?;
    let clamp = direction.invert();
    let mut out = match direction {
        Polarity::Dilation => ops::infimum(marker, image)?,
        Polarity::Erosion => ops::supremum(marker, image)?,
    };
    if out.is_empty() {
        return Ok(out);
    }

    let sizes = image.sizes().to_vec();
    let border = border_flags(&sizes);
    let input = image.as_slice();
    let data = out.as_slice_mut();
    let n = data.len();

    // forward raster pass
    let backward = list.backward();
    let backward_offsets = backward.offsets(image.strides());
    for offset in 0..n {
        let coords = border[offset].then(|| image.coords(offset));
        let mut val = data[offset];
        for (k, &o) in backward_offsets.iter().enumerate() {
            if let Some(coords) = &coords {
                if !backward.is_in_image(k, coords, &sizes) {
                    continue;
                }
            }
            val = direction.pick(val, data[shift(offset, o)]);
        }
        data[offset] = clamp.pick(val, input[offset]);
    }

    // backward raster pass, queueing the pixels that can still propagate backwards
    let forward = list.forward();
    let forward_offsets = forward.offsets(image.strides());
    let mut queue = BinaryHeap::new();
    for offset in (0..n).rev() {
        let coords = border[offset].then(|| image.coords(offset));
        let mut best = direction.identity::<T>();
        let mut worst = clamp.identity::<T>();
        for (k, &o) in forward_offsets.iter().enumerate() {
            if let Some(coords) = &coords {
                if !forward.is_in_image(k, coords, &sizes) {
                    continue;
                }
            }
            let v = data[shift(offset, o)];
            best = direction.pick(best, v);
            worst = clamp.pick(worst, v);
        }
        let val = clamp.pick(direction.pick(data[offset], best), input[offset]);
        if val != data[offset] {
            data[offset] = val;
            if direction.better(val, worst) {
                queue.push(Propagation {
                    value: val,
                    offset,
                    direction,
                });
            }
        }
    }
    let queued = queue.len();

    let neighbor_offsets = list.offsets(image.strides());
    let mut processed = vec![false; n];
    while let Some(item) = queue.pop() {
        let offset = item.offset;
        if processed[offset] {
            continue;
        }
        let coords = border[offset].then(|| image.coords(offset));
        for (k, &o) in neighbor_offsets.iter().enumerate() {
            if let Some(coords) = &coords {
                if !list.is_in_image(k, coords, &sizes) {
                    continue;
                }
            }
            let neighbor = shift(offset, o);
            let value = clamp.pick(input[neighbor], data[offset]);
            if direction.better(value, data[neighbor]) {
                data[neighbor] = value;
                queue.push(Propagation {
                    value,
                    offset: neighbor,
                    direction,
                });
            }
        }
        processed[offset] = true;
    }
    log::debug!("reconstruction by {direction:?}: {queued} pixels queued after the raster passes");

    Ok(out)
}

/// Reconstruction that propagates at most `max_distance` pixels away from the marker.
///
/// The mask is limited to the dilation (erosion) of the marker by a disk of diameter
/// `2 * max_distance`.
///
/// # Errors
///
/// Fails if `max_distance < 1`, plus the errors of [`morphological_reconstruction`].
pub fn limited_morphological_reconstruction<T: Pixel>(
    marker: &Image<T>,
    image: &Image<T>,
    max_distance: f64,
    connectivity: usize,
    direction: Polarity,
) -> Result<Image<T>, SegmentationError> {
    // also rejects NaN
    if !(max_distance >= 1.0) {
        return Err(SegmentationError::ParameterOutOfRange {
            name: "max_distance",
            value: max_distance,
        });
    }
    let se = StructuringElement::new(vec![2.0 * max_distance], SeShape::Elliptic);
    let mask = match direction {
        Polarity::Dilation => ops::infimum(&dilation(marker, &se, &[])?, image)?,
        Polarity::Erosion => ops::supremum(&erosion(marker, &se, &[])?, image)?,
    };
    morphological_reconstruction(marker, &mask, connectivity, direction)
}

/// Suppress the minima shallower than `h`: reconstruction by erosion of `image + h` above
/// `image`.
pub fn h_minima<T: Pixel>(
    image: &Image<T>,
    h: f64,
    connectivity: usize,
) -> Result<Image<T>, SegmentationError> {
    let marker = ops::add_constant(image, h);
    morphological_reconstruction(&marker, image, connectivity, Polarity::Erosion)
}

/// Suppress the maxima lower than `h`: reconstruction by dilation of `image - h` under `image`.
pub fn h_maxima<T: Pixel>(
    image: &Image<T>,
    h: f64,
    connectivity: usize,
) -> Result<Image<T>, SegmentationError> {
    let marker = ops::add_constant(image, -h);
    morphological_reconstruction(&marker, image, connectivity, Polarity::Dilation)
}

/// Modify `image` so that its only regional minima are the set pixels of `marker`.
///
/// Marker pixels are set to the type minimum; every other minimum is filled by reconstruction.
///
/// # Errors
///
/// Fails if the sizes differ or the connectivity is invalid.
pub fn impose_minima<T: Pixel>(
    image: &Image<T>,
    marker: &Image<bool>,
    connectivity: usize,
) -> Result<Image<T>, SegmentationError> {
    check_sizes(image.sizes(), marker.sizes())?;
    let mut seed = image.similar(T::max_value());
    ops::fill_where(&mut seed, marker, T::min_value())?;
    // keep the image above the seed minimum so no minimum of `image` merges with a marker
    let gray = if T::IS_FLOAT {
        ops::add_constant(image, 1.0)
    } else {
        let floor = T::clamp_from_f64(T::min_value().to_f64() + 1.0);
        image.map(|&v| v.sup(floor))
    };
    let gray = ops::infimum(&gray, &seed)?;
    morphological_reconstruction(&seed, &gray, connectivity, Polarity::Erosion)
}

/// Leveling of `image` by `marker`: reconstruction by dilation where the marker is below the
/// image, by erosion elsewhere.
pub fn leveling<T: Pixel>(
    image: &Image<T>,
    marker: &Image<T>,
    connectivity: usize,
) -> Result<Image<T>, SegmentationError> {
    let below = morphological_reconstruction(marker, image, connectivity, Polarity::Dilation)?;
    let mask = ops::lesser(marker, image)?;
    let above = morphological_reconstruction(marker, image, connectivity, Polarity::Erosion)?;
    Ok(ops::select(&mask, &below, &above)?)
}

/// Erosion by `se` followed by reconstruction by dilation under `image`.
///
/// Removes the bright structures the SE does not fit in, restoring the others exactly.
pub fn opening_by_reconstruction<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    connectivity: usize,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, SegmentationError> {
    let marker = erosion(image, se, bcs)?;
    morphological_reconstruction(&marker, image, connectivity, Polarity::Dilation)
}

/// Dilation by `se` followed by reconstruction by erosion above `image`.
pub fn closing_by_reconstruction<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    connectivity: usize,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, SegmentationError> {
    let marker = dilation(image, se, bcs)?;
    morphological_reconstruction(&marker, image, connectivity, Polarity::Erosion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstruction_by_erosion() -> Result<(), SegmentationError> {
        let image = Image::new(&[7], vec![9u8, 2, 3, 9, 1, 1, 9])?;
        let marker = Image::new(&[7], vec![9u8, 9, 9, 9, 9, 0, 9])?;
        let out = morphological_reconstruction(&marker, &image, 1, Polarity::Erosion)?;
        assert_eq!(out.as_slice(), &[9, 9, 9, 9, 1, 1, 9]);
        Ok(())
    }

    #[test]
    fn test_reconstruction_wraps_around_obstacle() -> Result<(), SegmentationError> {
        // the path from the marker to (0, 0) has to go down and back up against the raster order
        #[rustfmt::skip]
        let image = Image::new(&[4, 4], vec![
            5u8, 0, 5, 5,
            5, 0, 5, 0,
            5, 0, 5, 0,
            5, 5, 5, 0,
        ])?;
        let mut marker = image.similar(0u8);
        if let Some(m) = marker.get_mut(&[2, 0]) {
            *m = 5;
        }
        let out = morphological_reconstruction(&marker, &image, 1, Polarity::Dilation)?;
        assert_eq!(out, image);
        Ok(())
    }

    #[test]
    fn test_h_maxima() -> Result<(), SegmentationError> {
        let image = Image::new(&[5], vec![0u8, 3, 0, 5, 0])?;
        let out = h_maxima(&image, 2.0, 1)?;
        assert_eq!(out.as_slice(), &[0, 1, 0, 3, 0]);
        let out = h_minima(&ops::invert(&image), 2.0, 1)?;
        assert_eq!(ops::invert(&out).as_slice(), &[0, 1, 0, 3, 0]);
        Ok(())
    }

    #[test]
    fn test_impose_minima() -> Result<(), SegmentationError> {
        let image = Image::new(&[5], vec![5u8, 3, 5, 2, 5])?;
        let marker = Image::new(&[5], vec![true, false, false, false, false])?;
        let out = impose_minima(&image, &marker, 1)?;
        assert_eq!(out.as_slice(), &[0, 3, 5, 5, 5]);
        Ok(())
    }

    #[test]
    fn test_leveling_identity() -> Result<(), SegmentationError> {
        let image = Image::new(&[3, 2], vec![1.0f32, 4.0, 2.0, 8.0, 0.5, 3.0])?;
        assert_eq!(leveling(&image, &image, 2)?, image);
        Ok(())
    }

    #[test]
    fn test_limited_reconstruction_distance() -> Result<(), SegmentationError> {
        let image = Image::from_size_val(&[9], 7u8);
        let mut marker = image.similar(0u8);
        if let Some(m) = marker.get_mut(&[0]) {
            *m = 7;
        }
        let out =
            limited_morphological_reconstruction(&marker, &image, 2.0, 1, Polarity::Dilation)?;
        assert_eq!(out.as_slice(), &[7, 7, 7, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            limited_morphological_reconstruction(&marker, &image, 0.5, 1, Polarity::Dilation),
            Err(SegmentationError::ParameterOutOfRange { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_opening_by_reconstruction_keeps_large_objects() -> Result<(), SegmentationError> {
        // a 1-pixel spike on a wide plateau disappears, the plateau is kept whole
        let mut image = Image::from_size_val(&[12, 7], 0u8);
        for y in 1..6 {
            for x in 1..7 {
                if let Some(v) = image.get_mut(&[x, y]) {
                    *v = 10;
                }
            }
        }
        if let Some(v) = image.get_mut(&[9, 3]) {
            *v = 10;
        }
        let se = StructuringElement::new(vec![3.0, 3.0], SeShape::Rectangular);
        let out = opening_by_reconstruction(&image, &se, 1, &[])?;
        assert_eq!(out.get(&[9, 3]), Some(&0));
        assert_eq!(out.get(&[1, 1]), Some(&10));
        assert_eq!(out.get(&[6, 5]), Some(&10));

        let closed = closing_by_reconstruction(&ops::invert(&image), &se, 1, &[])?;
        assert_eq!(ops::invert(&closed), out);
        Ok(())
    }
}
