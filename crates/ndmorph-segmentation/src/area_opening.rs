use ndmorph_image::{error::check_sizes, BoundaryCondition, Image, NeighborList, Pixel};

use crate::error::SegmentationError;
use crate::offsets::{build_offsets, shift, sort_offsets, NeighborLabels};
use crate::types::{FilterPolarity, FloodOrder};
use crate::union_find::UnionFind;

/// The size measure a connected filter compares against the filter size.
#[derive(Debug, Clone, Copy)]
enum Criterion {
    Area(usize),
    Volume(f64),
}

/// A peak (or valley) of the image: its area, its volume and the level at which it became large
/// enough.
#[derive(Debug, Clone, Copy, Default)]
struct Peak<T> {
    size: usize,
    volume: f64,
    level: T,
}

impl Criterion {
    fn is_small<T>(self, peak: &Peak<T>) -> bool {
        match self {
            Criterion::Area(filter) => peak.size < filter,
            Criterion::Volume(filter) => peak.volume < filter,
        }
    }
}

impl<T: Pixel> Peak<T> {
    fn new(value: T) -> Self {
        Self {
            size: 1,
            volume: 0.0,
            level: value,
        }
    }

    /// Grow the peak down (or up) to `value`, as long as it is still small.
    fn add_pixel(&mut self, value: T, criterion: Criterion) {
        if !criterion.is_small(self) {
            return;
        }
        match criterion {
            Criterion::Area(_) => self.level = value,
            Criterion::Volume(_) => {
                self.volume += self.size as f64 * (self.level.to_f64() - value.to_f64()).abs();
                self.level = value;
            }
        }
        self.size += 1;
    }
}

fn merge_peaks<T: Pixel>(order: FloodOrder) -> impl Fn(&Peak<T>, &Peak<T>) -> Peak<T> {
    move |a, b| Peak {
        size: a.size + b.size,
        volume: a.volume + b.volume,
        level: match order {
            FloodOrder::LowFirst => a.level.sup(b.level),
            FloodOrder::HighFirst => a.level.inf(b.level),
        },
    }
}

fn parametric_opening<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    criterion: Criterion,
    connectivity: usize,
    polarity: FilterPolarity,
) -> Result<Image<T>, SegmentationError> {
    let ndims = image.ndims();
    if ndims < 1 {
        return Err(SegmentationError::DimensionalityNotSupported {
            required: 1,
            actual: 0,
        });
    }
    let list = NeighborList::new(connectivity, ndims)?;
    if let Some(mask) = mask {
        check_sizes(image.sizes(), mask.sizes())?;
    }
    if image.is_empty() {
        return Ok(image.clone());
    }

    // peaks are flooded from the top, valleys from the bottom
    let (order, bc) = match polarity {
        FilterPolarity::Opening => (FloodOrder::HighFirst, BoundaryCondition::AddMinValue),
        FilterPolarity::Closing => (FloodOrder::LowFirst, BoundaryCondition::AddMaxValue),
    };
    let mut grey = image.extend(&[1], &[bc])?;

    // the interior of the extended image holds the input pixels in raster order
    let mut offsets = build_offsets(grey.sizes());
    if let Some(mask) = mask {
        offsets = offsets
            .into_iter()
            .zip(mask.as_slice())
            .filter_map(|(o, &m)| m.then_some(o))
            .collect();
    }
    if offsets.is_empty() {
        return Ok(image.clone());
    }
    sort_offsets(&mut offsets, grey.as_slice(), order);

    let neighbor_offsets = list.offsets(grey.strides());
    let mut regions = UnionFind::new(merge_peaks(order));
    let mut neighbor_labels = NeighborLabels::with_capacity(neighbor_offsets.len());
    let mut labels = vec![0u32; grey.num_pixels()];
    let data = grey.as_slice();

    labels[offsets[0]] = regions.create(Peak::new(data[offsets[0]]))?;
    for &offset in &offsets[1..] {
        let value = data[offset];
        if order.is_last(value) {
            break;
        }
        neighbor_labels.reset();
        for &o in &neighbor_offsets {
            neighbor_labels.push(regions.find_root(labels[shift(offset, o)]));
        }
        match neighbor_labels.as_slice() {
            [] => labels[offset] = regions.create(Peak::new(value))?,
            [single] => {
                labels[offset] = *single;
                regions.value_mut(*single).add_pixel(value, criterion);
            }
            [first, ..] => {
                let small = neighbor_labels
                    .as_slice()
                    .iter()
                    .copied()
                    .find(|&l| criterion.is_small(regions.value(l)));
                let Some(lab) = small else {
                    // all neighbors are large already
                    labels[offset] = *first;
                    continue;
                };
                labels[offset] = lab;
                regions.value_mut(lab).add_pixel(value, criterion);
                for &other in neighbor_labels.as_slice() {
                    if other == lab {
                        continue;
                    }
                    if criterion.is_small(regions.value(other)) {
                        regions.union(lab, other);
                    } else {
                        // a large neighbor lends its size to the small region
                        let large = *regions.value(other);
                        let peak = regions.value_mut(lab);
                        peak.size += large.size;
                        peak.volume += large.volume;
                    }
                }
            }
        }
    }
    log::debug!(
        "{polarity:?} by {criterion:?}: {} regions over {} pixels",
        regions.len(),
        offsets.len()
    );

    let out = grey.as_slice_mut();
    for (v, &l) in out.iter_mut().zip(&labels) {
        if l == 0 {
            continue;
        }
        let level = regions.value(l).level;
        *v = match polarity {
            FilterPolarity::Opening => v.inf(level),
            FilterPolarity::Closing => v.sup(level),
        };
    }
    Ok(grey.crop(&vec![1; ndims], image.sizes())?)
}

/// Area opening (or closing): flatten the peaks (valleys) with fewer than `filter_size` pixels.
///
/// Each peak is lowered to the highest level at which it covers at least `filter_size` pixels.
/// Structures touching the image edge continue outside of it at the lowest (for the closing,
/// highest) value of the type.
///
/// # Arguments
///
/// * `image` - The grey-value image.
/// * `mask` - Optional mask; pixels outside it are left unchanged.
/// * `filter_size` - The smallest area that survives.
/// * `connectivity` - The neighborhood, between 1 and the dimensionality.
/// * `polarity` - Remove bright (opening) or dark (closing) structures.
///
/// # Examples
///
/// ```
/// use ndmorph_image::Image;
/// use ndmorph_segmentation::{area_opening, FilterPolarity};
///
/// let image = Image::new(&[9], vec![0u8, 5, 5, 0, 3, 3, 3, 3, 0]).unwrap();
/// let out = area_opening(&image, None, 3, 1, FilterPolarity::Opening).unwrap();
/// assert_eq!(out.as_slice(), &[0, 0, 0, 0, 3, 3, 3, 3, 0]);
/// ```
pub fn area_opening<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    filter_size: usize,
    connectivity: usize,
    polarity: FilterPolarity,
) -> Result<Image<T>, SegmentationError> {
    parametric_opening(
        image,
        mask,
        Criterion::Area(filter_size),
        connectivity,
        polarity,
    )
}

/// Volume opening (or closing): flatten the peaks (valleys) whose volume is below `filter_size`.
///
/// The volume of a peak at a given level is the sum of the differences between its pixels and
/// that level. Each peak is lowered to the level of the first pixel at which its volume is no
/// longer below `filter_size`; the level is not interpolated between pixel values.
///
/// # Errors
///
/// Fails if `filter_size` is not positive, plus the errors of [`area_opening`].
pub fn volume_opening<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    filter_size: f64,
    connectivity: usize,
    polarity: FilterPolarity,
) -> Result<Image<T>, SegmentationError> {
    if !(filter_size > 0.0) {
        return Err(SegmentationError::ParameterOutOfRange {
            name: "filter_size",
            value: filter_size,
        });
    }
    parametric_opening(
        image,
        mask,
        Criterion::Volume(filter_size),
        connectivity,
        polarity,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_opening_mask() -> Result<(), SegmentationError> {
        let image = Image::new(&[9], vec![0u8, 5, 5, 0, 3, 3, 3, 3, 0])?;
        let mask = image.map(|&v| v != 5);
        let out = area_opening(&image, Some(&mask), 3, 1, FilterPolarity::Opening)?;
        assert_eq!(out, image);
        Ok(())
    }

    #[test]
    fn test_area_closing_fills_small_holes() -> Result<(), SegmentationError> {
        #[rustfmt::skip]
        let image = Image::new(&[6, 4], vec![
            9u8, 9, 9, 9, 9, 9,
            9, 1, 9, 9, 2, 9,
            9, 9, 9, 9, 2, 9,
            9, 9, 9, 9, 9, 9,
        ])?;
        let out = area_opening(&image, None, 2, 1, FilterPolarity::Closing)?;
        assert_eq!(out.get(&[1, 1]), Some(&9));
        assert_eq!(out.get(&[4, 1]), Some(&2));
        let out = area_opening(&image, None, 3, 1, FilterPolarity::Closing)?;
        assert!(out.as_slice().iter().all(|&v| v == 9));
        Ok(())
    }

    #[test]
    fn test_volume_opening_keeps_tall_peaks() -> Result<(), SegmentationError> {
        // the tall peak only reaches volume 16 at the background level
        let image = Image::new(&[7], vec![0u8, 8, 8, 0, 1, 1, 0])?;
        let out = volume_opening(&image, None, 5.0, 1, FilterPolarity::Opening)?;
        assert_eq!(out.as_slice(), &[0; 7]);
        let out = volume_opening(&image, None, 17.0, 1, FilterPolarity::Opening)?;
        assert_eq!(out.as_slice(), &[0; 7]);

        // the spike reaches volume 4 at level 2 and stops growing there
        let spike = Image::new(&[5], vec![1.0f32, 2.0, 6.0, 2.0, 1.0])?;
        let out = volume_opening(&spike, None, 3.0, 1, FilterPolarity::Opening)?;
        approx::assert_relative_eq!(out.as_slice()[2], 2.0);
        approx::assert_relative_eq!(out.as_slice()[1], 2.0);
        approx::assert_relative_eq!(out.as_slice()[0], 1.0);

        assert!(volume_opening(&image, None, 0.0, 1, FilterPolarity::Opening).is_err());
        Ok(())
    }
}
