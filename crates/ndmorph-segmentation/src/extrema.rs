use ndmorph_image::{error::check_sizes, Image, NeighborList, Pixel};

use crate::error::SegmentationError;
use crate::offsets::{border_flags, shift, sort_offsets};
use crate::types::{FloodOrder, OutputKind, SegmentationImage};
use crate::union_find::UnionFind;
use crate::watershed::{fast_flood, FloodMode, WatershedOptions};

/// Options for [`watershed_minima`] and [`watershed_maxima`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtremaOptions {
    /// The neighborhood, between 1 and the dimensionality.
    pub connectivity: usize,
    /// Extrema shallower than this merge with their neighbors.
    pub max_depth: f64,
    /// Extrema with at most this many pixels merge with their neighbors; 0 disables the size
    /// criterion.
    pub max_size: usize,
    /// Produce a binary image or labelled extrema.
    pub output: OutputKind,
}

impl Default for ExtremaOptions {
    fn default() -> Self {
        Self {
            connectivity: 1,
            max_depth: 1.0,
            max_size: 0,
            output: OutputKind::Binary,
        }
    }
}

fn regional_extrema<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    connectivity: usize,
    output: OutputKind,
    order: FloodOrder,
) -> Result<SegmentationImage, SegmentationError> {
    let list = NeighborList::new(connectivity, image.ndims())?;
    if let Some(mask) = mask {
        check_sizes(image.sizes(), mask.sizes())?;
    }
    let data = image.as_slice();
    let mut offsets = match mask {
        Some(mask) => (0..data.len()).filter(|&i| mask.as_slice()[i]).collect::<Vec<_>>(),
        None => (0..data.len()).collect(),
    };
    sort_offsets(&mut offsets, data, order);

    let neighbor_offsets = list.offsets(image.strides());
    let border = border_flags(image.sizes());
    let sizes = image.sizes().to_vec();
    let mut labels = image.similar(0u32);
    // the payload tells whether the plateau is still an extremum
    let mut plateaus = UnionFind::new(|a: &bool, b: &bool| *a && *b);

    let lab = labels.as_slice_mut();
    for &offset in &offsets {
        let value = data[offset];
        let coords = border[offset].then(|| image.coords(offset));
        let mut label = 0;
        let mut is_extremum = true;
        for (k, &o) in neighbor_offsets.iter().enumerate() {
            if let Some(coords) = &coords {
                if !list.is_in_image(k, coords, &sizes) {
                    continue;
                }
            }
            let n = shift(offset, o);
            if lab[n] == 0 {
                continue;
            }
            if data[n] == value {
                label = if label == 0 {
                    plateaus.find_root(lab[n])
                } else {
                    plateaus.union(label, lab[n])
                };
            } else if order.precedes(data[n], value) {
                is_extremum = false;
            }
        }
        if label == 0 {
            label = plateaus.create(is_extremum)?;
        } else if !is_extremum {
            *plateaus.value_mut(label) = false;
        }
        lab[offset] = label;
    }

    let count = plateaus.relabel_with(|&is_extremum| is_extremum);
    log::debug!("found {count} regional extrema among {} plateaus", plateaus.len());
    for l in lab.iter_mut().filter(|l| **l > 0) {
        *l = plateaus.label(*l);
    }
    Ok(match output {
        OutputKind::Binary => SegmentationImage::Binary(labels.map(|&l| l > 0)),
        OutputKind::Labels => SegmentationImage::Labels(labels),
    })
}

/// Find the regional minima: plateaus without a lower neighbor.
///
/// # Arguments
///
/// * `image` - The grey-value image.
/// * `mask` - Optional mask; pixels outside it are ignored.
/// * `connectivity` - The neighborhood, between 1 and the dimensionality.
/// * `output` - A binary image, or each minimum labelled.
///
/// # Examples
///
/// ```
/// use ndmorph_image::Image;
/// use ndmorph_segmentation::{minima, OutputKind};
///
/// let image = Image::new(&[7], vec![3u8, 1, 1, 2, 0, 4, 4]).unwrap();
/// let minima = minima(&image, None, 1, OutputKind::Binary).unwrap().into_binary();
/// assert_eq!(minima.as_slice(), &[false, true, true, false, true, false, false]);
/// ```
pub fn minima<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    connectivity: usize,
    output: OutputKind,
) -> Result<SegmentationImage, SegmentationError> {
    regional_extrema(image, mask, connectivity, output, FloodOrder::LowFirst)
}

/// Find the regional maxima: plateaus without a higher neighbor.
///
/// See [`minima`].
pub fn maxima<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    connectivity: usize,
    output: OutputKind,
) -> Result<SegmentationImage, SegmentationError> {
    regional_extrema(image, mask, connectivity, output, FloodOrder::HighFirst)
}

fn watershed_extrema<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    options: &ExtremaOptions,
    order: FloodOrder,
) -> Result<SegmentationImage, SegmentationError> {
    let options = WatershedOptions {
        connectivity: options.connectivity,
        max_depth: options.max_depth,
        max_size: options.max_size,
        order,
        output: options.output,
        ..Default::default()
    };
    fast_flood(image, mask, &options, FloodMode::Extrema)
}

/// Find the minima that survive the merging of a fast watershed.
///
/// Basins shallower than `max_depth` (or smaller than `max_size`) merge with their neighbors, so
/// only significant minima are kept. A pixel is reported if it has the lowest value of its basin.
/// The 1-pixel image border is never reported.
///
/// # Errors
///
/// Same as [`crate::fast_watershed`].
pub fn watershed_minima<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    options: &ExtremaOptions,
) -> Result<SegmentationImage, SegmentationError> {
    watershed_extrema(image, mask, options, FloodOrder::LowFirst)
}

/// Find the maxima that survive the merging of a fast watershed.
///
/// See [`watershed_minima`].
pub fn watershed_maxima<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    options: &ExtremaOptions,
) -> Result<SegmentationImage, SegmentationError> {
    watershed_extrema(image, mask, options, FloodOrder::HighFirst)
}
