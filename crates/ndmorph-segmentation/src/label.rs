use ndmorph_image::{Image, NeighborList};

use crate::error::SegmentationError;
use crate::offsets::{border_flags, shift};
use crate::union_find::UnionFind;

/// Label the connected components of a binary image.
///
/// Components are numbered consecutively from 1 in raster order of their first pixel.
///
/// # Arguments
///
/// * `mask` - The binary image.
/// * `connectivity` - The neighborhood, between 1 and the dimensionality.
///
/// # Returns
///
/// The label image and the number of components.
///
/// # Examples
///
/// ```
/// use ndmorph_image::Image;
/// use ndmorph_segmentation::label_binary;
///
/// let mask = Image::new(&[5], vec![true, true, false, true, false]).unwrap();
/// let (labels, n) = label_binary(&mask, 1).unwrap();
/// assert_eq!(n, 2);
/// assert_eq!(labels.as_slice(), &[1, 1, 0, 2, 0]);
/// ```
pub fn label_binary(
    mask: &Image<bool>,
    connectivity: usize,
) -> Result<(Image<u32>, usize), SegmentationError> {
    let neighbors = NeighborList::new(connectivity, mask.ndims())?.backward();
    let offsets = neighbors.offsets(mask.strides());
    let border = border_flags(mask.sizes());
    let data = mask.as_slice();
    let mut labels = mask.similar(0u32);
    let mut regions = UnionFind::new(|_: &(), _: &()| ());

    let sizes = mask.sizes().to_vec();
    let out = labels.as_slice_mut();
    for i in 0..data.len() {
        if !data[i] {
            continue;
        }
        let coords = border[i].then(|| mask.coords(i));
        let mut label = 0;
        for (k, &o) in offsets.iter().enumerate() {
            if let Some(coords) = &coords {
                if !neighbors.is_in_image(k, coords, &sizes) {
                    continue;
                }
            }
            let n = out[shift(i, o)];
            if n == 0 {
                continue;
            }
            label = if label == 0 { n } else { regions.union(label, n) };
        }
        out[i] = if label == 0 { regions.create(())? } else { label };
    }

    let count = regions.relabel();
    for l in out.iter_mut().filter(|l| **l > 0) {
        *l = regions.label(*l);
    }
    log::debug!("labelled {count} connected components");
    Ok((labels, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_u_shape() -> Result<(), SegmentationError> {
        // two arms joined at the bottom row
        #[rustfmt::skip]
        let data = [
            1, 0, 1, 0,
            1, 0, 1, 0,
            1, 1, 1, 0,
            0, 0, 0, 1,
        ];
        let mask = Image::new(&[4, 4], data.iter().map(|&v| v == 1).collect())?;
        let (labels, n) = label_binary(&mask, 1)?;
        assert_eq!(n, 2);
        assert_eq!(labels.get(&[0, 0]), Some(&1));
        assert_eq!(labels.get(&[2, 0]), Some(&1));
        assert_eq!(labels.get(&[3, 3]), Some(&2));

        let (labels, n) = label_binary(&mask, 2)?;
        assert_eq!(n, 1);
        assert_eq!(labels.get(&[3, 3]), Some(&1));
        Ok(())
    }

    #[test]
    fn test_label_rejects_bad_connectivity() {
        let mask = Image::from_size_val(&[3, 3], true);
        assert!(label_binary(&mask, 3).is_err());
    }
}
