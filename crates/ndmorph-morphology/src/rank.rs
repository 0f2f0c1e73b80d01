use std::cmp::Ordering;
use std::str::FromStr;

use ndmorph_image::{boundary::boundary_array, ops, BoundaryCondition, Image, Pixel};

use crate::basic::{dilation, erosion};
use crate::error::MorphologyError;
use crate::parallel::{execute_chunks_with, ExecutionStrategy};
use crate::pixel_table::PixelTable;
use crate::structuring_element::StructuringElement;

/// The direction in which a rank is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankOrder {
    /// Rank 1 is the smallest value.
    #[default]
    Increasing,
    /// Rank 1 is the largest value.
    Decreasing,
}

impl FromStr for RankOrder {
    type Err = MorphologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "increasing" => Ok(RankOrder::Increasing),
            "decreasing" => Ok(RankOrder::Decreasing),
            _ => Err(MorphologyError::InvalidFlag(s.to_string())),
        }
    }
}

/// The `rank`-th value within the neighborhood of every pixel.
///
/// With `n` pixels in the structuring element, rank 1 in increasing order is the erosion and
/// rank `n` the dilation. Without boundary conditions the image is padded with the type maximum
/// for ranks in the lower half and with the type minimum otherwise.
///
/// # Errors
///
/// Fails for grey-weighted structuring elements, shapes without a neighborhood table, and a
/// rank outside `1..=n`.
pub fn rank_filter<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    rank: usize,
    order: RankOrder,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    if !se.is_flat() {
        return Err(MorphologyError::NotFlat);
    }
    let ndims = image.ndims();
    if image.is_empty() || ndims == 0 {
        return Ok(image.clone());
    }
    let kernel = se.kernel(ndims)?;
    let table = PixelTable::from_kernel(&kernel)?;
    let n = table.num_pixels();
    if rank < 1 || rank > n {
        return Err(MorphologyError::ParameterOutOfRange {
            name: "rank",
            value: rank as f64,
        });
    }
    let rank = match order {
        RankOrder::Increasing => rank,
        RankOrder::Decreasing => n - rank + 1,
    };
    if rank == 1 {
        return erosion(image, se, bcs);
    }
    if rank == n {
        return dilation(image, se, bcs);
    }

    let mut bcs = boundary_array(bcs, ndims)?;
    if bcs.is_empty() {
        bcs = if rank <= n / 2 {
            vec![BoundaryCondition::AddMaxValue; ndims]
        } else {
            vec![BoundaryCondition::AddMinValue; ndims]
        };
    }
    let border = table.border();
    let extended = image.extend(&border, &bcs)?;
    let strides = extended.strides().to_vec();
    let offsets = table
        .runs()
        .iter()
        .flat_map(|run| {
            let start: isize = run.coords.iter().zip(&strides).map(|(&c, &s)| c * s).sum();
            (0..run.length as isize).map(move |k| start + k)
        })
        .collect::<Vec<_>>();
    log::debug!("rank filter selecting {rank} of {n}");

    let width = image.sizes()[0];
    let ext = extended.as_slice();
    let mut out = image.clone();
    execute_chunks_with(
        ExecutionStrategy::default(),
        out.as_slice_mut(),
        width,
        || Vec::with_capacity(n),
        |values: &mut Vec<T>, row, line| {
            let base: isize = image
                .coords(row * width)
                .iter()
                .zip(&border)
                .zip(&strides)
                .map(|((&c, &b), &s)| (c + b) as isize * s)
                .sum();
            for (x, o) in line.iter_mut().enumerate() {
                let pos = base + x as isize;
                values.clear();
                values.extend(offsets.iter().map(|&off| ext[(pos + off) as usize]));
                let (_, selected, _) = values.select_nth_unstable_by(rank - 1, |a, b| {
                    a.partial_cmp(b).unwrap_or(Ordering::Equal)
                });
                *o = *selected;
            }
        },
    )?;
    Ok(out)
}

/// A closing that tolerates `rank` pixels of the structuring element not fitting the structure.
///
/// The rank filter with rank `rank + 1` in decreasing order is followed by an erosion with the
/// mirrored structuring element. The result is never below the input. Rank 0 is the closing.
///
/// # Errors
///
/// See [`rank_filter`]. `rank` must be smaller than the number of structuring element pixels.
pub fn rank_min_closing<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    rank: usize,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    let filtered = rank_filter(image, se, rank + 1, RankOrder::Decreasing, bcs)?;
    let out = erosion(&filtered, &se.mirrored(), bcs)?;
    Ok(ops::supremum(&out, image)?)
}

/// An opening that tolerates `rank` pixels of the structuring element not fitting the structure.
///
/// The dual of [`rank_min_closing`]. The result is never above the input. Rank 0 is the opening.
///
/// # Errors
///
/// See [`rank_filter`]. `rank` must be smaller than the number of structuring element pixels.
pub fn rank_max_opening<T: Pixel>(
    image: &Image<T>,
    se: &StructuringElement,
    rank: usize,
    bcs: &[BoundaryCondition],
) -> Result<Image<T>, MorphologyError> {
    let filtered = rank_filter(image, se, rank + 1, RankOrder::Increasing, bcs)?;
    let out = dilation(&filtered, &se.mirrored(), bcs)?;
    Ok(ops::infimum(&out, image)?)
}
