use std::collections::VecDeque;
use std::str::FromStr;

use ndmorph_image::{error::check_sizes, ops, Image, ImageError, Pixel};
use ndmorph_morphology::{dilation, erosion, SeShape, StructuringElement};

use crate::error::SegmentationError;
use crate::offsets::{border_flags, build_offsets, build_offsets_masked, shift, sort_offsets};
use crate::types::{FilterPolarity, FloodOrder};

const ACTIVE: u8 = 1;
const QUEUED: u8 = 2;
const CHANGED: u8 = 4;

/// How paths may turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathConstraint {
    /// Any step within the direction cone is allowed.
    #[default]
    Unconstrained,
    /// A step off the main direction must be followed by a step along it.
    Constrained,
}

impl FromStr for PathConstraint {
    type Err = SegmentationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unconstrained" => Ok(PathConstraint::Unconstrained),
            "constrained" => Ok(PathConstraint::Constrained),
            _ => Err(SegmentationError::InvalidFlag(s.to_string())),
        }
    }
}

/// Options for [`path_opening`] and [`directed_path_opening`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathOpeningOptions {
    /// Remove bright (opening) or dark (closing) structures.
    pub polarity: FilterPolarity,
    /// Whether paths are constrained.
    pub constraint: PathConstraint,
    /// Bridge single-pixel gaps by filtering a dilated (eroded) copy of the input.
    pub robust: bool,
}

/// Whether `coords` lies in the cone around `direction`.
///
/// Every nonzero component of the direction may change by at most one, and at least one of them
/// must stay the same. The direction itself and the origin are excluded.
fn is_cone_neighbor(direction: &[isize], coords: &[isize]) -> bool {
    let mut unchanged = false;
    for (&d, &c) in direction.iter().zip(coords) {
        if d != 0 {
            match (d - c).abs() {
                0 => unchanged = true,
                1 => {}
                _ => return false,
            }
        }
    }
    unchanged && coords != direction && coords.iter().any(|&c| c != 0)
}

/// Advance `coords` through `{-1, 0, 1}^D`, dimension 0 fastest. Returns false after the last.
fn next_unit_step(coords: &mut [isize]) -> bool {
    for c in coords.iter_mut() {
        *c += 1;
        if *c <= 1 {
            return true;
        }
        *c = -1;
    }
    false
}

/// All the directions of a `ndims`-dimensional grid, one per pair of opposite directions.
///
/// The first nonzero component of each direction is positive.
fn path_directions(ndims: usize) -> Vec<Vec<isize>> {
    let mut directions = Vec::new();
    let mut direction = vec![-1isize; ndims];
    loop {
        if direction.iter().find(|&&d| d != 0).is_some_and(|&d| d > 0) {
            directions.push(direction.clone());
        }
        if !next_unit_step(&mut direction) {
            break;
        }
    }
    directions
}

/// The upstream and downstream neighbor offsets of a direction, the main step first.
struct PathNeighbors {
    up: Vec<isize>,
    down: Vec<isize>,
}

impl PathNeighbors {
    fn new(direction: &[isize], strides: &[isize]) -> Self {
        let step = |coords: &[isize]| {
            coords
                .iter()
                .zip(strides)
                .map(|(&c, &s)| c * s)
                .sum::<isize>()
        };
        let mut up = vec![step(direction)];
        let mut coords = vec![-1isize; direction.len()];
        loop {
            if is_cone_neighbor(direction, &coords) {
                up.push(step(&coords));
            }
            if !next_unit_step(&mut coords) {
                break;
            }
        }
        let down = up.iter().map(|&o| -o).collect();
        Self { up, down }
    }
}

/// The work lists shared by the propagation passes.
#[derive(Default)]
struct Worklists {
    queue: VecDeque<usize>,
    changed: Vec<usize>,
}

impl Worklists {
    fn enqueue(&mut self, flags: &mut [u8], index: usize) {
        if flags[index] & ACTIVE != 0 && flags[index] & QUEUED == 0 {
            flags[index] |= QUEUED;
            self.queue.push_back(index);
        }
    }

    fn mark_changed(&mut self, flags: &mut [u8], index: usize) {
        if flags[index] & CHANGED == 0 {
            flags[index] |= CHANGED;
            self.changed.push(index);
        }
    }
}

/// Cut the paths through `seed`, and shorten the lengths of the pixels downstream of it.
fn propagate(
    flags: &mut [u8],
    length: &mut [u16],
    next: &[isize],
    prev: &[isize],
    seed: usize,
    lists: &mut Worklists,
) {
    length[seed] = 0;
    for &o in next {
        lists.enqueue(flags, shift(seed, o));
    }
    while let Some(index) = lists.queue.pop_front() {
        flags[index] &= !QUEUED;
        let len = prev
            .iter()
            .map(|&o| length[shift(index, o)])
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        if len < length[index] {
            length[index] = len;
            for &o in next {
                lists.enqueue(flags, shift(index, o));
            }
            lists.mark_changed(flags, index);
        }
    }
}

/// Like [`propagate`], tracking paths that end in a straight step separately from any path.
fn propagate_constrained(
    flags: &mut [u8],
    straight: &mut [u16],
    other: &mut [u16],
    next: &[isize],
    prev: &[isize],
    seed: usize,
    lists: &mut Worklists,
) {
    straight[seed] = 0;
    other[seed] = 0;
    for &o in next {
        lists.enqueue(flags, shift(seed, o));
    }
    while let Some(index) = lists.queue.pop_front() {
        flags[index] &= !QUEUED;
        let along = other[shift(index, prev[0])];
        let across = prev[1..]
            .iter()
            .map(|&o| straight[shift(index, o)])
            .fold(along, u16::max);
        let len_straight = along.saturating_add(1);
        let len_other = across.saturating_add(1);
        if len_straight < straight[index] {
            straight[index] = len_straight;
            for &o in next {
                lists.enqueue(flags, shift(index, o));
            }
            lists.mark_changed(flags, index);
        }
        if len_other < other[index] {
            other[index] = len_other;
            lists.enqueue(flags, shift(index, next[0]));
            lists.mark_changed(flags, index);
        }
    }
}

/// The path lengths of every pixel, upstream and downstream.
struct PathLengths {
    up: Vec<u16>,
    down: Vec<u16>,
    // only used by constrained paths
    other_up: Vec<u16>,
    other_down: Vec<u16>,
}

impl PathLengths {
    fn new(n: usize, length: u16, constraint: PathConstraint) -> Self {
        let extra = match constraint {
            PathConstraint::Unconstrained => 0,
            PathConstraint::Constrained => n,
        };
        Self {
            up: vec![length; n],
            down: vec![length; n],
            other_up: vec![length; extra],
            other_down: vec![length; extra],
        }
    }

    /// Whether the longest path through `index` is shorter than `length`.
    fn is_short(&self, index: usize, length: u16, constraint: PathConstraint) -> bool {
        let limit = length as usize + 1;
        match constraint {
            PathConstraint::Unconstrained => {
                (self.up[index] as usize + self.down[index] as usize) < limit
            }
            PathConstraint::Constrained => {
                (self.up[index] as usize + self.other_down[index] as usize) < limit
                    && (self.other_up[index] as usize + self.down[index] as usize) < limit
            }
        }
    }

    fn clear(&mut self, index: usize) {
        self.up[index] = 0;
        self.down[index] = 0;
        if let Some(l) = self.other_up.get_mut(index) {
            *l = 0;
        }
        if let Some(l) = self.other_down.get_mut(index) {
            *l = 0;
        }
    }
}

/// Filter `grey` along one direction, processing `offsets` in sorted order.
///
/// Each processed pixel cuts the paths through it; pixels whose longest path drops below
/// `length` take the value of that pixel and are done.
fn filter_direction<T: Pixel>(
    grey: &mut [T],
    mut flags: Vec<u8>,
    offsets: &[usize],
    neighbors: &PathNeighbors,
    length: u16,
    constraint: PathConstraint,
) {
    let mut lengths = PathLengths::new(grey.len(), length, constraint);
    let mut lists = Worklists::default();
    let (up, down) = (&neighbors.up, &neighbors.down);

    for &offset in offsets {
        if flags[offset] & ACTIVE == 0 {
            continue;
        }
        match constraint {
            PathConstraint::Unconstrained => {
                propagate(&mut flags, &mut lengths.up, up, down, offset, &mut lists);
                propagate(&mut flags, &mut lengths.down, down, up, offset, &mut lists);
            }
            PathConstraint::Constrained => {
                propagate_constrained(
                    &mut flags,
                    &mut lengths.up,
                    &mut lengths.other_up,
                    up,
                    down,
                    offset,
                    &mut lists,
                );
                propagate_constrained(
                    &mut flags,
                    &mut lengths.down,
                    &mut lengths.other_down,
                    down,
                    up,
                    offset,
                    &mut lists,
                );
            }
        }
        let value = grey[offset];
        for index in lists.changed.drain(..) {
            flags[index] &= !CHANGED;
            if lengths.is_short(index, length, constraint) {
                grey[index] = value;
                flags[index] &= !ACTIVE;
                lengths.clear(index);
            }
        }
        flags[offset] &= !ACTIVE;
    }
}

fn check_input<T>(image: &Image<T>, mask: Option<&Image<bool>>) -> Result<(), SegmentationError> {
    if image.ndims() < 2 {
        return Err(SegmentationError::DimensionalityNotSupported {
            required: 2,
            actual: image.ndims(),
        });
    }
    if image.sizes().iter().any(|&s| s < 3) {
        return Err(SegmentationError::ImageTooSmall {
            min: 3,
            sizes: image.sizes().to_vec(),
        });
    }
    if let Some(mask) = mask {
        check_sizes(image.sizes(), mask.sizes())?;
    }
    Ok(())
}

fn check_length(length: usize) -> Result<u16, SegmentationError> {
    match u16::try_from(length) {
        Ok(l) if l >= 2 => Ok(l),
        _ => Err(SegmentationError::ParameterOutOfRange {
            name: "length",
            value: length as f64,
        }),
    }
}

/// The image the paths are searched in: the input, or its dilation (erosion) by a 2-pixel box
/// in robust mode.
fn robust_input<T: Pixel>(
    image: &Image<T>,
    options: &PathOpeningOptions,
) -> Result<Image<T>, SegmentationError> {
    if !options.robust {
        return Ok(image.clone());
    }
    let se = StructuringElement::new(vec![2.0], SeShape::Rectangular);
    Ok(match options.polarity {
        FilterPolarity::Opening => dilation(image, &se, &[])?,
        FilterPolarity::Closing => erosion(image, &se, &[])?,
    })
}

fn robust_output<T: Pixel>(
    image: &Image<T>,
    out: Image<T>,
    options: &PathOpeningOptions,
) -> Result<Image<T>, SegmentationError> {
    if !options.robust {
        return Ok(out);
    }
    Ok(match options.polarity {
        FilterPolarity::Opening => ops::infimum(image, &out)?,
        FilterPolarity::Closing => ops::supremum(image, &out)?,
    })
}

/// The sorted interior offsets and the initial pixel flags.
fn prepare<T: Pixel>(
    input: &Image<T>,
    mask: Option<&Image<bool>>,
    polarity: FilterPolarity,
) -> (Vec<usize>, Vec<u8>) {
    let mut offsets = match mask {
        Some(mask) => build_offsets_masked(mask),
        None => build_offsets(input.sizes()),
    };
    // brighter pixels have their paths cut by darker ones for the opening
    let order = match polarity {
        FilterPolarity::Opening => FloodOrder::LowFirst,
        FilterPolarity::Closing => FloodOrder::HighFirst,
    };
    sort_offsets(&mut offsets, input.as_slice(), order);

    let border = border_flags(input.sizes());
    let flags = match mask {
        Some(mask) => mask
            .as_slice()
            .iter()
            .zip(&border)
            .map(|(&m, &b)| if m && !b { ACTIVE } else { 0 })
            .collect(),
        None => border.iter().map(|&b| if b { 0 } else { ACTIVE }).collect(),
    };
    (offsets, flags)
}

/// Path opening (or closing): remove the structures that do not hold a path of `length` pixels.
///
/// Paths are searched along every direction of the grid. A path in direction `d` steps from one
/// pixel to any neighbor in a cone around `d`. The results of all directions are combined with
/// the supremum (opening) or infimum (closing). The image border is never modified and counts as
/// part of any path touching it.
///
/// # Arguments
///
/// * `image` - The grey-value image, with at least 2 dimensions of at least 3 pixels.
/// * `mask` - Optional mask; pixels outside it are left unchanged.
/// * `length` - The path length, between 2 and `u16::MAX`.
/// * `options` - Polarity, constraint and robustness.
///
/// # Returns
///
/// The filtered image. If the mask selects no interior pixel, an image of zeros.
///
/// # Examples
///
/// ```
/// use ndmorph_image::Image;
/// use ndmorph_segmentation::{path_opening, PathOpeningOptions};
///
/// let mut image = Image::from_size_val(&[12, 5], 0u8);
/// for x in 2..5 {
///     *image.get_mut(&[x, 2]).unwrap() = 9;
/// }
/// let out = path_opening(&image, None, 3, &PathOpeningOptions::default()).unwrap();
/// assert_eq!(out, image);
/// let out = path_opening(&image, None, 4, &PathOpeningOptions::default()).unwrap();
/// assert!(out.as_slice().iter().all(|&v| v == 0));
/// ```
pub fn path_opening<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    length: usize,
    options: &PathOpeningOptions,
) -> Result<Image<T>, SegmentationError> {
    check_input(image, mask)?;
    let length = check_length(length)?;
    let input = robust_input(image, options)?;
    let (offsets, flags) = prepare(&input, mask, options.polarity);
    if offsets.is_empty() {
        return Ok(image.similar(T::zero()));
    }

    let mut out: Option<Image<T>> = None;
    for direction in path_directions(image.ndims()) {
        let neighbors = PathNeighbors::new(&direction, input.strides());
        let mut grey = input.clone();
        filter_direction(
            grey.as_slice_mut(),
            flags.clone(),
            &offsets,
            &neighbors,
            length,
            options.constraint,
        );
        log::trace!(
            "path {direction:?}: {} upstream neighbors, {} pixels changed",
            neighbors.up.len(),
            grey.as_slice()
                .iter()
                .zip(input.as_slice())
                .filter(|(a, b)| a != b)
                .count()
        );
        out = Some(match (out, options.polarity) {
            (None, _) => grey,
            (Some(acc), FilterPolarity::Opening) => ops::supremum(&acc, &grey)?,
            (Some(acc), FilterPolarity::Closing) => ops::infimum(&acc, &grey)?,
        });
    }
    let out = out.unwrap_or_else(|| input.clone());
    robust_output(image, out, options)
}

/// Path opening (or closing) along a single direction.
///
/// The length is the largest absolute component of `direction`, truncated, and the main step is
/// `direction / length`, rounded to the grid. Paths turn within the cone around that step.
///
/// # Arguments
///
/// * `image` - The grey-value image, with at least 2 dimensions of at least 3 pixels.
/// * `mask` - Optional mask; pixels outside it are left unchanged.
/// * `direction` - One component per dimension.
/// * `options` - Polarity, constraint and robustness.
///
/// # Returns
///
/// The filtered image; a copy of the input if the mask selects no interior pixel.
///
/// # Errors
///
/// Fails if the truncated length is below 2 or does not fit in 16 bits.
pub fn directed_path_opening<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    direction: &[f64],
    options: &PathOpeningOptions,
) -> Result<Image<T>, SegmentationError> {
    check_input(image, mask)?;
    if direction.len() != image.ndims() {
        return Err(ImageError::DimensionalityMismatch {
            expected: image.ndims(),
            actual: direction.len(),
        }
        .into());
    }
    // truncated toward zero
    let length = direction.iter().fold(0.0f64, |acc, p| acc.max(p.abs())) as usize;
    let length = check_length(length)?;
    let step = direction
        .iter()
        .map(|&p| (p / length as f64).round() as isize)
        .collect::<Vec<_>>();

    let input = robust_input(image, options)?;
    let (offsets, flags) = prepare(&input, mask, options.polarity);
    if offsets.is_empty() {
        return Ok(image.clone());
    }
    let neighbors = PathNeighbors::new(&step, input.strides());
    let mut out = input;
    filter_direction(
        out.as_slice_mut(),
        flags,
        &offsets,
        &neighbors,
        length,
        options.constraint,
    );
    log::trace!("directed path {step:?} of length {length}");
    robust_output(image, out, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(sizes: &[usize], row: usize, spans: &[(usize, usize)]) -> Image<u8> {
        let mut image = Image::from_size_val(sizes, 0u8);
        for &(start, end) in spans {
            for x in start..end {
                if let Some(v) = image.get_mut(&[x, row]) {
                    *v = 9;
                }
            }
        }
        image
    }

    #[test]
    fn test_directions() {
        assert_eq!(
            path_directions(2),
            vec![vec![1, -1], vec![1, 0], vec![0, 1], vec![1, 1]]
        );
        assert_eq!(path_directions(3).len(), 13);

        let neighbors = PathNeighbors::new(&[1, 0], &[1, 10]);
        assert_eq!(neighbors.up, vec![1, -9, 11]);
        assert_eq!(neighbors.down, vec![-1, 9, -11]);
        let neighbors = PathNeighbors::new(&[1, 1], &[1, 10]);
        assert_eq!(neighbors.up, vec![11, 1, 10]);
    }

    #[test]
    fn test_path_length_bounds() -> Result<(), SegmentationError> {
        let options = PathOpeningOptions::default();
        for len in [5, 6] {
            let image = segments(&[16, 7], 3, &[(2, 2 + len)]);
            assert_eq!(path_opening(&image, None, 5, &options)?, image);
        }
        let short = segments(&[16, 7], 3, &[(2, 6)]);
        let out = path_opening(&short, None, 5, &options)?;
        assert!(out.as_slice().iter().all(|&v| v == 0));

        let gapped = segments(&[16, 7], 3, &[(2, 5), (6, 9)]);
        let out = path_opening(&gapped, None, 5, &options)?;
        assert!(out.as_slice().iter().all(|&v| v == 0));
        Ok(())
    }

    #[test]
    fn test_constrained_and_robust() -> Result<(), SegmentationError> {
        let constrained = PathOpeningOptions {
            constraint: PathConstraint::Constrained,
            ..Default::default()
        };
        let image = segments(&[16, 7], 3, &[(2, 7)]);
        assert_eq!(path_opening(&image, None, 5, &constrained)?, image);
        let short = segments(&[16, 7], 3, &[(2, 6)]);
        let out = path_opening(&short, None, 5, &constrained)?;
        assert!(out.as_slice().iter().all(|&v| v == 0));

        // the dilation bridges the gap, the infimum restores it
        let robust = PathOpeningOptions {
            robust: true,
            ..Default::default()
        };
        let gapped = segments(&[16, 7], 3, &[(2, 5), (6, 9)]);
        assert_eq!(path_opening(&gapped, None, 5, &robust)?, gapped);
        Ok(())
    }

    #[test]
    fn test_directed_path_opening() -> Result<(), SegmentationError> {
        let options = PathOpeningOptions::default();
        let mut image = segments(&[12, 12], 2, &[(2, 7)]);
        for y in 4..9 {
            if let Some(v) = image.get_mut(&[9, y]) {
                *v = 9;
            }
        }
        let out = directed_path_opening(&image, None, &[5.0, 0.0], &options)?;
        assert_eq!(out.get(&[4, 2]), Some(&9));
        assert_eq!(out.get(&[9, 6]), Some(&0));
        let out = directed_path_opening(&image, None, &[0.0, -5.0], &options)?;
        assert_eq!(out.get(&[4, 2]), Some(&0));
        assert_eq!(out.get(&[9, 6]), Some(&9));

        assert!(matches!(
            directed_path_opening(&image, None, &[1.0, 0.0], &options),
            Err(SegmentationError::ParameterOutOfRange { name: "length", .. })
        ));
        // 2.9 truncates to 2, 1.9 to 1
        assert!(directed_path_opening(&image, None, &[2.9, 0.0], &options).is_ok());
        assert!(directed_path_opening(&image, None, &[-1.9, 1.9], &options).is_err());
        assert!(directed_path_opening(&image, None, &[5.0], &options).is_err());
        Ok(())
    }

    #[test]
    fn test_preconditions() -> Result<(), SegmentationError> {
        let options = PathOpeningOptions::default();
        let flat = Image::from_size_val(&[10], 1u8);
        assert!(path_opening(&flat, None, 3, &options).is_err());
        let thin = Image::from_size_val(&[10, 2], 1u8);
        assert!(path_opening(&thin, None, 3, &options).is_err());
        let image = Image::from_size_val(&[10, 10], 1u8);
        assert!(path_opening(&image, None, 1, &options).is_err());
        assert!(path_opening(&image, None, 70000, &options).is_err());

        let empty = image.similar(false);
        let out = path_opening(&image, Some(&empty), 3, &options)?;
        assert!(out.as_slice().iter().all(|&v| v == 0));
        assert_eq!(
            "constrained".parse::<PathConstraint>()?,
            PathConstraint::Constrained
        );
        Ok(())
    }
}
