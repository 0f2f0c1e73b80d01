use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndmorph_image::{error::check_sizes, Image, NeighborList, Pixel};

use crate::error::SegmentationError;
use crate::extrema::{maxima, minima};
use crate::label::label_binary;
use crate::offsets::{border_flags, interior_offsets, shift, sort_offsets, NeighborLabels};
use crate::types::{FloodOrder, OutputKind, SegmentationImage};
use crate::union_find::{UnionFind, MAX_LABEL};

/// Label of the pixels on a watershed line, or outside the mask.
pub const WATERSHED_LABEL: u32 = u32::MAX;
/// Marks unlabelled pixels on the image border, whose neighbors need a bounds check.
pub const IMAGE_BORDER: u32 = u32::MAX - 1;
/// Marks pixels waiting in the priority queue.
pub const PIXEL_ON_STACK: u32 = u32::MAX - 2;

/// Options shared by the watershed functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatershedOptions {
    /// The neighborhood, between 1 and the dimensionality.
    pub connectivity: usize,
    /// Regions shallower than this are merged into their neighbors. Negative values act as 0.
    pub max_depth: f64,
    /// Regions with at most this many pixels are merged into their neighbors; 0 disables the
    /// size criterion.
    pub max_size: usize,
    /// Flood from the minima or from the maxima.
    pub order: FloodOrder,
    /// Produce watershed lines or labelled regions.
    pub output: OutputKind,
    /// Assign contested pixels to a region instead of leaving a watershed line. Implies labels
    /// output. Seeded variants only.
    pub no_gaps: bool,
    /// Only grow regions uphill from their seeds. Seeded watershed only.
    pub uphill_only: bool,
}

impl Default for WatershedOptions {
    fn default() -> Self {
        Self {
            connectivity: 1,
            max_depth: 0.0,
            max_size: 0,
            order: FloodOrder::LowFirst,
            output: OutputKind::Binary,
            no_gaps: false,
            uphill_only: false,
        }
    }
}

/// The seeds of a seeded watershed: a label image, or a binary image whose connected components
/// become the seeds.
#[derive(Debug, Clone, Copy)]
pub enum Seeds<'a> {
    /// Seed labels; 0 is unlabelled.
    Labels(&'a Image<u32>),
    /// Binary seeds, labelled with the watershed connectivity.
    Binary(&'a Image<bool>),
}

impl<'a> From<&'a Image<u32>> for Seeds<'a> {
    fn from(image: &'a Image<u32>) -> Self {
        Seeds::Labels(image)
    }
}

impl<'a> From<&'a Image<bool>> for Seeds<'a> {
    fn from(image: &'a Image<bool>) -> Self {
        Seeds::Binary(image)
    }
}

impl Seeds<'_> {
    fn sizes(&self) -> &[usize] {
        match self {
            Seeds::Labels(image) => image.sizes(),
            Seeds::Binary(image) => image.sizes(),
        }
    }
}

/// What the fast flooding reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FloodMode {
    Watershed,
    Extrema,
}

/// A catchment basin: its number of pixels and its most extreme value.
#[derive(Debug, Clone, Copy, Default)]
struct Basin<T> {
    size: usize,
    lowest: T,
}

impl<T: Pixel> Basin<T> {
    fn new(value: T) -> Self {
        Self {
            size: 1,
            lowest: value,
        }
    }

    fn add_pixel(&mut self, value: T, order: FloodOrder) {
        self.size += 1;
        if order.precedes(value, self.lowest) {
            self.lowest = value;
        }
    }

    /// Whether the basin is too shallow or too small to stand on its own at `value`.
    fn is_mergeable(&self, value: T, max_depth: f64, max_size: usize) -> bool {
        (value.to_f64() - self.lowest.to_f64()).abs() <= max_depth
            && (max_size == 0 || self.size <= max_size)
    }
}

fn merge_basins<T: Pixel>(order: FloodOrder) -> impl Fn(&Basin<T>, &Basin<T>) -> Basin<T> {
    move |a, b| Basin {
        size: a.size + b.size,
        lowest: match order {
            FloodOrder::LowFirst => a.lowest.inf(b.lowest),
            FloodOrder::HighFirst => a.lowest.sup(b.lowest),
        },
    }
}

#[inline]
fn is_valid_label(label: u32) -> bool {
    label > 0 && label <= MAX_LABEL
}

/// An entry of the flooding queue.
///
/// The queue pops the item flooded first; among equal values the smaller rank wins. The rank is
/// the insertion order for the seeded watershed and the distance to the seed for the compact one.
#[derive(Debug, Clone, Copy)]
struct QueueItem<V> {
    value: V,
    rank: u64,
    offset: usize,
    on_edge: bool,
    order: FloodOrder,
}

impl<V: PartialOrd> PartialEq for QueueItem<V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<V: PartialOrd> Eq for QueueItem<V> {}

impl<V: PartialOrd> PartialOrd for QueueItem<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V: PartialOrd> Ord for QueueItem<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest item
        let by_value = match self.order {
            FloodOrder::LowFirst => other.value.partial_cmp(&self.value),
            FloodOrder::HighFirst => self.value.partial_cmp(&other.value),
        };
        by_value
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.rank.cmp(&self.rank))
    }
}

fn check_image<T>(image: &Image<T>, min_size: usize) -> Result<(), SegmentationError> {
    if image.ndims() < 1 {
        return Err(SegmentationError::DimensionalityNotSupported {
            required: 1,
            actual: 0,
        });
    }
    if image.sizes().iter().any(|&s| s < min_size) {
        return Err(SegmentationError::ImageTooSmall {
            min: min_size,
            sizes: image.sizes().to_vec(),
        });
    }
    Ok(())
}

/// Flood the sorted interior pixels, merging basins that fail the depth and size criteria.
pub(crate) fn fast_flood<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    options: &WatershedOptions,
    mode: FloodMode,
) -> Result<SegmentationImage, SegmentationError> {
    check_image(image, 3)?;
    let neighbors = NeighborList::new(options.connectivity, image.ndims())?;
    let max_depth = options.max_depth.max(0.0);
    let order = options.order;

    let data = image.as_slice();
    let mut offsets = interior_offsets(image.sizes(), mask)?;
    sort_offsets(&mut offsets, data, order);

    let mut labels = image.similar(0u32);
    if offsets.is_empty() {
        return Ok(match options.output {
            OutputKind::Binary => SegmentationImage::Binary(image.similar(false)),
            OutputKind::Labels => SegmentationImage::Labels(labels),
        });
    }

    let neighbor_offsets = neighbors.offsets(image.strides());
    let mut regions = UnionFind::new(merge_basins(order));
    let mut neighbor_labels = NeighborLabels::with_capacity(neighbor_offsets.len());

    let lab = labels.as_slice_mut();
    lab[offsets[0]] = regions.create(Basin::new(data[offsets[0]]))?;
    for &offset in &offsets[1..] {
        let value = data[offset];
        if order.is_last(value) {
            break;
        }
        neighbor_labels.reset();
        for &o in &neighbor_offsets {
            neighbor_labels.push(regions.find_root(lab[shift(offset, o)]));
        }
        match neighbor_labels.as_slice() {
            [] => lab[offset] = regions.create(Basin::new(value))?,
            [single] => {
                lab[offset] = *single;
                regions.value_mut(*single).size += 1;
            }
            [first, rest @ ..] => {
                let mut real = 0;
                for &l in neighbor_labels.as_slice() {
                    if !regions.value(l).is_mergeable(value, max_depth, options.max_size) {
                        real += 1;
                    }
                }
                // two or more real basins meet here: leave a watershed pixel
                if real <= 1 {
                    for &l in rest {
                        regions.union(*first, l);
                    }
                    lab[offset] = *first;
                    regions.value_mut(*first).size += 1;
                }
            }
        }
    }
    log::debug!(
        "fast watershed flooded {} pixels into {} basins",
        offsets.len(),
        regions.len()
    );

    Ok(match (mode, options.output) {
        (FloodMode::Watershed, OutputKind::Binary) => {
            SegmentationImage::Binary(labels.map(|&l| l == 0))
        }
        (FloodMode::Watershed, OutputKind::Labels) => {
            regions.relabel();
            for l in labels.as_slice_mut().iter_mut().filter(|l| **l > 0) {
                *l = regions.label(*l);
            }
            SegmentationImage::Labels(labels)
        }
        (FloodMode::Extrema, OutputKind::Binary) => {
            let mut out = image.similar(false);
            for ((o, &l), &v) in out.as_slice_mut().iter_mut().zip(labels.as_slice()).zip(data) {
                *o = l > 0 && v == regions.value(l).lowest;
            }
            SegmentationImage::Binary(out)
        }
        (FloodMode::Extrema, OutputKind::Labels) => {
            regions.relabel();
            for (l, &v) in labels.as_slice_mut().iter_mut().zip(data) {
                if *l > 0 {
                    *l = if v == regions.value(*l).lowest {
                        regions.label(*l)
                    } else {
                        0
                    };
                }
            }
            SegmentationImage::Labels(labels)
        }
    })
}

/// Fast watershed by sorted flooding.
///
/// Pixels are visited once, in order of grey value, skipping the 1-pixel image border. A pixel
/// touching two or more basins that are deeper than `max_depth` (and larger than `max_size`, if
/// nonzero) becomes a watershed pixel; otherwise the basins merge. The flooding stops at the
/// first infinite value.
///
/// # Arguments
///
/// * `image` - The grey-value image; every dimension must be at least 3 pixels.
/// * `mask` - Optional mask restricting the flooded pixels.
/// * `options` - The connectivity, merging criteria, flooding order and output kind.
///
/// # Returns
///
/// With binary output, the watershed lines (the image border and pixels outside the mask are
/// set too). With labels output, the densely labelled basins.
///
/// # Errors
///
/// Fails on images smaller than 3 pixels in any dimension, an invalid connectivity or a mask of
/// different sizes.
pub fn fast_watershed<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    options: &WatershedOptions,
) -> Result<SegmentationImage, SegmentationError> {
    fast_flood(image, mask, options, FloodMode::Watershed)
}

/// Turn the seeds into the initial label buffer, marking pixels outside the mask as watershed
/// pixels and unlabelled border pixels as such. Returns the buffer and the number of seeds.
fn seed_labels<T>(
    image: &Image<T>,
    seeds: Seeds<'_>,
    mask: Option<&Image<bool>>,
    connectivity: usize,
) -> Result<(Image<u32>, u32), SegmentationError> {
    check_sizes(image.sizes(), seeds.sizes())?;
    if let Some(mask) = mask {
        check_sizes(image.sizes(), mask.sizes())?;
    }
    let (mut labels, numlabs) = match seeds {
        Seeds::Binary(binary) => {
            let (labels, count) = label_binary(binary, connectivity)?;
            (labels, u32::try_from(count).unwrap_or(u32::MAX))
        }
        Seeds::Labels(seeds) => {
            let max = match mask {
                Some(mask) => seeds
                    .as_slice()
                    .iter()
                    .zip(mask.as_slice())
                    .filter(|(_, &m)| m)
                    .map(|(&s, _)| s)
                    .max(),
                None => seeds.as_slice().iter().copied().max(),
            };
            (seeds.clone(), max.unwrap_or(0))
        }
    };
    if numlabs > MAX_LABEL {
        return Err(SegmentationError::TooManySeeds(numlabs));
    }
    if let Some(mask) = mask {
        for (l, &m) in labels.as_slice_mut().iter_mut().zip(mask.as_slice()) {
            if !m {
                *l = WATERSHED_LABEL;
            }
        }
    }
    for (l, on_border) in labels.as_slice_mut().iter_mut().zip(border_flags(image.sizes())) {
        if on_border && *l == 0 {
            *l = IMAGE_BORDER;
        }
    }
    Ok((labels, numlabs))
}

/// The neighbors of a pixel that can be looked at: inside the image and not a watershed pixel.
struct Neighborhood<'a> {
    list: &'a NeighborList,
    offsets: Vec<isize>,
    sizes: Vec<usize>,
    usable: Vec<bool>,
}

impl<'a> Neighborhood<'a> {
    fn new<T>(list: &'a NeighborList, image: &Image<T>) -> Self {
        Self {
            list,
            offsets: list.offsets(image.strides()),
            sizes: image.sizes().to_vec(),
            usable: vec![false; list.len()],
        }
    }

    /// The offset of neighbor `k` of `offset`, if it lies inside the image.
    #[inline]
    fn neighbor(&self, k: usize, offset: usize, coords: Option<&[usize]>) -> Option<usize> {
        match coords {
            Some(coords) if !self.list.is_in_image(k, coords, &self.sizes) => None,
            _ => Some(shift(offset, self.offsets[k])),
        }
    }

    /// Whether some neighbor carries a seed label and, if `uphill` is given, passes that test
    /// against the pixel value.
    fn has_labelled_neighbor<T: Pixel>(
        &self,
        offset: usize,
        coords: Option<&[usize]>,
        labels: &[u32],
        grey: &[T],
        uphill: Option<FloodOrder>,
    ) -> bool {
        (0..self.offsets.len()).any(|k| {
            self.neighbor(k, offset, coords).is_some_and(|n| {
                is_valid_label(labels[n])
                    && uphill.map_or(true, |order| order.precedes(grey[n], grey[offset]))
            })
        })
    }

    /// Refresh the usable flags for `offset` and collect the labels found around it.
    fn collect(
        &mut self,
        offset: usize,
        coords: Option<&[usize]>,
        labels: &[u32],
        mut root: impl FnMut(u32) -> u32,
        found: &mut NeighborLabels,
    ) {
        found.reset();
        for k in 0..self.offsets.len() {
            let n = self.neighbor(k, offset, coords);
            self.usable[k] = n.is_some_and(|n| labels[n] != WATERSHED_LABEL);
            if let Some(n) = n {
                if self.usable[k] && is_valid_label(labels[n]) {
                    found.push(root(labels[n]));
                }
            }
        }
    }

    /// The label of the usable neighbor flooded first, for the no-gaps rule.
    fn best_label<T: Pixel>(
        &self,
        offset: usize,
        labels: &[u32],
        grey: &[T],
        order: FloodOrder,
    ) -> Option<u32> {
        let mut best: Option<(T, u32)> = None;
        for (k, &o) in self.offsets.iter().enumerate() {
            if !self.usable[k] {
                continue;
            }
            let n = shift(offset, o);
            if !is_valid_label(labels[n]) {
                continue;
            }
            if best.map_or(true, |(v, _)| order.precedes(grey[n], v)) {
                best = Some((grey[n], labels[n]));
            }
        }
        best.map(|(_, l)| l)
    }
}

/// The flooding queue with its insertion counter.
struct FloodQueue<V> {
    heap: BinaryHeap<QueueItem<V>>,
    counter: u64,
    order: FloodOrder,
}

impl<V: PartialOrd> FloodQueue<V> {
    fn new(order: FloodOrder) -> Self {
        Self {
            heap: BinaryHeap::new(),
            counter: 0,
            order,
        }
    }

    /// Push in insertion order.
    fn push(&mut self, value: V, offset: usize, on_edge: bool) {
        let rank = self.counter;
        self.counter += 1;
        self.push_ranked(value, rank, offset, on_edge);
    }

    fn push_ranked(&mut self, value: V, rank: u64, offset: usize, on_edge: bool) {
        self.heap.push(QueueItem {
            value,
            rank,
            offset,
            on_edge,
            order: self.order,
        });
    }

    fn pop(&mut self) -> Option<QueueItem<V>> {
        self.heap.pop()
    }
}

/// Watershed grown from seeds with a priority queue.
///
/// Pixels adjacent to a seed enter the queue first; the queue pops the lowest value (highest for
/// high-first flooding), and equal values in insertion order. A pixel reached by two basins that
/// are both deeper than `max_depth` (and larger than `max_size`, if nonzero) becomes a watershed
/// pixel, unless `no_gaps` is set, in which case it joins the basin of its lowest neighbor.
///
/// # Arguments
///
/// * `image` - The grey-value image.
/// * `seeds` - Seed labels, or a binary image whose components are the seeds.
/// * `mask` - Optional mask; pixels outside it are never flooded.
/// * `options` - The connectivity, merging criteria, flooding order, output kind and flags.
///
/// # Returns
///
/// The watershed lines or, with labels output or `no_gaps`, the basins labelled by the root seed
/// label of each basin.
///
/// # Errors
///
/// Fails if the sizes disagree, the connectivity is invalid, or the seed labels collide with the
/// reserved marker values.
pub fn seeded_watershed<'a, T: Pixel>(
    image: &Image<T>,
    seeds: impl Into<Seeds<'a>>,
    mask: Option<&Image<bool>>,
    options: &WatershedOptions,
) -> Result<SegmentationImage, SegmentationError> {
    check_image(image, 1)?;
    let list = NeighborList::new(options.connectivity, image.ndims())?;
    let (mut labels, numlabs) = seed_labels(image, seeds.into(), mask, options.connectivity)?;
    let order = options.order;
    let output = if options.no_gaps {
        OutputKind::Labels
    } else {
        options.output
    };

    let identity = match order {
        FloodOrder::LowFirst => T::max_value(),
        FloodOrder::HighFirst => T::min_value(),
    };
    let mut regions = UnionFind::with_regions(
        numlabs,
        Basin {
            size: 0,
            lowest: identity,
        },
        merge_basins(order),
    );
    let mut neighborhood = Neighborhood::new(&list, image);
    let mut queue = FloodQueue::new(order);
    let grey = image.as_slice();
    let uphill = options.uphill_only.then_some(order);

    let lab = labels.as_slice_mut();
    for i in 0..lab.len() {
        let label = lab[i];
        let on_edge = label == IMAGE_BORDER;
        if label == 0 || on_edge {
            let coords = on_edge.then(|| image.coords(i));
            if neighborhood.has_labelled_neighbor(i, coords.as_deref(), lab, grey, uphill) {
                queue.push(grey[i], i, on_edge);
                lab[i] = PIXEL_ON_STACK;
            }
        } else if label <= numlabs {
            regions.value_mut(label).add_pixel(grey[i], order);
        }
    }

    let mut found = NeighborLabels::with_capacity(list.len());
    while let Some(item) = queue.pop() {
        let offset = item.offset;
        if order.is_last(grey[offset]) {
            break;
        }
        let coords = item.on_edge.then(|| image.coords(offset));
        neighborhood.collect(
            offset,
            coords.as_deref(),
            lab,
            |l| regions.find_root(l),
            &mut found,
        );
        let value = grey[offset];
        let assigned = match found.as_slice() {
            [] => {
                lab[offset] = 0;
                None
            }
            [single] => Some(*single),
            [first, rest @ ..] => {
                let mut real = 0;
                for &l in found.as_slice() {
                    if !regions.value(l).is_mergeable(value, options.max_depth, options.max_size)
                    {
                        real += 1;
                    }
                }
                if real < 2 {
                    let mut root = *first;
                    for &l in rest {
                        root = regions.union(root, l);
                    }
                    Some(root)
                } else if options.no_gaps {
                    neighborhood
                        .best_label(offset, lab, grey, order)
                        .map(|l| regions.find_root(l))
                } else {
                    None
                }
            }
        };
        match assigned {
            Some(label) => {
                lab[offset] = label;
                regions.value_mut(label).add_pixel(value, order);
                enqueue_neighbors(&neighborhood, offset, lab, grey, &mut queue, uphill);
            }
            None if found.len() >= 2 => lab[offset] = WATERSHED_LABEL,
            None => {}
        }
    }
    log::debug!("seeded watershed grew {numlabs} seeds");

    Ok(match output {
        OutputKind::Binary => SegmentationImage::Binary(labels.map(|&l| l == WATERSHED_LABEL)),
        OutputKind::Labels => {
            for l in labels.as_slice_mut() {
                *l = if *l > MAX_LABEL {
                    0
                } else if *l > 0 {
                    regions.find_root(*l)
                } else {
                    0
                };
            }
            SegmentationImage::Labels(labels)
        }
    })
}

fn enqueue_neighbors<T: Pixel>(
    neighborhood: &Neighborhood<'_>,
    offset: usize,
    labels: &mut [u32],
    grey: &[T],
    queue: &mut FloodQueue<T>,
    uphill: Option<FloodOrder>,
) {
    for (k, &o) in neighborhood.offsets.iter().enumerate() {
        if !neighborhood.usable[k] {
            continue;
        }
        let n = shift(offset, o);
        let label = labels[n];
        if label != 0 && label != IMAGE_BORDER {
            continue;
        }
        if uphill.map_or(true, |order| order.precedes(grey[offset], grey[n])) {
            queue.push(grey[n], n, label == IMAGE_BORDER);
            labels[n] = PIXEL_ON_STACK;
        }
    }
}

/// Compact watershed: a seeded watershed whose priority adds `compactness` times the distance
/// to the seed to the grey value.
///
/// Basins never merge. Pixels where two basins meet become watershed pixels unless `no_gaps` is
/// set. Only `connectivity`, `order`, `output` and `no_gaps` of the options are used. The sign of
/// `compactness` is ignored.
///
/// # Errors
///
/// Same as [`seeded_watershed`].
pub fn compact_watershed<'a, T: Pixel>(
    image: &Image<T>,
    seeds: impl Into<Seeds<'a>>,
    mask: Option<&Image<bool>>,
    compactness: f64,
    options: &WatershedOptions,
) -> Result<SegmentationImage, SegmentationError> {
    check_image(image, 1)?;
    let list = NeighborList::new(options.connectivity, image.ndims())?;
    let (mut labels, numlabs) = seed_labels(image, seeds.into(), mask, options.connectivity)?;
    let order = options.order;
    let output = if options.no_gaps {
        OutputKind::Labels
    } else {
        options.output
    };
    // subtracting the distance floods high-first images the same way
    let compactness = match order {
        FloodOrder::LowFirst => compactness.abs(),
        FloodOrder::HighFirst => -compactness.abs(),
    };

    let mut neighborhood = Neighborhood::new(&list, image);
    let mut queue = FloodQueue::<f64>::new(order);
    let grey = image.as_slice();

    let lab = labels.as_slice_mut();
    for i in 0..lab.len() {
        let on_edge = lab[i] == IMAGE_BORDER;
        if lab[i] == 0 || on_edge {
            let coords = on_edge.then(|| image.coords(i));
            if neighborhood.has_labelled_neighbor(i, coords.as_deref(), lab, grey, None) {
                queue.push_ranked(grey[i].to_f64(), 0, i, on_edge);
                lab[i] = PIXEL_ON_STACK;
            }
        }
    }

    let mut found = NeighborLabels::with_capacity(list.len());
    while let Some(item) = queue.pop() {
        let offset = item.offset;
        if order.is_last(grey[offset]) {
            break;
        }
        let distance = item.rank + 1;
        let coords = item.on_edge.then(|| image.coords(offset));
        neighborhood.collect(offset, coords.as_deref(), lab, |l| l, &mut found);
        let assigned = match found.as_slice() {
            [] => {
                lab[offset] = 0;
                continue;
            }
            [single] => Some(*single),
            _ if options.no_gaps => neighborhood.best_label(offset, lab, grey, order),
            _ => None,
        };
        let Some(label) = assigned else {
            lab[offset] = WATERSHED_LABEL;
            continue;
        };
        lab[offset] = label;
        for (k, &o) in neighborhood.offsets.iter().enumerate() {
            if !neighborhood.usable[k] {
                continue;
            }
            let n = shift(offset, o);
            if lab[n] == 0 || lab[n] == IMAGE_BORDER {
                let value = grey[n].to_f64() + compactness * distance as f64;
                queue.push_ranked(value, distance, n, lab[n] == IMAGE_BORDER);
                lab[n] = PIXEL_ON_STACK;
            }
        }
    }
    log::debug!("compact watershed grew {numlabs} seeds");

    Ok(match output {
        OutputKind::Binary => SegmentationImage::Binary(labels.map(|&l| l == WATERSHED_LABEL)),
        OutputKind::Labels => {
            for l in labels.as_slice_mut().iter_mut().filter(|l| **l > MAX_LABEL) {
                *l = 0;
            }
            SegmentationImage::Labels(labels)
        }
    })
}

/// Watershed segmentation.
///
/// With `correct == false` this is [`fast_watershed`]. Otherwise the regional minima (maxima for
/// high-first flooding) seed a [`seeded_watershed`], which places the lines exactly between
/// basins at the cost of speed.
///
/// # Errors
///
/// See [`fast_watershed`] and [`seeded_watershed`].
pub fn watershed<T: Pixel>(
    image: &Image<T>,
    mask: Option<&Image<bool>>,
    options: &WatershedOptions,
    correct: bool,
) -> Result<SegmentationImage, SegmentationError> {
    if !correct {
        return fast_watershed(image, mask, options);
    }
    let seeds = match options.order {
        FloodOrder::LowFirst => minima(image, None, options.connectivity, OutputKind::Labels)?,
        FloodOrder::HighFirst => maxima(image, None, options.connectivity, OutputKind::Labels)?,
    }
    .into_labels();
    seeded_watershed(image, &seeds, mask, options)
}
