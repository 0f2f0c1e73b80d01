//! Morphology with arbitrary neighborhoods, stored as runs along the first image dimension.

use ndmorph_image::{boundary::boundary_array, BoundaryCondition, Image, Pixel};

use crate::error::MorphologyError;
use crate::kernel::Kernel;
use crate::operation::Polarity;
use crate::parallel::{execute_chunks_with, ExecutionStrategy};

/// A horizontal run of neighborhood pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelRun {
    /// The coordinates of the first pixel of the run, relative to the origin.
    pub coords: Vec<isize>,
    /// The number of consecutive pixels along dimension 0.
    pub length: usize,
}

/// A neighborhood encoded as runs along dimension 0.
///
/// The weights of a grey-weighted neighborhood are stored per pixel, in run order.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelTable {
    runs: Vec<PixelRun>,
    weights: Option<Vec<f64>>,
    ndims: usize,
}

impl PixelTable {
    /// Build the run table of a kernel.
    ///
    /// # Errors
    ///
    /// Fails on an empty kernel.
    pub fn from_kernel(kernel: &Kernel) -> Result<Self, MorphologyError> {
        if kernel.is_empty() {
            return Err(MorphologyError::EmptyKernel);
        }
        let mut pixels = kernel
            .coords()
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), kernel.weights().map(|w| w[i])))
            .collect::<Vec<_>>();
        // group pixels of the same row, in increasing x
        pixels.sort_by(|a, b| a.0.iter().rev().cmp(b.0.iter().rev()));
        pixels.dedup_by(|a, b| a.0 == b.0);

        let mut runs: Vec<PixelRun> = Vec::new();
        for (c, _) in &pixels {
            match runs.last_mut() {
                Some(run)
                    if run.coords[1..] == c[1..]
                        && run.coords[0] + run.length as isize == c[0] =>
                {
                    run.length += 1
                }
                _ => runs.push(PixelRun {
                    coords: c.clone(),
                    length: 1,
                }),
            }
        }
        let weights = kernel
            .has_weights()
            .then(|| pixels.iter().map(|(_, w)| w.unwrap_or(0.0)).collect());
        Ok(Self {
            runs,
            weights,
            ndims: kernel.ndims(),
        })
    }

    /// The runs.
    pub fn runs(&self) -> &[PixelRun] {
        &self.runs
    }

    /// The per-pixel weights, if grey-weighted.
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// The number of pixels.
    pub fn num_pixels(&self) -> usize {
        self.runs.iter().map(|r| r.length).sum()
    }

    /// The dimensionality.
    pub fn ndims(&self) -> usize {
        self.ndims
    }

    /// The largest distance from the origin per dimension.
    pub fn border(&self) -> Vec<usize> {
        let mut border = vec![0usize; self.ndims];
        for run in &self.runs {
            for (d, &c) in run.coords.iter().enumerate() {
                let reach = if d == 0 {
                    c.unsigned_abs().max((c + run.length as isize - 1).unsigned_abs())
                } else {
                    c.unsigned_abs()
                };
                border[d] = border[d].max(reach);
            }
        }
        border
    }
}

/// Dilation or erosion with an arbitrary kernel.
///
/// The image is extended by the kernel reach using `bcs`, or with the value that never wins if
/// `bcs` is empty. Image lines along dimension 0 are processed in parallel. Flat kernels update
/// the running extremum incrementally, re-scanning the neighborhood only when the extremum leaves
/// it. Grey-weighted kernels add (dilation) or subtract (erosion) each weight and saturate to the
/// pixel type.
///
/// # Errors
///
/// Fails on an empty kernel or one with more dimensions than the image.
pub fn pixel_table_morphology<T: Pixel>(
    image: &Image<T>,
    kernel: &Kernel,
    polarity: Polarity,
    bcs: &[BoundaryCondition],
    strategy: ExecutionStrategy,
) -> Result<Image<T>, MorphologyError> {
    let ndims = image.ndims();
    if image.is_empty() || ndims == 0 {
        return Ok(image.clone());
    }
    let kernel = kernel.clone().expand_dims(ndims)?;
    let table = PixelTable::from_kernel(&kernel)?;
    let border = table.border();

    let bcs = boundary_array(bcs, ndims)?;
    let ignore_outside = bcs.is_empty();
    let bcs = if ignore_outside {
        vec![polarity.identity_boundary()]
    } else {
        bcs
    };
    let extended = image.extend(&border, &bcs)?;
    let strides = extended.strides().to_vec();
    let position = |coords: &[isize]| -> isize {
        coords.iter().zip(&strides).map(|(&c, &s)| c * s).sum()
    };

    let width = image.sizes()[0];
    let mut out = image.clone();
    log::debug!(
        "pixel table {polarity:?} with {} runs, {} pixels",
        table.runs().len(),
        table.num_pixels()
    );

    match table.weights() {
        None => {
            let runs = table
                .runs()
                .iter()
                .map(|r| (position(&r.coords), r.length))
                .collect::<Vec<_>>();
            let ext = extended.as_slice();
            execute_chunks_with(strategy, out.as_slice_mut(), width, || (), |_, row, line| {
                let base = row_base(image, &border, &strides, row * width);
                flat_row(ext, base, &runs, polarity, line);
            })?;
        }
        Some(weights) => {
            let pixels = table
                .runs()
                .iter()
                .flat_map(|r| {
                    let start = position(&r.coords);
                    (0..r.length as isize).map(move |k| start + k)
                })
                .zip(weights.iter().copied())
                .collect::<Vec<_>>();
            // integer type limits shifted by a weight would win, so pad in f64 instead
            let extended = if ignore_outside {
                image.cast::<f64>().extend(&border, &bcs)?
            } else {
                extended.cast::<f64>()
            };
            let ext = extended.as_slice();
            execute_chunks_with(strategy, out.as_slice_mut(), width, || (), |_, row, line| {
                let base = row_base(image, &border, &strides, row * width);
                grey_row(ext, base, &pixels, polarity, line);
            })?;
        }
    }
    Ok(out)
}

/// The offset in the extended image of the first pixel of the image line starting at `start`.
fn row_base<T: Pixel>(
    image: &Image<T>,
    border: &[usize],
    strides: &[isize],
    start: usize,
) -> isize {
    image
        .coords(start)
        .iter()
        .zip(border)
        .zip(strides)
        .map(|((&c, &b), &s)| (c + b) as isize * s)
        .sum()
}

fn flat_row<T: Pixel>(
    ext: &[T],
    base: isize,
    runs: &[(isize, usize)],
    polarity: Polarity,
    line: &mut [T],
) {
    let mut current = polarity.identity::<T>();
    // how many more steps the current extremum stays inside the neighborhood
    let mut remaining: isize = -1;
    for (x, o) in line.iter_mut().enumerate() {
        let pos = base + x as isize;
        if remaining >= 0 {
            for &(offset, length) in runs {
                let last = length as isize - 1;
                let v = ext[(pos + offset + last) as usize];
                if polarity.better(v, current) {
                    current = v;
                    remaining = last;
                } else if v == current {
                    remaining = remaining.max(last);
                }
            }
        } else {
            current = polarity.identity();
            for &(offset, length) in runs {
                for j in 0..length as isize {
                    let v = ext[(pos + offset + j) as usize];
                    if polarity.better(v, current) {
                        current = v;
                        remaining = j;
                    } else if v == current {
                        remaining = remaining.max(j);
                    }
                }
            }
        }
        *o = current;
        remaining -= 1;
    }
}

fn grey_row<T: Pixel>(
    ext: &[f64],
    base: isize,
    pixels: &[(isize, f64)],
    polarity: Polarity,
    line: &mut [T],
) {
    for (x, o) in line.iter_mut().enumerate() {
        let pos = base + x as isize;
        let mut current = polarity.identity::<T>();
        for &(offset, weight) in pixels {
            let v = ext[(pos + offset) as usize];
            let v = match polarity {
                Polarity::Dilation => T::clamp_from_f64(v + weight),
                Polarity::Erosion => T::clamp_from_f64(v - weight),
            };
            current = polarity.pick(current, v);
        }
        *o = current;
    }
}
