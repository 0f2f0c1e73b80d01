//! Running extremum filters over one image line.

use ndmorph_image::{boundary::expand_line, BoundaryCondition, Pixel};

use crate::config::BRUTE_FORCE_MAX_LENGTH;
use crate::operation::Polarity;

/// A flat one-dimensional window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFilter {
    /// Two contiguous samples.
    BruteForce2,
    /// Three contiguous samples.
    BruteForce3,
    /// A contiguous window of any length, using the Van Herk/Gil-Werman recursion.
    VanHerk {
        /// The window length.
        length: usize,
    },
    /// `points` samples spaced `step` apart.
    Periodic {
        /// The number of samples in the window.
        points: usize,
        /// The distance between samples.
        step: usize,
    },
}

impl LineFilter {
    /// The cheapest filter for a contiguous window of `length` samples.
    pub fn contiguous(length: usize) -> Self {
        match length {
            2 if BRUTE_FORCE_MAX_LENGTH >= 2 => LineFilter::BruteForce2,
            3 if BRUTE_FORCE_MAX_LENGTH >= 3 => LineFilter::BruteForce3,
            _ => LineFilter::VanHerk {
                length: length.max(1),
            },
        }
    }

    /// A window of `points` samples spaced `step` apart.
    pub fn periodic(points: usize, step: usize) -> Self {
        if step <= 1 {
            Self::contiguous(points)
        } else {
            LineFilter::Periodic {
                points: points.max(1),
                step,
            }
        }
    }

    /// The number of samples in the window.
    pub fn points(&self) -> usize {
        match *self {
            LineFilter::BruteForce2 => 2,
            LineFilter::BruteForce3 => 3,
            LineFilter::VanHerk { length } => length,
            LineFilter::Periodic { points, .. } => points,
        }
    }

    /// The distance between consecutive samples.
    pub fn step(&self) -> usize {
        match *self {
            LineFilter::Periodic { step, .. } => step,
            _ => 1,
        }
    }

    /// The number of samples the window reaches to the left and to the right of its origin.
    ///
    /// The origin sits at sample `points / 2`; mirroring swaps the two reaches.
    pub fn margins(&self, mirror: bool) -> (usize, usize) {
        let (points, step) = (self.points(), self.step());
        let left = (points / 2) * step;
        let right = ((points - 1) / 2) * step;
        if mirror {
            (right, left)
        } else {
            (left, right)
        }
    }
}

/// What a line pass computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOperation {
    /// A single dilation or erosion.
    Extremum {
        /// Maximum or minimum.
        polarity: Polarity,
        /// Whether the window is reflected.
        mirror: bool,
    },
    /// An opening (first step erosion) or closing (first step dilation) within one line.
    ///
    /// The result does not depend on the window reflection.
    Fused {
        /// The polarity of the first step.
        first: Polarity,
    },
}

/// Scratch space of [`filter_line`], reused across lines.
///
/// Buffers are resized per line and so only ever grow.
#[derive(Debug)]
pub struct LineBuffers<T> {
    extended: Vec<T>,
    forward: Vec<T>,
    backward: Vec<T>,
    sub_in: Vec<T>,
    sub_out: Vec<T>,
    intermediate: Vec<T>,
}

impl<T> LineBuffers<T> {
    /// Empty buffers.
    pub fn new() -> Self {
        Self {
            extended: Vec::new(),
            forward: Vec::new(),
            backward: Vec::new(),
            sub_in: Vec::new(),
            sub_out: Vec::new(),
            intermediate: Vec::new(),
        }
    }
}

impl<T> Default for LineBuffers<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Filter `input` into `output` with a flat window.
///
/// Samples beyond the ends of the line are taken from its extension by `bc`. Without a boundary
/// condition they never win the comparison, so the window is effectively clipped.
///
/// # Arguments
///
/// * `input` - The line samples.
/// * `output` - The filtered samples, same length as `input`.
/// * `filter` - The window.
/// * `operation` - The filter to compute.
/// * `bc` - The boundary condition, if any.
/// * `buffers` - Reusable scratch space.
pub fn filter_line<T: Pixel>(
    input: &[T],
    output: &mut [T],
    filter: LineFilter,
    operation: LineOperation,
    bc: Option<BoundaryCondition>,
    buffers: &mut LineBuffers<T>,
) {
    debug_assert_eq!(input.len(), output.len());
    match operation {
        LineOperation::Extremum { polarity, mirror } => {
            extremum_pass(input, output, filter, polarity, mirror, bc, buffers)
        }
        LineOperation::Fused { first } => {
            let mut intermediate = std::mem::take(&mut buffers.intermediate);
            intermediate.clear();
            intermediate.resize(input.len(), T::zero());
            extremum_pass(input, &mut intermediate, filter, first, false, bc, buffers);
            extremum_pass(
                &intermediate,
                output,
                filter,
                first.invert(),
                true,
                bc,
                buffers,
            );
            buffers.intermediate = intermediate;
        }
    }
}

fn extremum_pass<T: Pixel>(
    input: &[T],
    output: &mut [T],
    filter: LineFilter,
    polarity: Polarity,
    mirror: bool,
    bc: Option<BoundaryCondition>,
    buffers: &mut LineBuffers<T>,
) {
    let n = input.len();
    if n == 0 {
        return;
    }
    let (left, right) = filter.margins(mirror);
    let margin = left.max(right);

    let extended = &mut buffers.extended;
    extended.clear();
    extended.resize(n + 2 * margin, polarity.identity());
    extended[margin..margin + n].copy_from_slice(input);
    if let Some(bc) = bc {
        expand_line(extended, margin, bc);
    }
    // window[i..i + span] covers output sample i
    let window = &extended[margin - left..margin + n + right];

    match filter {
        LineFilter::Periodic { points, step } => {
            for residue in 0..step.min(n) {
                let count = (n - residue).div_ceil(step);
                buffers.sub_in.clear();
                buffers
                    .sub_in
                    .extend(window[residue..].iter().step_by(step).copied());
                buffers.sub_out.clear();
                buffers.sub_out.resize(count, T::zero());
                running_extremum(
                    &buffers.sub_in[..count + points - 1],
                    points,
                    polarity,
                    &mut buffers.forward,
                    &mut buffers.backward,
                    &mut buffers.sub_out,
                );
                for (j, &v) in buffers.sub_out.iter().enumerate() {
                    output[residue + j * step] = v;
                }
            }
        }
        _ => running_extremum(
            window,
            filter.points(),
            polarity,
            &mut buffers.forward,
            &mut buffers.backward,
            output,
        ),
    }
}

/// `out[t] = extremum(seq[t..t + length])`; `seq` holds `out.len() + length - 1` samples.
fn running_extremum<T: Pixel>(
    seq: &[T],
    length: usize,
    polarity: Polarity,
    forward: &mut Vec<T>,
    backward: &mut Vec<T>,
    out: &mut [T],
) {
    debug_assert_eq!(seq.len() + 1, out.len() + length);
    match length {
        0 | 1 => out.copy_from_slice(&seq[..out.len()]),
        2 => {
            for (o, w) in out.iter_mut().zip(seq.windows(2)) {
                *o = polarity.pick(w[0], w[1]);
            }
        }
        3 => {
            for (o, w) in out.iter_mut().zip(seq.windows(3)) {
                *o = polarity.pick(polarity.pick(w[0], w[1]), w[2]);
            }
        }
        _ => van_herk(seq, length, polarity, forward, backward, out),
    }
}

/// Van Herk/Gil-Werman: prefix and suffix extrema over blocks of `length` samples.
fn van_herk<T: Pixel>(
    seq: &[T],
    length: usize,
    polarity: Polarity,
    forward: &mut Vec<T>,
    backward: &mut Vec<T>,
    out: &mut [T],
) {
    let m = seq.len();
    forward.clear();
    forward.reserve(m);
    for (i, &v) in seq.iter().enumerate() {
        let g = if i % length == 0 {
            v
        } else {
            polarity.pick(forward[i - 1], v)
        };
        forward.push(g);
    }

    backward.clear();
    backward.resize(m, T::zero());
    for i in (0..m).rev() {
        backward[i] = if i == m - 1 || (i + 1) % length == 0 {
            seq[i]
        } else {
            polarity.pick(backward[i + 1], seq[i])
        };
    }

    for (t, o) in out.iter_mut().enumerate() {
        *o = polarity.pick(backward[t], forward[t + length - 1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn reference<T: Pixel>(
        input: &[T],
        filter: LineFilter,
        polarity: Polarity,
        mirror: bool,
        bc: Option<BoundaryCondition>,
    ) -> Vec<T> {
        let n = input.len() as isize;
        let (points, step) = (filter.points() as isize, filter.step() as isize);
        let (left, right) = filter.margins(mirror);
        let margin = left.max(right);
        let mut extended = vec![polarity.identity(); input.len() + 2 * margin];
        extended[margin..margin + input.len()].copy_from_slice(input);
        if let Some(bc) = bc {
            expand_line(&mut extended, margin, bc);
        }
        (0..n)
            .map(|x| {
                (0..points)
                    .map(|k| x - left as isize + k * step)
                    .map(|pos| extended[(pos + margin as isize) as usize])
                    .fold(polarity.identity(), |acc, v| polarity.pick(acc, v))
            })
            .collect()
    }

    fn random_line(n: usize) -> Vec<i32> {
        let mut rng = rand::rng();
        (0..n).map(|_| rng.random_range(-50..50)).collect()
    }

    #[test]
    fn test_clipped_dilation() {
        let input = [1u8, 5, 2, 0, 0, 3];
        let mut output = [0u8; 6];
        let mut buffers = LineBuffers::new();
        let op = LineOperation::Extremum {
            polarity: Polarity::Dilation,
            mirror: false,
        };
        filter_line(&input, &mut output, LineFilter::contiguous(3), op, None, &mut buffers);
        assert_eq!(output, [5, 5, 5, 2, 3, 3]);
    }

    #[test]
    fn test_even_window_placement() {
        let input = [0u8, 0, 9, 0, 0, 0];
        let mut output = [0u8; 6];
        let mut buffers = LineBuffers::new();
        let op = LineOperation::Extremum {
            polarity: Polarity::Dilation,
            mirror: false,
        };
        // the window reaches two samples left and one right
        filter_line(&input, &mut output, LineFilter::contiguous(4), op, None, &mut buffers);
        assert_eq!(output, [0, 9, 9, 9, 9, 0]);
        let op = LineOperation::Extremum {
            polarity: Polarity::Dilation,
            mirror: true,
        };
        filter_line(&input, &mut output, LineFilter::contiguous(4), op, None, &mut buffers);
        assert_eq!(output, [9, 9, 9, 9, 0, 0]);
    }

    #[test]
    fn test_filters_match_reference() {
        let mut buffers = LineBuffers::new();
        let bcs = [
            None,
            Some(BoundaryCondition::SymmetricMirror),
            Some(BoundaryCondition::Periodic),
            Some(BoundaryCondition::AddZeros),
        ];
        for n in [1, 2, 5, 17, 40] {
            let input = random_line(n);
            let mut output = vec![0; n];
            for filter in (1..12)
                .map(LineFilter::contiguous)
                .chain([LineFilter::periodic(3, 2), LineFilter::periodic(4, 5)])
            {
                for polarity in [Polarity::Dilation, Polarity::Erosion] {
                    for mirror in [false, true] {
                        for bc in bcs {
                            let op = LineOperation::Extremum { polarity, mirror };
                            filter_line(&input, &mut output, filter, op, bc, &mut buffers);
                            let expected = reference(&input, filter, polarity, mirror, bc);
                            assert_eq!(
                                output, expected,
                                "{filter:?} {polarity:?} {mirror} {bc:?}"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_fused_opening() {
        let mut buffers = LineBuffers::new();
        let input = random_line(33);
        for filter in [LineFilter::contiguous(6), LineFilter::periodic(3, 4)] {
            let mut fused = vec![0; 33];
            filter_line(
                &input,
                &mut fused,
                filter,
                LineOperation::Fused {
                    first: Polarity::Erosion,
                },
                None,
                &mut buffers,
            );
            let eroded = reference(&input, filter, Polarity::Erosion, false, None);
            let opened = reference(&eroded, filter, Polarity::Dilation, true, None);
            assert_eq!(fused, opened);
            assert!(fused.iter().zip(&input).all(|(o, i)| o <= i));
        }
    }

    #[test]
    fn test_buffers_grow_only() {
        let mut buffers = LineBuffers::new();
        let op = LineOperation::Extremum {
            polarity: Polarity::Erosion,
            mirror: false,
        };
        let long = random_line(100);
        let mut out = vec![0; 100];
        filter_line(&long, &mut out, LineFilter::contiguous(9), op, None, &mut buffers);
        let capacity = buffers.forward.capacity();
        let short = random_line(10);
        let mut out = vec![0; 10];
        filter_line(&short, &mut out, LineFilter::contiguous(9), op, None, &mut buffers);
        assert!(buffers.forward.capacity() >= capacity);
        let expected = reference(
            &short,
            LineFilter::contiguous(9),
            Polarity::Erosion,
            false,
            None,
        );
        assert_eq!(out, expected);
    }
}
