use ndmorph_image::{image::increment_coords, Image, Pixel};

use crate::config::LINE_EPSILON;
use crate::error::MorphologyError;

/// A neighborhood: pixel coordinates relative to the origin, with optional weights.
///
/// A filter with kernel `K` computes `out[x] = max_{k in K} in[x + k]` for dilation and the
/// minimum for erosion. Weighted kernels add (dilation) or subtract (erosion) the weight of each
/// element before taking the extremum.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    coords: Vec<Vec<isize>>,
    weights: Option<Vec<f64>>,
    ndims: usize,
}

/// Build a kernel from all points of a box that satisfy a predicate.
///
/// `lower` and `upper` are inclusive per-dimension coordinate bounds.
fn from_predicate(lower: &[isize], upper: &[isize], pred: impl Fn(&[isize]) -> bool) -> Kernel {
    let ndims = lower.len();
    let sizes = lower
        .iter()
        .zip(upper)
        .map(|(&l, &u)| (u - l + 1).max(0) as usize)
        .collect::<Vec<_>>();
    let mut coords = Vec::new();
    if sizes.iter().all(|&s| s > 0) {
        let mut pos = vec![0usize; ndims];
        let mut point = vec![0isize; ndims];
        loop {
            for ((p, &c), &l) in point.iter_mut().zip(&pos).zip(lower) {
                *p = l + c as isize;
            }
            if pred(&point) {
                coords.push(point.clone());
            }
            if !increment_coords(&mut pos, &sizes) {
                break;
            }
        }
    }
    Kernel {
        coords,
        weights: None,
        ndims,
    }
}

/// The offset along a non-dominant dimension of the `k`-th point of a discrete line.
///
/// `slope` is the step along this dimension per unit step along the dominant one. Points
/// `0..L` of a line with slope `p / L` span exactly `round(|p|)` pixels.
pub(crate) fn line_offset(k: isize, slope: f64) -> isize {
    let delta = 1.0 - LINE_EPSILON;
    if slope > 0.0 {
        -((delta - k as f64 * slope).floor() as isize)
    } else {
        (delta + k as f64 * slope).floor() as isize
    }
}

/// The dominant dimension and length of a line given its per-dimension extents.
///
/// Lengths are `round(|p|)`; the first dimension with the largest length wins.
pub(crate) fn line_axis(params: &[f64]) -> (usize, f64) {
    let mut axis = 0;
    let mut length = params.first().map_or(0.0, |p| p.abs().round());
    for (d, p) in params.iter().enumerate().skip(1) {
        let l = p.abs().round();
        if l > length {
            length = l;
            axis = d;
        }
    }
    (axis, length)
}

/// The per-dimension steps of a line, normalized so that the dominant axis step is `+1`.
pub(crate) fn line_steps(params: &[f64], axis: usize, length: f64) -> Vec<f64> {
    let flip = if params[axis] < 0.0 { -1.0 } else { 1.0 };
    params
        .iter()
        .map(|&p| flip * p.abs().round().copysign(p) / length)
        .collect()
}

impl Kernel {
    /// A rectangle of `round(|p|)` pixels per dimension.
    ///
    /// The origin sits at `size / 2`, which for even sizes is right of the centre.
    pub fn rectangular(sizes: &[f64]) -> Self {
        let (lower, upper): (Vec<_>, Vec<_>) = sizes
            .iter()
            .map(|p| {
                let size = (p.abs().round() as isize).max(1);
                let left = size / 2;
                (-left, size - 1 - left)
            })
            .unzip();
        from_predicate(&lower, &upper, |_| true)
    }

    /// An ellipsoid with diameters `sizes`: all points with `sum (2 x / size)^2 <= 1`.
    pub fn elliptic(sizes: &[f64]) -> Self {
        let radii = sizes.iter().map(|p| p.abs() / 2.0).collect::<Vec<_>>();
        let upper = radii.iter().map(|r| r.floor() as isize).collect::<Vec<_>>();
        let lower = upper.iter().map(|u| -u).collect::<Vec<_>>();
        from_predicate(&lower, &upper, |p| {
            p.iter()
                .zip(&radii)
                .map(|(&x, &r)| if x == 0 { 0.0 } else { (x as f64 / r).powi(2) })
                .sum::<f64>()
                <= 1.0
        })
    }

    /// A diamond with diameters `sizes`: all points with `sum |2 x / size| <= 1`.
    pub fn diamond(sizes: &[f64]) -> Self {
        let radii = sizes.iter().map(|p| p.abs() / 2.0).collect::<Vec<_>>();
        let upper = radii.iter().map(|r| r.floor() as isize).collect::<Vec<_>>();
        let lower = upper.iter().map(|u| -u).collect::<Vec<_>>();
        from_predicate(&lower, &upper, |p| {
            p.iter()
                .zip(&radii)
                .map(|(&x, &r)| if x == 0 { 0.0 } else { (x as f64 / r).abs() })
                .sum::<f64>()
                <= 1.0
        })
    }

    /// A discrete (Bresenham) line spanning `round(|p|)` pixels along each dimension.
    ///
    /// The sign of each parameter gives the direction. The origin is on the line, at `L / 2`
    /// along the dominant dimension, matching the window placement of the line filters.
    pub fn line(params: &[f64]) -> Self {
        let ndims = params.len();
        let (axis, length) = line_axis(params);
        if length <= 1.0 {
            return Kernel {
                coords: vec![vec![0; ndims]],
                weights: None,
                ndims,
            };
        }
        let steps = line_steps(params, axis, length);
        let len = length as isize;
        let left = len / 2;
        let origin = steps
            .iter()
            .map(|&s| line_offset(left, s))
            .collect::<Vec<_>>();
        let coords = (0..len)
            .map(|i| {
                steps
                    .iter()
                    .zip(&origin)
                    .enumerate()
                    .map(|(d, (&s, &o))| {
                        if d == axis {
                            i - left
                        } else {
                            line_offset(i, s) - o
                        }
                    })
                    .collect()
            })
            .collect();
        Kernel {
            coords,
            weights: None,
            ndims,
        }
    }

    /// A flat kernel with the set pixels of a binary image.
    ///
    /// The origin is the pixel at `sizes / 2`.
    pub fn from_mask(mask: &Image<bool>) -> Self {
        let origin = mask.sizes().iter().map(|&s| (s / 2) as isize);
        let origin = origin.collect::<Vec<_>>();
        let coords = mask
            .as_slice()
            .iter()
            .enumerate()
            .filter(|(_, &m)| m)
            .map(|(i, _)| {
                mask.coords(i)
                    .iter()
                    .zip(&origin)
                    .map(|(&c, &o)| c as isize - o)
                    .collect()
            })
            .collect();
        Kernel {
            coords,
            weights: None,
            ndims: mask.ndims(),
        }
    }

    /// A grey-weighted kernel from an image of weights.
    ///
    /// Pixels with an infinite or NaN weight are not part of the kernel. The origin is the pixel
    /// at `sizes / 2`.
    pub fn from_weights<T: Pixel>(weights: &Image<T>) -> Self {
        let origin = weights
            .sizes()
            .iter()
            .map(|&s| (s / 2) as isize)
            .collect::<Vec<_>>();
        let (coords, values): (Vec<Vec<isize>>, Vec<f64>) = weights
            .as_slice()
            .iter()
            .enumerate()
            .filter(|(_, &w)| w.to_f64().is_finite())
            .map(|(i, &w)| {
                let c = weights
                    .coords(i)
                    .iter()
                    .zip(&origin)
                    .map(|(&c, &o)| c as isize - o)
                    .collect();
                (c, w.to_f64())
            })
            .unzip();
        Kernel {
            coords,
            weights: Some(values),
            ndims: weights.ndims(),
        }
    }

    /// Build a kernel from explicit coordinates and optional weights.
    ///
    /// # Errors
    ///
    /// Fails if the coordinates have inconsistent dimensionality or the weights do not match.
    pub fn from_coords(
        coords: Vec<Vec<isize>>,
        weights: Option<Vec<f64>>,
        ndims: usize,
    ) -> Result<Self, MorphologyError> {
        if let Some(bad) = coords.iter().find(|c| c.len() != ndims) {
            return Err(ndmorph_image::ImageError::DimensionalityMismatch {
                expected: ndims,
                actual: bad.len(),
            }
            .into());
        }
        if let Some(w) = &weights {
            if w.len() != coords.len() {
                return Err(ndmorph_image::ImageError::InvalidShape {
                    expected: coords.len(),
                    actual: w.len(),
                }
                .into());
            }
        }
        Ok(Kernel {
            coords,
            weights,
            ndims,
        })
    }

    /// The number of pixels.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Whether the kernel has no pixels.
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// The dimensionality.
    pub fn ndims(&self) -> usize {
        self.ndims
    }

    /// The pixel coordinates relative to the origin.
    pub fn coords(&self) -> &[Vec<isize>] {
        &self.coords
    }

    /// The per-pixel weights of a grey-weighted kernel.
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// Whether the kernel is grey-weighted.
    pub fn has_weights(&self) -> bool {
        self.weights.is_some()
    }

    /// Reflect the kernel through its origin.
    pub fn mirror(&mut self) {
        for c in self.coords.iter_mut().flatten() {
            *c = -*c;
        }
    }

    /// Move every pixel by `shift`.
    pub fn shift(&mut self, shift: &[isize]) {
        for c in self.coords.iter_mut() {
            for (v, s) in c.iter_mut().zip(shift) {
                *v += s;
            }
        }
    }

    /// Add trailing singleton dimensions up to `ndims`.
    ///
    /// # Errors
    ///
    /// Fails if the kernel has more than `ndims` dimensions.
    pub fn expand_dims(mut self, ndims: usize) -> Result<Self, MorphologyError> {
        if self.ndims > ndims {
            return Err(ndmorph_image::ImageError::DimensionalityMismatch {
                expected: ndims,
                actual: self.ndims,
            }
            .into());
        }
        for c in self.coords.iter_mut() {
            c.resize(ndims, 0);
        }
        self.ndims = ndims;
        Ok(self)
    }

    /// The inclusive lower and upper coordinate bounds per dimension.
    ///
    /// Both are zero for an empty kernel.
    pub fn bounds(&self) -> (Vec<isize>, Vec<isize>) {
        let mut lower = vec![0isize; self.ndims];
        let mut upper = vec![0isize; self.ndims];
        for c in &self.coords {
            for (d, &v) in c.iter().enumerate() {
                lower[d] = lower[d].min(v);
                upper[d] = upper[d].max(v);
            }
        }
        (lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn print_kernel(kernel: &Kernel) {
        let (lower, upper) = kernel.bounds();
        for y in lower[1]..=upper[1] {
            for x in lower[0]..=upper[0] {
                let set = kernel.coords().iter().any(|c| c[0] == x && c[1] == y);
                print!("{}", if set { "1 " } else { "0 " });
            }
            println!();
        }
    }

    #[test]
    fn test_rect_kernel_even_origin() {
        let kernel = Kernel::rectangular(&[4.0, 3.0]);
        assert_eq!(kernel.len(), 12);
        assert_eq!(kernel.bounds(), (vec![-2, -1], vec![1, 1]));
        let mut mirrored = kernel.clone();
        mirrored.mirror();
        assert_eq!(mirrored.bounds(), (vec![-1, -1], vec![2, 1]));
    }

    #[test]
    fn test_ellipse_kernel_counts() {
        // sizes are diameters, so even sizes round up to the next odd extent
        assert_eq!(Kernel::elliptic(&[1.0, 10.0]).len(), 11);
        assert_eq!(Kernel::elliptic(&[1.0, 11.0]).len(), 11);
        let kernel = Kernel::elliptic(&[10.0, 11.0]);
        print_kernel(&kernel);
        assert_eq!(kernel.len(), 89);
    }

    #[test]
    fn test_diamond_kernel() {
        let kernel = Kernel::diamond(&[3.0, 3.0]);
        assert_eq!(kernel.len(), 5);
        let kernel = Kernel::diamond(&[5.0, 5.0]);
        print_kernel(&kernel);
        assert_eq!(kernel.len(), 13);
        assert!(kernel.coords().iter().all(|c| c[0].abs() + c[1].abs() <= 2));
    }

    #[test]
    fn test_line_kernel_diagonal() {
        let kernel = Kernel::line(&[5.0, -5.0]);
        assert_eq!(kernel.len(), 5);
        for c in kernel.coords() {
            assert_eq!(c[0], -c[1]);
        }
        let kernel = Kernel::line(&[1.0, 4.0]);
        assert_eq!(
            kernel.coords(),
            &[vec![0, -2], vec![0, -1], vec![0, 0], vec![0, 1]]
        );
    }

    #[test]
    fn test_line_kernel_is_connected() {
        let kernel = Kernel::line(&[7.0, 3.0, -2.0]);
        assert_eq!(kernel.len(), 7);
        for pair in kernel.coords().windows(2) {
            for d in 0..3 {
                assert!((pair[1][d] - pair[0][d]).abs() <= 1);
            }
        }
        assert!(kernel.coords().iter().any(|c| c.iter().all(|&v| v == 0)));
    }

    #[test]
    fn test_kernel_from_images() -> Result<(), Box<dyn std::error::Error>> {
        let mask = Image::new(&[3, 2], vec![true, false, true, false, true, false])?;
        let kernel = Kernel::from_mask(&mask);
        assert_eq!(kernel.coords(), &[vec![-1, -1], vec![1, -1], vec![0, 0]]);

        let weights = Image::new(&[3], vec![-1.0f32, f32::NEG_INFINITY, 0.5])?;
        let kernel = Kernel::from_weights(&weights);
        assert_eq!(kernel.coords(), &[vec![-1], vec![1]]);
        assert_eq!(kernel.weights(), Some(&[-1.0, 0.5][..]));
        Ok(())
    }

    #[test]
    fn test_kernel_expand_dims() -> Result<(), MorphologyError> {
        let kernel = Kernel::rectangular(&[3.0]).expand_dims(3)?;
        assert_eq!(kernel.ndims(), 3);
        assert!(kernel.coords().iter().all(|c| c.len() == 3 && c[2] == 0));
        assert!(Kernel::rectangular(&[3.0, 3.0]).expand_dims(1).is_err());
        Ok(())
    }
}
