use ndmorph_image::{Image, ImageError, Pixel};

use crate::error::MorphologyError;
use crate::operation::Polarity;
use crate::parallel::ExecutionStrategy;
use crate::separable::filter_lines;

/// Dilation or erosion with the separable parabolic structuring function.
///
/// Along each dimension with `params[d] > 0` the structuring function is `-x^2 / params[d]^2`, so
/// larger parameters give flatter parabolas. Values are computed in `f64` and saturated to the
/// pixel type at the end. Boundary conditions do not apply: pixels outside the image never
/// contribute.
pub fn parabolic_morphology<T: Pixel>(
    image: &Image<T>,
    params: &[f64],
    polarity: Polarity,
    strategy: ExecutionStrategy,
) -> Result<Image<T>, MorphologyError> {
    if params.len() != image.ndims() {
        return Err(ImageError::DimensionalityMismatch {
            expected: image.ndims(),
            actual: params.len(),
        }
        .into());
    }
    let dims = params
        .iter()
        .zip(image.sizes())
        .enumerate()
        .filter(|(_, (&p, &size))| p > 0.0 && size > 1)
        .map(|(d, (&p, _))| (d, 1.0 / (p * p)))
        .collect::<Vec<_>>();
    if dims.is_empty() {
        return Ok(image.clone());
    }

    let mut current = image.cast::<f64>();
    for (dim, lambda) in dims {
        current = filter_lines(&current, dim, strategy, Vec::new, |input, output, buffer| {
            parabolic_line(input, output, lambda, polarity, buffer)
        })?;
    }
    Ok(current.cast())
}

/// Two passes: the envelope of parabolas rooted left of each sample, then right of it.
///
/// The winning root moves monotonically along the line, so each pass only searches between the
/// previous winner and the current sample.
fn parabolic_line(
    input: &[f64],
    output: &mut [f64],
    lambda: f64,
    polarity: Polarity,
    forward: &mut Vec<f64>,
) {
    let n = input.len();
    if n == 0 {
        return;
    }
    let sign = match polarity {
        Polarity::Dilation => -1.0,
        Polarity::Erosion => 1.0,
    };
    let at_least_as_good = |a: f64, b: f64| !polarity.better(b, a);

    forward.clear();
    forward.push(input[0]);
    let mut index: isize = 0;
    for i in 1..n {
        index -= 1;
        if at_least_as_good(input[i], forward[i - 1]) {
            forward.push(input[i]);
            index = 0;
        } else {
            let mut best = polarity.identity::<f64>();
            let mut winner = index;
            for jj in index..=0 {
                let v = input[(i as isize + jj) as usize] + sign * lambda * (jj * jj) as f64;
                if at_least_as_good(v, best) {
                    best = v;
                    winner = jj;
                }
            }
            index = winner;
            forward.push(best);
        }
    }

    output[n - 1] = forward[n - 1];
    let mut index: isize = 0;
    for i in (0..n - 1).rev() {
        index += 1;
        if at_least_as_good(forward[i], output[i + 1]) {
            output[i] = forward[i];
            index = 0;
        } else {
            let mut best = polarity.identity::<f64>();
            let mut winner = index;
            for jj in (0..=index).rev() {
                let v = forward[i + jj as usize] + sign * lambda * (jj * jj) as f64;
                if at_least_as_good(v, best) {
                    best = v;
                    winner = jj;
                }
            }
            index = winner;
            output[i] = best;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::Rng;

    fn brute_force(input: &[f64], lambda: f64, polarity: Polarity) -> Vec<f64> {
        let sign = match polarity {
            Polarity::Dilation => -1.0,
            Polarity::Erosion => 1.0,
        };
        (0..input.len())
            .map(|x| {
                input
                    .iter()
                    .enumerate()
                    .map(|(y, &v)| v + sign * lambda * (x as f64 - y as f64).powi(2))
                    .fold(polarity.identity::<f64>(), |a, b| polarity.pick(a, b))
            })
            .collect()
    }

    #[test]
    fn test_line_matches_brute_force() {
        let mut rng = rand::rng();
        let mut forward = Vec::new();
        for n in [1, 2, 7, 60] {
            let input = (0..n)
                .map(|_| rng.random_range(-20.0..20.0))
                .collect::<Vec<f64>>();
            for lambda in [0.01, 0.5, 3.0] {
                for polarity in [Polarity::Dilation, Polarity::Erosion] {
                    let mut output = vec![0.0; n];
                    parabolic_line(&input, &mut output, lambda, polarity, &mut forward);
                    let expected = brute_force(&input, lambda, polarity);
                    for (o, e) in output.iter().zip(&expected) {
                        assert_relative_eq!(*o, *e, epsilon = 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn test_impulse_response() -> Result<(), MorphologyError> {
        let mut image = Image::from_size_val(&[128, 69], 0.0f32);
        if let Some(v) = image.get_mut(&[64, 35]) {
            *v = 25.0;
        }
        let out = parabolic_morphology(
            &image,
            &[10.0, 0.0],
            Polarity::Dilation,
            ExecutionStrategy::Serial,
        )?;
        let expected = 25.0 + 2.0 * (1..50).map(|i| 25.0 - (i * i) as f64 / 100.0).sum::<f64>();
        let sum = out.as_slice().iter().map(|&v| v as f64).sum::<f64>();
        assert_relative_eq!(sum, expected, max_relative = 1e-5);
        assert_eq!(out.get(&[64, 35]), Some(&25.0));
        assert_eq!(out.get(&[64, 36]), Some(&0.0));
        Ok(())
    }

    #[test]
    fn test_zero_params_copy() -> Result<(), MorphologyError> {
        let image = Image::new(&[3, 2], vec![1u16, 5, 2, 8, 0, 3])?;
        let out = parabolic_morphology(
            &image,
            &[0.0, 0.0],
            Polarity::Erosion,
            ExecutionStrategy::Serial,
        )?;
        assert_eq!(out, image);
        assert!(parabolic_morphology(&image, &[1.0], Polarity::Erosion, ExecutionStrategy::Serial)
            .is_err());
        Ok(())
    }
}
