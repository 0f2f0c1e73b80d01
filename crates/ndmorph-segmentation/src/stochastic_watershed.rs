use std::f64::consts::PI;
use std::str::FromStr;

use ndmorph_image::{image::increment_coords, Image, Pixel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::SegmentationError;
use crate::watershed::{seeded_watershed, WatershedOptions};

/// How the random seeds of a stochastic watershed are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedGrid {
    /// Every pixel is a seed with the same probability.
    Poisson,
    /// A randomly placed rectangular grid, randomly rotated in 2D and 3D.
    Rectangular,
    /// A randomly placed and rotated hexagonal grid. 2D only.
    #[default]
    Hexagonal,
    /// A randomly placed and rotated face-centered cubic grid. 3D only.
    Fcc,
    /// A randomly placed and rotated body-centered cubic grid. 3D only.
    Bcc,
}

impl FromStr for SeedGrid {
    type Err = SegmentationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "poisson" => Ok(SeedGrid::Poisson),
            "rectangular" => Ok(SeedGrid::Rectangular),
            "hexagonal" => Ok(SeedGrid::Hexagonal),
            "fcc" => Ok(SeedGrid::Fcc),
            "bcc" => Ok(SeedGrid::Bcc),
            _ => Err(SegmentationError::InvalidFlag(s.to_string())),
        }
    }
}

/// Parameters of [`stochastic_watershed`].
#[derive(Debug, Clone, PartialEq)]
pub struct StochasticWatershedOptions {
    /// The expected number of seeds per iteration.
    pub n_seeds: usize,
    /// The number of seeded watersheds to accumulate.
    pub n_iterations: usize,
    /// When positive, uniform noise in `[0, noise)` is added to the image in every iteration.
    pub noise: f64,
    /// How the seeds are placed.
    pub grid: SeedGrid,
    /// Seed of the random number generator, for reproducible results.
    pub random_seed: Option<u64>,
}

impl Default for StochasticWatershedOptions {
    fn default() -> Self {
        Self {
            n_seeds: 100,
            n_iterations: 50,
            noise: 0.0,
            grid: SeedGrid::default(),
            random_seed: None,
        }
    }
}

/// Stochastic watershed: how often each pixel lies on the watershed of randomly seeded floods.
///
/// Every iteration places about `n_seeds` seeds, optionally adds noise to the image, and runs a
/// seeded watershed with connectivity 1 in which basins never merge. The output counts, per
/// pixel, the iterations in which it was a watershed pixel. Strong region boundaries get counts
/// close to `n_iterations`.
///
/// # Errors
///
/// Fails for 0-D images, zero seeds or iterations, a grid that does not fit the dimensionality,
/// and a seed density that puts grid points less than 2 pixels apart.
pub fn stochastic_watershed<T: Pixel>(
    image: &Image<T>,
    options: &StochasticWatershedOptions,
) -> Result<Image<u32>, SegmentationError> {
    if image.ndims() < 1 {
        return Err(SegmentationError::DimensionalityNotSupported {
            required: 1,
            actual: 0,
        });
    }
    if options.n_seeds == 0 {
        return Err(SegmentationError::ParameterOutOfRange {
            name: "n_seeds",
            value: 0.0,
        });
    }
    if options.n_iterations == 0 {
        return Err(SegmentationError::ParameterOutOfRange {
            name: "n_iterations",
            value: 0.0,
        });
    }
    let density = options.n_seeds as f64 / image.num_pixels() as f64;
    let mut rng = match options.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    log::debug!(
        "stochastic watershed with {:?} seeds at density {density}, {} iterations",
        options.grid,
        options.n_iterations
    );

    let watershed_options = WatershedOptions {
        max_depth: -1.0,
        ..Default::default()
    };
    let mut counts = image.similar(0u32);
    let mut seeds = image.similar(false);
    for _ in 0..options.n_iterations {
        match options.grid {
            SeedGrid::Poisson => fill_poisson(&mut seeds, density, &mut rng),
            grid => fill_random_grid(&mut seeds, density, grid, &mut rng)?,
        }
        let edges = if options.noise > 0.0 {
            let data = image
                .as_slice()
                .iter()
                .map(|&v| v.to_f64() + rng.random::<f64>() * options.noise)
                .collect();
            let noisy = Image::new(image.sizes(), data)?;
            seeded_watershed(&noisy, &seeds, None, &watershed_options)?
        } else {
            seeded_watershed(image, &seeds, None, &watershed_options)?
        };
        let edges = edges.into_binary();
        for (count, &edge) in counts.as_slice_mut().iter_mut().zip(edges.as_slice()) {
            *count += u32::from(edge);
        }
    }
    Ok(counts)
}

/// Set every pixel independently with probability `density`.
fn fill_poisson<R: Rng + ?Sized>(seeds: &mut Image<bool>, density: f64, rng: &mut R) {
    for s in seeds.as_slice_mut() {
        *s = rng.random::<f64>() < density;
    }
}

/// Draw a randomly translated (and in 2D and 3D rotated) grid with `density` points per pixel.
fn fill_random_grid<R: Rng + ?Sized>(
    seeds: &mut Image<bool>,
    density: f64,
    grid: SeedGrid,
    rng: &mut R,
) -> Result<(), SegmentationError> {
    let ndims = seeds.ndims();
    let mut distance = (1.0 / density).powf(1.0 / ndims as f64);
    match (grid, ndims) {
        (SeedGrid::Hexagonal, 2) => distance *= (2.0 / 3f64.sqrt()).sqrt(),
        (SeedGrid::Fcc, 3) => distance /= 2f64.cbrt(),
        (SeedGrid::Bcc, 3) => distance *= 2f64.cbrt() / 2.0,
        (SeedGrid::Hexagonal, actual) => {
            return Err(SegmentationError::DimensionalityNotSupported {
                required: 2,
                actual,
            })
        }
        (SeedGrid::Fcc | SeedGrid::Bcc, actual) => {
            return Err(SegmentationError::DimensionalityNotSupported {
                required: 3,
                actual,
            })
        }
        _ => {}
    }
    if distance < 2.0 {
        return Err(SegmentationError::ParameterOutOfRange {
            name: "density",
            value: density,
        });
    }
    seeds.as_slice_mut().fill(false);

    if ndims == 1 {
        let data = seeds.as_slice_mut();
        let mut position = rng.random_range(0.0..distance);
        while let Some(s) = data.get_mut(position.round() as usize) {
            *s = true;
            position += distance;
        }
        return Ok(());
    }

    let lattice = lattice_matrix(grid, ndims, distance, rng);
    let offset = if ndims <= 3 {
        let unit = (0..ndims).map(|_| rng.random::<f64>()).collect::<Vec<_>>();
        multiply(&lattice, &unit)
            .into_iter()
            .map(f64::round)
            .collect::<Vec<_>>()
    } else {
        (0..ndims)
            .map(|_| rng.random_range(0.0..distance).round())
            .collect()
    };
    let Some(inverse) = invert(&lattice, ndims) else {
        return Err(SegmentationError::ParameterOutOfRange {
            name: "density",
            value: density,
        });
    };

    let sizes = seeds.sizes().to_vec();
    let mut coords = vec![0usize; ndims];
    for s in seeds.as_slice_mut() {
        let position = coords
            .iter()
            .zip(&offset)
            .map(|(&c, &o)| c as f64 + o)
            .collect::<Vec<_>>();
        let index = multiply(&inverse, &position)
            .into_iter()
            .map(f64::round)
            .collect::<Vec<_>>();
        *s = multiply(&lattice, &index)
            .into_iter()
            .zip(&position)
            .all(|(g, &p)| g.round() == p);
        increment_coords(&mut coords, &sizes);
    }
    Ok(())
}

/// The grid basis vectors as the columns of an `ndims` x `ndims` column-major matrix.
fn lattice_matrix<R: Rng + ?Sized>(
    grid: SeedGrid,
    ndims: usize,
    distance: f64,
    rng: &mut R,
) -> Vec<f64> {
    let d = distance;
    match ndims {
        2 => {
            let angle = rng.random_range(0.0..PI);
            let (x, y) = (angle.cos(), angle.sin());
            let h = 3f64.sqrt() / 2.0;
            match grid {
                SeedGrid::Hexagonal => {
                    vec![x * d, y * d, (0.5 * x - h * y) * d, (0.5 * y + h * x) * d]
                }
                _ => vec![x * d, y * d, -y * d, x * d],
            }
        }
        3 => {
            let base = match grid {
                SeedGrid::Fcc => vec![d, d, 0.0, d, 0.0, d, 0.0, d, d],
                SeedGrid::Bcc => vec![d, d, -d, d, -d, d, -d, d, d],
                _ => vec![d, 0.0, 0.0, 0.0, d, 0.0, 0.0, 0.0, d],
            };
            let rotation = random_rotation(rng);
            let mut out = vec![0.0; 9];
            for i in 0..3 {
                for j in 0..3 {
                    out[i + 3 * j] = (0..3).map(|k| rotation[i + 3 * k] * base[k + 3 * j]).sum();
                }
            }
            out
        }
        _ => {
            let mut out = vec![0.0; ndims * ndims];
            for i in 0..ndims {
                out[i * (ndims + 1)] = d;
            }
            out
        }
    }
}

/// A uniformly distributed 3D rotation, column-major.
fn random_rotation<R: Rng + ?Sized>(rng: &mut R) -> [f64; 9] {
    let phi = rng.random_range(0.0..2.0 * PI);
    let theta = rng.random_range(-1.0..1.0f64).acos();
    let psi = rng.random_range(0.0..PI);
    let (cf, sf) = (phi.cos(), phi.sin());
    let (ct, st) = (theta.cos(), theta.sin());
    let (cp, sp) = (psi.cos(), psi.sin());
    [
        cf * ct,
        -ct * sf,
        st,
        cp * sf + cf * sp * st,
        cf * cp - sf * sp * st,
        -ct * sp,
        sf * sp - cf * cp * st,
        cf * sp + cp * sf * st,
        cp * ct,
    ]
}

/// `m * v` for a square column-major matrix.
fn multiply(m: &[f64], v: &[f64]) -> Vec<f64> {
    let n = v.len();
    (0..n)
        .map(|i| (0..n).map(|j| m[i + n * j] * v[j]).sum())
        .collect()
}

/// The inverse of a square matrix by Gauss-Jordan elimination, `None` if it is singular.
fn invert(m: &[f64], n: usize) -> Option<Vec<f64>> {
    let mut a = m.to_vec();
    let mut inv = vec![0.0; n * n];
    for i in 0..n {
        inv[i * (n + 1)] = 1.0;
    }
    for col in 0..n {
        let pivot =
            (col..n).max_by(|&r, &s| a[r * n + col].abs().total_cmp(&a[s * n + col].abs()))?;
        if a[pivot * n + col].abs() < f64::EPSILON {
            return None;
        }
        for k in 0..n {
            a.swap(col * n + k, pivot * n + k);
            inv.swap(col * n + k, pivot * n + k);
        }
        let p = a[col * n + col];
        for k in 0..n {
            a[col * n + k] /= p;
            inv[col * n + k] /= p;
        }
        for row in (0..n).filter(|&r| r != col) {
            let factor = a[row * n + col];
            for k in 0..n {
                a[row * n + k] -= factor * a[col * n + k];
                inv[row * n + k] -= factor * inv[col * n + k];
            }
        }
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_positions(seeds: &Image<bool>) -> Vec<usize> {
        (0..seeds.num_pixels())
            .filter(|&i| seeds.as_slice()[i])
            .collect()
    }

    #[test]
    fn test_one_dimensional_grid_spacing() -> Result<(), SegmentationError> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seeds = Image::from_size_val(&[50], false);
        for _ in 0..20 {
            fill_random_grid(&mut seeds, 0.2, SeedGrid::Rectangular, &mut rng)?;
            let positions = seed_positions(&seeds);
            assert!((9..=10).contains(&positions.len()), "{positions:?}");
            assert!(positions.windows(2).all(|w| w[1] - w[0] == 5), "{positions:?}");
        }
        Ok(())
    }

    #[test]
    fn test_four_dimensional_grid_count() -> Result<(), SegmentationError> {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seeds = Image::from_size_val(&[6, 6, 6, 6], false);
        // spacing 3: two of every six coordinates per dimension
        for _ in 0..5 {
            fill_random_grid(&mut seeds, 1.0 / 81.0, SeedGrid::Rectangular, &mut rng)?;
            assert_eq!(seed_positions(&seeds).len(), 16);
        }
        Ok(())
    }

    #[test]
    fn test_rotated_grids_are_sparse() -> Result<(), SegmentationError> {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seeds = Image::from_size_val(&[60, 60], false);
        for grid in [SeedGrid::Rectangular, SeedGrid::Hexagonal] {
            for _ in 0..10 {
                fill_random_grid(&mut seeds, 0.01, grid, &mut rng)?;
                let positions = seed_positions(&seeds);
                let count = positions.len();
                assert!((20..=52).contains(&count), "{grid:?} {count}");
                // no two seeds are 4-connected
                for &p in &positions {
                    let (x, y) = (p % 60, p / 60);
                    assert!(x + 1 >= 60 || !seeds.as_slice()[p + 1]);
                    assert!(y + 1 >= 60 || !seeds.as_slice()[p + 60]);
                }
            }
        }
        let mut volume = Image::from_size_val(&[20, 20, 20], false);
        for grid in [SeedGrid::Rectangular, SeedGrid::Fcc, SeedGrid::Bcc] {
            fill_random_grid(&mut volume, 0.01, grid, &mut rng)?;
            let count = seed_positions(&volume).len();
            assert!((40..=130).contains(&count), "{grid:?} {count}");
        }
        Ok(())
    }

    #[test]
    fn test_grid_preconditions() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut seeds = Image::from_size_val(&[10, 10, 10], false);
        assert!(matches!(
            fill_random_grid(&mut seeds, 0.01, SeedGrid::Hexagonal, &mut rng),
            Err(SegmentationError::DimensionalityNotSupported { required: 2, .. })
        ));
        let mut flat = Image::from_size_val(&[10, 10], false);
        assert!(fill_random_grid(&mut flat, 0.01, SeedGrid::Bcc, &mut rng).is_err());
        assert!(matches!(
            fill_random_grid(&mut flat, 0.5, SeedGrid::Rectangular, &mut rng),
            Err(SegmentationError::ParameterOutOfRange { name: "density", .. })
        ));
        fill_poisson(&mut flat, 2.0, &mut rng);
        assert!(flat.as_slice().iter().all(|&s| s));
    }

    #[test]
    fn test_invert() {
        let m = [2.0, 1.0, 1.0, 3.0];
        let inv = invert(&m, 2).unwrap_or_default();
        let id = [multiply(&m, &[inv[0], inv[1]]), multiply(&m, &[inv[2], inv[3]])];
        approx::assert_relative_eq!(id[0][0], 1.0, epsilon = 1e-12);
        approx::assert_relative_eq!(id[0][1], 0.0, epsilon = 1e-12);
        approx::assert_relative_eq!(id[1][0], 0.0, epsilon = 1e-12);
        approx::assert_relative_eq!(id[1][1], 1.0, epsilon = 1e-12);
        assert!(invert(&[1.0, 2.0, 2.0, 4.0], 2).is_none());
    }

    #[test]
    fn test_ridge_is_counted_most() -> Result<(), SegmentationError> {
        // two valleys separated by a ridge at x = 20
        let (w, h): (usize, usize) = (41, 16);
        let data = (0..w * h)
            .map(|i| 20 - (i % w).abs_diff(20) as u8)
            .collect::<Vec<_>>();
        let image = Image::new(&[w, h], data)?;
        let options = StochasticWatershedOptions {
            n_seeds: 12,
            n_iterations: 20,
            grid: SeedGrid::Rectangular,
            random_seed: Some(5),
            ..Default::default()
        };
        let counts = stochastic_watershed(&image, &options)?;
        let column = |x: usize| (0..h).map(|y| counts.as_slice()[x + y * w]).sum::<u32>();
        let ridge = column(20);
        assert!((0..w).filter(|&x| x != 20).all(|x| column(x) < ridge));
        assert!(counts.as_slice().iter().all(|&c| c <= 20));
        assert_eq!(counts, stochastic_watershed(&image, &options)?);
        Ok(())
    }

    #[test]
    fn test_noise_and_poisson_seeds() -> Result<(), SegmentationError> {
        let image = Image::from_size_val(&[24, 24], 3.0f32);
        let options = StochasticWatershedOptions {
            n_seeds: 20,
            n_iterations: 5,
            noise: 1.0,
            grid: SeedGrid::Poisson,
            random_seed: Some(9),
        };
        let counts = stochastic_watershed(&image, &options)?;
        assert_eq!(counts.sizes(), image.sizes());
        assert!(counts.as_slice().iter().all(|&c| c <= 5));
        Ok(())
    }

    #[test]
    fn test_preconditions() {
        let image = Image::from_size_val(&[20, 20], 0u8);
        let options = StochasticWatershedOptions {
            n_seeds: 0,
            ..Default::default()
        };
        assert!(matches!(
            stochastic_watershed(&image, &options),
            Err(SegmentationError::ParameterOutOfRange { name: "n_seeds", .. })
        ));
        let options = StochasticWatershedOptions {
            n_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(
            stochastic_watershed(&image, &options),
            Err(SegmentationError::ParameterOutOfRange { name: "n_iterations", .. })
        ));
        // 100 seeds on 100 pixels put grid points closer than 2 pixels
        let small = Image::from_size_val(&[10, 10], 0u8);
        assert!(stochastic_watershed(&small, &StochasticWatershedOptions::default()).is_err());
        assert_eq!("fcc".parse::<SeedGrid>().ok(), Some(SeedGrid::Fcc));
        assert!("exact".parse::<SeedGrid>().is_err());
    }
}
