use crate::error::ImageError;

/// The neighbors of a pixel under a given connectivity.
///
/// Connectivity `c` selects all steps in `{-1, 0, 1}^ndims` (excluding the zero step) with at most
/// `c` nonzero components: 1 gives the face neighbors (4 in 2D, 6 in 3D), `ndims` gives the full
/// neighborhood (8 in 2D, 26 in 3D).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborList {
    coords: Vec<Vec<isize>>,
    ndims: usize,
}

impl NeighborList {
    /// Create the neighbor list for `connectivity` in `ndims` dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::IllegalConnectivity`] unless `1 <= connectivity <= ndims`.
    pub fn new(connectivity: usize, ndims: usize) -> Result<Self, ImageError> {
        if connectivity == 0 || connectivity > ndims {
            return Err(ImageError::IllegalConnectivity {
                connectivity,
                ndims,
            });
        }
        let mut coords = Vec::new();
        let mut step = vec![-1isize; ndims];
        loop {
            let nonzero = step.iter().filter(|&&c| c != 0).count();
            if nonzero > 0 && nonzero <= connectivity {
                coords.push(step.clone());
            }
            // odometer over {-1, 0, 1}, dimension 0 fastest
            let mut d = 0;
            while d < ndims {
                step[d] += 1;
                if step[d] <= 1 {
                    break;
                }
                step[d] = -1;
                d += 1;
            }
            if d == ndims {
                break;
            }
        }
        Ok(Self { coords, ndims })
    }

    /// Build a list from explicit coordinate steps.
    pub fn from_coords(coords: Vec<Vec<isize>>, ndims: usize) -> Self {
        Self { coords, ndims }
    }

    /// The number of neighbors.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// The dimensionality the list was built for.
    pub fn ndims(&self) -> usize {
        self.ndims
    }

    /// The coordinate steps, one per neighbor.
    pub fn coords(&self) -> &[Vec<isize>] {
        &self.coords
    }

    /// The linear offsets of the neighbors in a buffer with the given strides.
    pub fn offsets(&self, strides: &[isize]) -> Vec<isize> {
        self.coords
            .iter()
            .map(|c| c.iter().zip(strides).map(|(&c, &s)| c * s).sum())
            .collect()
    }

    /// The neighbors visited before the central pixel in a forward raster scan.
    ///
    /// With dimension 0 varying fastest, a step precedes the pixel when its last nonzero
    /// component is negative.
    pub fn backward(&self) -> NeighborList {
        self.filter_by_sign(true)
    }

    /// The neighbors visited after the central pixel in a forward raster scan.
    pub fn forward(&self) -> NeighborList {
        self.filter_by_sign(false)
    }

    fn filter_by_sign(&self, negative: bool) -> NeighborList {
        let coords = self
            .coords
            .iter()
            .filter(|c| {
                c.iter()
                    .rev()
                    .find(|&&v| v != 0)
                    .is_some_and(|&v| (v < 0) == negative)
            })
            .cloned()
            .collect();
        NeighborList {
            coords,
            ndims: self.ndims,
        }
    }

    /// Whether neighbor `index` of the pixel at `coords` lies inside an image of `sizes`.
    #[inline]
    pub fn is_in_image(&self, index: usize, coords: &[usize], sizes: &[usize]) -> bool {
        self.coords[index]
            .iter()
            .zip(coords.iter().zip(sizes))
            .all(|(&step, (&c, &s))| {
                let p = c as isize + step;
                p >= 0 && p < s as isize
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbor_counts() -> Result<(), ImageError> {
        assert_eq!(NeighborList::new(1, 2)?.len(), 4);
        assert_eq!(NeighborList::new(2, 2)?.len(), 8);
        assert_eq!(NeighborList::new(1, 3)?.len(), 6);
        assert_eq!(NeighborList::new(2, 3)?.len(), 18);
        assert_eq!(NeighborList::new(3, 3)?.len(), 26);
        assert_eq!(NeighborList::new(1, 1)?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_illegal_connectivity() {
        assert_eq!(
            NeighborList::new(3, 2),
            Err(ImageError::IllegalConnectivity {
                connectivity: 3,
                ndims: 2
            })
        );
        assert!(NeighborList::new(0, 2).is_err());
    }

    #[test]
    fn test_backward_forward_split() -> Result<(), ImageError> {
        let list = NeighborList::new(2, 2)?;
        let backward = list.backward();
        let forward = list.forward();
        assert_eq!(backward.len(), 4);
        assert_eq!(forward.len(), 4);
        let offsets = backward.offsets(&[1, 10]);
        assert!(offsets.iter().all(|&o| o < 0));
        let offsets = forward.offsets(&[1, 10]);
        assert!(offsets.iter().all(|&o| o > 0));
        Ok(())
    }

    #[test]
    fn test_is_in_image() -> Result<(), ImageError> {
        let list = NeighborList::new(1, 2)?;
        let sizes = [3, 3];
        let inside = (0..list.len())
            .filter(|&i| list.is_in_image(i, &[0, 0], &sizes))
            .count();
        assert_eq!(inside, 2);
        let inside = (0..list.len())
            .filter(|&i| list.is_in_image(i, &[1, 1], &sizes))
            .count();
        assert_eq!(inside, 4);
        Ok(())
    }
}
