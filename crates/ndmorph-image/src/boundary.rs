use std::str::FromStr;

use crate::error::ImageError;
use crate::pixel::Pixel;

/// How image data is extended past the image boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryCondition {
    /// The data are mirrored: the value at -1 equals the value at 0, at -2 the value at 1, etc.
    #[default]
    SymmetricMirror,
    /// The data repeat periodically: the value at -1 equals the value of the last pixel.
    Periodic,
    /// The boundary is filled with zeros.
    AddZeros,
    /// The boundary is filled with the maximum value of the pixel type.
    AddMaxValue,
    /// The boundary is filled with the minimum (lowest) value of the pixel type.
    AddMinValue,
    /// The edge value is repeated indefinitely.
    ZeroOrderExtrapolate,
}

impl FromStr for BoundaryCondition {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "default" | "mirror" => Ok(Self::SymmetricMirror),
            "periodic" => Ok(Self::Periodic),
            "add zeros" => Ok(Self::AddZeros),
            "add max" => Ok(Self::AddMaxValue),
            "add min" => Ok(Self::AddMinValue),
            "zero order" => Ok(Self::ZeroOrderExtrapolate),
            _ => Err(ImageError::InvalidFlag(s.to_string())),
        }
    }
}

/// Expand a boundary condition array to one entry per dimension.
///
/// An empty array stays empty: callers interpret it as "use the default of the operation".
/// A single entry is used for all dimensions.
///
/// # Errors
///
/// Any other length than 0, 1 or `ndims`.
pub fn boundary_array(
    bcs: &[BoundaryCondition],
    ndims: usize,
) -> Result<Vec<BoundaryCondition>, ImageError> {
    match bcs.len() {
        0 => Ok(Vec::new()),
        1 => Ok(vec![bcs[0]; ndims]),
        n if n == ndims => Ok(bcs.to_vec()),
        n => Err(ImageError::DimensionalityMismatch {
            expected: ndims,
            actual: n,
        }),
    }
}

/// Parse an array of boundary condition names.
pub fn parse_boundary_conditions<S: AsRef<str>>(
    names: &[S],
) -> Result<Vec<BoundaryCondition>, ImageError> {
    names.iter().map(|s| s.as_ref().parse()).collect()
}

/// Fill the `border` samples on either side of a line buffer.
///
/// `buffer` holds `border` samples of margin, the line data, and `border` samples of margin.
/// Lines of a single pixel are extended with that pixel for the mirror and periodic conditions.
pub fn expand_line<T: Pixel>(buffer: &mut [T], border: usize, bc: BoundaryCondition) {
    if border == 0 || buffer.len() <= 2 * border {
        return;
    }
    let n = buffer.len() - 2 * border;
    match bc {
        BoundaryCondition::AddZeros => fill_margins(buffer, border, T::zero(), T::zero()),
        BoundaryCondition::AddMaxValue => {
            fill_margins(buffer, border, T::max_value(), T::max_value())
        }
        BoundaryCondition::AddMinValue => {
            fill_margins(buffer, border, T::min_value(), T::min_value())
        }
        BoundaryCondition::ZeroOrderExtrapolate => {
            let (first, last) = (buffer[border], buffer[border + n - 1]);
            fill_margins(buffer, border, first, last)
        }
        BoundaryCondition::SymmetricMirror | BoundaryCondition::Periodic => {
            let periodic = bc == BoundaryCondition::Periodic;
            let source = |pos: isize| -> usize {
                let n = n as isize;
                let index = if periodic {
                    pos.rem_euclid(n)
                } else {
                    let m = pos.rem_euclid(2 * n);
                    if m < n {
                        m
                    } else {
                        2 * n - 1 - m
                    }
                };
                border + index as usize
            };
            for k in 0..border {
                let pos = -(k as isize) - 1;
                buffer[border - 1 - k] = buffer[source(pos)];
                let pos = (n + k) as isize;
                buffer[border + n + k] = buffer[source(pos)];
            }
        }
    }
}

fn fill_margins<T: Copy>(buffer: &mut [T], border: usize, left: T, right: T) {
    let len = buffer.len();
    buffer[..border].fill(left);
    buffer[len - border..].fill(right);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_line_mirror() {
        let mut buffer = [0u8, 0, 0, 1, 2, 3, 0, 0, 0];
        expand_line(&mut buffer, 3, BoundaryCondition::SymmetricMirror);
        assert_eq!(buffer, [3, 2, 1, 1, 2, 3, 3, 2, 1]);
    }

    #[test]
    fn test_expand_line_mirror_longer_than_line() {
        let mut buffer = [0u8, 0, 0, 1, 2, 0, 0, 0];
        expand_line(&mut buffer, 3, BoundaryCondition::SymmetricMirror);
        assert_eq!(buffer, [2, 2, 1, 1, 2, 2, 1, 1]);
    }

    #[test]
    fn test_expand_line_periodic() {
        let mut buffer = [0i16, 0, 1, 2, 3, 0, 0];
        expand_line(&mut buffer, 2, BoundaryCondition::Periodic);
        assert_eq!(buffer, [2, 3, 1, 2, 3, 1, 2]);
    }

    #[test]
    fn test_expand_line_constants() {
        let mut buffer = [9u8, 1, 2, 9];
        expand_line(&mut buffer, 1, BoundaryCondition::AddMinValue);
        assert_eq!(buffer, [0, 1, 2, 0]);
        expand_line(&mut buffer, 1, BoundaryCondition::AddMaxValue);
        assert_eq!(buffer, [255, 1, 2, 255]);
        expand_line(&mut buffer, 1, BoundaryCondition::ZeroOrderExtrapolate);
        assert_eq!(buffer, [1, 1, 2, 2]);
        let mut buffer = [9.0f32, 1.0, 9.0];
        expand_line(&mut buffer, 1, BoundaryCondition::AddZeros);
        assert_eq!(buffer, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_boundary_array() {
        let bc = [BoundaryCondition::Periodic];
        assert_eq!(boundary_array(&bc, 3).unwrap().len(), 3);
        assert!(boundary_array(&[], 3).unwrap().is_empty());
        assert!(boundary_array(&[bc[0], bc[0]], 3).is_err());
    }

    #[test]
    fn test_parse_boundary_conditions() {
        let bcs = parse_boundary_conditions(&["add min", "periodic"]).unwrap();
        assert_eq!(
            bcs,
            vec![BoundaryCondition::AddMinValue, BoundaryCondition::Periodic]
        );
        assert_eq!(
            "nonsense".parse::<BoundaryCondition>(),
            Err(ImageError::InvalidFlag("nonsense".to_string()))
        );
    }
}
