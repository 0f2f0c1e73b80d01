use num_traits::{Bounded, NumCast, Zero};

use crate::dyn_image::DataType;

/// Trait for the scalar sample types an [`crate::Image`] can hold.
///
/// The morphology and segmentation algorithms only need ordering, the type range and a
/// saturating conversion from `f64`; everything else goes through these helpers so that hot
/// loops stay generic over the closed set of supported types.
pub trait Pixel:
    Copy + PartialOrd + Default + Send + Sync + std::fmt::Debug + Bounded + NumCast + Zero + 'static
{
    /// The runtime tag of this type.
    const DATA_TYPE: DataType;

    /// Whether the type is a floating-point type.
    const IS_FLOAT: bool = false;

    /// Returns true for `+inf`. Always false for integer types.
    #[inline]
    fn is_pos_infinity(self) -> bool {
        false
    }

    /// Returns true for `-inf`. Always false for integer types.
    #[inline]
    fn is_neg_infinity(self) -> bool {
        false
    }

    /// Lossless (or nearest) conversion to `f64`.
    fn to_f64(self) -> f64;

    /// Saturating conversion from `f64`, rounding to the nearest integer for integer types.
    fn clamp_from_f64(value: f64) -> Self;

    /// The complement of the value within the type range.
    ///
    /// Unsigned types map `v` to `max - v`, signed integers to `!v` (that is `-1 - v`, which maps
    /// the range onto itself) and floating-point types to `-v`.
    fn invert(self) -> Self;

    /// The larger of two values.
    #[inline]
    fn sup(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }

    /// The smaller of two values.
    #[inline]
    fn inf(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }
}

macro_rules! impl_pixel_unsigned {
    ($($t:ty => $dt:ident),*) => {
        $(
            impl Pixel for $t {
                const DATA_TYPE: DataType = DataType::$dt;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn clamp_from_f64(value: f64) -> Self {
                    // `as` saturates and maps NaN to 0
                    value.round() as $t
                }

                #[inline]
                fn invert(self) -> Self {
                    <$t>::MAX - self
                }
            }
        )*
    };
}

macro_rules! impl_pixel_signed {
    ($($t:ty => $dt:ident),*) => {
        $(
            impl Pixel for $t {
                const DATA_TYPE: DataType = DataType::$dt;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn clamp_from_f64(value: f64) -> Self {
                    value.round() as $t
                }

                #[inline]
                fn invert(self) -> Self {
                    !self
                }
            }
        )*
    };
}

macro_rules! impl_pixel_float {
    ($($t:ty => $dt:ident),*) => {
        $(
            impl Pixel for $t {
                const DATA_TYPE: DataType = DataType::$dt;
                const IS_FLOAT: bool = true;

                #[inline]
                fn is_pos_infinity(self) -> bool {
                    self == <$t>::INFINITY
                }

                #[inline]
                fn is_neg_infinity(self) -> bool {
                    self == <$t>::NEG_INFINITY
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn clamp_from_f64(value: f64) -> Self {
                    value as $t
                }

                #[inline]
                fn invert(self) -> Self {
                    -self
                }
            }
        )*
    };
}

impl_pixel_unsigned!(u8 => U8, u16 => U16, u32 => U32);
impl_pixel_signed!(i8 => I8, i16 => I16, i32 => I32);
impl_pixel_float!(f32 => F32, f64 => F64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_from_f64_saturates() {
        assert_eq!(u8::clamp_from_f64(300.0), 255);
        assert_eq!(u8::clamp_from_f64(-4.0), 0);
        assert_eq!(u8::clamp_from_f64(f64::NAN), 0);
        assert_eq!(i16::clamp_from_f64(-1e9), i16::MIN);
        assert_eq!(i32::clamp_from_f64(2.6), 3);
        assert_eq!(f32::clamp_from_f64(1.5), 1.5);
    }

    #[test]
    fn test_invert_is_involution() {
        for v in [0u8, 1, 127, 255] {
            assert_eq!(v.invert().invert(), v);
        }
        for v in [i8::MIN, -1, 0, i8::MAX] {
            assert_eq!(v.invert().invert(), v);
        }
        assert_eq!(0u16.invert(), u16::MAX);
        assert_eq!(i8::MIN.invert(), i8::MAX);
        assert_eq!(2.5f64.invert(), -2.5);
    }

    #[test]
    fn test_infinity_flags() {
        assert!(f32::INFINITY.is_pos_infinity());
        assert!(f64::NEG_INFINITY.is_neg_infinity());
        assert!(!u8::MAX.is_pos_infinity());
        assert!(!f32::MAX.is_pos_infinity());
    }

    #[test]
    fn test_sup_inf() {
        assert_eq!(3u8.sup(7), 7);
        assert_eq!(3u8.inf(7), 3);
        assert_eq!((-1.0f32).sup(-2.0), -1.0);
    }
}
