use crate::image::Image;

/// The closed set of sample types supported by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 32-bit floating point.
    F32,
    /// 64-bit floating point.
    F64,
}

impl DataType {
    /// Whether the type is a floating-point type.
    pub fn is_float(self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    /// Whether the type can hold negative values.
    pub fn is_signed(self) -> bool {
        !matches!(self, DataType::U8 | DataType::U16 | DataType::U32)
    }

    /// The size of one sample in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 | DataType::F32 => 4,
            DataType::F64 => 8,
        }
    }
}

/// An image whose sample type is only known at runtime.
///
/// Generic algorithms are instantiated once per variant; [`dispatch_image!`] performs the single
/// runtime switch at the API boundary.
///
/// [`dispatch_image!`]: crate::dispatch_image
#[derive(Debug, Clone, PartialEq)]
pub enum DynImage {
    /// An `u8` image.
    U8(Image<u8>),
    /// An `u16` image.
    U16(Image<u16>),
    /// An `u32` image.
    U32(Image<u32>),
    /// An `i8` image.
    I8(Image<i8>),
    /// An `i16` image.
    I16(Image<i16>),
    /// An `i32` image.
    I32(Image<i32>),
    /// An `f32` image.
    F32(Image<f32>),
    /// An `f64` image.
    F64(Image<f64>),
}

/// Run an expression generic over the pixel type on a [`DynImage`].
///
/// The identifier is bound to the typed `&Image<T>` in every arm, so the expression must
/// produce the same type for all sample types, typically by converting back with
/// `DynImage::from`.
///
/// # Examples
///
/// ```
/// use ndmorph_image::{dispatch_image, DynImage, Image};
///
/// let image = DynImage::from(Image::<u16>::from_size_val(&[4, 4], 3));
/// let n = dispatch_image!(&image, img => img.num_pixels());
/// assert_eq!(n, 16);
/// ```
#[macro_export]
macro_rules! dispatch_image {
    ($image:expr, $bound:ident => $body:expr) => {
        match $image {
            $crate::DynImage::U8($bound) => $body,
            $crate::DynImage::U16($bound) => $body,
            $crate::DynImage::U32($bound) => $body,
            $crate::DynImage::I8($bound) => $body,
            $crate::DynImage::I16($bound) => $body,
            $crate::DynImage::I32($bound) => $body,
            $crate::DynImage::F32($bound) => $body,
            $crate::DynImage::F64($bound) => $body,
        }
    };
}

macro_rules! impl_from_image {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<Image<$t>> for DynImage {
                fn from(image: Image<$t>) -> Self {
                    DynImage::$variant(image)
                }
            }
        )*
    };
}

impl_from_image!(
    u8 => U8, u16 => U16, u32 => U32, i8 => I8, i16 => I16, i32 => I32, f32 => F32, f64 => F64
);

impl DynImage {
    /// The runtime sample type.
    pub fn data_type(&self) -> DataType {
        match self {
            DynImage::U8(_) => DataType::U8,
            DynImage::U16(_) => DataType::U16,
            DynImage::U32(_) => DataType::U32,
            DynImage::I8(_) => DataType::I8,
            DynImage::I16(_) => DataType::I16,
            DynImage::I32(_) => DataType::I32,
            DynImage::F32(_) => DataType::F32,
            DynImage::F64(_) => DataType::F64,
        }
    }

    /// The extent of each dimension.
    pub fn sizes(&self) -> &[usize] {
        dispatch_image!(self, image => image.sizes())
    }

    /// Convert to another sample type, saturating out-of-range values.
    pub fn convert(&self, data_type: DataType) -> DynImage {
        dispatch_image!(self, image => match data_type {
            DataType::U8 => DynImage::U8(image.cast()),
            DataType::U16 => DynImage::U16(image.cast()),
            DataType::U32 => DynImage::U32(image.cast()),
            DataType::I8 => DynImage::I8(image.cast()),
            DataType::I16 => DynImage::I16(image.cast()),
            DataType::I32 => DynImage::I32(image.cast()),
            DataType::F32 => DynImage::F32(image.cast()),
            DataType::F64 => DynImage::F64(image.cast()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::Pixel;

    #[test]
    fn test_data_type_tags() {
        assert_eq!(<u8 as Pixel>::DATA_TYPE, DataType::U8);
        assert_eq!(<f64 as Pixel>::DATA_TYPE, DataType::F64);
        assert!(DataType::F32.is_float());
        assert!(!DataType::U16.is_signed());
        assert_eq!(DataType::I32.size_of(), 4);
    }

    #[test]
    fn test_dyn_image_convert() {
        let image = DynImage::from(Image::from_size_val(&[2, 2], 300i32));
        let converted = image.convert(DataType::U8);
        assert_eq!(converted.data_type(), DataType::U8);
        assert_eq!(converted, DynImage::U8(Image::from_size_val(&[2, 2], 255)));
        assert_eq!(converted.sizes(), &[2, 2]);
    }
}
