use std::fmt;

use crate::error::ImageError;
use crate::image::{AnyImage, Image};

/// Element (channel depth) types accepted at the SLAM boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DType {
    /// 8-bit unsigned integer.
    U8,
    /// 8-bit signed integer.
    I8,
    /// 16-bit unsigned integer.
    U16,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_of(&self) -> usize {
        match self {
            DType::U8 | DType::I8 => 1,
            DType::U16 | DType::I16 => 2,
            DType::I32 | DType::F32 => 4,
            DType::F64 => 8,
        }
    }

    /// The numpy name of the element type, e.g. `uint8`.
    pub fn name(&self) -> &'static str {
        match self {
            DType::U8 => "uint8",
            DType::I8 => "int8",
            DType::U16 => "uint16",
            DType::I16 => "int16",
            DType::I32 => "int32",
            DType::F32 => "float32",
            DType::F64 => "float64",
        }
    }

    /// Parse an array-interface type string such as `|u1` or `<f4`.
    ///
    /// The byte order must be native (or irrelevant for single byte types).
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidInputKind`] for unsupported element kinds,
    /// widths or a foreign byte order.
    pub fn from_typestr(typestr: &str) -> Result<Self, ImageError> {
        let mut chars = typestr.chars();
        let (order, kind) = match (chars.next(), chars.next()) {
            (Some(order), Some(kind)) => (order, kind),
            _ => {
                return Err(ImageError::InvalidInputKind(format!(
                    "malformed element type `{typestr}`"
                )))
            }
        };
        let width: usize = chars.as_str().parse().map_err(|_| {
            ImageError::InvalidInputKind(format!("malformed element type `{typestr}`"))
        })?;

        let native = if cfg!(target_endian = "little") {
            '<'
        } else {
            '>'
        };
        let order_ok = order == '=' || order == native || (order == '|' && width == 1);
        if !order_ok {
            return Err(ImageError::InvalidInputKind(format!(
                "element type `{typestr}` is not in native byte order"
            )));
        }

        match (kind, width) {
            ('u', 1) => Ok(DType::U8),
            ('i', 1) => Ok(DType::I8),
            ('u', 2) => Ok(DType::U16),
            ('i', 2) => Ok(DType::I16),
            ('i', 4) => Ok(DType::I32),
            ('f', 4) => Ok(DType::F32),
            ('f', 8) => Ok(DType::F64),
            _ => Err(ImageError::InvalidInputKind(format!(
                "unsupported element type `{typestr}`"
            ))),
        }
    }

    /// The native-order array-interface type string of this element type.
    pub fn typestr(&self) -> String {
        let kind = match self {
            DType::U8 | DType::U16 => 'u',
            DType::I8 | DType::I16 | DType::I32 => 'i',
            DType::F32 | DType::F64 => 'f',
        };
        let order = if self.size_of() == 1 {
            '|'
        } else if cfg!(target_endian = "little") {
            '<'
        } else {
            '>'
        };
        format!("{order}{kind}{}", self.size_of())
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Trait for the pixel element types an [`Image`] can hold.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The runtime tag of this element type.
    const DTYPE: DType;

    /// Read one element from exactly `size_of::<Self>()` native-order bytes.
    fn from_ne_slice(bytes: &[u8]) -> Self;

    /// Append the native-order bytes of this element.
    fn extend_ne_bytes(self, out: &mut Vec<u8>);

    /// Wrap a typed image into the type-erased [`AnyImage`].
    fn into_any(image: Image<Self>) -> AnyImage;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            fn from_ne_slice(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_ne_bytes(buf)
            }

            fn extend_ne_bytes(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_ne_bytes());
            }

            fn into_any(image: Image<Self>) -> AnyImage {
                AnyImage::$dtype(image)
            }
        }
    };
}

impl_element!(u8, U8);
impl_element!(i8, I8);
impl_element!(u16, U16);
impl_element!(i16, I16);
impl_element!(i32, I32);
impl_element!(f32, F32);
impl_element!(f64, F64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typestr_parsing() -> Result<(), ImageError> {
        assert_eq!(DType::from_typestr("|u1")?, DType::U8);
        assert_eq!(DType::from_typestr("|i1")?, DType::I8);
        assert_eq!(DType::from_typestr("=u2")?, DType::U16);
        assert_eq!(DType::from_typestr(&DType::F32.typestr())?, DType::F32);
        assert_eq!(DType::from_typestr(&DType::F64.typestr())?, DType::F64);
        Ok(())
    }

    #[test]
    fn typestr_rejects_unsupported() {
        for bad in ["|b1", "<c8", "|O8", "<u8", "<f2", "", "<", "<fx"] {
            assert!(
                matches!(
                    DType::from_typestr(bad),
                    Err(ImageError::InvalidInputKind(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn typestr_rejects_foreign_byte_order() {
        let foreign = if cfg!(target_endian = "little") {
            ">f4"
        } else {
            "<f4"
        };
        assert!(DType::from_typestr(foreign).is_err());
    }

    #[test]
    fn element_bytes() {
        let mut out = vec![];
        1234.5f32.extend_ne_bytes(&mut out);
        assert_eq!(out.len(), 4);
        assert_eq!(f32::from_ne_slice(&out), 1234.5);
    }
}
