//! Conversion between host-side arrays and dense [`AnyImage`] buffers.
//!
//! Host arrays are described by an [`ArrayRef`] in the spirit of the numpy
//! array interface: a byte buffer, a shape, optional byte strides and a type
//! string such as `|u1` or `<f4`. Decoding copies the pixels exactly once into
//! a dense row-major buffer; strided (but otherwise regular) layouts, including
//! reversed views with negative strides, are gathered during that single copy.

use crate::dtype::{DType, Element};
use crate::error::ImageError;
use crate::image::{AnyImage, Image, ImageSize};

/// A borrowed description of an external array.
#[derive(Clone, Copy, Debug)]
pub struct ArrayRef<'a> {
    /// Raw bytes spanned by the array, starting at its lowest addressed byte.
    ///
    /// This is the first element unless some stride is negative.
    pub data: &'a [u8],
    /// Array shape, `[rows, cols]` or `[rows, cols, channels]`.
    pub shape: &'a [usize],
    /// Byte strides per dimension. `None` means C-contiguous.
    pub strides: Option<&'a [isize]>,
    /// Array-interface element type string, e.g. `|u1`, `<u2`, `<f4`.
    pub typestr: &'a str,
}

/// An owned, C-contiguous array produced by [`encode`].
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedArray {
    /// Raw native-order bytes.
    pub data: Vec<u8>,
    /// Array shape, `[rows, cols]` for single channel images, `[rows, cols, channels]` otherwise.
    pub shape: Vec<usize>,
    /// Byte strides per dimension.
    pub strides: Vec<isize>,
    /// Element type.
    pub dtype: DType,
}

impl OwnedArray {
    /// Borrow the array as an [`ArrayRef`]; `typestr` must outlive the view.
    pub fn as_array_ref<'a>(&'a self, typestr: &'a str) -> ArrayRef<'a> {
        ArrayRef {
            data: &self.data,
            shape: &self.shape,
            strides: Some(&self.strides),
            typestr,
        }
    }
}

/// C-contiguous byte strides for `shape`.
///
/// Strides saturate at `isize::MAX`; such layouts never fit a real buffer.
pub fn contiguous_strides(shape: &[usize], itemsize: usize) -> Vec<isize> {
    let mut strides = vec![0isize; shape.len()];
    let mut acc = isize::try_from(itemsize).unwrap_or(isize::MAX);
    for (stride, &dim) in strides.iter_mut().zip(shape).rev() {
        *stride = acc;
        acc = acc.saturating_mul(isize::try_from(dim.max(1)).unwrap_or(isize::MAX));
    }
    strides
}

/// Bytes addressed by an array layout, relative to its first element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteSpan {
    /// Bytes between the lowest addressed byte and the first element.
    pub offset: usize,
    /// Total number of bytes from the lowest to the highest addressed byte.
    pub len: usize,
}

/// The bytes spanned by an array with the given layout.
///
/// Returns `None` when the span does not fit in the address space.
pub fn byte_span(shape: &[usize], strides: &[isize], itemsize: usize) -> Option<ByteSpan> {
    if shape.iter().any(|&d| d == 0) {
        return Some(ByteSpan { offset: 0, len: 0 });
    }
    let (mut low, mut high) = (0isize, 0isize);
    for (&dim, &stride) in shape.iter().zip(strides) {
        let reach = isize::try_from(dim - 1).ok()?.checked_mul(stride)?;
        if reach < 0 {
            low = low.checked_add(reach)?;
        } else {
            high = high.checked_add(reach)?;
        }
    }
    let len = high
        .checked_sub(low)?
        .checked_add(isize::try_from(itemsize).ok()?)?;
    Some(ByteSpan {
        offset: low.unsigned_abs(),
        len: len.unsigned_abs(),
    })
}

/// Decode an external array into a dense image buffer.
///
/// # Errors
///
/// Returns [`ImageError::InvalidInputKind`] if the array has the wrong number
/// of dimensions, an unsupported element type, strides that cannot be adapted
/// (not a multiple of the element size) or a buffer too small for its
/// declared layout.
///
/// # Examples
///
/// ```
/// use vslam_image::codec::{decode, ArrayRef};
///
/// let pixels = [0u8, 1, 2, 3, 4, 5];
/// let image = decode(&ArrayRef {
///     data: &pixels,
///     shape: &[2, 3],
///     strides: None,
///     typestr: "|u1",
/// })
/// .unwrap();
///
/// assert_eq!(image.shape(), [2, 3, 1]);
/// ```
pub fn decode(array: &ArrayRef<'_>) -> Result<AnyImage, ImageError> {
    let dtype = DType::from_typestr(array.typestr)?;
    let itemsize = dtype.size_of();

    let (rows, cols, channels) = match *array.shape {
        [rows, cols] => (rows, cols, 1),
        [rows, cols, channels] => (rows, cols, channels),
        _ => {
            return Err(ImageError::InvalidInputKind(format!(
                "expected a 2 or 3 dimensional array, got {} dimensions",
                array.shape.len()
            )))
        }
    };

    let contiguous = contiguous_strides(array.shape, itemsize);
    let strides = match array.strides {
        Some(strides) if strides.len() != array.shape.len() => {
            return Err(ImageError::InvalidInputKind(format!(
                "{} strides for {} dimensions",
                strides.len(),
                array.shape.len()
            )))
        }
        Some(strides) => strides,
        None => contiguous.as_slice(),
    };

    if strides.iter().any(|&s| s.unsigned_abs() % itemsize != 0) {
        return Err(ImageError::InvalidInputKind(format!(
            "strides {strides:?} cannot be adapted to a dense {dtype} buffer"
        )));
    }

    let numel = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(channels))
        .filter(|n| {
            n.checked_mul(itemsize)
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        })
        .ok_or_else(|| {
            ImageError::InvalidInputKind(format!(
                "{rows}x{cols}x{channels} {dtype} array is too large"
            ))
        })?;

    let span = byte_span(array.shape, strides, itemsize).ok_or_else(|| {
        ImageError::InvalidInputKind(format!(
            "layout {:?} with strides {strides:?} overflows the address space",
            array.shape
        ))
    })?;
    if span.len > array.data.len() {
        return Err(ImageError::InvalidInputKind(format!(
            "buffer holds {} bytes but the layout needs {}",
            array.data.len(),
            span.len
        )));
    }

    // a 2d layout is treated as a single channel with the element stride
    let chan_stride = strides.get(2).copied().unwrap_or(itemsize as isize);
    let layout = Layout {
        size: ImageSize {
            width: cols,
            height: rows,
        },
        channels,
        numel,
        first: span.offset,
        strides: [strides[0], strides[1], chan_stride],
        is_contiguous: strides == contiguous.as_slice(),
    };

    log::trace!(
        "decoding {rows}x{cols}x{channels} {dtype} array (contiguous: {})",
        layout.is_contiguous
    );

    Ok(match dtype {
        DType::U8 => gather::<u8>(array.data, &layout)?.into(),
        DType::I8 => gather::<i8>(array.data, &layout)?.into(),
        DType::U16 => gather::<u16>(array.data, &layout)?.into(),
        DType::I16 => gather::<i16>(array.data, &layout)?.into(),
        DType::I32 => gather::<i32>(array.data, &layout)?.into(),
        DType::F32 => gather::<f32>(array.data, &layout)?.into(),
        DType::F64 => gather::<f64>(array.data, &layout)?.into(),
    })
}

/// Encode a dense image buffer as an owned C-contiguous array.
///
/// Single channel images become 2d arrays, everything else is 3d with the
/// channel dimension last. Element type and pixel values are preserved exactly.
pub fn encode(image: &AnyImage) -> OwnedArray {
    let [rows, cols, channels] = image.shape();
    let shape = if channels == 1 {
        vec![rows, cols]
    } else {
        vec![rows, cols, channels]
    };
    let dtype = image.dtype();
    let strides = contiguous_strides(&shape, dtype.size_of());

    let mut data = Vec::new();
    image.extend_ne_bytes(&mut data);

    OwnedArray {
        data,
        shape,
        strides,
        dtype,
    }
}

struct Layout {
    size: ImageSize,
    channels: usize,
    numel: usize,
    first: usize,
    strides: [isize; 3],
    is_contiguous: bool,
}

fn gather<T: Element>(bytes: &[u8], layout: &Layout) -> Result<Image<T>, ImageError> {
    let itemsize = std::mem::size_of::<T>();

    // offsets stay inside the span checked by `decode`
    let data = if layout.is_contiguous {
        bytes[..layout.numel * itemsize]
            .chunks_exact(itemsize)
            .map(T::from_ne_slice)
            .collect()
    } else {
        let [row_stride, col_stride, chan_stride] = layout.strides;
        let first = layout.first as isize;
        let mut data = Vec::with_capacity(layout.numel);
        for y in 0..layout.size.height as isize {
            for x in 0..layout.size.width as isize {
                let pixel = first + y * row_stride + x * col_stride;
                for c in 0..layout.channels as isize {
                    let offset = (pixel + c * chan_stride) as usize;
                    data.push(T::from_ne_slice(&bytes[offset..offset + itemsize]));
                }
            }
        }
        data
    };

    Image::new(layout.size, layout.channels, data)
}
