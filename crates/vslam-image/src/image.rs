use crate::dtype::{DType, Element};
use crate::error::ImageError;

/// Image size in pixels
///
/// # Examples
///
/// ```
/// use vslam_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ImageSize {{ width: {}, height: {} }}",
            self.width, self.height
        )
    }
}

/// A dense, contiguous, row-major image with interleaved channels.
///
/// The pixel at row `y`, column `x`, channel `c` lives at
/// `(y * width + x) * channels + c`.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T: Element> {
    size: ImageSize,
    channels: usize,
    data: Vec<T>,
}

impl<T: Element> Image<T> {
    /// Create a new image from pixel data.
    ///
    /// # Errors
    ///
    /// If the length of the pixel data does not match the image size, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use vslam_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8>::new(
    ///     ImageSize { width: 10, height: 20 },
    ///     3,
    ///     vec![0u8; 10 * 20 * 3],
    /// ).unwrap();
    ///
    /// assert_eq!(image.width(), 10);
    /// assert_eq!(image.num_channels(), 3);
    /// ```
    pub fn new(size: ImageSize, channels: usize, data: Vec<T>) -> Result<Self, ImageError> {
        let expected = size
            .width
            .checked_mul(size.height)
            .and_then(|n| n.checked_mul(channels));
        if expected != Some(data.len()) {
            return Err(ImageError::InvalidChannelShape(
                data.len(),
                expected.unwrap_or(usize::MAX),
            ));
        }

        Ok(Self {
            size,
            channels,
            data,
        })
    }

    /// Create a new image with every element set to `val`.
    pub fn from_size_val(size: ImageSize, channels: usize, val: T) -> Self {
        Self {
            size,
            channels,
            data: vec![val; size.width * size.height * channels],
        }
    }

    /// Get the size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Get the width of the image in pixels.
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Get the height of the image in pixels.
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Get the number of rows of the image.
    pub fn rows(&self) -> usize {
        self.height()
    }

    /// Get the number of columns of the image.
    pub fn cols(&self) -> usize {
        self.width()
    }

    /// Get the number of channels in the image.
    pub fn num_channels(&self) -> usize {
        self.channels
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Whether the image has no backing data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The pixel data in row-major order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consume the image and return its pixel data.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Get the element at `[row, col, channel]`.
    pub fn get(&self, index: [usize; 3]) -> Option<&T> {
        let [y, x, c] = index;
        if y >= self.height() || x >= self.width() || c >= self.channels {
            return None;
        }
        self.data.get((y * self.width() + x) * self.channels + c)
    }
}

/// A type-erased image, tagged with its element type.
///
/// This is the buffer handed to the SLAM engine; grayscale, color and depth
/// frames all travel as an `AnyImage`.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyImage {
    /// 8-bit unsigned image.
    U8(Image<u8>),
    /// 8-bit signed image.
    I8(Image<i8>),
    /// 16-bit unsigned image, typically depth in millimetres.
    U16(Image<u16>),
    /// 16-bit signed image.
    I16(Image<i16>),
    /// 32-bit signed image.
    I32(Image<i32>),
    /// 32-bit float image, typically depth in metres.
    F32(Image<f32>),
    /// 64-bit float image.
    F64(Image<f64>),
}

macro_rules! dispatch {
    ($self:expr, $img:ident => $body:expr) => {
        match $self {
            AnyImage::U8($img) => $body,
            AnyImage::I8($img) => $body,
            AnyImage::U16($img) => $body,
            AnyImage::I16($img) => $body,
            AnyImage::I32($img) => $body,
            AnyImage::F32($img) => $body,
            AnyImage::F64($img) => $body,
        }
    };
}

impl AnyImage {
    /// The element type of the image.
    pub fn dtype(&self) -> DType {
        match self {
            AnyImage::U8(_) => DType::U8,
            AnyImage::I8(_) => DType::I8,
            AnyImage::U16(_) => DType::U16,
            AnyImage::I16(_) => DType::I16,
            AnyImage::I32(_) => DType::I32,
            AnyImage::F32(_) => DType::F32,
            AnyImage::F64(_) => DType::F64,
        }
    }

    /// Get the size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        dispatch!(self, img => img.size())
    }

    /// Get the number of channels in the image.
    pub fn num_channels(&self) -> usize {
        dispatch!(self, img => img.num_channels())
    }

    /// The `(rows, cols, channels)` triple.
    pub fn shape(&self) -> [usize; 3] {
        let size = self.size();
        [size.height, size.width, self.num_channels()]
    }

    /// Whether the image has no backing data.
    pub fn is_empty(&self) -> bool {
        dispatch!(self, img => img.is_empty())
    }

    /// Append the native-order bytes of every element.
    pub(crate) fn extend_ne_bytes(&self, out: &mut Vec<u8>) {
        dispatch!(self, img => {
            out.reserve(img.numel() * self.dtype().size_of());
            for v in img.as_slice() {
                v.extend_ne_bytes(out);
            }
        })
    }
}

impl<T: Element> From<Image<T>> for AnyImage {
    fn from(image: Image<T>) -> Self {
        T::into_any(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_smoke() -> Result<(), ImageError> {
        let image = Image::<u8>::new(
            ImageSize {
                width: 10,
                height: 20,
            },
            3,
            vec![0u8; 10 * 20 * 3],
        )?;
        assert_eq!(image.size().width, 10);
        assert_eq!(image.size().height, 20);
        assert_eq!(image.num_channels(), 3);
        assert!(!image.is_empty());

        Ok(())
    }

    #[test]
    fn image_wrong_length() {
        let res = Image::<f32>::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            1,
            vec![0.0; 3],
        );
        assert_eq!(res, Err(ImageError::InvalidChannelShape(3, 4)));

        let res = Image::<u8>::new(
            ImageSize {
                width: usize::MAX,
                height: 2,
            },
            1,
            vec![],
        );
        assert_eq!(res, Err(ImageError::InvalidChannelShape(0, usize::MAX)));
    }

    #[test]
    fn image_get() -> Result<(), ImageError> {
        let image = Image::<u16>::new(
            ImageSize {
                height: 2,
                width: 1,
            },
            3,
            vec![0, 1, 2, 3, 4, 5],
        )?;
        assert_eq!(image.get([1, 0, 2]), Some(&5));
        assert_eq!(image.get([2, 0, 0]), None);
        assert_eq!(image.get([0, 0, 3]), None);

        Ok(())
    }

    #[test]
    fn any_image_metadata() {
        let depth: AnyImage = Image::<f32>::from_size_val(
            ImageSize {
                width: 4,
                height: 3,
            },
            1,
            1.5,
        )
        .into();
        assert_eq!(depth.dtype(), DType::F32);
        assert_eq!(depth.shape(), [3, 4, 1]);
        assert!(!depth.is_empty());

        let empty: AnyImage = Image::<u8>::from_size_val(
            ImageSize {
                width: 0,
                height: 0,
            },
            1,
            0,
        )
        .into();
        assert!(empty.is_empty());
    }
}
