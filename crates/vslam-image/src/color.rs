use crate::error::ImageError;
use crate::image::{AnyImage, Image};

/// Convert a BGR image to grayscale.
///
/// Uses the fixed-point BT.601 luma weights, with the channels in blue, green,
/// red order as delivered by most video decoders.
///
/// # Arguments
///
/// * `src` - The input BGR image with 3 channels.
///
/// # Errors
///
/// Returns [`ImageError::InvalidNumChannels`] if `src` does not have 3 channels.
pub fn gray_from_bgr_u8(src: &Image<u8>) -> Result<Image<u8>, ImageError> {
    if src.num_channels() != 3 {
        return Err(ImageError::InvalidNumChannels(src.num_channels(), 3));
    }

    let data = src
        .as_slice()
        .chunks_exact(3)
        .map(|px| {
            let b = px[0] as u16;
            let g = px[1] as u16;
            let r = px[2] as u16;
            ((r * 77 + g * 150 + b * 29) >> 8) as u8
        })
        .collect();

    Image::new(src.size(), 1, data)
}

/// Reduce a frame to a single channel when it is an 8-bit BGR image.
///
/// Every other frame is returned unchanged.
pub fn to_gray(frame: AnyImage) -> Result<AnyImage, ImageError> {
    match frame {
        AnyImage::U8(img) if img.num_channels() == 3 => Ok(gray_from_bgr_u8(&img)?.into()),
        other => Ok(other),
    }
}
