#![deny(missing_docs)]
//! Dense image buffers and the array marshalling codec used at the SLAM boundary.

/// Conversion between host arrays and dense image buffers.
pub mod codec;

/// Color space conversions.
pub mod color;

/// Element types accepted at the boundary.
pub mod dtype;

/// Error types for the image module.
pub mod error;

/// image representation for the SLAM engine.
pub mod image;

pub use crate::codec::{decode, encode, ArrayRef, OwnedArray};
pub use crate::dtype::{DType, Element};
pub use crate::error::ImageError;
pub use crate::image::{AnyImage, Image, ImageSize};
