#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use vslam_image as image;

#[doc(inline)]
pub use vslam_session as session;
