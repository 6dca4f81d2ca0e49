/// An error type for the image module.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    /// The external object cannot be interpreted as an image.
    #[error("Invalid input kind: {0}")]
    InvalidInputKind(String),

    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when the number of channels is not the expected one.
    #[error("Invalid number of channels: got {0}, expected {1}")]
    InvalidNumChannels(usize, usize),
}
