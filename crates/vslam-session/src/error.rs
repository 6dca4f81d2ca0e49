use std::path::PathBuf;

use vslam_image::ImageError;

use crate::session::SessionState;

/// Faults raised by a SLAM engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A vocabulary or settings resource could not be opened or parsed.
    #[error("Failed to load engine resource {path}: {reason}")]
    ResourceUnavailable {
        /// Path of the resource.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },

    /// Any other engine-internal failure.
    #[error("Engine fault: {0}")]
    Fault(String),
}

/// An error type for the session module.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The operation needs an initialized session.
    #[error("Session is not ready (state: {0}), call initialize() first")]
    SessionNotReady(SessionState),

    /// A supplied image has no backing data.
    #[error("Frame has an empty image")]
    EmptyFrame,

    /// The session already owns an engine.
    #[error("Session is already initialized")]
    AlreadyInitialized,

    /// The boundary codec could not interpret the input as an image.
    #[error("Invalid input kind. {0}")]
    InvalidInputKind(#[from] ImageError),

    /// Fault propagated from the engine.
    #[error("{0}")]
    Engine(#[from] EngineError),
}
