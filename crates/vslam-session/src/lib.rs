#![deny(missing_docs)]
//! Session lifecycle, frame ingestion and safe result extraction for visual
//! SLAM engines.

/// Session and sensor configuration.
pub mod config;

/// The engine interface a session drives.
pub mod engine;

/// Error types for the session module.
pub mod error;

/// Filtering of engine output.
pub mod extract;

/// Pinhole projection of map points.
pub mod projection;

/// Run summaries.
pub mod record;

/// Frame sources and the monocular runner.
pub mod runner;

/// The session state machine.
pub mod session;

/// Engine settings resources.
pub mod settings;

/// Geometric value types shared with the engine.
pub mod types;

pub use crate::config::{CameraKind, SensorType, SessionConfig};
pub use crate::engine::{EngineFactory, SlamEngine};
pub use crate::error::{EngineError, SessionError};
pub use crate::extract::{BestEffort, ExtractionStatus};
pub use crate::runner::{FrameSource, MonoRunner, RunnerConfig, RunnerStep};
pub use crate::session::{Frame, SessionState, SharedSession, SlamSession};
pub use crate::settings::CameraSettings;
pub use crate::types::{KeyPoint, MapPointSample, Pose, TrackingState};
