//! The interface a SLAM engine exposes to a session.
//!
//! The engine is a black box: feature extraction, mapping and loop closure
//! all happen behind this trait. Implementations may run background threads
//! of their own; the session only ever calls into the engine from the thread
//! that owns it.

use vslam_image::AnyImage;

use crate::config::SessionConfig;
use crate::error::EngineError;
use crate::types::{KeyPoint, MapPointSample, Pose, TrackingState};

/// A tracking engine owned by exactly one session.
pub trait SlamEngine: Send {
    /// Track a monocular frame. Blocks for one full pipeline pass.
    fn track_monocular(&mut self, image: &AnyImage, timestamp: f64) -> Result<Pose, EngineError>;

    /// Track a rectified stereo pair.
    fn track_stereo(
        &mut self,
        left: &AnyImage,
        right: &AnyImage,
        timestamp: f64,
    ) -> Result<Pose, EngineError>;

    /// Track a color frame with its registered depth map.
    fn track_rgbd(
        &mut self,
        image: &AnyImage,
        depth: &AnyImage,
        timestamp: f64,
    ) -> Result<Pose, EngineError>;

    /// Clear the map and the tracking state.
    fn reset(&mut self) -> Result<(), EngineError>;

    /// Stop background work and release resources.
    fn shutdown(&mut self) -> Result<(), EngineError>;

    /// Current tracking state.
    fn tracking_state(&self) -> TrackingState;

    /// Whether tracking is lost.
    fn is_lost(&self) -> bool {
        self.tracking_state() == TrackingState::Lost
    }

    /// All poses accumulated so far, oldest first.
    fn trajectory(&self) -> Result<Vec<Pose>, EngineError>;

    /// Map points associated with the keypoints of the last tracked frame.
    ///
    /// `None` entries are keypoints without a map point.
    fn tracked_map_points(&self) -> Result<Vec<Option<MapPointSample>>, EngineError>;

    /// Undistorted keypoints of the last tracked frame.
    fn tracked_keypoints_undistorted(&self) -> Result<Vec<KeyPoint>, EngineError>;
}

/// Builds an engine from a session configuration.
///
/// Loading the vocabulary and settings resources happens here; failures are
/// reported as [`EngineError::ResourceUnavailable`].
pub trait EngineFactory: Send {
    /// Construct a new engine instance.
    fn create(&self, config: &SessionConfig) -> Result<Box<dyn SlamEngine>, EngineError>;
}

impl<F> EngineFactory for F
where
    F: Fn(&SessionConfig) -> Result<Box<dyn SlamEngine>, EngineError> + Send,
{
    fn create(&self, config: &SessionConfig) -> Result<Box<dyn SlamEngine>, EngineError> {
        self(config)
    }
}
