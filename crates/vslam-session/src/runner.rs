//! Frame-by-frame driver for monocular sessions.

use std::collections::VecDeque;

use vslam_image::{color, AnyImage};

use crate::config::{CameraKind, SensorType};
use crate::error::SessionError;
use crate::session::{SessionState, SlamSession};
use crate::types::Pose;

/// Error types for frame sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source could not be opened.
    #[error("Cannot open frame source: {0}")]
    Open(String),

    /// A frame could not be read or decoded.
    #[error("Failed to read frame {index}: {reason}")]
    Read {
        /// Index of the frame that failed.
        index: usize,
        /// What went wrong.
        reason: String,
    },
}

/// An error type for the runner module.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The frame source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The session rejected a call.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The runner only drives single camera sessions.
    #[error("Unsupported sensor {0}, the runner expects a monocular session")]
    UnsupportedSensor(SensorType),
}

/// A sequential supply of frames, e.g. a decoded video.
pub trait FrameSource {
    /// The next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<AnyImage>, SourceError>;

    /// Nominal frame rate, if known.
    fn fps(&self) -> Option<f64>;
}

/// Frames held in memory.
#[derive(Clone, Debug, Default)]
pub struct VecSource {
    frames: VecDeque<AnyImage>,
    fps: Option<f64>,
}

impl VecSource {
    /// Create a source yielding `frames` in order.
    pub fn new(frames: Vec<AnyImage>, fps: Option<f64>) -> Self {
        Self {
            frames: frames.into(),
            fps,
        }
    }

    /// Number of frames left.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Result<Option<AnyImage>, SourceError> {
        Ok(self.frames.pop_front())
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }
}

/// Tuning of the runner and of the processing record.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Frames processed before any report is produced.
    pub min_init_frames: usize,
    /// Consecutive lost or low quality frames that stop a run.
    pub max_lost_frames: usize,
    /// Seconds between frames when the source has no usable frame rate.
    pub default_frame_interval: f64,
    /// Fewer tracked points than this marks a low quality frame.
    pub min_tracked_points: usize,
    /// Cap on the current points kept per report.
    pub max_reported_points: usize,
    /// Cap on the keypoints kept per report.
    pub max_reported_keypoints: usize,
    /// Cap on the accumulated unique map points.
    pub max_accumulated_points: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            min_init_frames: 20,
            max_lost_frames: 50,
            default_frame_interval: 0.033,
            min_tracked_points: 15,
            max_reported_points: 500,
            max_reported_keypoints: 200,
            max_accumulated_points: 5000,
        }
    }
}

/// What the engine produced for a tracked frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// Zero-based index of the frame.
    pub frame_index: usize,
    /// The most recent pose, if the trajectory is not empty.
    pub pose: Option<Pose>,
    /// All poses so far.
    pub trajectory: Vec<Pose>,
    /// Valid map points of the frame.
    pub points: Vec<[f32; 3]>,
    /// Valid keypoints of the frame.
    pub keypoints: Vec<[f32; 2]>,
}

/// Outcome of one [`MonoRunner::step`].
#[derive(Clone, Debug, PartialEq)]
pub enum RunnerStep {
    /// The source is exhausted.
    Finished,
    /// Tracking is healthy but the warm-up period is not over yet.
    Warming,
    /// The engine lost tracking on this frame.
    Lost,
    /// Tracking is healthy and reported.
    Tracked(FrameReport),
}

/// Feeds frames of a [`FrameSource`] to a monocular session.
///
/// Timestamps are synthesised from the frame index and the source frame rate.
/// Color frames are reduced to grayscale before tracking.
#[derive(Debug)]
pub struct MonoRunner<S: FrameSource> {
    session: SlamSession,
    source: S,
    config: RunnerConfig,
    dt: f64,
    frame_index: usize,
}

impl<S: FrameSource> MonoRunner<S> {
    /// Create a runner, initializing the session if needed.
    ///
    /// # Errors
    ///
    /// * [`RunnerError::UnsupportedSensor`] if the session is not monocular.
    /// * [`RunnerError::Session`] if the session cannot be initialized.
    pub fn new(
        mut session: SlamSession,
        source: S,
        config: RunnerConfig,
    ) -> Result<Self, RunnerError> {
        let sensor = session.config().sensor_type;
        if sensor.camera_kind() != CameraKind::Monocular {
            return Err(RunnerError::UnsupportedSensor(sensor));
        }
        if session.state() != SessionState::Initialized {
            session.initialize()?;
        }

        let dt = match source.fps() {
            Some(fps) if fps > 0.0 => 1.0 / fps,
            _ => config.default_frame_interval,
        };
        log::debug!("runner frame interval {dt:.4}s");

        Ok(Self {
            session,
            source,
            config,
            dt,
            frame_index: 0,
        })
    }

    /// The driven session.
    pub fn session(&self) -> &SlamSession {
        &self.session
    }

    /// The runner configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Number of frames handed to the engine so far.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Seconds between consecutive timestamps.
    pub fn frame_interval(&self) -> f64 {
        self.dt
    }

    /// Read one frame from the source and track it.
    pub fn step(&mut self) -> Result<RunnerStep, RunnerError> {
        let Some(frame) = self.source.next_frame()? else {
            return Ok(RunnerStep::Finished);
        };

        let timestamp = self.frame_index as f64 * self.dt;
        let gray = color::to_gray(frame).map_err(SessionError::from)?;
        let healthy = self.session.process_mono(&gray, timestamp)?;
        self.frame_index += 1;

        if !healthy {
            return Ok(RunnerStep::Lost);
        }
        if self.frame_index <= self.config.min_init_frames {
            return Ok(RunnerStep::Warming);
        }

        let trajectory = self.session.trajectory().into_items();
        let points = self.session.tracked_map_points()?;
        let keypoints = self.session.current_keypoints().into_items();

        Ok(RunnerStep::Tracked(FrameReport {
            frame_index: self.frame_index - 1,
            pose: trajectory.last().copied(),
            trajectory,
            points,
            keypoints,
        }))
    }

    /// Shut the session down. Further steps fail with a not-ready error.
    pub fn stop(&mut self) -> Result<(), RunnerError> {
        self.session.shutdown()?;
        Ok(())
    }
}
