//! The session state machine wrapping one engine instance.
//!
//! A session starts `Uninitialized`, owns a live engine only while
//! `Initialized`, and ends in the terminal `ShutDown` state. The engine lives
//! inside the `Initialized` state, so an engine exists exactly when the
//! session is initialized.
//!
//! Sessions are not meant to be driven from several threads at once; wrap
//! them in a [`SharedSession`] when that is needed so that frame processing
//! and extraction never interleave.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use vslam_image::AnyImage;

use crate::config::SessionConfig;
use crate::engine::{EngineFactory, SlamEngine};
use crate::error::SessionError;
use crate::extract::{self, BestEffort, ExtractionStatus};
use crate::types::{Pose, TrackingState};

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Configuration stored, no engine.
    Uninitialized,
    /// Owns a live engine.
    Initialized,
    /// The engine was torn down; terminal.
    ShutDown,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initialized => "initialized",
            SessionState::ShutDown => "shut down",
        };
        f.write_str(name)
    }
}

enum Slot {
    Uninitialized,
    Initialized(Box<dyn SlamEngine>),
    ShutDown,
}

/// One input frame. Images are borrowed for the duration of the call.
#[derive(Clone, Copy, Debug)]
pub enum Frame<'a> {
    /// A single image.
    Mono {
        /// Grayscale or color image.
        image: &'a AnyImage,
        /// Capture time.
        timestamp: f64,
    },
    /// A rectified stereo pair.
    Stereo {
        /// Left image.
        left: &'a AnyImage,
        /// Right image.
        right: &'a AnyImage,
        /// Capture time.
        timestamp: f64,
    },
    /// A color image with registered depth.
    Rgbd {
        /// Color or grayscale image.
        image: &'a AnyImage,
        /// Depth map.
        depth: &'a AnyImage,
        /// Capture time.
        timestamp: f64,
    },
}

impl Frame<'_> {
    /// Capture time of the frame.
    pub fn timestamp(&self) -> f64 {
        match self {
            Frame::Mono { timestamp, .. }
            | Frame::Stereo { timestamp, .. }
            | Frame::Rgbd { timestamp, .. } => *timestamp,
        }
    }
}

/// A SLAM session: configuration plus at most one engine instance.
pub struct SlamSession {
    config: SessionConfig,
    factory: Box<dyn EngineFactory>,
    slot: Slot,
}

impl fmt::Debug for SlamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlamSession")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

impl SlamSession {
    /// Create an uninitialized session. No engine is built yet.
    pub fn new(config: SessionConfig, factory: impl EngineFactory + 'static) -> Self {
        Self {
            config,
            factory: Box::new(factory),
            slot: Slot::Uninitialized,
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        match self.slot {
            Slot::Uninitialized => SessionState::Uninitialized,
            Slot::Initialized(_) => SessionState::Initialized,
            Slot::ShutDown => SessionState::ShutDown,
        }
    }

    /// Whether the session owns a live engine.
    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Initialized
    }

    /// Enable or disable the engine viewer. Takes effect on the next
    /// [`initialize`](Self::initialize).
    pub fn set_use_viewer(&mut self, use_viewer: bool) {
        self.config.use_viewer = use_viewer;
    }

    /// Build the engine from the stored configuration.
    ///
    /// # Errors
    ///
    /// * [`SessionError::AlreadyInitialized`] if an engine already exists; the
    ///   existing engine is left untouched.
    /// * [`SessionError::SessionNotReady`] once the session is shut down.
    /// * [`SessionError::Engine`] if the factory fails; the session stays
    ///   uninitialized.
    pub fn initialize(&mut self) -> Result<(), SessionError> {
        match self.slot {
            Slot::Initialized(_) => return Err(SessionError::AlreadyInitialized),
            Slot::ShutDown => return Err(SessionError::SessionNotReady(SessionState::ShutDown)),
            Slot::Uninitialized => {}
        }

        log::info!(
            "initializing {} session (vocabulary: {}, settings: {})",
            self.config.sensor_type,
            self.config.vocab_file.display(),
            self.config.settings_file.display()
        );
        let engine = self.factory.create(&self.config)?;
        self.slot = Slot::Initialized(engine);

        Ok(())
    }

    fn engine(&self) -> Result<&dyn SlamEngine, SessionError> {
        match &self.slot {
            Slot::Initialized(engine) => Ok(engine.as_ref()),
            _ => Err(SessionError::SessionNotReady(self.state())),
        }
    }

    fn engine_mut(&mut self) -> Result<&mut dyn SlamEngine, SessionError> {
        let state = self.state();
        match &mut self.slot {
            Slot::Initialized(engine) => Ok(engine.as_mut()),
            _ => Err(SessionError::SessionNotReady(state)),
        }
    }

    /// Track a monocular frame.
    ///
    /// Returns whether tracking is healthy after the frame, i.e. the engine
    /// is not lost. The pose itself is available through
    /// [`trajectory`](Self::trajectory).
    ///
    /// Calling this on a session configured for another sensor is not checked
    /// here; the engine decides what happens.
    ///
    /// # Errors
    ///
    /// * [`SessionError::SessionNotReady`] if the session is not initialized.
    /// * [`SessionError::EmptyFrame`] if the image has no data; the engine is
    ///   not called.
    /// * [`SessionError::Engine`] if tracking fails inside the engine.
    pub fn process_mono(
        &mut self,
        image: &AnyImage,
        timestamp: f64,
    ) -> Result<bool, SessionError> {
        let engine = self.engine_mut()?;
        ensure_non_empty(&[image])?;
        engine.track_monocular(image, timestamp)?;
        Ok(tracking_healthy(engine, timestamp))
    }

    /// Track a stereo pair. See [`process_mono`](Self::process_mono).
    pub fn process_stereo(
        &mut self,
        left: &AnyImage,
        right: &AnyImage,
        timestamp: f64,
    ) -> Result<bool, SessionError> {
        let engine = self.engine_mut()?;
        ensure_non_empty(&[left, right])?;
        engine.track_stereo(left, right, timestamp)?;
        Ok(tracking_healthy(engine, timestamp))
    }

    /// Track a color frame with depth. See [`process_mono`](Self::process_mono).
    pub fn process_rgbd(
        &mut self,
        image: &AnyImage,
        depth: &AnyImage,
        timestamp: f64,
    ) -> Result<bool, SessionError> {
        let engine = self.engine_mut()?;
        ensure_non_empty(&[image, depth])?;
        engine.track_rgbd(image, depth, timestamp)?;
        Ok(tracking_healthy(engine, timestamp))
    }

    /// Dispatch a [`Frame`] to the matching `process_*` call.
    pub fn process_frame(&mut self, frame: &Frame<'_>) -> Result<bool, SessionError> {
        match *frame {
            Frame::Mono { image, timestamp } => self.process_mono(image, timestamp),
            Frame::Stereo {
                left,
                right,
                timestamp,
            } => self.process_stereo(left, right, timestamp),
            Frame::Rgbd {
                image,
                depth,
                timestamp,
            } => self.process_rgbd(image, depth, timestamp),
        }
    }

    /// Clear the engine's map and tracking state. A no-op unless initialized.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if let Slot::Initialized(engine) = &mut self.slot {
            log::info!("resetting session");
            engine.reset()?;
        }
        Ok(())
    }

    /// Tear the engine down and move to the terminal `ShutDown` state.
    ///
    /// A no-op unless initialized. The transition happens even when the
    /// engine reports a fault during teardown; the fault is returned after.
    pub fn shutdown(&mut self) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.slot, Slot::ShutDown) {
            Slot::Initialized(mut engine) => {
                log::info!("shutting down session");
                engine.shutdown()?;
                Ok(())
            }
            other => {
                self.slot = other;
                Ok(())
            }
        }
    }

    /// Current engine tracking state, `None` when not initialized.
    pub fn tracking_state(&self) -> Option<TrackingState> {
        self.engine().ok().map(|engine| engine.tracking_state())
    }

    /// All finite poses accumulated by the engine, oldest first.
    ///
    /// Never fails: when the session is not initialized or the engine faults,
    /// the result is empty and its status says why.
    pub fn trajectory(&self) -> BestEffort<Pose> {
        let Ok(engine) = self.engine() else {
            return BestEffort::empty(ExtractionStatus::SessionNotReady);
        };
        match engine.trajectory() {
            Ok(poses) => BestEffort::complete(extract::finite_poses(poses)),
            Err(err) => {
                log::warn!("trajectory extraction failed: {err}");
                BestEffort::empty(ExtractionStatus::EngineFault(err))
            }
        }
    }

    /// Positions of the valid map points seen in the last tracked frame.
    ///
    /// Null, bad and non-finite points are dropped.
    pub fn map_points(&self) -> Result<Vec<[f32; 3]>, SessionError> {
        let points = self.engine()?.tracked_map_points()?;
        Ok(extract::valid_map_points(&points))
    }

    /// Map points tracked in the last frame.
    ///
    /// The engine interface only exposes the points of the last tracked
    /// frame, so this currently matches [`map_points`](Self::map_points).
    pub fn tracked_map_points(&self) -> Result<Vec<[f32; 3]>, SessionError> {
        self.map_points()
    }

    /// Number of points [`map_points`](Self::map_points) would return.
    pub fn num_map_points(&self) -> Result<usize, SessionError> {
        let points = self.engine()?.tracked_map_points()?;
        Ok(extract::count_valid_map_points(&points))
    }

    /// Up to [`MAX_KEYPOINTS`](extract::MAX_KEYPOINTS) undistorted keypoints
    /// of the last tracked frame, without negative coordinates.
    ///
    /// Empty while tracking is lost. Never fails, like
    /// [`trajectory`](Self::trajectory).
    pub fn current_keypoints(&self) -> BestEffort<[f32; 2]> {
        let Ok(engine) = self.engine() else {
            return BestEffort::empty(ExtractionStatus::SessionNotReady);
        };
        if engine.is_lost() {
            return BestEffort::empty(ExtractionStatus::TrackingLost);
        }
        match engine.tracked_keypoints_undistorted() {
            Ok(keypoints) => {
                let valid = extract::valid_keypoints(&keypoints);
                log::debug!("{} valid keypoints in the current frame", valid.len());
                BestEffort::complete(valid)
            }
            Err(err) => {
                log::warn!("keypoint extraction failed: {err}");
                BestEffort::empty(ExtractionStatus::EngineFault(err))
            }
        }
    }

    /// Move the session behind a mutex so several threads can share it.
    pub fn into_shared(self) -> SharedSession {
        SharedSession(Arc::new(Mutex::new(self)))
    }
}

impl Drop for SlamSession {
    fn drop(&mut self) {
        if let Slot::Initialized(engine) = &mut self.slot {
            log::info!("releasing engine of a dropped session");
            if let Err(err) = engine.shutdown() {
                log::warn!("engine shutdown failed during teardown: {err}");
            }
        }
    }
}

fn ensure_non_empty(images: &[&AnyImage]) -> Result<(), SessionError> {
    if images.iter().any(|image| image.is_empty()) {
        return Err(SessionError::EmptyFrame);
    }
    Ok(())
}

fn tracking_healthy(engine: &dyn SlamEngine, timestamp: f64) -> bool {
    let state = engine.tracking_state();
    log::debug!("frame at {timestamp}: tracking state {state}");
    state != TrackingState::Lost
}

/// A session shared between threads.
///
/// Every operation goes through one mutex, so a frame being processed on one
/// thread never overlaps an extraction on another.
#[derive(Clone, Debug)]
pub struct SharedSession(Arc<Mutex<SlamSession>>);

impl SharedSession {
    /// Run `f` with exclusive access to the session.
    ///
    /// A panic on another thread while it held the session does not block
    /// later callers.
    pub fn with<R>(&self, f: impl FnOnce(&mut SlamSession) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
