#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use vslam_image::{AnyImage, Image, ImageSize};
use vslam_session::{
    EngineError, KeyPoint, MapPointSample, Pose, SensorType, SessionConfig, SlamEngine,
    SlamSession, TrackingState,
};

/// Everything the mock engine does, observable from the test.
#[derive(Debug, Default)]
pub struct MockState {
    pub created: usize,
    pub track_calls: usize,
    pub reset_calls: usize,
    pub shutdown_calls: usize,
    pub state_queries: usize,
    pub timestamps: Vec<f64>,
    pub last_shape: Option<[usize; 3]>,

    /// States applied after each tracked frame, `Ok` once exhausted.
    pub scripted_states: VecDeque<TrackingState>,
    pub state: TrackingState,

    pub trajectory: Vec<Pose>,
    pub map_points: Vec<Option<MapPointSample>>,
    pub keypoints: Vec<KeyPoint>,

    pub fail_create: bool,
    pub fail_track: bool,
    pub fail_shutdown: bool,
    pub fail_extraction: bool,
}

/// Shared handle to the state of every engine the factory builds.
#[derive(Clone, Debug, Default)]
pub struct MockHandle(Arc<Mutex<MockState>>);

impl MockHandle {
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().expect("mock state poisoned")
    }

    /// A session whose factory builds [`MockEngine`]s bound to this handle.
    pub fn session(&self, sensor: SensorType) -> SlamSession {
        let handle = self.clone();
        SlamSession::new(
            SessionConfig::new("vocab/ORBvoc.txt", "config/camera.yaml", sensor),
            move |config: &SessionConfig| -> Result<Box<dyn SlamEngine>, EngineError> {
                let mut state = handle.state();
                if state.fail_create {
                    return Err(EngineError::ResourceUnavailable {
                        path: config.vocab_file.clone(),
                        reason: "no such file".to_string(),
                    });
                }
                state.created += 1;
                Ok(Box::new(MockEngine(handle.clone())))
            },
        )
    }
}

pub struct MockEngine(MockHandle);

impl MockEngine {
    fn track(&mut self, timestamp: f64) -> Result<Pose, EngineError> {
        let mut state = self.0.state();
        state.track_calls += 1;
        state.timestamps.push(timestamp);
        if state.fail_track {
            return Err(EngineError::Fault("tracking exploded".to_string()));
        }

        state.state = state
            .scripted_states
            .pop_front()
            .unwrap_or(TrackingState::Ok);

        let pose = Pose::from_rotation_translation(
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            [timestamp as f32, 0.0, 0.0],
        );
        if matches!(state.state, TrackingState::Ok | TrackingState::OkKlt) {
            state.trajectory.push(pose);
        }
        Ok(pose)
    }

    fn extraction_guard(&self) -> Result<MutexGuard<'_, MockState>, EngineError> {
        let state = self.0.state();
        if state.fail_extraction {
            return Err(EngineError::Fault("extraction exploded".to_string()));
        }
        Ok(state)
    }
}

impl SlamEngine for MockEngine {
    fn track_monocular(&mut self, image: &AnyImage, timestamp: f64) -> Result<Pose, EngineError> {
        self.0.state().last_shape = Some(image.shape());
        self.track(timestamp)
    }

    fn track_stereo(
        &mut self,
        _: &AnyImage,
        _: &AnyImage,
        timestamp: f64,
    ) -> Result<Pose, EngineError> {
        self.track(timestamp)
    }

    fn track_rgbd(
        &mut self,
        _: &AnyImage,
        _: &AnyImage,
        timestamp: f64,
    ) -> Result<Pose, EngineError> {
        self.track(timestamp)
    }

    fn reset(&mut self) -> Result<(), EngineError> {
        let mut state = self.0.state();
        state.reset_calls += 1;
        state.trajectory.clear();
        state.state = TrackingState::NoImagesYet;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), EngineError> {
        let mut state = self.0.state();
        state.shutdown_calls += 1;
        if state.fail_shutdown {
            return Err(EngineError::Fault("viewer thread did not join".to_string()));
        }
        Ok(())
    }

    fn tracking_state(&self) -> TrackingState {
        let mut state = self.0.state();
        state.state_queries += 1;
        state.state
    }

    fn trajectory(&self) -> Result<Vec<Pose>, EngineError> {
        Ok(self.extraction_guard()?.trajectory.clone())
    }

    fn tracked_map_points(&self) -> Result<Vec<Option<MapPointSample>>, EngineError> {
        Ok(self.extraction_guard()?.map_points.clone())
    }

    fn tracked_keypoints_undistorted(&self) -> Result<Vec<KeyPoint>, EngineError> {
        Ok(self.extraction_guard()?.keypoints.clone())
    }
}

pub fn image_of(width: usize, height: usize, channels: usize) -> AnyImage {
    Image::<u8>::from_size_val(ImageSize { width, height }, channels, 100).into()
}

pub fn gray_frame() -> AnyImage {
    image_of(640, 480, 1)
}

pub fn empty_frame() -> AnyImage {
    image_of(0, 0, 1)
}

pub fn depth_frame() -> AnyImage {
    Image::<f32>::from_size_val(
        ImageSize {
            width: 640,
            height: 480,
        },
        1,
        1.25,
    )
    .into()
}

/// `n` healthy points followed by a null, a bad and a non-finite point.
pub fn noisy_map_points(n: usize) -> Vec<Option<MapPointSample>> {
    let mut points: Vec<_> = (0..n)
        .map(|i| Some(MapPointSample::new([i as f32 * 0.1, 0.5, 2.0])))
        .collect();
    points.push(None);
    points.push(Some(MapPointSample {
        position: [0.0, 0.0, 1.0],
        is_bad: true,
    }));
    points.push(Some(MapPointSample::new([f32::NAN, 0.0, 1.0])));
    points
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
