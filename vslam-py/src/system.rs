use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use vslam_image::AnyImage;
use vslam_session::{
    EngineError, SessionConfig, SessionError, SessionState, SharedSession, SlamEngine,
    SlamSession,
};

use crate::array::{image_from_pyarray, matrix_to_pyarray};
use crate::engine::{PyEngine, StagedFrames};
use crate::enums::{PySensor, PyTrackingState};

fn to_pyerr(err: SessionError) -> PyErr {
    match err {
        SessionError::EmptyFrame | SessionError::InvalidInputKind(_) => {
            PyValueError::new_err(err.to_string())
        }
        SessionError::SessionNotReady(_)
        | SessionError::AlreadyInitialized
        | SessionError::Engine(_) => PyRuntimeError::new_err(err.to_string()),
    }
}

fn decode(image: &Bound<'_, PyAny>) -> PyResult<AnyImage> {
    image_from_pyarray(image).map_err(|e| to_pyerr(e.into()))
}

#[pyclass(name = "System", module = "vslam_rs")]
pub struct PySystem {
    session: SharedSession,
    staged: StagedFrames,
}

impl PySystem {
    /// Run `f` on the session without holding the GIL while waiting for it.
    fn with<R, F>(&self, py: Python<'_>, f: F) -> R
    where
        F: FnOnce(&mut SlamSession) -> R + Send,
        R: Send,
    {
        let shared = self.session.clone();
        py.allow_threads(move || shared.with(f))
    }

    fn process(
        &self,
        py: Python<'_>,
        images: &[&Bound<'_, PyAny>],
        track: impl FnOnce(&mut SlamSession, &[AnyImage]) -> Result<bool, SessionError> + Send,
    ) -> PyResult<bool> {
        // readiness is reported before the frame is looked at
        let state = self.with(py, |s| s.state());
        if state != SessionState::Initialized {
            return Err(to_pyerr(SessionError::SessionNotReady(state)));
        }
        let decoded = images
            .iter()
            .map(|image| decode(image))
            .collect::<PyResult<Vec<_>>>()?;
        self.staged
            .stage(images.iter().map(|image| (*image).clone().unbind()).collect());
        let result = self.with(py, move |s| track(s, &decoded));
        // frames rejected before reaching the engine leave their arrays staged
        self.staged.take();
        result.map_err(to_pyerr)
    }
}

#[pymethods]
impl PySystem {
    #[new]
    #[pyo3(signature = (vocab_file, settings_file, sensor_type, engine_factory))]
    pub fn new(
        vocab_file: String,
        settings_file: String,
        sensor_type: PySensor,
        engine_factory: Py<PyAny>,
    ) -> PyResult<PySystem> {
        let config = SessionConfig::new(vocab_file, settings_file, sensor_type.into());
        let staged = StagedFrames::default();
        let engine_frames = staged.clone();
        let factory = move |config: &SessionConfig| -> Result<Box<dyn SlamEngine>, EngineError> {
            let engine = PyEngine::create(&engine_factory, config, engine_frames.clone())?;
            Ok(Box::new(engine))
        };
        Ok(PySystem {
            session: SlamSession::new(config, factory).into_shared(),
            staged,
        })
    }

    pub fn initialize(&self, py: Python<'_>) -> PyResult<bool> {
        self.with(py, |s| s.initialize()).map_err(to_pyerr)?;
        Ok(true)
    }

    pub fn process_image_mono(
        &self,
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        timestamp: f64,
    ) -> PyResult<bool> {
        self.process(py, &[image], move |s, images| {
            s.process_mono(&images[0], timestamp)
        })
    }

    pub fn process_image_stereo(
        &self,
        py: Python<'_>,
        left: &Bound<'_, PyAny>,
        right: &Bound<'_, PyAny>,
        timestamp: f64,
    ) -> PyResult<bool> {
        self.process(py, &[left, right], move |s, images| {
            s.process_stereo(&images[0], &images[1], timestamp)
        })
    }

    pub fn process_image_rgbd(
        &self,
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        depth: &Bound<'_, PyAny>,
        timestamp: f64,
    ) -> PyResult<bool> {
        self.process(py, &[image, depth], move |s, images| {
            s.process_rgbd(&images[0], &images[1], timestamp)
        })
    }

    pub fn reset(&self, py: Python<'_>) -> PyResult<()> {
        self.with(py, |s| s.reset()).map_err(to_pyerr)
    }

    pub fn shutdown(&self, py: Python<'_>) -> PyResult<()> {
        self.with(py, |s| s.shutdown()).map_err(to_pyerr)
    }

    pub fn is_running(&self, py: Python<'_>) -> bool {
        self.with(py, |s| s.is_running())
    }

    pub fn set_use_viewer(&self, py: Python<'_>, use_viewer: bool) {
        self.with(py, move |s| s.set_use_viewer(use_viewer))
    }

    pub fn get_tracking_state(&self, py: Python<'_>) -> Option<PyTrackingState> {
        self.with(py, |s| s.tracking_state()).map(Into::into)
    }

    pub fn get_trajectory<'py>(&self, py: Python<'py>) -> PyResult<Vec<Bound<'py, PyAny>>> {
        let trajectory = self.with(py, |s| s.trajectory());
        trajectory
            .items()
            .iter()
            .map(|pose| matrix_to_pyarray(py, pose.0.iter().flatten().copied().collect(), 4))
            .collect()
    }

    pub fn get_map_points<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        let points = self.with(py, |s| s.map_points()).map_err(to_pyerr)?;
        matrix_to_pyarray(py, points.into_iter().flatten().collect(), 3)
    }

    pub fn get_tracked_map_points<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        let points = self.with(py, |s| s.tracked_map_points()).map_err(to_pyerr)?;
        matrix_to_pyarray(py, points.into_iter().flatten().collect(), 3)
    }

    pub fn get_current_keypoints<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        let keypoints = self.with(py, |s| s.current_keypoints()).into_items();
        matrix_to_pyarray(py, keypoints.into_iter().flatten().collect(), 2)
    }

    pub fn get_num_map_points(&self, py: Python<'_>) -> PyResult<usize> {
        self.with(py, |s| s.num_map_points()).map_err(to_pyerr)
    }

    fn __repr__(&self, py: Python<'_>) -> String {
        self.with(py, |s| {
            format!(
                "System(sensor_type: {}, state: {})",
                s.config().sensor_type,
                s.state()
            )
        })
    }
}
