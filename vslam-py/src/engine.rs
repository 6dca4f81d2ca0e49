use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use pyo3::exceptions::PyOSError;
use pyo3::prelude::*;

use vslam_image::AnyImage;
use vslam_session::{
    EngineError, KeyPoint, MapPointSample, Pose, SessionConfig, SlamEngine, TrackingState,
};

use crate::array::image_to_pyarray;
use crate::enums::PyTrackingState;

/// Host arrays of the frame about to be tracked.
///
/// The binding stages the caller's arrays after they decoded successfully, so
/// the engine receives them as they are instead of a re-encoded copy.
#[derive(Clone, Default)]
pub struct StagedFrames(Arc<Mutex<Vec<Py<PyAny>>>>);

impl StagedFrames {
    pub fn stage(&self, arrays: Vec<Py<PyAny>>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = arrays;
    }

    pub fn take(&self) -> Vec<Py<PyAny>> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// A host object implementing the engine protocol.
pub struct PyEngine {
    inner: Py<PyAny>,
    staged: StagedFrames,
}

fn fault(py: Python<'_>, err: PyErr) -> EngineError {
    let kind = err
        .get_type(py)
        .name()
        .map(|n| n.to_string())
        .unwrap_or_else(|_| "Exception".to_string());
    EngineError::Fault(format!("{kind}: {}", err.value(py)))
}

/// Extract a value, going through `tolist()` first for numpy arrays.
fn extract_nested<'py, T: FromPyObject<'py>>(value: Bound<'py, PyAny>) -> PyResult<T> {
    if value.hasattr("tolist")? {
        value.call_method0("tolist")?.extract()
    } else {
        value.extract()
    }
}

fn extract_state(value: &Bound<'_, PyAny>) -> PyResult<TrackingState> {
    if let Ok(state) = value.extract::<PyTrackingState>() {
        return Ok(state.into());
    }
    if let Ok(code) = value.extract::<i32>() {
        if let Some(state) = TrackingState::from_code(code) {
            return Ok(state);
        }
    }
    let name: String = value.str()?.extract()?;
    let name = name.rsplit('.').next().unwrap_or_default().to_ascii_uppercase();
    TrackingState::from_name(&name).ok_or_else(|| {
        pyo3::exceptions::PyValueError::new_err(format!("unknown tracking state {name}"))
    })
}

impl PyEngine {
    /// Build an engine by calling the host factory with the session
    /// configuration.
    pub fn create(
        factory: &Py<PyAny>,
        config: &SessionConfig,
        staged: StagedFrames,
    ) -> Result<Self, EngineError> {
        Python::with_gil(|py| {
            let vocab = config.vocab_file.to_string_lossy().into_owned();
            let settings = config.settings_file.to_string_lossy().into_owned();
            factory
                .call1(
                    py,
                    (vocab, settings, config.sensor_type.as_str(), config.use_viewer),
                )
                .map(|inner| Self { inner, staged })
                .map_err(|err| {
                    if err.is_instance_of::<PyOSError>(py) {
                        EngineError::ResourceUnavailable {
                            path: resource_path(py, &err, config),
                            reason: err.value(py).to_string(),
                        }
                    } else {
                        fault(py, err)
                    }
                })
        })
    }

    fn call<T>(
        &self,
        name: &str,
        args: impl for<'py> FnOnce(Python<'py>) -> PyResult<Vec<Bound<'py, PyAny>>>,
        convert: impl for<'py> FnOnce(Bound<'py, PyAny>) -> PyResult<T>,
    ) -> Result<T, EngineError> {
        Python::with_gil(|py| {
            let result = args(py).and_then(|args| {
                let args = pyo3::types::PyTuple::new(py, args)?;
                convert(self.inner.bind(py).call_method1(name, args)?)
            });
            result.map_err(|err| fault(py, err))
        })
    }

    fn track(
        &mut self,
        name: &str,
        images: &[&AnyImage],
        timestamp: f64,
    ) -> Result<Pose, EngineError> {
        let staged = self.staged.take();
        self.call(
            name,
            |py| {
                let mut args: Vec<Bound<'_, PyAny>> = if staged.len() == images.len() {
                    staged.into_iter().map(|array| array.into_bound(py)).collect()
                } else {
                    images
                        .iter()
                        .map(|image| image_to_pyarray(py, image))
                        .collect::<PyResult<Vec<_>>>()?
                };
                args.push(timestamp.into_pyobject(py)?.into_any());
                Ok(args)
            },
            |value| {
                if value.is_none() {
                    // engines may not report a pose before initialization
                    return Ok(Pose([[f32::NAN; 4]; 4]));
                }
                extract_nested::<[[f32; 4]; 4]>(value).map(Pose)
            },
        )
    }
}

/// The path an `OSError` names, or the vocabulary resource.
fn resource_path(py: Python<'_>, err: &PyErr, config: &SessionConfig) -> PathBuf {
    err.value(py)
        .getattr("filename")
        .and_then(|f| f.extract::<Option<String>>())
        .ok()
        .flatten()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.vocab_file.clone())
}

impl SlamEngine for PyEngine {
    fn track_monocular(&mut self, image: &AnyImage, timestamp: f64) -> Result<Pose, EngineError> {
        self.track("track_monocular", &[image], timestamp)
    }

    fn track_stereo(
        &mut self,
        left: &AnyImage,
        right: &AnyImage,
        timestamp: f64,
    ) -> Result<Pose, EngineError> {
        self.track("track_stereo", &[left, right], timestamp)
    }

    fn track_rgbd(
        &mut self,
        image: &AnyImage,
        depth: &AnyImage,
        timestamp: f64,
    ) -> Result<Pose, EngineError> {
        self.track("track_rgbd", &[image, depth], timestamp)
    }

    fn reset(&mut self) -> Result<(), EngineError> {
        self.call("reset", |_| Ok(Vec::new()), |_| Ok(()))
    }

    fn shutdown(&mut self) -> Result<(), EngineError> {
        self.call("shutdown", |_| Ok(Vec::new()), |_| Ok(()))
    }

    fn tracking_state(&self) -> TrackingState {
        self.call("tracking_state", |_| Ok(Vec::new()), |v| extract_state(&v))
            .unwrap_or_else(|err| {
                log::warn!("cannot read the tracking state, assuming lost: {err}");
                TrackingState::Lost
            })
    }

    fn trajectory(&self) -> Result<Vec<Pose>, EngineError> {
        self.call(
            "trajectory",
            |_| Ok(Vec::new()),
            |value| {
                value
                    .try_iter()?
                    .map(|pose| extract_nested::<[[f32; 4]; 4]>(pose?).map(Pose))
                    .collect()
            },
        )
    }

    fn tracked_map_points(&self) -> Result<Vec<Option<MapPointSample>>, EngineError> {
        self.call(
            "tracked_map_points",
            |_| Ok(Vec::new()),
            |value| {
                value
                    .try_iter()?
                    .map(|point| {
                        let point = point?;
                        if point.is_none() {
                            return Ok(None);
                        }
                        let (position, is_bad): (Bound<'_, PyAny>, bool) = point.extract()?;
                        Ok(Some(MapPointSample {
                            position: extract_nested(position)?,
                            is_bad,
                        }))
                    })
                    .collect()
            },
        )
    }

    fn tracked_keypoints_undistorted(&self) -> Result<Vec<KeyPoint>, EngineError> {
        self.call(
            "tracked_keypoints_undistorted",
            |_| Ok(Vec::new()),
            |value| {
                let points: Vec<[f32; 2]> = extract_nested(value)?;
                Ok(points.into_iter().map(|[x, y]| KeyPoint::at(x, y)).collect())
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{eval, namespace, with_python};
    use pyo3::ffi::c_str;
    use vslam_session::SensorType;

    fn factory(py: Python<'_>) -> PyResult<Py<PyAny>> {
        Ok(namespace(py)?
            .get_item("make_engine")?
            .ok_or_else(|| pyo3::exceptions::PyKeyError::new_err("make_engine"))?
            .unbind())
    }

    #[test]
    fn tracking_state_accepts_members_codes_and_names() -> PyResult<()> {
        with_python(|py| -> PyResult<()> {
            let g = namespace(py)?;
            let member = Bound::new(py, PyTrackingState::OK_KLT)?.into_any();
            assert_eq!(extract_state(&member)?, TrackingState::OkKlt);
            assert_eq!(extract_state(&eval(&g, c_str!("4"))?)?, TrackingState::Lost);
            assert_eq!(
                extract_state(&eval(&g, c_str!("-1"))?)?,
                TrackingState::SystemNotReady
            );
            assert_eq!(
                extract_state(&eval(&g, c_str!("'TrackingState.RECENTLY_LOST'"))?)?,
                TrackingState::RecentlyLost
            );
            assert_eq!(extract_state(&eval(&g, c_str!("'ok'"))?)?, TrackingState::Ok);
            assert!(extract_state(&eval(&g, c_str!("42"))?).is_err());
            assert!(extract_state(&eval(&g, c_str!("'DRIFTING'"))?).is_err());
            Ok(())
        })
    }

    #[test]
    fn factory_errors_are_classified() -> PyResult<()> {
        with_python(|py| -> PyResult<()> {
            let factory = factory(py)?;
            let config = SessionConfig::new("missing.txt", "cam.yaml", SensorType::Monocular);
            let Err(EngineError::ResourceUnavailable { path, .. }) =
                PyEngine::create(&factory, &config, StagedFrames::default())
            else {
                panic!("expected a missing resource");
            };
            assert_eq!(path, PathBuf::from("missing.txt"));

            let config = SessionConfig::new("broken.txt", "cam.yaml", SensorType::Monocular);
            let Err(EngineError::Fault(reason)) =
                PyEngine::create(&factory, &config, StagedFrames::default())
            else {
                panic!("expected an engine fault");
            };
            assert_eq!(reason, "ValueError: corrupt vocabulary");
            Ok(())
        })
    }

    #[test]
    fn host_engine_results_are_converted() -> Result<(), Box<dyn std::error::Error>> {
        with_python(|py| -> Result<(), Box<dyn std::error::Error>> {
            let config = SessionConfig::new("voc.txt", "cam.yaml", SensorType::Monocular);
            let mut engine = PyEngine::create(&factory(py)?, &config, StagedFrames::default())?;

            let frame: AnyImage = vslam_image::Image::<u8>::from_size_val(
                vslam_image::ImageSize {
                    width: 4,
                    height: 3,
                },
                1,
                9,
            )
            .into();
            let pose = engine.track_monocular(&frame, 0.5)?;
            assert_eq!(pose.translation(), [0.5, 0.0, 0.0]);
            assert_eq!(engine.tracking_state(), TrackingState::Ok);
            assert_eq!(engine.trajectory()?, vec![pose]);

            let points = engine.tracked_map_points()?;
            assert_eq!(points.len(), 4);
            assert_eq!(points[0], Some(MapPointSample::new([0.0, 0.5, 2.0])));
            assert!(points[1].is_none());
            assert!(points[2].is_some_and(|p| p.is_bad));
            assert!(points[3].is_some_and(|p| p.position[0].is_nan()));

            let keypoints = engine.tracked_keypoints_undistorted()?;
            assert_eq!(keypoints, vec![KeyPoint::at(1.0, 2.0), KeyPoint::at(-1.0, 3.0)]);
            Ok(())
        })
    }
}
