use std::ffi::CStr;

use pyo3::ffi::c_str;
use pyo3::prelude::*;
use pyo3::types::PyDict;

/// A host engine following the engine protocol. `make_engine` records every
/// engine it builds in `ENGINES`.
const STUB_ENGINE: &CStr = c_str!(
    r#"
class Engine:
    def __init__(self, vocab, settings, sensor, use_viewer):
        if vocab == "missing.txt":
            raise FileNotFoundError(2, "No such file or directory", vocab)
        if vocab == "broken.txt":
            raise ValueError("corrupt vocabulary")
        self.sensor = sensor
        self.frames = []
        self.poses = []
        self.state = 2

    def track_monocular(self, image, timestamp):
        self.frames.append(image)
        pose = np.eye(4, dtype=np.float32)
        pose[0, 3] = timestamp
        self.poses.append(pose)
        return pose

    def track_stereo(self, left, right, timestamp):
        return self.track_monocular(left, timestamp)

    def track_rgbd(self, image, depth, timestamp):
        return self.track_monocular(image, timestamp)

    def reset(self):
        self.poses = []

    def shutdown(self):
        pass

    def tracking_state(self):
        return self.state

    def trajectory(self):
        return self.poses

    def tracked_map_points(self):
        return [
            ((0.0, 0.5, 2.0), False),
            None,
            ((1.0, 1.0, 1.0), True),
            (np.array([np.nan, 0.0, 1.0]), False),
        ]

    def tracked_keypoints_undistorted(self):
        return np.array([[1.0, 2.0], [-1.0, 3.0]], dtype=np.float32)


ENGINES = []


def make_engine(*args):
    engine = Engine(*args)
    ENGINES.append(engine)
    return engine
"#
);

/// Run `f` on an embedded interpreter.
pub fn with_python<F, R>(f: F) -> R
where
    F: for<'py> FnOnce(Python<'py>) -> R,
{
    pyo3::prepare_freethreaded_python();
    Python::with_gil(f)
}

/// Globals with numpy imported as `np` and the stub engine defined.
pub fn namespace(py: Python<'_>) -> PyResult<Bound<'_, PyDict>> {
    let globals = PyDict::new(py);
    globals.set_item("np", py.import("numpy")?)?;
    py.run(STUB_ENGINE, Some(&globals), None)?;
    Ok(globals)
}

pub fn eval<'py>(globals: &Bound<'py, PyDict>, code: &CStr) -> PyResult<Bound<'py, PyAny>> {
    globals.py().eval(code, Some(globals), None)
}
