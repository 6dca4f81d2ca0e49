mod array;
mod engine;
mod enums;
mod system;

#[cfg(test)]
mod testing;

use pyo3::prelude::*;

use crate::enums::{PySensor, PyTrackingState};
use crate::system::PySystem;

pub fn get_version() -> String {
    let version = env!("CARGO_PKG_VERSION").to_string();
    // cargo uses "1.0-alpha1" while python uses "1.0.0a1"
    version.replace("-alpha", "a").replace("-beta", "b")
}

#[pymodule]
pub fn vslam_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // RUST_LOG controls the verbosity of the wrapped crates
    let _ = env_logger::try_init();

    m.add("__version__", get_version())?;
    m.add_class::<PySystem>()?;
    m.add_class::<PySensor>()?;
    m.add_class::<PyTrackingState>()?;
    Ok(())
}
