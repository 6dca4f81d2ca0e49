use pyo3::prelude::*;

use vslam_session::{SensorType, TrackingState};

#[pyclass(name = "Sensor", eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
pub enum PySensor {
    MONOCULAR,
    STEREO,
    RGBD,
    IMU_MONOCULAR,
    IMU_STEREO,
    IMU_RGBD,
}

impl From<PySensor> for SensorType {
    fn from(sensor: PySensor) -> Self {
        match sensor {
            PySensor::MONOCULAR => SensorType::Monocular,
            PySensor::STEREO => SensorType::Stereo,
            PySensor::RGBD => SensorType::Rgbd,
            PySensor::IMU_MONOCULAR => SensorType::ImuMonocular,
            PySensor::IMU_STEREO => SensorType::ImuStereo,
            PySensor::IMU_RGBD => SensorType::ImuRgbd,
        }
    }
}

impl From<SensorType> for PySensor {
    fn from(sensor: SensorType) -> Self {
        match sensor {
            SensorType::Monocular => PySensor::MONOCULAR,
            SensorType::Stereo => PySensor::STEREO,
            SensorType::Rgbd => PySensor::RGBD,
            SensorType::ImuMonocular => PySensor::IMU_MONOCULAR,
            SensorType::ImuStereo => PySensor::IMU_STEREO,
            SensorType::ImuRgbd => PySensor::IMU_RGBD,
        }
    }
}

#[pyclass(name = "TrackingState", eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
pub enum PyTrackingState {
    SYSTEM_NOT_READY = -1,
    NO_IMAGES_YET = 0,
    NOT_INITIALIZED = 1,
    OK = 2,
    RECENTLY_LOST = 3,
    LOST = 4,
    OK_KLT = 5,
}

impl From<PyTrackingState> for TrackingState {
    fn from(state: PyTrackingState) -> Self {
        match state {
            PyTrackingState::SYSTEM_NOT_READY => TrackingState::SystemNotReady,
            PyTrackingState::NO_IMAGES_YET => TrackingState::NoImagesYet,
            PyTrackingState::NOT_INITIALIZED => TrackingState::NotInitialized,
            PyTrackingState::OK => TrackingState::Ok,
            PyTrackingState::RECENTLY_LOST => TrackingState::RecentlyLost,
            PyTrackingState::LOST => TrackingState::Lost,
            PyTrackingState::OK_KLT => TrackingState::OkKlt,
        }
    }
}

impl From<TrackingState> for PyTrackingState {
    fn from(state: TrackingState) -> Self {
        match state {
            TrackingState::SystemNotReady => PyTrackingState::SYSTEM_NOT_READY,
            TrackingState::NoImagesYet => PyTrackingState::NO_IMAGES_YET,
            TrackingState::NotInitialized => PyTrackingState::NOT_INITIALIZED,
            TrackingState::Ok => PyTrackingState::OK,
            TrackingState::RecentlyLost => PyTrackingState::RECENTLY_LOST,
            TrackingState::Lost => PyTrackingState::LOST,
            TrackingState::OkKlt => PyTrackingState::OK_KLT,
        }
    }
}
