use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Sensor configuration the engine runs with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorType {
    /// Single camera.
    Monocular,
    /// Rectified stereo pair.
    Stereo,
    /// Color image plus registered depth.
    Rgbd,
    /// Single camera with an IMU.
    ImuMonocular,
    /// Stereo pair with an IMU.
    ImuStereo,
    /// RGB-D camera with an IMU.
    ImuRgbd,
}

/// Which `process_*` call a sensor expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraKind {
    /// `process_mono`
    Monocular,
    /// `process_stereo`
    Stereo,
    /// `process_rgbd`
    Rgbd,
}

impl SensorType {
    /// All sensor types, in host enum order.
    pub const ALL: [SensorType; 6] = [
        SensorType::Monocular,
        SensorType::Stereo,
        SensorType::Rgbd,
        SensorType::ImuMonocular,
        SensorType::ImuStereo,
        SensorType::ImuRgbd,
    ];

    /// Whether the sensor is IMU-augmented.
    pub fn is_inertial(&self) -> bool {
        matches!(
            self,
            SensorType::ImuMonocular | SensorType::ImuStereo | SensorType::ImuRgbd
        )
    }

    /// The camera arrangement, ignoring the IMU.
    pub fn camera_kind(&self) -> CameraKind {
        match self {
            SensorType::Monocular | SensorType::ImuMonocular => CameraKind::Monocular,
            SensorType::Stereo | SensorType::ImuStereo => CameraKind::Stereo,
            SensorType::Rgbd | SensorType::ImuRgbd => CameraKind::Rgbd,
        }
    }

    /// The host-facing name, e.g. `IMU_STEREO`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Monocular => "MONOCULAR",
            SensorType::Stereo => "STEREO",
            SensorType::Rgbd => "RGBD",
            SensorType::ImuMonocular => "IMU_MONOCULAR",
            SensorType::ImuStereo => "IMU_STEREO",
            SensorType::ImuRgbd => "IMU_RGBD",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown sensor name.
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("Unknown sensor type: {0}")]
pub struct ParseSensorError(pub String);

impl FromStr for SensorType {
    type Err = ParseSensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        SensorType::ALL
            .into_iter()
            .find(|sensor| sensor.as_str() == normalized)
            .ok_or_else(|| ParseSensorError(s.to_string()))
    }
}

/// Error type for loading a [`SessionConfig`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Error reading the file.
    #[error("Failed to read config file. {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing the JSON document.
    #[error("Failed to parse config. {0}")]
    Json(#[from] serde_json::Error),
}

/// Construction parameters of a SLAM session.
///
/// The paths are handed to the engine untouched; they are never opened or
/// validated by the session itself.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionConfig {
    /// Feature vocabulary resource.
    pub vocab_file: PathBuf,
    /// Camera calibration and runtime parameter resource.
    pub settings_file: PathBuf,
    /// Sensor configuration.
    pub sensor_type: SensorType,
    /// Whether the engine should open its own viewer.
    #[serde(default)]
    pub use_viewer: bool,
}

impl SessionConfig {
    /// Create a config with the viewer disabled.
    pub fn new(
        vocab_file: impl Into<PathBuf>,
        settings_file: impl Into<PathBuf>,
        sensor_type: SensorType,
    ) -> Self {
        Self {
            vocab_file: vocab_file.into(),
            settings_file: settings_file.into(),
            sensor_type,
            use_viewer: false,
        }
    }

    /// Load a config from a JSON file.
    ///
    /// ```json
    /// { "vocab_file": "ORBvoc.txt", "settings_file": "camera.yaml", "sensor_type": "MONOCULAR" }
    /// ```
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
