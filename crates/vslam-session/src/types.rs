use std::fmt;

/// A 4x4 rigid transform, row-major, as produced by the engine per frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pose(pub [[f32; 4]; 4]);

impl Pose {
    /// The identity transform.
    pub fn identity() -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self(m)
    }

    /// Build a transform from a row-major rotation and a translation.
    pub fn from_rotation_translation(rotation: [[f32; 3]; 3], translation: [f32; 3]) -> Self {
        let mut m = Self::identity().0;
        for r in 0..3 {
            m[r][..3].copy_from_slice(&rotation[r]);
            m[r][3] = translation[r];
        }
        Self(m)
    }

    /// Whether every entry is finite (no NaN or infinity).
    pub fn is_finite(&self) -> bool {
        self.0.iter().flatten().all(|v| v.is_finite())
    }

    /// The translation column.
    pub fn translation(&self) -> [f32; 3] {
        [self.0[0][3], self.0[1][3], self.0[2][3]]
    }

    /// Apply the transform to a 3d point.
    pub fn transform_point(&self, p: [f32; 3]) -> [f32; 3] {
        let m = &self.0;
        let mut out = [0.0; 3];
        for (r, o) in out.iter_mut().enumerate() {
            *o = m[r][0] * p[0] + m[r][1] * p[1] + m[r][2] * p[2] + m[r][3];
        }
        out
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// A map point as reported by the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapPointSample {
    /// World position.
    pub position: [f32; 3],
    /// The engine has invalidated this point; it is still allocated but
    /// semantically absent.
    pub is_bad: bool,
}

impl MapPointSample {
    /// A healthy point at `position`.
    pub fn new(position: [f32; 3]) -> Self {
        Self {
            position,
            is_bad: false,
        }
    }
}

/// An undistorted 2d keypoint of the most recently tracked frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KeyPoint {
    /// Column in pixels.
    pub x: f32,
    /// Row in pixels.
    pub y: f32,
    /// Diameter of the keypoint neighbourhood.
    pub size: f32,
    /// Orientation in degrees, `-1` if not applicable.
    pub angle: f32,
    /// Detector response.
    pub response: f32,
    /// Pyramid level the keypoint was extracted from.
    pub octave: i32,
}

impl KeyPoint {
    /// A keypoint at `(x, y)` with the remaining attributes zeroed.
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }
}

/// Tracking state of the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TrackingState {
    /// The engine is still loading.
    SystemNotReady,
    /// No frame was processed yet.
    #[default]
    NoImagesYet,
    /// Frames are arriving but the map is not initialized.
    NotInitialized,
    /// Tracking successfully.
    Ok,
    /// Lost tracking recently, attempting recovery.
    RecentlyLost,
    /// Completely lost, needs relocalization.
    Lost,
    /// Tracking through optical flow.
    OkKlt,
}

impl TrackingState {
    /// All states, ordered by their numeric code.
    pub const ALL: [TrackingState; 7] = [
        TrackingState::SystemNotReady,
        TrackingState::NoImagesYet,
        TrackingState::NotInitialized,
        TrackingState::Ok,
        TrackingState::RecentlyLost,
        TrackingState::Lost,
        TrackingState::OkKlt,
    ];

    /// The engine's numeric code, `-1` for `SystemNotReady` up to `5` for
    /// `OkKlt`.
    pub fn code(&self) -> i32 {
        match self {
            TrackingState::SystemNotReady => -1,
            TrackingState::NoImagesYet => 0,
            TrackingState::NotInitialized => 1,
            TrackingState::Ok => 2,
            TrackingState::RecentlyLost => 3,
            TrackingState::Lost => 4,
            TrackingState::OkKlt => 5,
        }
    }

    /// The state with the given numeric code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// The upper-case engine name, e.g. `RECENTLY_LOST`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingState::SystemNotReady => "SYSTEM_NOT_READY",
            TrackingState::NoImagesYet => "NO_IMAGES_YET",
            TrackingState::NotInitialized => "NOT_INITIALIZED",
            TrackingState::Ok => "OK",
            TrackingState::RecentlyLost => "RECENTLY_LOST",
            TrackingState::Lost => "LOST",
            TrackingState::OkKlt => "OK_KLT",
        }
    }

    /// The state with the given upper-case engine name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
