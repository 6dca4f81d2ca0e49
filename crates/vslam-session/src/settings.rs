//! Camera parameters of an engine settings resource.
//!
//! Settings resources are OpenCV-style YAML documents with flat dotted keys,
//! e.g. `Camera1.fx: 458.654`. Only the pinhole intrinsics and the image
//! geometry are read here; everything else is left to the engine.
//!
//! These are standalone helpers: sessions hand the settings path to the
//! engine untouched. They prepare a resource for an uncalibrated camera before
//! a session is built, and supply the intrinsics
//! [`project_points`](crate::projection::project_points) needs.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

/// Error types for the settings module.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Error reading or writing file
    #[error("error reading or writing file")]
    Io(#[from] std::io::Error),

    /// A required key is absent.
    #[error("Missing settings key {0}")]
    MissingKey(&'static str),

    /// The resource is not a YAML document.
    #[error("Malformed settings document")]
    Yaml(#[from] serde_yaml::Error),

    /// A key holds a value of the wrong type.
    #[error("Parse error {0}")]
    Parse(String),
}

/// Pinhole intrinsics and image geometry of the first camera.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraSettings {
    /// Focal length along x in pixels.
    pub fx: f32,
    /// Focal length along y in pixels.
    pub fy: f32,
    /// Principal point x in pixels.
    pub cx: f32,
    /// Principal point y in pixels.
    pub cy: f32,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Frame rate.
    pub fps: f32,
}

impl CameraSettings {
    /// Rough intrinsics for an uncalibrated camera: a field of view of about
    /// 60 degrees and the principal point at the image centre.
    pub fn approximate(width: u32, height: u32, fps: f32) -> Self {
        let focal = width.max(height) as f32 * 1.2;
        Self {
            fx: focal,
            fy: focal,
            cx: width as f32 / 2.0,
            cy: height as f32 / 2.0,
            width,
            height,
            fps,
        }
    }

    /// Parse settings from the contents of a settings resource.
    pub fn parse(contents: &str) -> Result<Self, SettingsError> {
        let e = parse_document(contents)?;

        // newer files prefix the camera index, older ones do not
        Ok(Self {
            fx: lookup(&e, &["Camera1.fx", "Camera.fx"])?,
            fy: lookup(&e, &["Camera1.fy", "Camera.fy"])?,
            cx: lookup(&e, &["Camera1.cx", "Camera.cx"])?,
            cy: lookup(&e, &["Camera1.cy", "Camera.cy"])?,
            width: lookup(&e, &["Camera.width"])?,
            height: lookup(&e, &["Camera.height"])?,
            fps: lookup(&e, &["Camera.fps"])?,
        })
    }
}

/// The top level mapping of a settings document.
///
/// OpenCV writes a `%YAML:1.0` directive that YAML 1.2 parsers reject, so
/// directive lines are dropped before parsing.
fn parse_document(contents: &str) -> Result<Mapping, SettingsError> {
    let body = contents
        .lines()
        .filter(|line| !line.starts_with('%'))
        .collect::<Vec<_>>()
        .join("\n");
    let document: Option<Mapping> = serde_yaml::from_str(&body)?;
    Ok(document.unwrap_or_default())
}

fn lookup<T: DeserializeOwned>(
    entries: &Mapping,
    keys: &[&'static str],
) -> Result<T, SettingsError> {
    let (key, value) = keys
        .iter()
        .find_map(|k| entries.get(*k).map(|v| (*k, v)))
        .ok_or(SettingsError::MissingKey(keys[0]))?;
    parse_value(key, value)
}

fn parse_value<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T, SettingsError> {
    serde_yaml::from_value(value.clone())
        .map_err(|e| SettingsError::Parse(format!("{key}: {e}")))
}

/// Read the camera settings of a settings resource.
pub fn read_camera_settings(path: impl AsRef<Path>) -> Result<CameraSettings, SettingsError> {
    let contents = std::fs::read_to_string(path)?;
    CameraSettings::parse(&contents)
}

/// Rewrite a settings template for `settings`.
///
/// The intrinsics, the image size and the frame rate are replaced, distortion
/// coefficients are zeroed and the resize target is set to the native size.
/// Both `Camera1.*` and legacy `Camera.*` intrinsics are rewritten. Lines for
/// keys not present in the template are not added.
pub fn render_settings(template: &str, settings: &CameraSettings) -> String {
    let mut replacements: Vec<(String, String)> = Vec::new();
    for camera in ["Camera1", "Camera"] {
        let intrinsics = [
            ("fx", format!("{:.1}", settings.fx)),
            ("fy", format!("{:.1}", settings.fy)),
            ("cx", format!("{:.1}", settings.cx)),
            ("cy", format!("{:.1}", settings.cy)),
            ("k1", "0.0".to_string()),
            ("k2", "0.0".to_string()),
            ("p1", "0.0".to_string()),
            ("p2", "0.0".to_string()),
        ];
        replacements.extend(
            intrinsics
                .into_iter()
                .map(|(name, value)| (format!("{camera}.{name}"), value)),
        );
    }
    replacements.extend([
        ("Camera.width".to_string(), settings.width.to_string()),
        ("Camera.height".to_string(), settings.height.to_string()),
        ("Camera.fps".to_string(), (settings.fps as u32).to_string()),
        ("Camera.newWidth".to_string(), settings.width.to_string()),
        ("Camera.newHeight".to_string(), settings.height.to_string()),
    ]);

    let mut out = String::with_capacity(template.len());
    for line in template.lines() {
        let key = line.split(':').next().unwrap_or_default().trim();
        match replacements.iter().find(|(k, _)| k == key) {
            Some((k, value)) => out.push_str(&format!("{k}: {value}")),
            None => out.push_str(line),
        }
        out.push('\n');
    }
    out
}

/// Render a template and write it to `path`.
pub fn write_settings(
    path: impl AsRef<Path>,
    template: &str,
    settings: &CameraSettings,
) -> Result<(), SettingsError> {
    let path = path.as_ref();
    std::fs::write(path, render_settings(template, settings))?;
    log::info!(
        "wrote settings {} (fx={}, fy={}, cx={}, cy={})",
        path.display(),
        settings.fx,
        settings.fy,
        settings.cx,
        settings.cy
    );
    Ok(())
}
