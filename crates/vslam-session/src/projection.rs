//! Projection of map points into the image, e.g. for a 2d overlay of a
//! [`FrameReport`](crate::runner::FrameReport). A standalone helper: nothing
//! in the session or runner calls it.

use crate::settings::CameraSettings;
use crate::types::Pose;

/// Points closer to the camera than this are not projected.
pub const MIN_DEPTH: f32 = 0.01;

/// Project world points into the image of a pinhole camera.
///
/// # Arguments
///
/// * `points` - The points in world coordinates.
/// * `world_to_camera` - The camera pose as a world to camera transform.
/// * `settings` - The camera intrinsics and image size.
///
/// # Returns
///
/// The pixel coordinates `[u, v]` of the points in front of the camera that
/// land inside the image, in input order.
pub fn project_points(
    points: &[[f32; 3]],
    world_to_camera: &Pose,
    settings: &CameraSettings,
) -> Vec<[f32; 2]> {
    let (width, height) = (settings.width as f32, settings.height as f32);
    points
        .iter()
        .filter_map(|p| {
            let [x, y, z] = world_to_camera.transform_point(*p);
            if z <= MIN_DEPTH {
                return None;
            }
            let u = settings.fx * x / z + settings.cx;
            let v = settings.fy * y / z + settings.cy;
            (u >= 0.0 && u < width && v >= 0.0 && v < height).then_some([u, v])
        })
        .collect()
}
