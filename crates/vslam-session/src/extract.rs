//! Filters applied to engine output before it leaves the session, and the
//! result type of the best-effort extraction calls.

use crate::error::EngineError;
use crate::types::{KeyPoint, MapPointSample, Pose};

/// Upper bound on the keypoints returned per frame.
pub const MAX_KEYPOINTS: usize = 200;

/// How a best-effort extraction ended.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtractionStatus {
    /// The engine answered and the items were filtered.
    Complete,
    /// The session had no engine; nothing was queried.
    SessionNotReady,
    /// The engine is lost; keypoints are not meaningful.
    TrackingLost,
    /// The engine failed during extraction; the fault was swallowed.
    EngineFault(EngineError),
}

/// Result of an extraction that never fails: on any problem the items are
/// empty and the status says why.
#[derive(Clone, Debug, PartialEq)]
pub struct BestEffort<T> {
    items: Vec<T>,
    status: ExtractionStatus,
}

impl<T> BestEffort<T> {
    /// A successful extraction.
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            status: ExtractionStatus::Complete,
        }
    }

    /// An empty result with the given reason.
    pub fn empty(status: ExtractionStatus) -> Self {
        Self {
            items: Vec::new(),
            status,
        }
    }

    /// The extracted items.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the result, keeping only the items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Why the result looks the way it does.
    pub fn status(&self) -> &ExtractionStatus {
        &self.status
    }

    /// Whether the engine answered.
    pub fn is_complete(&self) -> bool {
        self.status == ExtractionStatus::Complete
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items were extracted.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Drop every pose with a NaN or infinite entry, keeping order.
pub fn finite_poses(poses: Vec<Pose>) -> Vec<Pose> {
    poses.into_iter().filter(Pose::is_finite).collect()
}

fn is_valid_map_point(point: &Option<MapPointSample>) -> bool {
    match point {
        Some(p) => !p.is_bad && p.position.iter().all(|v| v.is_finite()),
        None => false,
    }
}

/// Positions of the points that are present, not bad and finite.
pub fn valid_map_points(points: &[Option<MapPointSample>]) -> Vec<[f32; 3]> {
    points
        .iter()
        .filter(|p| is_valid_map_point(p))
        .flatten()
        .map(|p| p.position)
        .collect()
}

/// Count of the points [`valid_map_points`] would return.
pub fn count_valid_map_points(points: &[Option<MapPointSample>]) -> usize {
    points.iter().filter(|p| is_valid_map_point(p)).count()
}

/// Pixel coordinates among the first [`MAX_KEYPOINTS`] keypoints, skipping
/// negative coordinates which mark unassociated keypoints.
pub fn valid_keypoints(keypoints: &[KeyPoint]) -> Vec<[f32; 2]> {
    keypoints
        .iter()
        .take(MAX_KEYPOINTS)
        .filter(|kp| kp.x >= 0.0 && kp.y >= 0.0)
        .map(|kp| [kp.x, kp.y])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn pose_at(x: f32) -> Pose {
        Pose::from_rotation_translation(
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            [x, 0.0, 0.0],
        )
    }

    #[test]
    fn finite_poses_keeps_order() {
        let mut broken = pose_at(1.0);
        broken.0[1][2] = f32::NAN;
        let kept = finite_poses(vec![pose_at(0.0), broken, pose_at(2.0)]);
        assert_eq!(kept, vec![pose_at(0.0), pose_at(2.0)]);
    }

    #[test]
    fn finite_poses_rejects_every_special_value() {
        let mut rng = rand::rng();
        let specials = [f32::NAN, f32::INFINITY, f32::NEG_INFINITY];

        for _ in 0..200 {
            let poses: Vec<Pose> = (0..16)
                .map(|_| {
                    let mut pose = pose_at(rng.random_range(-10.0..10.0));
                    if rng.random_bool(0.4) {
                        let r = rng.random_range(0..4);
                        let c = rng.random_range(0..4);
                        pose.0[r][c] = specials[rng.random_range(0..specials.len())];
                    }
                    pose
                })
                .collect();
            let expected = poses.iter().filter(|p| p.is_finite()).count();

            let kept = finite_poses(poses);
            assert_eq!(kept.len(), expected);
            assert!(kept
                .iter()
                .all(|p| p.0.iter().flatten().all(|v| !v.is_nan() && !v.is_infinite())));
        }
    }

    #[test]
    fn map_point_filter() {
        let points = vec![
            Some(MapPointSample::new([1.0, 2.0, 3.0])),
            None,
            Some(MapPointSample {
                position: [4.0, 5.0, 6.0],
                is_bad: true,
            }),
            Some(MapPointSample::new([f32::INFINITY, 0.0, 0.0])),
            Some(MapPointSample::new([-1.0, 0.5, 9.0])),
        ];
        let valid = valid_map_points(&points);
        assert_eq!(valid, vec![[1.0, 2.0, 3.0], [-1.0, 0.5, 9.0]]);
        assert_eq!(count_valid_map_points(&points), valid.len());
    }

    #[test]
    fn keypoint_filter_caps_and_skips_negative() {
        let mut keypoints: Vec<KeyPoint> =
            (0..250).map(|i| KeyPoint::at(i as f32, 1.0)).collect();
        keypoints[3] = KeyPoint::at(-1.0, 4.0);
        keypoints[7] = KeyPoint::at(2.0, -0.5);

        let valid = valid_keypoints(&keypoints);
        assert_eq!(valid.len(), MAX_KEYPOINTS - 2);
        assert!(valid.iter().all(|[x, y]| *x >= 0.0 && *y >= 0.0));
        assert_eq!(valid.last(), Some(&[199.0, 1.0]));
    }

    #[test]
    fn best_effort_accessors() {
        let ok = BestEffort::complete(vec![1, 2]);
        assert!(ok.is_complete());
        assert_eq!(ok.len(), 2);
        assert_eq!(ok.into_items(), vec![1, 2]);

        let fault = BestEffort::<u8>::empty(ExtractionStatus::EngineFault(EngineError::Fault(
            "boom".to_string(),
        )));
        assert!(fault.is_empty());
        assert!(!fault.is_complete());
    }
}
