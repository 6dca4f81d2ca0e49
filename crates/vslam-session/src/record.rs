//! Summary of a whole monocular run.

use std::collections::HashSet;
use std::path::Path;

use crate::runner::{FrameReport, FrameSource, MonoRunner, RunnerConfig, RunnerStep};
use crate::types::Pose;

/// Error types for saving a record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Error writing the file
    #[error("error writing file")]
    Io(#[from] std::io::Error),

    /// Error serializing the record
    #[error("error serializing record")]
    Json(#[from] serde_json::Error),
}

/// Progress of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Frames are still being fed.
    #[default]
    Processing,
    /// The source was exhausted.
    Completed,
    /// The run stopped early because tracking stayed lost.
    CompletedWithWarnings,
    /// The run aborted on an error.
    Failed,
}

/// A pose of a frame with enough tracked points.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrajectoryEntry {
    /// Zero-based frame index.
    pub frame: usize,
    /// Pose reported for that frame.
    pub pose: Pose,
}

/// Unique map points seen during a run, up to a fixed capacity.
///
/// Points are compared after rounding each coordinate to a millimetre.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "Vec<[f32; 3]>", into = "Vec<[f32; 3]>")]
pub struct MapAccumulator {
    points: Vec<[f32; 3]>,
    seen: HashSet<[i64; 3]>,
    capacity: usize,
}

impl MapAccumulator {
    /// An empty accumulator holding at most `capacity` points.
    pub fn new(capacity: usize) -> Self {
        Self {
            points: Vec::new(),
            seen: HashSet::new(),
            capacity,
        }
    }

    /// Add the points not seen before. Returns how many were added.
    pub fn extend(&mut self, points: &[[f32; 3]]) -> usize {
        let before = self.points.len();
        for p in points {
            if self.points.len() >= self.capacity {
                break;
            }
            if self.seen.insert(round_mm(p)) {
                self.points.push(*p);
            }
        }
        self.points.len() - before
    }

    /// The accumulated points, in insertion order.
    pub fn points(&self) -> &[[f32; 3]] {
        &self.points
    }

    /// Number of accumulated points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no point was accumulated.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the capacity is reached.
    pub fn is_full(&self) -> bool {
        self.points.len() >= self.capacity
    }
}

fn round_mm(p: &[f32; 3]) -> [i64; 3] {
    p.map(|v| (f64::from(v) * 1000.0).round() as i64)
}

impl From<Vec<[f32; 3]>> for MapAccumulator {
    fn from(points: Vec<[f32; 3]>) -> Self {
        let mut acc = Self::new(RunnerConfig::default().max_accumulated_points.max(points.len()));
        acc.extend(&points);
        acc
    }
}

impl From<MapAccumulator> for Vec<[f32; 3]> {
    fn from(acc: MapAccumulator) -> Self {
        acc.points
    }
}

/// Everything a run produced, in a form ready to be stored or served.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProcessingRecord {
    /// Frames handed to the engine.
    pub processed_frames: usize,
    /// Where the run stands.
    pub status: ProcessingStatus,
    /// Latest reported pose.
    pub current_pose: Option<Pose>,
    /// Number of points tracked in the latest reported frame.
    pub tracked_points_count: usize,
    /// Points of the latest reported frame, capped.
    pub tracked_points: Vec<[f32; 3]>,
    /// Keypoints of the latest reported frame, capped.
    pub keypoints: Vec<[f32; 2]>,
    /// Unique points seen during the run.
    pub map_points: MapAccumulator,
    /// Poses of the frames with enough tracked points.
    pub trajectory: Vec<TrajectoryEntry>,
    /// Why the run stopped early.
    pub warning: Option<String>,
    /// Why the run failed.
    pub error: Option<String>,
    #[serde(skip)]
    lost_streak: usize,
}

impl ProcessingRecord {
    /// An empty record sized for `config`.
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            processed_frames: 0,
            status: ProcessingStatus::Processing,
            current_pose: None,
            tracked_points_count: 0,
            tracked_points: Vec::new(),
            keypoints: Vec::new(),
            map_points: MapAccumulator::new(config.max_accumulated_points),
            trajectory: Vec::new(),
            warning: None,
            error: None,
            lost_streak: 0,
        }
    }

    /// Consecutive lost or low quality frames up to now.
    pub fn lost_streak(&self) -> usize {
        self.lost_streak
    }

    /// Fold one runner step into the record.
    ///
    /// Returns `true` once the lost streak reaches `max_lost_frames`, in which
    /// case the status is already set to
    /// [`CompletedWithWarnings`](ProcessingStatus::CompletedWithWarnings).
    pub fn observe(
        &mut self,
        processed_frames: usize,
        step: &RunnerStep,
        config: &RunnerConfig,
    ) -> bool {
        self.processed_frames = processed_frames;

        match step {
            RunnerStep::Finished | RunnerStep::Warming => {}
            RunnerStep::Lost => {
                self.lost_streak += 1;
                log::debug!("frame {:05}: tracking lost", processed_frames);
            }
            RunnerStep::Tracked(report) => self.observe_report(report, config),
        }

        if self.lost_streak >= config.max_lost_frames {
            log::warn!("tracking lost for {} frames, stopping", self.lost_streak);
            self.status = ProcessingStatus::CompletedWithWarnings;
            self.warning = Some(format!(
                "Tracking lost after frame {}",
                processed_frames.saturating_sub(config.max_lost_frames)
            ));
            return true;
        }
        false
    }

    fn observe_report(&mut self, report: &FrameReport, config: &RunnerConfig) {
        let tracked = report.points.len();
        self.current_pose = report.pose;
        self.tracked_points_count = tracked;
        self.tracked_points = report
            .points
            .iter()
            .take(config.max_reported_points)
            .copied()
            .collect();
        self.keypoints = report
            .keypoints
            .iter()
            .take(config.max_reported_keypoints)
            .copied()
            .collect();

        let added = self.map_points.extend(&report.points);
        if added > 0 {
            log::debug!(
                "frame {:05}: added {} map points, total {}",
                report.frame_index,
                added,
                self.map_points.len()
            );
        }

        if tracked < config.min_tracked_points {
            self.lost_streak += 1;
            log::warn!(
                "frame {:05}: low tracking quality, {} points",
                report.frame_index,
                tracked
            );
            return;
        }

        self.lost_streak = 0;
        if let Some(pose) = report.pose {
            self.trajectory.push(TrajectoryEntry {
                frame: report.frame_index,
                pose,
            });
        }
    }

    /// Write the record as pretty-printed JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), RecordError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Drive `runner` until the source is exhausted, tracking stays lost for too
/// long or an error occurs, then shut the session down.
///
/// Errors are recorded in the returned record rather than propagated.
pub fn run_to_completion<S: FrameSource>(mut runner: MonoRunner<S>) -> ProcessingRecord {
    let config = runner.config().clone();
    let mut record = ProcessingRecord::new(&config);

    loop {
        match runner.step() {
            Ok(RunnerStep::Finished) => {
                log::info!("finished after {} frames", runner.frame_index());
                record.status = ProcessingStatus::Completed;
                break;
            }
            Ok(step) => {
                if record.observe(runner.frame_index(), &step, &config) {
                    break;
                }
            }
            Err(err) => {
                log::warn!("run failed at frame {}: {err}", runner.frame_index());
                record.processed_frames = runner.frame_index();
                record.status = ProcessingStatus::Failed;
                record.error = Some(err.to_string());
                break;
            }
        }
    }

    if let Err(err) = runner.stop() {
        log::warn!("error during shutdown: {err}");
    }
    record
}
