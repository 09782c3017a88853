//! The seam between frame recording and the 3D engine.

use crate::calibration::CameraCalibration;
use crate::error::RenderError;
use crate::layout::FramePaths;
use crate::Pose;
use std::path::Path;

/// A scene with a posed camera rig that can render and report calibration.
///
/// [`crate::render::BevyHost`] is the GPU implementation; tests drive the
/// recorder with an in-memory host.
pub trait SceneHost {
    /// Set the pivot rotation and camera distance, and propagate transforms
    /// so the following calls observe the new pose.
    fn apply_pose(&mut self, pose: &Pose) -> Result<(), RenderError>;

    /// Render the current pose and write `paths.color` and `paths.depth`.
    fn render_to(&mut self, paths: &FramePaths) -> Result<(), RenderError>;

    /// Calibration of the camera at the current pose.
    fn camera_calibration(&mut self) -> Result<CameraCalibration, RenderError>;

    /// Serialize the scene for debugging.
    fn dump_scene(&mut self, path: &Path) -> Result<(), RenderError>;
}
