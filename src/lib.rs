//! bevy-orbit-render: multi-view color, depth and calibration renders of a mesh
//!
//! Renders a single textured mesh from a fixed set of camera poses and writes,
//! per pose, a color PNG, a 32-bit OpenEXR depth image and a JSON file with
//! the camera extrinsics (`RT`) and projection (`K`). Used to produce training
//! data for multi-view 3D learning.
//!
//! Two pose sources are supported:
//!
//! - an orbit sweep around the mesh ([`pose::orbit_frames`]), used by
//!   `render-orbit`
//! - a `renderings` table stored next to the mesh ([`pose::PoseTable`]), used
//!   by `render_table`
//!
//! # Usage
//!
//! ```ignore
//! use bevy_orbit_render::{pose, recorder, BevyHost, OrbitArgs};
//! use clap::Parser;
//!
//! let job = OrbitArgs::parse().into_job()?;
//! let frames = pose::orbit_frames(16, 2);
//! let mut host = BevyHost::open(&job.mesh, &job.settings)?;
//! let summary = recorder::run(&mut host, &job, &frames)?;
//! ```
//!
//! Rendering a frame whose color PNG already exists is skipped, so an
//! interrupted run can simply be restarted. Calibration JSON is always
//! rewritten.

pub mod calibration;
pub mod cleanup;
pub mod config;
pub mod depth;
pub mod encode;
pub mod error;
pub mod host;
pub mod layout;
pub mod pose;
pub mod recorder;
pub mod render;
pub mod rig;

pub use calibration::CameraCalibration;
pub use config::{
    CameraConfig, ColorDepth, DepthFormat, LightingConfig, MeshCleanup, OrbitArgs, RenderJob,
    RenderSettings, TableArgs,
};
pub use error::RenderError;
pub use host::SceneHost;
pub use layout::FramePaths;
pub use recorder::{FrameOutcome, RunSummary};
pub use render::BevyHost;

// Re-export bevy math types for downstream use
pub use bevy::prelude::{Mat4, Quat, Transform, Vec3};

/// Pivot rotation plus camera distance.
///
/// Angles are radians, applied to the pivot as extrinsic X (pitch), then Y
/// (roll), then Z (yaw) rotations in the Z-up scene frame. The camera sits
/// `distance` along the rotated pivot's +Z axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
    pub distance: f32,
}

impl Pose {
    /// Pose with zero roll.
    pub fn new(pitch: f32, yaw: f32, distance: f32) -> Self {
        Self {
            pitch,
            roll: 0.0,
            yaw,
            distance,
        }
    }

    pub fn to_quat(&self) -> Quat {
        rig::euler_xyz(self.pitch, self.roll, self.yaw)
    }

    /// Camera position in the scene frame.
    pub fn camera_position(&self) -> Vec3 {
        self.to_quat() * Vec3::new(0.0, 0.0, self.distance)
    }
}

/// A pose and the name its output files are written under.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub name: String,
    pub pose: Pose,
}
