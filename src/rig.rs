//! Camera and light rig.
//!
//! Poses, lights and calibration are expressed in a Z-up scene frame. The
//! [`RigRoot`] entity rotates that frame into Bevy's Y-up world, and every
//! other rig entity is its descendant, so the functions here only ever deal
//! with scene-frame transforms.
//!
//! ```text
//! RigRoot (Z-up -> Y-up)
//! ├── Pivot (pose rotation)
//! │   └── RigCamera (0, 0, distance), looking at the pivot, scene +Z up
//! ├── KeyLight
//! ├── FillLight
//! └── ImportedMesh (Y-up OBJ -> Z-up)
//! ```

use crate::config::{CameraConfig, LightingConfig};
use crate::Pose;
use bevy::prelude::*;
use bevy::render::camera::{CameraProjection, PerspectiveProjection};
use std::f32::consts::{FRAC_PI_2, PI};

/// Root of the rig, carries the scene-frame to world rotation.
#[derive(Component)]
pub struct RigRoot;

/// Entity the camera orbits around, at the scene origin.
#[derive(Component)]
pub struct Pivot;

/// The capture camera.
#[derive(Component)]
pub struct RigCamera;

#[derive(Component)]
pub struct KeyLight;

#[derive(Component)]
pub struct FillLight;

/// Root of the imported mesh scene.
#[derive(Component)]
pub struct ImportedMesh;

/// Rotation from extrinsic X, then Y, then Z Euler angles (radians).
pub fn euler_xyz(x: f32, y: f32, z: f32) -> Quat {
    Quat::from_rotation_z(z) * Quat::from_rotation_y(y) * Quat::from_rotation_x(x)
}

/// Rotation of [`RigRoot`]: scene +Z becomes world +Y.
pub fn zup_to_yup() -> Quat {
    Quat::from_rotation_x(-FRAC_PI_2)
}

/// Rotation applied to the imported mesh so its Y-up OBJ data stands on the
/// scene's Z-up floor.
pub fn mesh_import_rotation() -> Quat {
    Quat::from_rotation_x(FRAC_PI_2)
}

pub fn pivot_transform(pose: &Pose) -> Transform {
    Transform::from_rotation(pose.to_quat())
}

/// Camera transform in the scene frame: at the pose position, looking at the
/// pivot with its image up leaning toward scene +Z.
pub fn camera_scene_transform(pose: &Pose) -> Transform {
    Transform::from_translation(pose.camera_position()).looking_at(Vec3::ZERO, Vec3::Z)
}

/// Camera transform relative to the pivot, so that under
/// [`pivot_transform`] it lands on [`camera_scene_transform`].
pub fn camera_local_transform(pose: &Pose) -> Transform {
    let pivot = pivot_transform(pose);
    let scene = camera_scene_transform(pose);
    let inverse = pivot.rotation.inverse();
    Transform {
        translation: inverse * scene.translation,
        rotation: inverse * scene.rotation,
        scale: Vec3::ONE,
    }
}

/// Camera world matrix in the scene frame.
pub fn camera_in_scene(pose: &Pose) -> Mat4 {
    pivot_transform(pose).compute_matrix() * camera_local_transform(pose).compute_matrix()
}

/// World-to-camera matrix in the scene frame.
pub fn view_matrix(pose: &Pose) -> Mat4 {
    camera_in_scene(pose).inverse()
}

pub fn perspective(camera: &CameraConfig) -> PerspectiveProjection {
    PerspectiveProjection {
        fov: camera.fov_radians(),
        near: camera.near_plane,
        ..default()
    }
}

/// Projection matrix the renderer uses for a `width` x `height` target.
pub fn projection_matrix(camera: &CameraConfig, width: u32, height: u32) -> Mat4 {
    let mut projection = perspective(camera);
    projection.update(width as f32, height as f32);
    projection.get_clip_from_view()
}

pub fn key_light_rotation(lighting: &LightingConfig) -> Quat {
    let [x, y, z] = lighting.key_rotation_deg;
    euler_xyz(x.to_radians(), y.to_radians(), z.to_radians())
}

/// Fill light: the key turned half a revolution about its own X axis.
pub fn fill_light_rotation(lighting: &LightingConfig) -> Quat {
    key_light_rotation(lighting) * Quat::from_rotation_x(PI)
}
