//! Pose sequencing: the synthetic orbit grid and the external pose table.
//!
//! Both sequencers are pure; they only describe where the pivot and camera go
//! and what each frame is called. Nothing here touches the renderer.

use crate::error::RenderError;
use crate::{Frame, Pose};
use std::fs;
use std::path::{Path, PathBuf};

/// Camera distances of the orbit sweep, outermost loop.
pub const ORBIT_DISTANCES: [f32; 2] = [1.5, 1.2];

/// Number of pitch bands swept per distance.
pub const PITCH_BANDS: usize = 2;

/// File name of the pose table that sits next to the mesh.
pub const POSE_TABLE_NAME: &str = "renderings";

/// One pose of the orbit grid together with the indices that name it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitPose {
    /// Pitch band index (0 = first band below the pole)
    pub pitch_band: usize,
    /// Index into [`ORBIT_DISTANCES`]
    pub distance_band: usize,
    /// Azimuth label in whole degrees, `int(i * stepsize_yaw)`
    pub azimuth_deg: u32,
    /// Pivot rotation and camera distance
    pub pose: Pose,
}

impl OrbitPose {
    /// Output name, e.g. `r0d1_045`.
    pub fn frame_name(&self) -> String {
        format!(
            "r{}d{}_{:03}",
            self.pitch_band, self.distance_band, self.azimuth_deg
        )
    }

    pub fn to_frame(&self) -> Frame {
        Frame {
            name: self.frame_name(),
            pose: self.pose,
        }
    }
}

/// Generate the orbit grid: 2 distances × 2 pitch bands × `views_yaw` azimuths.
///
/// Per distance the pivot starts one pitch step below the pole and half a yaw
/// step around. Yaw is accumulated by repeated addition and is carried over
/// from the first pitch band into the second, so the second band continues
/// past 360° instead of starting again at the half step. Pitch never goes
/// below the horizon.
///
/// `views_yaw == 0` produces no poses.
pub fn generate_orbit_poses(views_yaw: usize, views_pitch: usize) -> Vec<OrbitPose> {
    if views_yaw == 0 {
        return Vec::new();
    }

    let stepsize_yaw = 360.0_f64 / views_yaw as f64;
    let stepsize_pitch = 90.0_f64 / (views_pitch as f64 + 1.0);
    let horizon = (-90.0_f64).to_radians();

    let mut poses = Vec::with_capacity(ORBIT_DISTANCES.len() * PITCH_BANDS * views_yaw);

    for (distance_band, &distance) in ORBIT_DISTANCES.iter().enumerate() {
        let mut pitch = (-stepsize_pitch).to_radians();
        let mut yaw = (stepsize_yaw / 2.0).to_radians();

        for pitch_band in 0..PITCH_BANDS {
            for i in 0..views_yaw {
                poses.push(OrbitPose {
                    pitch_band,
                    distance_band,
                    azimuth_deg: (i as f64 * stepsize_yaw) as u32,
                    pose: Pose::new(pitch.max(horizon) as f32, yaw as f32, distance),
                });
                yaw += stepsize_yaw.to_radians();
            }
            pitch -= stepsize_pitch.to_radians();
        }
    }

    poses
}

/// Orbit grid as named frames, in render order.
pub fn orbit_frames(views_yaw: usize, views_pitch: usize) -> Vec<Frame> {
    generate_orbit_poses(views_yaw, views_pitch)
        .iter()
        .map(OrbitPose::to_frame)
        .collect()
}

/// Path of the pose table for a mesh: the mesh path with its file name
/// replaced by [`POSE_TABLE_NAME`].
pub fn pose_table_path(mesh_path: &Path) -> PathBuf {
    mesh_path.with_file_name(POSE_TABLE_NAME)
}

/// One row of the pose table.
///
/// Only azimuth, elevation and distance drive the camera. The in-plane
/// rotation and field-of-view columns are parsed so malformed rows are still
/// rejected, but they are not applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseTableRow {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    /// Unused
    pub in_plane_rotation_deg: f64,
    pub distance: f64,
    /// Unused
    pub field_of_view_deg: f64,
}

impl PoseTableRow {
    /// Pivot rotation `(elevation, 0, azimuth)`, elevation taken verbatim.
    pub fn to_pose(&self) -> Pose {
        Pose::new(
            self.elevation_deg.to_radians() as f32,
            self.azimuth_deg.to_radians() as f32,
            self.distance as f32,
        )
    }
}

/// Whitespace-delimited numeric pose table, five columns per row.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseTable {
    pub path: PathBuf,
    pub rows: Vec<PoseTableRow>,
}

impl PoseTable {
    /// Number of columns every row must have.
    pub const COLUMNS: usize = 5;

    /// Load the pose table that belongs to `mesh_path`.
    pub fn for_mesh(mesh_path: &Path) -> Result<Self, RenderError> {
        Self::load(pose_table_path(mesh_path))
    }

    /// Load and parse a pose table. A missing file is fatal.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| RenderError::PoseTable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(path, &text)
    }

    /// Parse table text. `#` starts a comment; blank lines are skipped.
    pub fn parse(path: &Path, text: &str) -> Result<Self, RenderError> {
        let mut rows = Vec::new();

        for (line_idx, line) in text.lines().enumerate() {
            let content = line.split('#').next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }

            let values = content
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| RenderError::PoseTable {
                    path: path.to_path_buf(),
                    reason: format!("line {}: {}", line_idx + 1, e),
                })?;

            let [azimuth_deg, elevation_deg, in_plane_rotation_deg, distance, field_of_view_deg] =
                values[..]
            else {
                return Err(RenderError::PoseTable {
                    path: path.to_path_buf(),
                    reason: format!(
                        "line {}: expected {} columns, found {}",
                        line_idx + 1,
                        Self::COLUMNS,
                        values.len()
                    ),
                });
            };

            rows.push(PoseTableRow {
                azimuth_deg,
                elevation_deg,
                in_plane_rotation_deg,
                distance,
                field_of_view_deg,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One frame per row, in row order, named `00`, `01`, ...
    pub fn frames(&self) -> Vec<Frame> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| Frame {
                name: format!("{:02}", i),
                pose: row.to_pose(),
            })
            .collect()
    }
}
