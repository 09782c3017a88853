//! Per-frame camera calibration export.

use crate::error::RenderError;
use bevy::math::{Mat3, Mat4};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Camera extrinsics and projection for one frame.
///
/// Both matrices are stored row-major, i.e. `rt[row][col]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    /// World-to-camera transform (inverse of the camera's world matrix)
    #[serde(rename = "RT")]
    pub rt: [[f32; 4]; 4],
    /// Projection matrix as computed by the renderer for this camera
    #[serde(rename = "K")]
    pub k: [[f32; 4]; 4],
}

impl CameraCalibration {
    /// Build from column-major glam matrices.
    pub fn from_matrices(rt: Mat4, k: Mat4) -> Self {
        Self {
            rt: to_rows(rt),
            k: to_rows(k),
        }
    }

    pub fn rt_matrix(&self) -> Mat4 {
        from_rows(&self.rt)
    }

    pub fn k_matrix(&self) -> Mat4 {
        from_rows(&self.k)
    }

    /// Determinant of RT's upper-left 3x3 block. A rigid transform gives ±1.
    pub fn rotation_determinant(&self) -> f32 {
        Mat3::from_mat4(self.rt_matrix()).determinant()
    }

    /// Both focal terms of K (`K[0][0]`, `K[1][1]`) are positive.
    pub fn has_positive_focal_terms(&self) -> bool {
        let k = self.k_matrix();
        k.x_axis.x > 0.0 && k.y_axis.y > 0.0
    }

    /// Write `{"RT": ..., "K": ...}` to `path`, replacing any existing file.
    pub fn write_json(&self, path: &Path) -> Result<(), RenderError> {
        let file = File::create(path).map_err(|e| RenderError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush().map_err(|e| RenderError::io(path, e))?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self, RenderError> {
        let file = File::open(path).map_err(|e| RenderError::io(path, e))?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

fn to_rows(m: Mat4) -> [[f32; 4]; 4] {
    m.transpose().to_cols_array_2d()
}

fn from_rows(rows: &[[f32; 4]; 4]) -> Mat4 {
    Mat4::from_cols_array_2d(rows).transpose()
}
