//! Error type shared by every stage of a render run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while setting up the scene or recording frames.
///
/// There is no retry anywhere: the first error aborts the run.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Invalid configuration (rejected before any mesh is loaded)
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    /// Pose table missing or malformed
    #[error("Pose table {path}: {reason}")]
    PoseTable { path: PathBuf, reason: String },
    /// Mesh file not found
    #[error("Mesh not found: {0}")]
    MeshNotFound(PathBuf),
    /// Mesh file exists but the host could not import it
    #[error("Mesh import failed: {0}")]
    MeshImport(String),
    /// Bevy rendering failed
    #[error("Render failed: {0}")]
    RenderFailed(String),
    /// Scene could not be serialized for `--dump`
    #[error("Scene dump failed: {0}")]
    SceneDump(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

impl RenderError {
    /// Wrap an I/O error together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::Io {
            path: path.into(),
            source,
        }
    }
}
