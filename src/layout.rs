//! Output directory and per-frame file naming.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Identifier of a mesh: the two path components above the directory that
/// contains the mesh file.
///
/// For `.../02958343/1a0bc9/models/model.obj` this is `["02958343", "1a0bc9"]`.
/// Shallower paths yield fewer components.
pub fn model_identifier(mesh_path: &Path) -> Vec<OsString> {
    let parts: Vec<OsString> = mesh_path
        .parent()
        .map(|dir| {
            dir.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_os_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    // Drop the mesh's own directory, keep the two above it.
    let end = parts.len().saturating_sub(1);
    let start = end.saturating_sub(2);
    parts[start..end].to_vec()
}

/// Directory all outputs for `mesh_path` are written to.
pub fn output_dir(output_folder: &Path, mesh_path: &Path) -> PathBuf {
    let mut dir = output_folder.to_path_buf();
    for part in model_identifier(mesh_path) {
        dir.push(part);
    }
    dir
}

/// The three files produced for one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePaths {
    /// `output_dir/<name>`, no extension
    pub prefix: PathBuf,
    pub color: PathBuf,
    pub depth: PathBuf,
    pub calibration: PathBuf,
}

impl FramePaths {
    pub fn new(output_dir: &Path, frame_name: &str) -> Self {
        let prefix = output_dir.join(frame_name);
        Self {
            color: with_suffix(&prefix, ".png"),
            depth: with_suffix(&prefix, "_depth.exr"),
            calibration: with_suffix(&prefix, ".json"),
            prefix,
        }
    }

    /// True when the color image is already on disk and rendering can be skipped.
    pub fn is_rendered(&self) -> bool {
        self.color.exists()
    }
}

// `Path::with_extension` would eat anything after a dot in the frame name.
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut s = prefix.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}
