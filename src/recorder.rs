//! Frame recording loop.

use crate::config::RenderJob;
use crate::error::RenderError;
use crate::host::SceneHost;
use crate::layout::FramePaths;
use crate::Frame;
use bevy::log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// File the scene is dumped to, relative to the working directory.
pub const SCENE_DUMP_FILE: &str = "dump.scn.ron";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    /// Color file already existed; only the calibration was rewritten
    Skipped,
}

/// Result of a completed run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    pub rendered: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.rendered + self.skipped
    }
}

/// Record one frame: pose the rig, render unless the color file exists, then
/// always rewrite the calibration JSON.
pub fn record_frame<H: SceneHost>(
    host: &mut H,
    output_dir: &Path,
    frame: &Frame,
) -> Result<FrameOutcome, RenderError> {
    host.apply_pose(&frame.pose)?;

    let paths = FramePaths::new(output_dir, &frame.name);
    let outcome = if paths.is_rendered() {
        debug!("Skipping {} (already rendered)", paths.color.display());
        FrameOutcome::Skipped
    } else {
        host.render_to(&paths)?;
        FrameOutcome::Rendered
    };

    host.camera_calibration()?.write_json(&paths.calibration)?;
    Ok(outcome)
}

/// Record `frames` in order. The first error aborts the rest.
pub fn record_frames<H: SceneHost>(
    host: &mut H,
    output_dir: &Path,
    frames: &[Frame],
) -> Result<RunSummary, RenderError> {
    let mut summary = RunSummary {
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    };

    for (i, frame) in frames.iter().enumerate() {
        match record_frame(host, output_dir, frame)? {
            FrameOutcome::Rendered => summary.rendered += 1,
            FrameOutcome::Skipped => summary.skipped += 1,
        }
        info!("[{}/{}] {}", i + 1, frames.len(), frame.name);
    }

    Ok(summary)
}

/// Run a whole job: create the output directory, dump the scene if asked,
/// then record every frame.
pub fn run<H: SceneHost>(
    host: &mut H,
    job: &RenderJob,
    frames: &[Frame],
) -> Result<RunSummary, RenderError> {
    fs::create_dir_all(&job.output_dir).map_err(|e| RenderError::io(&job.output_dir, e))?;

    if job.dump {
        host.dump_scene(Path::new(SCENE_DUMP_FILE))?;
        info!("Scene written to {}", SCENE_DUMP_FILE);
    }

    info!(
        "Recording {} frames into {}",
        frames.len(),
        job.output_dir.display()
    );
    let summary = record_frames(host, &job.output_dir, frames)?;
    info!(
        "Done: {} rendered, {} skipped",
        summary.rendered, summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CameraCalibration;
    use crate::Pose;
    use bevy::math::Mat4;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingHost {
        poses: Vec<Pose>,
        renders: usize,
        fail_render_at: Option<usize>,
    }

    impl SceneHost for CountingHost {
        fn apply_pose(&mut self, pose: &Pose) -> Result<(), RenderError> {
            self.poses.push(*pose);
            Ok(())
        }

        fn render_to(&mut self, paths: &FramePaths) -> Result<(), RenderError> {
            if self.fail_render_at == Some(self.renders) {
                return Err(RenderError::RenderFailed("timeout".to_string()));
            }
            self.renders += 1;
            fs::write(&paths.color, b"color").map_err(|e| RenderError::io(&paths.color, e))?;
            fs::write(&paths.depth, b"depth").map_err(|e| RenderError::io(&paths.depth, e))?;
            Ok(())
        }

        fn camera_calibration(&mut self) -> Result<CameraCalibration, RenderError> {
            Ok(CameraCalibration::from_matrices(Mat4::IDENTITY, Mat4::IDENTITY))
        }

        fn dump_scene(&mut self, _path: &Path) -> Result<(), RenderError> {
            Ok(())
        }
    }

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame {
                name: format!("{:02}", i),
                pose: Pose::new(0.0, i as f32, 1.0),
            })
            .collect()
    }

    #[test]
    fn test_record_frame_renders_then_skips() {
        let dir = TempDir::new().unwrap();
        let mut host = CountingHost::default();
        let frame = &frames(1)[0];

        assert_eq!(
            record_frame(&mut host, dir.path(), frame).unwrap(),
            FrameOutcome::Rendered
        );
        assert_eq!(
            record_frame(&mut host, dir.path(), frame).unwrap(),
            FrameOutcome::Skipped
        );
        assert_eq!(host.renders, 1);
        assert_eq!(host.poses.len(), 2);
        assert!(dir.path().join("00.json").exists());
    }

    #[test]
    fn test_record_frames_counts() {
        let dir = TempDir::new().unwrap();
        let mut host = CountingHost::default();
        fs::write(dir.path().join("01.png"), b"old").unwrap();

        let summary = record_frames(&mut host, dir.path(), &frames(3)).unwrap();
        assert_eq!(summary.rendered, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(fs::read(dir.path().join("01.png")).unwrap(), b"old");
        assert!(dir.path().join("01.json").exists());
    }

    #[test]
    fn test_render_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let mut host = CountingHost {
            fail_render_at: Some(1),
            ..Default::default()
        };

        let result = record_frames(&mut host, dir.path(), &frames(3));
        assert!(matches!(result, Err(RenderError::RenderFailed(_))));
        assert!(dir.path().join("00.json").exists());
        assert!(!dir.path().join("01.json").exists());
        assert!(!dir.path().join("02.png").exists());
    }

    #[test]
    fn test_no_frames() {
        let dir = TempDir::new().unwrap();
        let mut host = CountingHost::default();
        let summary = record_frames(&mut host, dir.path(), &[]).unwrap();
        assert_eq!(summary.total(), 0);
        assert!(host.poses.is_empty());
    }
}
