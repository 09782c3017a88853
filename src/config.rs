//! Command-line options and the validated settings they turn into.
//!
//! Both binaries share [`CommonArgs`]; each adds its own options and builds a
//! [`RenderJob`] through `into_job`, which rejects bad configuration before
//! any mesh is touched.

use crate::error::RenderError;
use crate::layout;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Bits per channel of the color PNG.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorDepth {
    #[value(name = "8")]
    Eight,
    #[default]
    #[value(name = "16")]
    Sixteen,
}

impl ColorDepth {
    pub fn bits(self) -> u8 {
        match self {
            ColorDepth::Eight => 8,
            ColorDepth::Sixteen => 16,
        }
    }
}

impl fmt::Display for ColorDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Container of the depth channel. OpenEXR is the only supported format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DepthFormat {
    #[default]
    OpenExr,
}

impl DepthFormat {
    /// Parse the `--format` value.
    pub fn parse(s: &str) -> Result<Self, RenderError> {
        match s {
            "OPEN_EXR" => Ok(DepthFormat::OpenExr),
            other => Err(RenderError::InvalidConfig(format!(
                "unsupported format '{}', only OPEN_EXR is supported",
                other
            ))),
        }
    }
}

/// Light rig configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct LightingConfig {
    /// Key light illuminance in lux (default: daylight ambient, 10 000)
    pub key_illuminance: f32,
    /// Fill light illuminance as a fraction of the key (default: 0.015)
    pub fill_ratio: f32,
    /// Key light XYZ Euler rotation in degrees, in the Z-up scene frame
    pub key_rotation_deg: [f32; 3],
    /// Ambient light brightness (default: 0.0)
    pub ambient_brightness: f32,
    /// Enable shadows (default: false)
    pub shadows_enabled: bool,
    /// Specular response of imported materials (default: false)
    pub specular_enabled: bool,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            key_illuminance: 10_000.0,
            fill_ratio: 0.015,
            key_rotation_deg: [37.26, 3.16, 106.94],
            ambient_brightness: 0.0,
            shadows_enabled: false,
            specular_enabled: false,
        }
    }
}

impl LightingConfig {
    pub fn fill_illuminance(&self) -> f32 {
        self.key_illuminance * self.fill_ratio
    }
}

/// Perspective camera parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    /// Lens focal length in millimetres (default: 35)
    pub focal_length_mm: f32,
    /// Sensor width in millimetres (default: 32)
    pub sensor_width_mm: f32,
    /// Near clipping plane (default: 0.1)
    pub near_plane: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            focal_length_mm: 35.0,
            sensor_width_mm: 32.0,
            near_plane: 0.1,
        }
    }
}

impl CameraConfig {
    /// Field of view across the sensor, in radians.
    ///
    /// For a square target this is also the vertical field of view.
    pub fn fov_radians(&self) -> f32 {
        2.0 * (self.sensor_width_mm / (2.0 * self.focal_length_mm)).atan()
    }
}

/// Mesh cleanup applied after import.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshCleanup {
    /// Uniform scale applied to positions (default: 1.0)
    pub scale: f32,
    pub remove_doubles: bool,
    /// Positions closer than this are merged (default: 1e-4)
    pub merge_distance: f32,
    pub edge_split: bool,
    /// Edges sharper than this angle in radians shade hard (default: 1.32645)
    pub split_angle: f32,
}

impl Default for MeshCleanup {
    fn default() -> Self {
        Self {
            scale: 1.0,
            remove_doubles: true,
            merge_distance: 1e-4,
            edge_split: true,
            split_angle: 1.32645,
        }
    }
}

impl MeshCleanup {
    /// True when cleanup would change nothing.
    pub fn is_noop(&self) -> bool {
        self.scale == 1.0 && !self.remove_doubles && !self.edge_split
    }
}

/// Everything the host needs to know to render frames.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    /// Square render target edge in pixels (default: 256)
    pub resolution: u32,
    pub color_depth: ColorDepth,
    pub depth_format: DepthFormat,
    /// Worker threads of the host task pools
    pub threads: usize,
    pub cleanup: MeshCleanup,
    pub lighting: LightingConfig,
    pub camera: CameraConfig,
    /// Updates run after the scene is ready and before the first capture
    pub warmup_frames: u32,
    /// Wall-clock limit for loading the mesh and for each capture
    pub timeout: Duration,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::orbit_default()
    }
}

impl RenderSettings {
    /// Orbit sweep: 2 threads, 16-bit color.
    pub fn orbit_default() -> Self {
        Self {
            resolution: 256,
            color_depth: ColorDepth::Sixteen,
            depth_format: DepthFormat::OpenExr,
            threads: 2,
            cleanup: MeshCleanup::default(),
            lighting: LightingConfig::default(),
            camera: CameraConfig::default(),
            warmup_frames: 30,
            timeout: Duration::from_secs(60),
        }
    }

    /// Pose table: 4 threads, 8-bit color.
    pub fn table_default() -> Self {
        Self {
            color_depth: ColorDepth::Eight,
            threads: 4,
            ..Self::orbit_default()
        }
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.resolution == 0 {
            return Err(RenderError::InvalidConfig(
                "resolution must be greater than zero".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(RenderError::InvalidConfig(
                "thread count must be greater than zero".to_string(),
            ));
        }
        if !(self.cleanup.scale.is_finite() && self.cleanup.scale > 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "scale must be a positive number, got {}",
                self.cleanup.scale
            )));
        }
        Ok(())
    }
}

/// A validated run: one mesh, one output directory.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderJob {
    pub mesh: PathBuf,
    pub output_dir: PathBuf,
    /// Write `dump.scn.ron` before the first frame
    pub dump: bool,
    pub settings: RenderSettings,
}

/// Options shared by both programs.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to the obj file to be rendered.
    #[arg(value_name = "OBJ")]
    pub obj: PathBuf,

    /// The path the output will be dumped to.
    #[arg(long = "output_folder", value_name = "DIR", default_value = "/tmp")]
    pub output_folder: PathBuf,

    /// Save the scene rig to dump.scn.ron.
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump: bool,

    /// Scaling factor applied to model.
    #[arg(long, default_value_t = 1.0)]
    pub scale: f32,

    /// Remove double vertices to improve mesh quality.
    #[arg(
        long = "remove_doubles",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub remove_doubles: bool,

    /// Split edges sharper than 76 degrees.
    #[arg(
        long = "edge_split",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub edge_split: bool,

    /// Edge length of the square output images.
    #[arg(long, default_value_t = 256)]
    pub resolution: u32,
}

impl CommonArgs {
    fn apply(&self, settings: &mut RenderSettings) {
        settings.resolution = self.resolution;
        settings.cleanup.scale = self.scale;
        settings.cleanup.remove_doubles = self.remove_doubles;
        settings.cleanup.edge_split = self.edge_split;
    }

    fn into_job(self, settings: RenderSettings) -> Result<RenderJob, RenderError> {
        settings.validate()?;
        if !self.obj.is_file() {
            return Err(RenderError::MeshNotFound(self.obj));
        }
        Ok(RenderJob {
            output_dir: layout::output_dir(&self.output_folder, &self.obj),
            mesh: self.obj,
            dump: self.dump,
            settings,
        })
    }
}

/// Renders a mesh from a sweep of camera poses around it.
#[derive(Parser, Debug, Clone)]
#[command(name = "render-orbit", version, about)]
pub struct OrbitArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Number of azimuth steps per pitch band.
    #[arg(long = "views_yaw", default_value_t = 16)]
    pub views_yaw: usize,

    /// Controls the pitch step, 90 / (views_pitch + 1) degrees.
    #[arg(long = "views_pitch", default_value_t = 2)]
    pub views_pitch: usize,

    /// Number of bits per channel used for the color output.
    #[arg(long = "color_depth", value_enum, default_value_t = ColorDepth::Sixteen)]
    pub color_depth: ColorDepth,

    /// Format of the depth files. Only OPEN_EXR is supported.
    #[arg(long, default_value = "OPEN_EXR")]
    pub format: String,
}

impl OrbitArgs {
    pub fn into_job(self) -> Result<RenderJob, RenderError> {
        let mut settings = RenderSettings::orbit_default();
        settings.depth_format = DepthFormat::parse(&self.format)?;
        settings.color_depth = self.color_depth;
        self.common.apply(&mut settings);
        self.common.into_job(settings)
    }
}

/// Renders a mesh from the camera poses listed in its `renderings` table.
#[derive(Parser, Debug, Clone)]
#[command(name = "render_table", version, about)]
pub struct TableArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl TableArgs {
    pub fn into_job(self) -> Result<RenderJob, RenderError> {
        let mut settings = RenderSettings::table_default();
        self.common.apply(&mut settings);
        self.common.into_job(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::fs;
    use std::path::Path;

    fn mesh_in(dir: &Path) -> PathBuf {
        let models = dir.join("02958343").join("1a0bc9").join("models");
        fs::create_dir_all(&models).unwrap();
        let mesh = models.join("model.obj");
        fs::write(&mesh, "v 0 0 0\n").unwrap();
        mesh
    }

    #[test]
    fn test_orbit_defaults() {
        let args = OrbitArgs::parse_from(["render-orbit", "model.obj"]);
        assert_eq!(args.views_yaw, 16);
        assert_eq!(args.views_pitch, 2);
        assert_eq!(args.color_depth, ColorDepth::Sixteen);
        assert_eq!(args.format, "OPEN_EXR");
        assert_eq!(args.common.output_folder, PathBuf::from("/tmp"));
        assert!(!args.common.dump);
        assert_eq!(args.common.scale, 1.0);
        assert!(args.common.remove_doubles);
        assert!(args.common.edge_split);
        assert_eq!(args.common.resolution, 256);
    }

    #[test]
    fn test_orbit_underscore_options() {
        let args = OrbitArgs::parse_from([
            "render-orbit",
            "--views_yaw",
            "8",
            "--views_pitch",
            "1",
            "--color_depth",
            "8",
            "--output_folder",
            "/data/out",
            "--dump",
            "model.obj",
        ]);
        assert_eq!(args.views_yaw, 8);
        assert_eq!(args.views_pitch, 1);
        assert_eq!(args.color_depth, ColorDepth::Eight);
        assert_eq!(args.common.output_folder, PathBuf::from("/data/out"));
        assert!(args.common.dump);
    }

    #[test]
    fn test_bool_options_accept_words() {
        let args = TableArgs::parse_from([
            "render_table",
            "--remove_doubles",
            "false",
            "--edge_split",
            "no",
            "model.obj",
        ]);
        assert!(!args.common.remove_doubles);
        assert!(!args.common.edge_split);

        let args = TableArgs::parse_from(["render_table", "--edge_split", "1", "model.obj"]);
        assert!(args.common.edge_split);
    }

    #[test]
    fn test_invalid_color_depth_rejected() {
        let result = OrbitArgs::try_parse_from(["render-orbit", "--color_depth", "12", "m.obj"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_depth_format_parse() {
        assert_eq!(DepthFormat::parse("OPEN_EXR").unwrap(), DepthFormat::OpenExr);
        assert!(matches!(
            DepthFormat::parse("PNG"),
            Err(RenderError::InvalidConfig(_))
        ));
        assert!(DepthFormat::parse("open_exr").is_err());
    }

    #[test]
    fn test_bad_format_fails_before_mesh_lookup() {
        // The mesh does not exist; the format error must win.
        let args = OrbitArgs::parse_from(["render-orbit", "--format", "PNG", "/missing/model.obj"]);
        assert!(matches!(args.into_job(), Err(RenderError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_mesh() {
        let args = TableArgs::parse_from(["render_table", "/missing/model.obj"]);
        assert!(matches!(args.into_job(), Err(RenderError::MeshNotFound(_))));
    }

    #[test]
    fn test_orbit_job() {
        let dir = tempfile::TempDir::new().unwrap();
        let mesh = mesh_in(dir.path());
        let out = dir.path().join("out");

        let args = OrbitArgs::parse_from([
            OsString::from("render-orbit"),
            OsString::from("--output_folder"),
            out.clone().into_os_string(),
            OsString::from("--scale"),
            OsString::from("0.5"),
            mesh.clone().into_os_string(),
        ]);
        let job = args.into_job().unwrap();

        assert_eq!(job.mesh, mesh);
        assert_eq!(job.output_dir, out.join("02958343").join("1a0bc9"));
        assert_eq!(job.settings.threads, 2);
        assert_eq!(job.settings.color_depth, ColorDepth::Sixteen);
        assert_eq!(job.settings.cleanup.scale, 0.5);
        assert!(!job.dump);
    }

    #[test]
    fn test_table_job_uses_eight_bit_color() {
        let dir = tempfile::TempDir::new().unwrap();
        let mesh = mesh_in(dir.path());

        let args = TableArgs::parse_from([
            OsString::from("render_table"),
            mesh.clone().into_os_string(),
        ]);
        let job = args.into_job().unwrap();
        assert_eq!(job.settings.color_depth, ColorDepth::Eight);
        assert_eq!(job.settings.threads, 4);
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let mut settings = RenderSettings::orbit_default();
        settings.resolution = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_non_positive_scale_rejected() {
        let mut settings = RenderSettings::table_default();
        settings.cleanup.scale = 0.0;
        assert!(settings.validate().is_err());
        settings.cleanup.scale = f32::NAN;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_camera_fov() {
        let fov = CameraConfig::default().fov_radians();
        assert!((fov - 0.857_556).abs() < 1e-5);
    }

    #[test]
    fn test_lighting_defaults() {
        let lighting = LightingConfig::default();
        assert!(!lighting.shadows_enabled);
        assert!(!lighting.specular_enabled);
        assert!((lighting.fill_illuminance() - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_cleanup_noop() {
        assert!(!MeshCleanup::default().is_noop());
        let off = MeshCleanup {
            remove_doubles: false,
            edge_split: false,
            ..MeshCleanup::default()
        };
        assert!(off.is_noop());
    }
}
