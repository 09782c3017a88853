//! Headless Bevy scene host.
//!
//! [`BevyHost`] owns a windowless Bevy [`App`] that is driven by hand with
//! [`App::update`]. The camera renders into an off-screen RGBA image; color is
//! read back through a [`Screenshot`] of that image and depth through
//! [`DepthReadbackNode`], which copies the view depth texture into a staging
//! buffer right after the main pass.
//!
//! Pipelined rendering is disabled so a capture requested in one update is
//! rendered and read back within that same update's render world run.
//!
//! # Running Requirements
//!
//! A GPU adapter is required. On servers without one, a software Vulkan
//! driver (llvmpipe) works:
//! ```bash
//! WGPU_BACKEND=vulkan render-orbit model.obj
//! ```

use bevy::app::PluginsState;
use bevy::asset::LoadState;
use bevy::core::{TaskPoolOptions, TaskPoolPlugin};
use bevy::core_pipeline::tonemapping::{DebandDither, Tonemapping};
use bevy::ecs::query::QueryItem;
use bevy::prelude::*;
use bevy::render::camera::{ExtractedCamera, RenderTarget};
use bevy::render::pipelined_rendering::PipelinedRenderingPlugin;
use bevy::render::primitives::Aabb;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_graph::{
    NodeRunError, RenderGraphApp, RenderGraphContext, RenderLabel, ViewNode, ViewNodeRunner,
};
use bevy::render::render_resource::{
    Buffer, BufferDescriptor, BufferUsages, Extent3d, ImageCopyBuffer, ImageCopyTexture,
    ImageDataLayout, Maintain, MapMode, Origin3d, TextureAspect, TextureDimension, TextureFormat,
    TextureUsages,
};
use bevy::render::renderer::{RenderContext, RenderDevice};
use bevy::render::settings::{RenderCreation, WgpuSettings};
use bevy::render::view::screenshot::{Screenshot, ScreenshotCaptured};
use bevy::render::view::ViewDepthTexture;
use bevy::render::{Extract, Render, RenderApp, RenderPlugin, RenderSet};
use bevy::scene::SceneInstanceReady;
use bevy::tasks::tick_global_task_pools_on_main_thread;
use bevy::window::ExitCondition;
use bevy::winit::WinitPlugin;
use bevy_obj::ObjPlugin;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::calibration::CameraCalibration;
use crate::config::RenderSettings;
use crate::error::RenderError;
use crate::host::SceneHost;
use crate::layout::FramePaths;
use crate::rig::{self, FillLight, ImportedMesh, KeyLight, Pivot, RigCamera, RigRoot};
use crate::config::ColorDepth;
use crate::encode::ColorPixels;
use crate::{cleanup, depth, encode, Pose};

/// Shared buffer the screenshot observer writes into: (color, width, height)
#[derive(Resource, Clone, Default)]
struct SharedImageBuffer(Arc<Mutex<Option<(ColorPixels, u32, u32)>>>);

/// Shared buffer for raw NDC depth from GPU readback: (ndc, width, height)
#[derive(Resource, Clone, Default)]
struct SharedDepthBuffer(Arc<Mutex<Option<(Vec<f32>, u32, u32)>>>);

fn take_shared<T>(buffer: &Mutex<Option<T>>) -> Option<T> {
    buffer.lock().ok().and_then(|mut guard| guard.take())
}

/// Everything the startup and update systems need to build and prepare the rig.
#[derive(Resource, Clone)]
struct HostConfig {
    mesh_file: String,
    settings: RenderSettings,
    target: Handle<Image>,
}

/// Progress of scene import and preparation
#[derive(Resource, Default)]
struct HostState {
    scene_ready: bool,
    meshes_prepared: bool,
}

/// Handle for the loaded mesh scene
#[derive(Resource)]
struct LoadedScene(Handle<Scene>);

// ============================================================================
// Depth Readback
// ============================================================================

/// Request to capture depth, extracted from main world to render world.
/// Stays set for exactly one update.
#[derive(Resource, Default, Clone)]
struct DepthCaptureRequest {
    requested: bool,
}

/// Staging buffer filled by the render node, mapped in the cleanup set.
struct PendingDepthCapture {
    buffer: Buffer,
    width: u32,
    height: u32,
}

#[derive(Resource, Default)]
struct PendingDepthCaptureQueue(Arc<Mutex<Vec<PendingDepthCapture>>>);

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
struct DepthReadbackLabel;

/// Render node that copies the camera's depth texture to a staging buffer.
#[derive(Default)]
struct DepthReadbackNode;

impl ViewNode for DepthReadbackNode {
    type ViewQuery = (&'static ViewDepthTexture, &'static ExtractedCamera);

    fn run<'w>(
        &self,
        _graph: &mut RenderGraphContext,
        render_context: &mut RenderContext<'w>,
        (view_depth_texture, camera): QueryItem<'w, Self::ViewQuery>,
        world: &'w World,
    ) -> Result<(), NodeRunError> {
        let Some(request) = world.get_resource::<DepthCaptureRequest>() else {
            return Ok(());
        };
        if !request.requested {
            return Ok(());
        }
        let Some(queue) = world.get_resource::<PendingDepthCaptureQueue>() else {
            return Ok(());
        };
        let Some(size) = camera.physical_target_size else {
            return Ok(());
        };
        let (width, height) = (size.x, size.y);

        let render_device = world.resource::<RenderDevice>();
        let padded_bytes_per_row = depth::align_byte_size(width * 4);

        let staging_buffer = render_device.create_buffer(&BufferDescriptor {
            label: Some("depth_staging_buffer"),
            size: depth::aligned_buffer_size(width, height),
            usage: BufferUsages::COPY_DST | BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        render_context.command_encoder().copy_texture_to_buffer(
            ImageCopyTexture {
                texture: &view_depth_texture.texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::DepthOnly,
            },
            ImageCopyBuffer {
                buffer: &staging_buffer,
                layout: ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        if let Ok(mut pending) = queue.0.lock() {
            pending.push(PendingDepthCapture {
                buffer: staging_buffer,
                width,
                height,
            });
        }

        Ok(())
    }
}

/// Registers the depth readback node between the main pass and tonemapping.
struct DepthReadbackPlugin {
    shared_depth: SharedDepthBuffer,
}

impl Plugin for DepthReadbackPlugin {
    fn build(&self, app: &mut App) {
        use bevy::core_pipeline::core_3d::graph::{Core3d, Node3d};

        app.insert_resource(self.shared_depth.clone());
        app.init_resource::<DepthCaptureRequest>();

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            error!("Failed to get RenderApp for depth readback");
            return;
        };

        render_app.insert_resource(self.shared_depth.clone());
        render_app.init_resource::<PendingDepthCaptureQueue>();
        render_app.add_systems(ExtractSchedule, extract_depth_request);
        render_app.add_systems(Render, collect_depth_captures.in_set(RenderSet::Cleanup));
        render_app
            .add_render_graph_node::<ViewNodeRunner<DepthReadbackNode>>(Core3d, DepthReadbackLabel)
            .add_render_graph_edges(
                Core3d,
                (Node3d::EndMainPass, DepthReadbackLabel, Node3d::Tonemapping),
            );
    }
}

fn extract_depth_request(mut commands: Commands, request: Extract<Res<DepthCaptureRequest>>) {
    commands.insert_resource(DepthCaptureRequest {
        requested: request.requested,
    });
}

/// Map the staging buffers submitted this frame and publish the depth values.
///
/// Runs after queue submission; blocks on the device until the copy is done.
fn collect_depth_captures(
    queue: Res<PendingDepthCaptureQueue>,
    shared_depth: Res<SharedDepthBuffer>,
    render_device: Res<RenderDevice>,
) {
    let pending_captures = {
        let Ok(mut pending) = queue.0.lock() else {
            return;
        };
        std::mem::take(&mut *pending)
    };

    for pending in pending_captures {
        let buffer_slice = pending.buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        render_device.poll(Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {
                let data = buffer_slice.get_mapped_range();
                let ndc = depth::extract_depth_with_alignment(&data, pending.width, pending.height);
                drop(data);
                pending.buffer.unmap();

                match ndc {
                    Ok(ndc) => {
                        if let Ok(mut guard) = shared_depth.0.lock() {
                            *guard = Some((ndc, pending.width, pending.height));
                        }
                    }
                    Err(e) => error!("Depth readback: {}", e),
                }
            }
            Ok(Err(e)) => error!("Failed to map depth buffer: {:?}", e),
            Err(e) => error!("Depth buffer mapping channel closed: {:?}", e),
        }
    }
}

// ============================================================================
// Scene Setup
// ============================================================================

/// Build the rig and start loading the mesh.
fn setup_scene(mut commands: Commands, asset_server: Res<AssetServer>, config: Res<HostConfig>) {
    let settings = &config.settings;
    let lighting = &settings.lighting;

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: lighting.ambient_brightness,
    });

    let scene_handle: Handle<Scene> = asset_server.load(config.mesh_file.clone());
    commands.insert_resource(LoadedScene(scene_handle.clone()));

    commands
        .spawn((
            Transform::from_rotation(rig::zup_to_yup()),
            Visibility::default(),
            RigRoot,
            Name::new("Root"),
        ))
        .with_children(|root| {
            root.spawn((
                Transform::IDENTITY,
                Visibility::default(),
                Pivot,
                Name::new("Pivot"),
            ))
            .with_children(|pivot| {
                pivot.spawn((
                    Camera3d {
                        depth_texture_usages: (TextureUsages::RENDER_ATTACHMENT
                            | TextureUsages::COPY_SRC)
                            .into(),
                        ..default()
                    },
                    Camera {
                        target: RenderTarget::Image(config.target.clone()),
                        clear_color: ClearColorConfig::Custom(Color::NONE),
                        // Float intermediate textures for 16-bit output
                        hdr: settings.color_depth == ColorDepth::Sixteen,
                        ..default()
                    },
                    Projection::Perspective(rig::perspective(&settings.camera)),
                    // Depth cannot be copied out of a multisampled texture
                    Msaa::Off,
                    Tonemapping::None,
                    DebandDither::Disabled,
                    rig::camera_local_transform(&Pose::new(0.0, 0.0, 1.5)),
                    RigCamera,
                    Name::new("Camera"),
                ));
            });

            root.spawn((
                DirectionalLight {
                    illuminance: lighting.key_illuminance,
                    shadows_enabled: lighting.shadows_enabled,
                    ..default()
                },
                Transform::from_rotation(rig::key_light_rotation(lighting)),
                KeyLight,
                Name::new("KeyLight"),
            ));

            root.spawn((
                DirectionalLight {
                    illuminance: lighting.fill_illuminance(),
                    shadows_enabled: lighting.shadows_enabled,
                    ..default()
                },
                Transform::from_rotation(rig::fill_light_rotation(lighting)),
                FillLight,
                Name::new("FillLight"),
            ));

            root.spawn((
                SceneRoot(scene_handle),
                Transform::from_rotation(rig::mesh_import_rotation()),
                ImportedMesh,
                Name::new("Mesh"),
            ))
            .observe(on_scene_ready);
        });

    info!("Scene setup complete");
}

fn on_scene_ready(_trigger: Trigger<SceneInstanceReady>, mut state: ResMut<HostState>) {
    state.scene_ready = true;
    info!("Mesh scene spawned");
}

/// Clean up every imported mesh once and switch off specular on its materials.
#[allow(clippy::too_many_arguments)]
fn prepare_imported_meshes(
    mut commands: Commands,
    mut state: ResMut<HostState>,
    config: Res<HostConfig>,
    roots: Query<Entity, With<ImportedMesh>>,
    children: Query<&Children>,
    mesh_query: Query<(&Mesh3d, Option<&MeshMaterial3d<StandardMaterial>>)>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if !state.scene_ready || state.meshes_prepared {
        return;
    }

    let cleanup = &config.settings.cleanup;
    let specular = config.settings.lighting.specular_enabled;
    let mut seen_meshes = HashSet::new();
    let mut seen_materials = HashSet::new();

    for root in &roots {
        for entity in children.iter_descendants(root) {
            let Ok((mesh3d, material)) = mesh_query.get(entity) else {
                continue;
            };

            if seen_meshes.insert(mesh3d.0.id()) {
                if let Some(mesh) = meshes.get_mut(&mesh3d.0) {
                    if !cleanup.is_noop() {
                        if let Some(stats) = cleanup::apply(mesh, cleanup) {
                            debug!("Mesh cleanup: {}", stats);
                        }
                    }
                } else {
                    warn!("Imported mesh {:?} has no data", mesh3d.0.id());
                }
            }
            // Bounds are recomputed from the cleaned mesh.
            commands.entity(entity).remove::<Aabb>();

            if let Some(material) = material {
                if !specular && seen_materials.insert(material.0.id()) {
                    if let Some(mat) = materials.get_mut(&material.0) {
                        mat.reflectance = 0.0;
                    }
                }
            }
        }
    }

    if seen_meshes.is_empty() {
        warn!("Mesh scene contains no meshes");
    } else {
        info!(
            "Prepared {} meshes, {} materials",
            seen_meshes.len(),
            seen_materials.len()
        );
    }
    state.meshes_prepared = true;
}

// ============================================================================
// Host
// ============================================================================

/// Bevy implementation of [`SceneHost`].
pub struct BevyHost {
    app: App,
    settings: RenderSettings,
    target: Handle<Image>,
    shared_image: SharedImageBuffer,
    shared_depth: SharedDepthBuffer,
}

impl BevyHost {
    /// Start the headless app, import `mesh` and build the rig.
    ///
    /// Returns once the mesh is loaded, cleaned up, and the renderer has run
    /// `settings.warmup_frames` updates.
    pub fn open(mesh: &Path, settings: &RenderSettings) -> Result<Self, RenderError> {
        settings.validate()?;
        if !mesh.is_file() {
            return Err(RenderError::MeshNotFound(mesh.to_path_buf()));
        }
        let mesh_dir = mesh
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .canonicalize()
            .map_err(|e| RenderError::io(mesh, e))?;
        let mesh_file = mesh
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .ok_or_else(|| RenderError::MeshNotFound(mesh.to_path_buf()))?;

        let shared_image = SharedImageBuffer::default();
        let shared_depth = SharedDepthBuffer::default();

        let mut app = App::new();
        app.add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: None,
                    exit_condition: ExitCondition::DontExit,
                    close_when_requested: false,
                })
                .set(AssetPlugin {
                    file_path: mesh_dir.to_string_lossy().into_owned(),
                    ..default()
                })
                .set(TaskPoolPlugin {
                    task_pool_options: TaskPoolOptions::with_num_threads(settings.threads),
                })
                .set(RenderPlugin {
                    render_creation: RenderCreation::Automatic(WgpuSettings::default()),
                    synchronous_pipeline_compilation: true,
                })
                .disable::<WinitPlugin>()
                .disable::<PipelinedRenderingPlugin>(),
        )
        .add_plugins(ObjPlugin)
        .add_plugins(DepthReadbackPlugin {
            shared_depth: shared_depth.clone(),
        })
        .init_resource::<HostState>()
        .add_systems(Startup, setup_scene)
        .add_systems(Update, prepare_imported_meshes);

        // Renderer initialization finishes asynchronously.
        while app.plugins_state() == PluginsState::Adding {
            tick_global_task_pools_on_main_thread();
        }
        app.finish();
        app.cleanup();

        let target = app
            .world_mut()
            .resource_mut::<Assets<Image>>()
            .add(render_target_image(settings.resolution, settings.color_depth));
        app.insert_resource(HostConfig {
            mesh_file,
            settings: settings.clone(),
            target: target.clone(),
        });

        let mut host = Self {
            app,
            settings: settings.clone(),
            target,
            shared_image,
            shared_depth,
        };
        host.wait_for_scene(mesh)?;

        for _ in 0..host.settings.warmup_frames {
            host.app.update();
        }
        info!("Ready to capture");
        Ok(host)
    }

    fn wait_for_scene(&mut self, mesh: &Path) -> Result<(), RenderError> {
        let start = Instant::now();
        loop {
            self.app.update();

            let world = self.app.world();
            if let Some(scene) = world.get_resource::<LoadedScene>() {
                let asset_server = world.resource::<AssetServer>();
                if let Some(LoadState::Failed(err)) = asset_server.get_load_state(&scene.0) {
                    return Err(RenderError::MeshImport(format!(
                        "{}: {}",
                        mesh.display(),
                        err
                    )));
                }
                let state = world.resource::<HostState>();
                if state.meshes_prepared && asset_server.is_loaded_with_dependencies(&scene.0) {
                    return Ok(());
                }
            }

            if start.elapsed() > self.settings.timeout {
                return Err(RenderError::MeshImport(format!(
                    "timed out loading {}",
                    mesh.display()
                )));
            }
        }
    }

    /// Render one frame and return (color, ndc depth, width, height).
    fn capture(&mut self) -> Result<(ColorPixels, Vec<f32>, u32, u32), RenderError> {
        take_shared(&self.shared_image.0);
        take_shared(&self.shared_depth.0);

        let image_buffer = self.shared_image.0.clone();
        self.app
            .world_mut()
            .spawn(Screenshot::image(self.target.clone()))
            .observe(move |trigger: Trigger<ScreenshotCaptured>| {
                let image: &Image = trigger.event();
                let size = image.size();
                match screenshot_pixels(image) {
                    Ok(pixels) => {
                        if let Ok(mut guard) = image_buffer.lock() {
                            *guard = Some((pixels, size.x, size.y));
                        }
                    }
                    Err(e) => error!("Unreadable screenshot: {}", e),
                }
            });

        self.app
            .world_mut()
            .resource_mut::<DepthCaptureRequest>()
            .requested = true;
        self.app.update();
        self.app
            .world_mut()
            .resource_mut::<DepthCaptureRequest>()
            .requested = false;

        let start = Instant::now();
        let mut color = None;
        let mut depth = None;
        loop {
            color = color.or_else(|| take_shared(&self.shared_image.0));
            depth = depth.or_else(|| take_shared(&self.shared_depth.0));

            if let (Some((rgba, w, h)), Some((ndc, dw, dh))) = (&color, &depth) {
                if (*w, *h) != (*dw, *dh) {
                    return Err(RenderError::RenderFailed(format!(
                        "color is {}x{} but depth is {}x{}",
                        w, h, dw, dh
                    )));
                }
                return Ok((rgba.clone(), ndc.clone(), *w, *h));
            }

            if start.elapsed() > self.settings.timeout {
                return Err(RenderError::RenderFailed(format!(
                    "capture timed out (color: {}, depth: {})",
                    color.is_some(),
                    depth.is_some()
                )));
            }
            self.app.update();
        }
    }
}

/// Off-screen color target. 16-bit output renders into a linear float
/// texture and is sRGB-encoded on the CPU.
fn render_target_image(resolution: u32, color_depth: ColorDepth) -> Image {
    let size = Extent3d {
        width: resolution,
        height: resolution,
        depth_or_array_layers: 1,
    };
    let (format, clear): (TextureFormat, &[u8]) = match color_depth {
        ColorDepth::Eight => (TextureFormat::Rgba8UnormSrgb, &[0; 4]),
        ColorDepth::Sixteen => (TextureFormat::Rgba32Float, &[0; 16]),
    };
    let mut image = Image::new_fill(
        size,
        TextureDimension::D2,
        clear,
        format,
        RenderAssetUsages::default(),
    );
    image.texture_descriptor.usage = TextureUsages::TEXTURE_BINDING
        | TextureUsages::COPY_DST
        | TextureUsages::COPY_SRC
        | TextureUsages::RENDER_ATTACHMENT;
    image
}

fn screenshot_pixels(image: &Image) -> Result<ColorPixels, String> {
    match image.texture_descriptor.format {
        TextureFormat::Rgba32Float => Ok(ColorPixels::Linear(
            image
                .data
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )),
        _ => image
            .clone()
            .try_into_dynamic()
            .map(|dynamic| ColorPixels::Srgb8(dynamic.to_rgba8().into_raw()))
            .map_err(|e| format!("{:?}", e)),
    }
}

impl SceneHost for BevyHost {
    fn apply_pose(&mut self, pose: &Pose) -> Result<(), RenderError> {
        let world = self.app.world_mut();

        let mut pivots = world.query_filtered::<&mut Transform, (With<Pivot>, Without<RigCamera>)>();
        let mut pivot = pivots
            .get_single_mut(world)
            .map_err(|e| RenderError::RenderFailed(format!("pivot: {}", e)))?;
        *pivot = rig::pivot_transform(pose);

        let mut cameras = world.query_filtered::<&mut Transform, (With<RigCamera>, Without<Pivot>)>();
        let mut camera = cameras
            .get_single_mut(world)
            .map_err(|e| RenderError::RenderFailed(format!("camera: {}", e)))?;
        *camera = rig::camera_local_transform(pose);

        // Propagate to GlobalTransform and the camera's computed projection.
        self.app.update();
        Ok(())
    }

    fn render_to(&mut self, paths: &FramePaths) -> Result<(), RenderError> {
        let (rgba, ndc, width, height) = self.capture()?;
        let view_depth = depth::convert_depth(&ndc, self.settings.camera.near_plane);

        encode::write_color_png(
            &paths.color,
            &rgba,
            width,
            height,
            self.settings.color_depth,
        )?;
        encode::write_depth_exr(&paths.depth, &view_depth, width, height)?;
        debug!("Wrote {}", paths.color.display());
        Ok(())
    }

    fn camera_calibration(&mut self) -> Result<CameraCalibration, RenderError> {
        let world = self.app.world_mut();

        let mut roots = world.query_filtered::<&GlobalTransform, With<RigRoot>>();
        let root = *roots
            .get_single(world)
            .map_err(|e| RenderError::RenderFailed(format!("rig root: {}", e)))?;

        let mut cameras = world.query_filtered::<(&GlobalTransform, &Camera), With<RigCamera>>();
        let (camera_global, camera) = cameras
            .get_single(world)
            .map_err(|e| RenderError::RenderFailed(format!("camera: {}", e)))?;

        let camera_in_scene = root.affine().inverse() * camera_global.affine();
        let rt = Mat4::from(camera_in_scene).inverse();
        Ok(CameraCalibration::from_matrices(rt, camera.clip_from_view()))
    }

    fn dump_scene(&mut self, path: &Path) -> Result<(), RenderError> {
        let serialized = scene_to_ron(self.app.world())?;
        fs::write(path, serialized).map_err(|e| RenderError::io(path, e))?;
        Ok(())
    }
}

/// Serialize the rig as a RON [`DynamicScene`]: every entity's name and
/// transform, the camera projection, the lights and the ambient light.
///
/// `Camera` itself is left out; its render target is an image handle, which
/// has no serialized form.
pub(crate) fn scene_to_ron(world: &World) -> Result<String, RenderError> {
    let scene = DynamicSceneBuilder::from_world(world)
        .deny_all()
        .allow_component::<Name>()
        .allow_component::<Transform>()
        .allow_component::<Projection>()
        .allow_component::<DirectionalLight>()
        .allow_resource::<AmbientLight>()
        .extract_entities(world.iter_entities().map(|e| e.id()))
        .extract_resources()
        .build();

    let registry = world.resource::<AppTypeRegistry>().read();
    scene
        .serialize(&registry)
        .map_err(|e| RenderError::SceneDump(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig_world() -> App {
        let mut app = App::new();
        app.register_type::<Name>()
            .register_type::<Transform>()
            .register_type::<Projection>()
            .register_type::<DirectionalLight>()
            .register_type::<AmbientLight>();

        let settings = RenderSettings::orbit_default();
        app.insert_resource(AmbientLight {
            color: Color::WHITE,
            brightness: 0.0,
        });
        let world = app.world_mut();
        world.spawn((
            Transform::from_xyz(0.0, 0.0, 1.5),
            Projection::Perspective(rig::perspective(&settings.camera)),
            Name::new("Camera"),
        ));
        world.spawn((
            DirectionalLight {
                illuminance: settings.lighting.key_illuminance,
                ..default()
            },
            Transform::from_rotation(rig::key_light_rotation(&settings.lighting)),
            Name::new("KeyLight"),
        ));
        app
    }

    #[test]
    fn test_scene_dump_describes_rig() {
        let app = rig_world();
        let ron = scene_to_ron(app.world()).unwrap();

        assert!(ron.contains("\"Camera\""));
        assert!(ron.contains("\"KeyLight\""));
        assert!(ron.contains("Projection"));
        assert!(ron.contains("fov"));
        assert!(ron.contains("DirectionalLight"));
        assert!(ron.contains("illuminance"));
        assert!(ron.contains("AmbientLight"));
    }

    #[test]
    fn test_scene_dump_skips_unlisted_components() {
        let mut app = rig_world();
        app.world_mut().spawn((Visibility::Hidden, Name::new("Hidden")));
        let ron = scene_to_ron(app.world()).unwrap();
        assert!(ron.contains("\"Hidden\""));
        assert!(!ron.contains("Visibility"));
    }
}
