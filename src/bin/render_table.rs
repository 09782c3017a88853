//! Render a mesh from the camera poses listed in its `renderings` table.
//!
//! Usage:
//!   render_table [--output_folder /tmp] [--scale 1] [--dump] <.../model.obj>
//!
//! The table is read from the mesh's directory before the mesh is loaded. Each
//! row `azimuth elevation in_plane distance fov` becomes frame `00`, `01`, ...

use bevy_orbit_render::pose::PoseTable;
use bevy_orbit_render::{recorder, BevyHost, RenderError, RunSummary, TableArgs};
use clap::Parser;
use std::process::ExitCode;

fn run(args: TableArgs) -> Result<RunSummary, RenderError> {
    let job = args.into_job()?;
    let table = PoseTable::for_mesh(&job.mesh)?;
    let frames = table.frames();

    println!("=== render_table ===");
    println!("Mesh: {}", job.mesh.display());
    println!("Pose table: {} ({} rows)", table.path.display(), table.len());
    println!("Output directory: {}", job.output_dir.display());

    let mut host = BevyHost::open(&job.mesh, &job.settings)?;
    recorder::run(&mut host, &job, &frames)
}

fn main() -> ExitCode {
    match run(TableArgs::parse()) {
        Ok(summary) => {
            println!(
                "Rendered {}, skipped {} (already present)",
                summary.rendered, summary.skipped
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("render_table: {}", e);
            ExitCode::FAILURE
        }
    }
}
