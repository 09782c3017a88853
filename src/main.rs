//! Render a mesh from an orbit of camera poses.
//!
//! Usage:
//!   render-orbit [--views_yaw 16] [--views_pitch 2] [--output_folder /tmp]
//!                [--color_depth 16] [--format OPEN_EXR] [--dump] <model.obj>
//!
//! Writes `r{band}d{distance}_{azimuth}.png`, `..._depth.exr` and `.json` per
//! pose into `<output_folder>/<category>/<model>/`.

use bevy_orbit_render::{pose, recorder, BevyHost, OrbitArgs, RenderError, RunSummary};
use clap::Parser;
use std::process::ExitCode;

fn run(args: OrbitArgs) -> Result<RunSummary, RenderError> {
    let (views_yaw, views_pitch) = (args.views_yaw, args.views_pitch);
    let job = args.into_job()?;
    let frames = pose::orbit_frames(views_yaw, views_pitch);

    println!("=== render-orbit ===");
    println!("Mesh: {}", job.mesh.display());
    println!("Output directory: {}", job.output_dir.display());
    println!(
        "Frames: {} ({} yaw x {} pitch bands x {} distances)",
        frames.len(),
        views_yaw,
        pose::PITCH_BANDS,
        pose::ORBIT_DISTANCES.len()
    );

    let mut host = BevyHost::open(&job.mesh, &job.settings)?;
    recorder::run(&mut host, &job, &frames)
}

fn main() -> ExitCode {
    match run(OrbitArgs::parse()) {
        Ok(summary) => {
            println!(
                "Rendered {}, skipped {} (already present)",
                summary.rendered, summary.skipped
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("render-orbit: {}", e);
            ExitCode::FAILURE
        }
    }
}
