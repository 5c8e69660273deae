use crate::assets::{AssetSource, FsAssetSource};
use crate::cli::CliOverrides;
use crate::config::ViewerConfig;
use crate::viewer::{FrameInput, FrameOutput, Viewer};
use anyhow::Result;
use glam::Vec3;
use winit::keyboard::Key;

pub const RUNNER_HZ: f64 = 90.0;

/// Load the scene from disk and walk forward for the requested number of frames.
pub fn run_headless(cli: &CliOverrides) -> Result<FrameOutput> {
    let mut config = match cli.config_path() {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    let overrides = cli.config_overrides();
    if !overrides.is_empty() {
        log::info!("CLI overrides applied: {}", overrides.applied_fields().join(", "));
        config.apply_overrides(&overrides);
    }
    let site_root = cli.site_root();
    log::info!("Serving assets from {}", site_root.display());
    let mut viewer = Viewer::load(config, FsAssetSource::new(site_root));
    let output = simulate(&mut viewer, cli.frames());
    match &output.hud {
        Some(hud) => log::info!("Final HUD: {hud}"),
        None => log::info!("Final eye position: {:?}", viewer.scene().viewpoint.eye_world()),
    }
    Ok(output)
}

/// Hold the forward key and feed `frames` frames at a steady rate. Returns the last
/// frame's output.
pub fn simulate<S: AssetSource>(viewer: &mut Viewer<S>, frames: u32) -> FrameOutput {
    viewer.input_mut().press(Key::Character("w".into()));
    let mut last = FrameOutput::default();
    for index in 0..frames {
        let timestamp_ms = f64::from(index) * 1000.0 / RUNNER_HZ;
        last = viewer.frame(FrameInput { timestamp_ms, head_local: Vec3::ZERO, ..FrameInput::default() });
        for event in &last.events {
            log::info!("frame {index}: {event}");
        }
    }
    last
}
