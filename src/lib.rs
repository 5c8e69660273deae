pub mod assets;
pub mod audio;
pub mod camera;
pub mod character;
pub mod cli;
pub mod collision;
pub mod collision_mesh;
pub mod config;
pub mod drone;
pub mod dynamics;
pub mod events;
pub mod hud;
pub mod input;
pub mod interaction;
pub mod lighting;
pub mod path;
pub mod physics;
pub mod runner;
pub mod scene;
pub mod scene_config;
pub mod time;
pub mod viewer;

pub use viewer::{FrameInput, FrameOutput, Viewer};

pub(crate) fn wrap_angle(mut radians: f32) -> f32 {
    let two_pi = 2.0 * std::f32::consts::PI;
    while radians > std::f32::consts::PI {
        radians -= two_pi;
    }
    while radians < -std::f32::consts::PI {
        radians += two_pi;
    }
    radians
}
