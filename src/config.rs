use crate::events::ToggleFlags;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    #[serde(default = "AssetConfig::default_local_root")]
    pub local_root: String,
    #[serde(default = "AssetConfig::default_cdn_base")]
    pub cdn_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneFiles {
    #[serde(default = "SceneFiles::default_splat")]
    pub splat: String,
    #[serde(default = "SceneFiles::default_collision_mesh")]
    pub collision_mesh: String,
    #[serde(default = "SceneFiles::default_objects")]
    pub objects: String,
    #[serde(default = "SceneFiles::default_lighting")]
    pub lighting: String,
    #[serde(default = "SceneFiles::default_audio")]
    pub audio: String,
    #[serde(default = "SceneFiles::default_path")]
    pub path: String,
    #[serde(default = "SceneFiles::default_robot")]
    pub robot: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestepMode {
    /// One internal tick per call regardless of the frame delta.
    FixedTick,
    /// Frame deltas accumulate and whole ticks are run, capped per call.
    #[default]
    Accumulated,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicsConfig {
    #[serde(default = "PhysicsConfig::default_gravity")]
    pub gravity: [f32; 3],
    #[serde(default = "PhysicsConfig::default_fixed_dt")]
    pub fixed_dt: f32,
    #[serde(default)]
    pub timestep: TimestepMode,
    #[serde(default = "PhysicsConfig::default_max_substeps")]
    pub max_substeps: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterConfig {
    #[serde(default = "CharacterConfig::default_radius")]
    pub radius: f32,
    #[serde(default = "CharacterConfig::default_height")]
    pub height: f32,
    #[serde(default = "CharacterConfig::default_mass")]
    pub mass: f32,
    #[serde(default = "CharacterConfig::default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "CharacterConfig::default_jump_force")]
    pub jump_force: f32,
    #[serde(default = "CharacterConfig::default_eye_height_fraction")]
    pub eye_height_fraction: f32,
    #[serde(default = "CharacterConfig::default_linear_damping")]
    pub linear_damping: f32,
    #[serde(default = "CharacterConfig::default_ground_ray_length")]
    pub ground_ray_length: f32,
    #[serde(default = "CharacterConfig::default_grounded_velocity_threshold")]
    pub grounded_velocity_threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionConfig {
    #[serde(default = "InteractionConfig::default_pinch_threshold")]
    pub pinch_threshold: f32,
    #[serde(default = "InteractionConfig::default_grab_radius")]
    pub grab_radius: f32,
    #[serde(default = "InteractionConfig::default_throw_multiplier")]
    pub throw_multiplier: f32,
    #[serde(default = "InteractionConfig::default_velocity_history")]
    pub velocity_history: usize,
    #[serde(default = "InteractionConfig::default_max_spin")]
    pub max_spin: f32,
    #[serde(default = "InteractionConfig::default_kick_radius")]
    pub kick_radius: f32,
    #[serde(default = "InteractionConfig::default_kick_strength")]
    pub kick_strength: f32,
    #[serde(default = "InteractionConfig::default_throw_radius")]
    pub throw_radius: f32,
    #[serde(default = "InteractionConfig::default_throw_strength")]
    pub throw_strength: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToggleConfig {
    #[serde(default = "ToggleConfig::default_audio")]
    pub audio: bool,
    #[serde(default)]
    pub physics: bool,
    #[serde(default)]
    pub hud: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ViewerConfig {
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub scene: SceneFiles,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub character: CharacterConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub toggles: ToggleConfig,
    /// Key binding file loaded into `Input`; built-in bindings when unset.
    #[serde(default)]
    pub input_bindings: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub local_root: Option<String>,
    pub cdn_base: Option<String>,
    pub physics: Option<bool>,
    pub hud: Option<bool>,
    pub input_bindings: Option<String>,
}

impl AssetConfig {
    fn default_local_root() -> String {
        "assets".to_string()
    }

    fn default_cdn_base() -> String {
        "https://cdn.example.com/splat-viewer/".to_string()
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self { local_root: Self::default_local_root(), cdn_base: Self::default_cdn_base() }
    }
}

impl SceneFiles {
    fn default_splat() -> String {
        "scene.splat".to_string()
    }

    fn default_collision_mesh() -> String {
        "collision.glb".to_string()
    }

    fn default_objects() -> String {
        "objects.json".to_string()
    }

    fn default_lighting() -> String {
        "lighting.json".to_string()
    }

    fn default_audio() -> String {
        "audio.json".to_string()
    }

    fn default_path() -> String {
        "path.json".to_string()
    }

    fn default_robot() -> String {
        "robot.json".to_string()
    }
}

impl Default for SceneFiles {
    fn default() -> Self {
        Self {
            splat: Self::default_splat(),
            collision_mesh: Self::default_collision_mesh(),
            objects: Self::default_objects(),
            lighting: Self::default_lighting(),
            audio: Self::default_audio(),
            path: Self::default_path(),
            robot: Self::default_robot(),
        }
    }
}

impl PhysicsConfig {
    const fn default_gravity() -> [f32; 3] {
        [0.0, -9.81, 0.0]
    }

    const fn default_fixed_dt() -> f32 {
        1.0 / 60.0
    }

    const fn default_max_substeps() -> u32 {
        4
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Self::default_gravity(),
            fixed_dt: Self::default_fixed_dt(),
            timestep: TimestepMode::default(),
            max_substeps: Self::default_max_substeps(),
        }
    }
}

impl CharacterConfig {
    const fn default_radius() -> f32 {
        0.3
    }

    const fn default_height() -> f32 {
        1.7
    }

    const fn default_mass() -> f32 {
        70.0
    }

    const fn default_move_speed() -> f32 {
        3.0
    }

    const fn default_jump_force() -> f32 {
        5.0
    }

    const fn default_eye_height_fraction() -> f32 {
        0.9
    }

    const fn default_linear_damping() -> f32 {
        0.5
    }

    const fn default_ground_ray_length() -> f32 {
        0.15
    }

    const fn default_grounded_velocity_threshold() -> f32 {
        0.1
    }

    /// Length of the cylindrical section between the two caps, halved.
    pub fn half_height(&self) -> f32 {
        (self.height * 0.5 - self.radius).max(0.0)
    }
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            radius: Self::default_radius(),
            height: Self::default_height(),
            mass: Self::default_mass(),
            move_speed: Self::default_move_speed(),
            jump_force: Self::default_jump_force(),
            eye_height_fraction: Self::default_eye_height_fraction(),
            linear_damping: Self::default_linear_damping(),
            ground_ray_length: Self::default_ground_ray_length(),
            grounded_velocity_threshold: Self::default_grounded_velocity_threshold(),
        }
    }
}

impl InteractionConfig {
    const fn default_pinch_threshold() -> f32 {
        0.02
    }

    const fn default_grab_radius() -> f32 {
        0.15
    }

    const fn default_throw_multiplier() -> f32 {
        1.5
    }

    const fn default_velocity_history() -> usize {
        5
    }

    const fn default_max_spin() -> f32 {
        2.0
    }

    const fn default_kick_radius() -> f32 {
        1.5
    }

    const fn default_kick_strength() -> f32 {
        4.0
    }

    const fn default_throw_radius() -> f32 {
        2.0
    }

    const fn default_throw_strength() -> f32 {
        6.0
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            pinch_threshold: Self::default_pinch_threshold(),
            grab_radius: Self::default_grab_radius(),
            throw_multiplier: Self::default_throw_multiplier(),
            velocity_history: Self::default_velocity_history(),
            max_spin: Self::default_max_spin(),
            kick_radius: Self::default_kick_radius(),
            kick_strength: Self::default_kick_strength(),
            throw_radius: Self::default_throw_radius(),
            throw_strength: Self::default_throw_strength(),
        }
    }
}

impl ToggleConfig {
    const fn default_audio() -> bool {
        true
    }

    pub fn flags(&self) -> ToggleFlags {
        let mut flags = ToggleFlags::empty();
        flags.set(ToggleFlags::AUDIO, self.audio);
        flags.set(ToggleFlags::PHYSICS, self.physics);
        flags.set(ToggleFlags::HUD, self.hud);
        flags
    }
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self { audio: Self::default_audio(), physics: false, hud: false }
    }
}

impl ViewerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(root) = &overrides.local_root {
            self.assets.local_root = root.clone();
        }
        if let Some(cdn) = &overrides.cdn_base {
            self.assets.cdn_base = cdn.clone();
        }
        if let Some(physics) = overrides.physics {
            self.toggles.physics = physics;
        }
        if let Some(hud) = overrides.hud {
            self.toggles.hud = hud;
        }
        if let Some(bindings) = &overrides.input_bindings {
            self.input_bindings = Some(bindings.clone());
        }
    }
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.local_root.is_none() && self.cdn_base.is_none() && self.physics.is_none()
            && self.hud.is_none()
            && self.input_bindings.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.local_root.is_some() {
            fields.push("local_root");
        }
        if self.cdn_base.is_some() {
            fields.push("cdn_base");
        }
        if self.physics.is_some() {
            fields.push("physics");
        }
        if self.hud.is_some() {
            fields.push("hud");
        }
        if self.input_bindings.is_some() {
            fields.push("input_bindings");
        }
        fields
    }
}
