use anyhow::{bail, Context, Result};
use glam::Vec3;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Vector that accepts either `[x, y, z]` or `{"x":..,"y":..,"z":..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "Vec3Repr")]
pub struct Vec3Data {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Vec3Repr {
    Array([f32; 3]),
    Object { x: f32, y: f32, z: f32 },
}

impl From<Vec3Repr> for Vec3Data {
    fn from(repr: Vec3Repr) -> Self {
        match repr {
            Vec3Repr::Array([x, y, z]) => Self { x, y, z },
            Vec3Repr::Object { x, y, z } => Self { x, y, z },
        }
    }
}

impl From<Vec3Data> for Vec3 {
    fn from(value: Vec3Data) -> Self {
        Vec3::new(value.x, value.y, value.z)
    }
}

impl From<Vec3> for Vec3Data {
    fn from(value: Vec3) -> Self {
        Self { x: value.x, y: value.y, z: value.z }
    }
}

/// RGB color from `"#rrggbb"`, `"0xrrggbb"` or a plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Color(pub u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Int(u32),
    Text(String),
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Int(value) => Ok(Color(value & 0xff_ff_ff)),
            ColorRepr::Text(text) => {
                let hex = text.trim().trim_start_matches('#').trim_start_matches("0x");
                u32::from_str_radix(hex, 16).map(Color).map_err(|_| format!("invalid color '{text}'"))
            }
        }
    }
}

impl Color {
    pub const WHITE: Color = Color(0xff_ff_ff);

    pub fn to_rgb(self) -> [f32; 3] {
        let r = ((self.0 >> 16) & 0xff) as f32 / 255.0;
        let g = ((self.0 >> 8) & 0xff) as f32 / 255.0;
        let b = (self.0 & 0xff) as f32 / 255.0;
        [r, g, b]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

fn default_scale() -> Vec3Data {
    Vec3Data { x: 1.0, y: 1.0, z: 1.0 }
}

const fn default_intensity() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct DynamicBodyConfig {
    pub radius: f32,
    #[serde(default = "DynamicBodyConfig::default_mass")]
    pub mass: f32,
    #[serde(default = "DynamicBodyConfig::default_restitution")]
    pub restitution: f32,
    #[serde(default = "DynamicBodyConfig::default_friction")]
    pub friction: f32,
}

impl DynamicBodyConfig {
    const fn default_mass() -> f32 {
        1.0
    }

    const fn default_restitution() -> f32 {
        0.4
    }

    const fn default_friction() -> f32 {
        0.6
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectPlacement {
    pub name: String,
    pub model: String,
    pub position: Vec3Data,
    #[serde(default = "default_scale")]
    pub scale: Vec3Data,
    #[serde(default)]
    pub dynamic: Option<DynamicBodyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LightConfig {
    Ambient {
        name: String,
        #[serde(default)]
        color: Color,
        #[serde(default = "default_intensity")]
        intensity: f32,
    },
    Hemisphere {
        name: String,
        #[serde(default)]
        sky_color: Color,
        #[serde(default)]
        ground_color: Color,
        #[serde(default = "default_intensity")]
        intensity: f32,
    },
    Directional {
        name: String,
        #[serde(default)]
        color: Color,
        #[serde(default = "default_intensity")]
        intensity: f32,
        position: Vec3Data,
        #[serde(default)]
        target: Vec3Data,
        #[serde(default)]
        cast_shadow: bool,
    },
    Point {
        name: String,
        #[serde(default)]
        color: Color,
        #[serde(default = "default_intensity")]
        intensity: f32,
        position: Vec3Data,
        #[serde(default)]
        distance: f32,
        #[serde(default = "LightConfig::default_decay")]
        decay: f32,
    },
    Spot {
        name: String,
        #[serde(default)]
        color: Color,
        #[serde(default = "default_intensity")]
        intensity: f32,
        position: Vec3Data,
        #[serde(default)]
        target: Vec3Data,
        #[serde(default = "LightConfig::default_spot_angle")]
        angle: f32,
        #[serde(default)]
        penumbra: f32,
        #[serde(default)]
        distance: f32,
        #[serde(default = "LightConfig::default_decay")]
        decay: f32,
    },
}

impl LightConfig {
    const fn default_decay() -> f32 {
        2.0
    }

    fn default_spot_angle() -> f32 {
        std::f32::consts::FRAC_PI_3
    }

    pub fn name(&self) -> &str {
        match self {
            LightConfig::Ambient { name, .. }
            | LightConfig::Hemisphere { name, .. }
            | LightConfig::Directional { name, .. }
            | LightConfig::Point { name, .. }
            | LightConfig::Spot { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFalloff {
    #[serde(default = "AudioFalloff::default_ref_distance")]
    pub ref_distance: f32,
    #[serde(default = "AudioFalloff::default_rolloff_factor")]
    pub rolloff_factor: f32,
    #[serde(default = "AudioFalloff::default_max_distance")]
    pub max_distance: f32,
    #[serde(default = "default_intensity")]
    pub volume: f32,
    #[serde(default, rename = "loop")]
    pub looped: bool,
}

impl AudioFalloff {
    const fn default_ref_distance() -> f32 {
        1.0
    }

    const fn default_rolloff_factor() -> f32 {
        1.0
    }

    const fn default_max_distance() -> f32 {
        10_000.0
    }
}

impl Default for AudioFalloff {
    fn default() -> Self {
        Self {
            ref_distance: Self::default_ref_distance(),
            rolloff_factor: Self::default_rolloff_factor(),
            max_distance: Self::default_max_distance(),
            volume: default_intensity(),
            looped: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSourceConfig {
    #[serde(alias = "audio_url")]
    pub audio_url: String,
    #[serde(alias = "audio_position")]
    pub audio_position: Vec3Data,
    #[serde(default)]
    pub falloff: AudioFalloff,
    #[serde(alias = "trigger_radius")]
    pub trigger_radius: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathPointConfig {
    pub position: Vec3Data,
    #[serde(alias = "trigger_radius")]
    pub trigger_radius: f32,
    #[serde(default)]
    pub color: Color,
    #[serde(default = "PathPointConfig::default_radius")]
    pub radius: f32,
    #[serde(default, alias = "highlight_offset")]
    pub highlight_offset: f32,
}

impl PathPointConfig {
    const fn default_radius() -> f32 {
        0.1
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotConfig {
    pub waypoints: Vec<Vec3Data>,
    #[serde(alias = "movement_speed")]
    pub movement_speed: f32,
    /// Milliseconds.
    #[serde(alias = "pause_duration")]
    pub pause_duration: f64,
    /// Milliseconds.
    #[serde(alias = "rotation_duration")]
    pub rotation_duration: f64,
}

impl RobotConfig {
    pub fn parse(bytes: &[u8], origin: &str) -> Result<Self> {
        let config: RobotConfig =
            serde_json::from_slice(bytes).with_context(|| format!("Failed to parse robot config {origin}"))?;
        if config.waypoints.len() < 2 {
            bail!("Robot config {origin} needs at least two waypoints, found {}", config.waypoints.len());
        }
        if !(config.movement_speed > 0.0) {
            bail!("Robot config {origin} has non-positive movement speed {}", config.movement_speed);
        }
        Ok(config)
    }
}

/// Parse a config list, skipping entries that fail to deserialize. The list may be the
/// document itself or wrapped under `wrapper_key`.
pub fn parse_entries<T: DeserializeOwned>(bytes: &[u8], wrapper_key: &str, origin: &str) -> Result<Vec<T>> {
    let document: Value =
        serde_json::from_slice(bytes).with_context(|| format!("Failed to parse config file {origin}"))?;
    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove(wrapper_key) {
            Some(Value::Array(entries)) => entries,
            _ => bail!("Config file {origin} has no '{wrapper_key}' list"),
        },
        _ => bail!("Config file {origin} must contain a list"),
    };
    let mut parsed = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<T>(entry) {
            Ok(value) => parsed.push(value),
            Err(err) => log::warn!("{origin}: skipping malformed entry #{index}: {err}"),
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_accept_arrays_and_objects() {
        let a: Vec3Data = serde_json::from_str("[1, 2, 3]").expect("array form");
        let b: Vec3Data = serde_json::from_str(r#"{"x":1,"y":2,"z":3}"#).expect("object form");
        assert_eq!(a, b);
    }

    #[test]
    fn colors_parse_hex_strings_and_integers() {
        let hex: Color = serde_json::from_str(r##""#ff8000""##).expect("hex color");
        let int: Color = serde_json::from_str("16744448").expect("int color");
        assert_eq!(hex, Color(0xff8000));
        assert_eq!(hex, int);
        assert!(serde_json::from_str::<Color>(r#""nope""#).is_err());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let json = br#"[
            {"type":"ambient","name":"amb","intensity":0.4},
            {"type":"laser","name":"bad"},
            {"type":"directional","name":"sun"},
            {"type":"point","name":"bulb","position":[0,2,0]}
        ]"#;
        let lights: Vec<LightConfig> = parse_entries(json, "lights", "lighting.json").expect("list parses");
        let names: Vec<_> = lights.iter().map(|l| l.name().to_string()).collect();
        assert_eq!(names, vec!["amb", "bulb"], "unknown type and missing position are dropped");
    }

    #[test]
    fn wrapped_lists_are_accepted() {
        let json = br#"{"points":[{"position":[0,0,1],"triggerRadius":1.5,"highlightOffset":0.2}]}"#;
        let points: Vec<PathPointConfig> = parse_entries(json, "points", "path.json").expect("wrapped list");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].trigger_radius, 1.5);
        assert_eq!(points[0].highlight_offset, 0.2);
    }

    #[test]
    fn audio_sources_read_falloff() {
        let json = br#"[{"audio_url":"birds.mp3","audio_position":[1,0,0],
            "falloff":{"refDistance":2,"rolloffFactor":0.5,"maxDistance":40,"volume":0.8,"loop":true},
            "triggerRadius":6}]"#;
        let sources: Vec<AudioSourceConfig> = parse_entries(json, "sources", "audio.json").expect("audio list");
        assert_eq!(sources.len(), 1);
        assert!(sources[0].falloff.looped);
        assert_eq!(sources[0].falloff.ref_distance, 2.0);
    }

    #[test]
    fn robot_config_needs_two_waypoints() {
        let json = br#"{"waypoints":[[0,0,0]],"movementSpeed":2,"pauseDuration":1000,"rotationDuration":1500}"#;
        let err = RobotConfig::parse(json, "robot.json").unwrap_err();
        assert!(err.to_string().contains("at least two waypoints"));
    }
}
