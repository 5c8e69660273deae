use crate::scene_config::{Color, LightConfig};
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Ambient,
    Hemisphere,
    Directional,
    Point,
    Spot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Ambient { color: Color, intensity: f32 },
    Hemisphere { sky_color: Color, ground_color: Color, intensity: f32 },
    Directional { color: Color, intensity: f32, position: Vec3, target: Vec3, cast_shadow: bool },
    Point { color: Color, intensity: f32, position: Vec3, distance: f32, decay: f32 },
    Spot { color: Color, intensity: f32, position: Vec3, target: Vec3, angle: f32, penumbra: f32, distance: f32, decay: f32 },
}

impl Light {
    pub fn kind(&self) -> LightKind {
        match self {
            Light::Ambient { .. } => LightKind::Ambient,
            Light::Hemisphere { .. } => LightKind::Hemisphere,
            Light::Directional { .. } => LightKind::Directional,
            Light::Point { .. } => LightKind::Point,
            Light::Spot { .. } => LightKind::Spot,
        }
    }

    /// Unit direction the light travels in, for lights that aim at a target.
    pub fn direction(&self) -> Option<Vec3> {
        match self {
            Light::Directional { position, target, .. } | Light::Spot { position, target, .. } => {
                Some((*target - *position).normalize_or_zero())
            }
            _ => None,
        }
    }
}

/// Debug mesh drawn along an aimed light. Shown only while the HUD is on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightHelper {
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneLight {
    pub name: String,
    pub light: Light,
    pub helper: Option<LightHelper>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneLights {
    lights: Vec<SceneLight>,
    helpers_visible: bool,
}

impl SceneLights {
    pub fn from_configs(configs: impl IntoIterator<Item = LightConfig>, helpers_visible: bool) -> Self {
        let mut lights = Self { lights: Vec::new(), helpers_visible };
        for config in configs {
            lights.add(config);
        }
        lights
    }

    pub fn add(&mut self, config: LightConfig) {
        let name = config.name().to_string();
        let light = match config {
            LightConfig::Ambient { color, intensity, .. } => Light::Ambient { color, intensity },
            LightConfig::Hemisphere { sky_color, ground_color, intensity, .. } => {
                Light::Hemisphere { sky_color, ground_color, intensity }
            }
            LightConfig::Directional { color, intensity, position, target, cast_shadow, .. } => {
                Light::Directional { color, intensity, position: position.into(), target: target.into(), cast_shadow }
            }
            LightConfig::Point { color, intensity, position, distance, decay, .. } => {
                Light::Point { color, intensity, position: position.into(), distance, decay }
            }
            LightConfig::Spot { color, intensity, position, target, angle, penumbra, distance, decay, .. } => Light::Spot {
                color,
                intensity,
                position: position.into(),
                target: target.into(),
                angle,
                penumbra,
                distance,
                decay,
            },
        };
        let helper = match light.kind() {
            LightKind::Directional | LightKind::Spot => Some(LightHelper { visible: self.helpers_visible }),
            _ => None,
        };
        if self.get(&name).is_some() {
            log::warn!("Duplicate light name '{name}'");
        }
        self.lights.push(SceneLight { name, light, helper });
    }

    pub fn set_helpers_visible(&mut self, visible: bool) {
        self.helpers_visible = visible;
        for helper in self.lights.iter_mut().filter_map(|light| light.helper.as_mut()) {
            helper.visible = visible;
        }
    }

    pub fn helpers_visible(&self) -> bool {
        self.helpers_visible
    }

    pub fn count(&self, kind: LightKind) -> usize {
        self.lights.iter().filter(|light| light.light.kind() == kind).count()
    }

    pub fn get(&self, name: &str) -> Option<&SceneLight> {
        self.lights.iter().find(|light| light.name == name)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &SceneLight> {
        self.lights.iter()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_config::Vec3Data;

    fn sun() -> LightConfig {
        LightConfig::Directional {
            name: "sun".into(),
            color: Color::WHITE,
            intensity: 2.0,
            position: Vec3Data { x: 0.0, y: 10.0, z: 0.0 },
            target: Vec3Data::default(),
            cast_shadow: true,
        }
    }

    #[test]
    fn only_aimed_lights_get_helpers() {
        let lights = SceneLights::from_configs(
            [LightConfig::Ambient { name: "amb".into(), color: Color::WHITE, intensity: 0.3 }, sun()],
            false,
        );
        assert!(lights.get("amb").expect("ambient").helper.is_none());
        assert_eq!(lights.get("sun").expect("sun").helper, Some(LightHelper { visible: false }));
    }

    #[test]
    fn helper_visibility_follows_toggle() {
        let mut lights = SceneLights::from_configs([sun()], false);
        lights.set_helpers_visible(true);
        assert!(lights.get("sun").and_then(|l| l.helper).map(|h| h.visible).unwrap_or(false));
        assert_eq!(lights.get("sun").and_then(|l| l.light.direction()), Some(Vec3::NEG_Y));
    }
}
