use crate::events::{EventBus, ViewerEvent};
use crate::scene_config::{Color, PathPointConfig};
use glam::{Vec2, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct PathMarker {
    pub position: Vec3,
    pub trigger_radius: f32,
    pub color: Color,
    pub radius: f32,
    pub highlight_offset: f32,
    pub highlighted: bool,
}

impl PathMarker {
    /// Where the marker is drawn; highlighted markers lift by their offset.
    pub fn display_position(&self) -> Vec3 {
        if self.highlighted {
            self.position + Vec3::Y * self.highlight_offset
        } else {
            self.position
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathTracker {
    markers: Vec<PathMarker>,
}

impl PathTracker {
    pub fn from_configs(configs: impl IntoIterator<Item = PathPointConfig>) -> Self {
        let markers = configs
            .into_iter()
            .map(|config| PathMarker {
                position: config.position.into(),
                trigger_radius: config.trigger_radius,
                color: config.color,
                radius: config.radius,
                highlight_offset: config.highlight_offset,
                highlighted: false,
            })
            .collect();
        Self { markers }
    }

    pub fn markers(&self) -> &[PathMarker] {
        &self.markers
    }

    pub fn active_indices(&self) -> Vec<usize> {
        self.markers.iter().enumerate().filter(|(_, marker)| marker.highlighted).map(|(index, _)| index).collect()
    }

    /// Highlight markers within their trigger radius of the listener, measured on the
    /// ground plane.
    pub fn update(&mut self, listener: Vec3, bus: &mut EventBus) {
        let listener_flat = Vec2::new(listener.x, listener.z);
        for (index, marker) in self.markers.iter_mut().enumerate() {
            let distance = Vec2::new(marker.position.x, marker.position.z).distance(listener_flat);
            let inside = distance <= marker.trigger_radius;
            if inside == marker.highlighted {
                continue;
            }
            marker.highlighted = inside;
            bus.push(if inside { ViewerEvent::WaypointEntered { index } } else { ViewerEvent::WaypointLeft { index } });
        }
    }
}
