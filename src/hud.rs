use glam::Vec3;
use std::fmt;

/// Per-frame readout for the debug overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct HudSnapshot {
    pub fps: f32,
    pub eye_position: Vec3,
    pub grounded: bool,
    pub physics_enabled: bool,
    pub held_left: Option<String>,
    pub held_right: Option<String>,
    pub drone_phase: Option<&'static str>,
    pub active_waypoints: Vec<usize>,
}

impl fmt::Display for HudSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fps={:.1} eye=({:.2}, {:.2}, {:.2}) physics={} grounded={}",
            self.fps, self.eye_position.x, self.eye_position.y, self.eye_position.z, self.physics_enabled, self.grounded
        )?;
        if let Some(name) = &self.held_left {
            write!(f, " left={name}")?;
        }
        if let Some(name) = &self.held_right {
            write!(f, " right={name}")?;
        }
        if let Some(phase) = self.drone_phase {
            write!(f, " drone={phase}")?;
        }
        if !self.active_waypoints.is_empty() {
            write!(f, " waypoints={:?}", self.active_waypoints)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_omits_empty_sections() {
        let snapshot = HudSnapshot {
            fps: 90.0,
            eye_position: Vec3::new(0.0, 1.6, 0.0),
            grounded: true,
            physics_enabled: true,
            held_left: Some("ball".into()),
            held_right: None,
            drone_phase: None,
            active_waypoints: Vec::new(),
        };
        assert_eq!(snapshot.to_string(), "fps=90.0 eye=(0.00, 1.60, 0.00) physics=true grounded=true left=ball");
    }
}
