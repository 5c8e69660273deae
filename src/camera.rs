use glam::{Quat, Vec3};

/// Movable origin of the tracking space. Moving it relocates the viewer without touching
/// world content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl ReferenceFrame {
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.translation + self.rotation * local
    }
}

impl Default for ReferenceFrame {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY }
    }
}

/// Viewer pose: the tracked head inside the reference frame plus a heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewpoint {
    pub reference_frame: ReferenceFrame,
    pub head_local: Vec3,
    /// Heading around +Y in radians. Zero looks down -Z.
    pub yaw: f32,
}

impl Viewpoint {
    pub fn new(eye: Vec3, yaw: f32) -> Self {
        Self {
            reference_frame: ReferenceFrame { translation: eye, rotation: Quat::IDENTITY },
            head_local: Vec3::ZERO,
            yaw,
        }
    }

    pub fn eye_world(&self) -> Vec3 {
        self.reference_frame.to_world(self.head_local)
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.reference_frame.to_world(local)
    }

    pub fn forward_flat(&self) -> Vec3 {
        Quat::from_rotation_y(self.yaw) * Vec3::NEG_Z
    }

    pub fn right_flat(&self) -> Vec3 {
        Quat::from_rotation_y(self.yaw) * Vec3::X
    }

    /// Shift the reference frame so the tracked eye ends up at `world`.
    pub fn place_eye_at(&mut self, world: Vec3) {
        let head_offset = self.reference_frame.rotation * self.head_local;
        self.reference_frame.translation = world - head_offset;
    }
}

impl Default for Viewpoint {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 1.6, 0.0), 0.0)
    }
}
