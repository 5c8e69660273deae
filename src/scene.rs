use crate::camera::Viewpoint;
use crate::dynamics::{DynamicObjectRegistry, VisualTransform};
use crate::lighting::SceneLights;
use crate::physics::PhysicsWorld;
use glam::Vec3;
use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

/// Splat file backing the scene background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplatBackground {
    pub url: String,
    pub local: bool,
}

/// Visual placed from the objects config. Dynamic objects are also in the registry under
/// the same name.
#[derive(Debug, Clone)]
pub struct PlacedObject {
    pub name: String,
    pub model_url: String,
    pub transform: VisualTransform,
    pub dynamic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionShape {
    TriMesh { triangles: usize },
    /// Fallback for non-indexed geometry.
    Cuboid { half_extents: Vec3 },
}

#[derive(Debug, Clone)]
pub struct CollisionRecord {
    pub name: String,
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub shape: CollisionShape,
}

/// Everything the frame loop mutates. Lives as long as the session.
#[derive(Default)]
pub struct SceneContext {
    pub viewpoint: Viewpoint,
    pub splat: Option<SplatBackground>,
    pub physics: Option<PhysicsWorld>,
    pub dynamics: DynamicObjectRegistry,
    pub collision_meshes: Vec<CollisionRecord>,
    pub objects: Vec<PlacedObject>,
    pub lights: SceneLights,
    pub(crate) physics_missing_warned: bool,
}

impl SceneContext {
    pub fn new(viewpoint: Viewpoint) -> Self {
        Self { viewpoint, ..Self::default() }
    }

    pub fn has_physics(&self) -> bool {
        self.physics.is_some()
    }

    pub fn object(&self, name: &str) -> Option<&PlacedObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    /// Mirror registry poses onto the placed visuals of dynamic objects.
    pub fn refresh_placed_objects(&mut self) {
        for object in self.objects.iter_mut().filter(|object| object.dynamic) {
            if let Some(dynamic) = self.dynamics.get(&object.name) {
                object.transform.translation = dynamic.visual.translation;
                object.transform.rotation = dynamic.visual.rotation;
            }
        }
    }
}
