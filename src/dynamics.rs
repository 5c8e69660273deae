use crate::physics::{quat_from_rapier, vec_from_rapier, vec_to_rapier, PhysicsWorld};
use crate::scene::SceneContext;
use anyhow::{bail, Result};
use glam::{Quat, Vec3};
use rapier3d::prelude::{ColliderBuilder, ColliderHandle, RigidBodyBuilder, RigidBodyHandle};
use std::collections::BTreeMap;

/// Transform read by the renderer for a physics-driven visual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl VisualTransform {
    pub fn at(translation: Vec3) -> Self {
        Self { translation, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

impl Default for VisualTransform {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicHandles {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

#[derive(Debug, Clone)]
pub struct DynamicObject {
    pub name: String,
    pub visual: VisualTransform,
    pub radius: f32,
    pub handles: DynamicHandles,
}

#[derive(Debug, Clone, Copy)]
pub struct SphereSpec {
    pub radius: f32,
    pub mass: f32,
    pub restitution: f32,
    pub friction: f32,
}

/// Movable physics-backed objects keyed by unique name. Objects live for the whole session.
#[derive(Default)]
pub struct DynamicObjectRegistry {
    objects: BTreeMap<String, DynamicObject>,
}

impl DynamicObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        physics: &mut PhysicsWorld,
        visual: VisualTransform,
        name: &str,
        position: Vec3,
        spec: SphereSpec,
    ) -> Result<DynamicHandles> {
        if self.objects.contains_key(name) {
            bail!("Dynamic object '{name}' already exists");
        }
        if !(spec.radius > 0.0) {
            bail!("Dynamic object '{name}' needs a positive radius, got {}", spec.radius);
        }
        let body = RigidBodyBuilder::dynamic().translation(vec_to_rapier(position)).build();
        let collider = ColliderBuilder::ball(spec.radius)
            .mass(spec.mass.max(1.0e-3))
            .restitution(spec.restitution)
            .friction(spec.friction)
            .build();
        let (body, collider) = physics.insert_body(body, collider);
        let handles = DynamicHandles { body, collider };
        let visual = VisualTransform { translation: position, ..visual };
        self.objects.insert(name.to_string(), DynamicObject { name: name.to_string(), visual, radius: spec.radius, handles });
        Ok(handles)
    }

    /// Copy simulated poses onto the visuals. Call once per frame after stepping.
    pub fn sync_visuals(&mut self, physics: &PhysicsWorld) {
        for object in self.objects.values_mut() {
            if let Some(body) = physics.body(object.handles.body) {
                object.visual.translation = vec_from_rapier(body.translation());
                object.visual.rotation = quat_from_rapier(body.rotation());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&DynamicObject> {
        self.objects.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DynamicObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn position_of(&self, physics: &PhysicsWorld, name: &str) -> Option<Vec3> {
        let object = self.objects.get(name)?;
        physics.body(object.handles.body).map(|body| vec_from_rapier(body.translation()))
    }

    /// Nearest object whose body lies within `radius` of `point`, ignoring names rejected
    /// by `exclude`. Ties go to the name that sorts first.
    pub fn nearest_within(
        &self,
        physics: &PhysicsWorld,
        point: Vec3,
        radius: f32,
        exclude: impl Fn(&str) -> bool,
    ) -> Option<&DynamicObject> {
        let mut best: Option<(&DynamicObject, f32)> = None;
        for object in self.objects.values() {
            if exclude(&object.name) {
                continue;
            }
            let Some(body) = physics.body(object.handles.body) else {
                continue;
            };
            let distance = vec_from_rapier(body.translation()).distance(point);
            if distance > radius {
                continue;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((object, distance));
            }
        }
        best.map(|(object, _)| object)
    }

    /// Shove dynamic objects within `radius` of `origin` along the flat `forward` with a
    /// little lift. Held (kinematic) bodies are left alone.
    pub fn kick_nearby(&self, physics: &mut PhysicsWorld, origin: Vec3, forward: Vec3, radius: f32, strength: f32) -> usize {
        let dir = (Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero() + Vec3::Y * 0.3).normalize_or_zero();
        self.impulse_nearby(physics, origin, radius, dir * strength)
    }

    /// Toss dynamic objects within `radius` of `origin` forward and up.
    pub fn throw_nearby(&self, physics: &mut PhysicsWorld, origin: Vec3, forward: Vec3, radius: f32, strength: f32) -> usize {
        let dir = (Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero() + Vec3::Y).normalize_or_zero();
        self.impulse_nearby(physics, origin, radius, dir * strength)
    }

    fn impulse_nearby(&self, physics: &mut PhysicsWorld, origin: Vec3, radius: f32, velocity_change: Vec3) -> usize {
        let mut affected = 0;
        for object in self.objects.values() {
            let Some(body) = physics.body_mut(object.handles.body) else {
                continue;
            };
            if !body.is_dynamic() {
                continue;
            }
            if vec_from_rapier(body.translation()).distance(origin) > radius {
                continue;
            }
            let impulse = velocity_change * body.mass();
            body.apply_impulse(vec_to_rapier(impulse), true);
            affected += 1;
        }
        affected
    }
}

/// Spawn a dynamic ball paired with `visual`. Returns `None` (with a warning) when physics
/// is unavailable or the name is taken.
#[allow(clippy::too_many_arguments)]
pub fn add_dynamic_object(
    ctx: &mut SceneContext,
    visual: VisualTransform,
    name: &str,
    radius: f32,
    position: Vec3,
    mass: f32,
    restitution: f32,
    friction: f32,
) -> Option<DynamicHandles> {
    let Some(physics) = ctx.physics.as_mut() else {
        log::warn!("Physics unavailable, cannot add dynamic object '{name}'");
        return None;
    };
    let spec = SphereSpec { radius, mass, restitution, friction };
    match ctx.dynamics.add(physics, visual, name, position, spec) {
        Ok(handles) => Some(handles),
        Err(err) => {
            log::warn!("{err}");
            None
        }
    }
}

pub fn sync_visuals(ctx: &mut SceneContext) {
    if let Some(physics) = ctx.physics.as_ref() {
        ctx.dynamics.sync_visuals(physics);
        ctx.refresh_placed_objects();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use rapier3d::prelude::RigidBodyType;

    #[test]
    fn adding_without_physics_is_refused() {
        let mut ctx = SceneContext::default();
        let added = add_dynamic_object(&mut ctx, VisualTransform::default(), "ball", 0.1, Vec3::ZERO, 1.0, 0.4, 0.6);
        assert!(added.is_none());
        assert!(ctx.dynamics.is_empty());
    }

    const BALL: SphereSpec = SphereSpec { radius: 0.1, mass: 0.5, restitution: 0.4, friction: 0.6 };

    #[test]
    fn names_are_unique() {
        let mut physics = PhysicsWorld::new(&PhysicsConfig::default());
        let mut registry = DynamicObjectRegistry::new();
        registry.add(&mut physics, VisualTransform::default(), "ball", Vec3::ZERO, BALL).expect("first add");
        let err = registry.add(&mut physics, VisualTransform::default(), "ball", Vec3::X, BALL).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn visuals_follow_bodies_after_sync() {
        let mut physics = PhysicsWorld::new(&PhysicsConfig::default());
        let mut registry = DynamicObjectRegistry::new();
        registry.add(&mut physics, VisualTransform::default(), "ball", Vec3::new(0.0, 5.0, 0.0), BALL).expect("add");
        for _ in 0..30 {
            physics.step(1.0 / 60.0);
        }
        registry.sync_visuals(&physics);
        let visual = registry.get("ball").expect("ball").visual;
        assert!(visual.translation.y < 5.0, "ball falls under gravity");
        assert_eq!(Some(visual.translation), registry.position_of(&physics, "ball"));
    }

    #[test]
    fn kick_only_reaches_nearby_objects() {
        let mut physics = PhysicsWorld::new(&PhysicsConfig::default());
        let mut registry = DynamicObjectRegistry::new();
        registry.add(&mut physics, VisualTransform::default(), "near", Vec3::new(0.0, 0.0, -1.0), BALL).expect("add");
        registry.add(&mut physics, VisualTransform::default(), "far", Vec3::new(0.0, 0.0, -9.0), BALL).expect("add");
        physics.step(physics.fixed_dt());
        let kicked = registry.kick_nearby(&mut physics, Vec3::ZERO, Vec3::NEG_Z, 1.5, 4.0);
        assert_eq!(kicked, 1);
        let near = registry.get("near").expect("near").handles.body;
        let linvel = physics.body(near).map(|b| vec_from_rapier(b.linvel())).expect("body");
        assert!(linvel.z < -3.0 && linvel.y > 0.0);
    }

    #[test]
    fn throw_lifts_free_objects_and_skips_held_ones() {
        let mut physics = PhysicsWorld::new(&PhysicsConfig::default());
        let mut registry = DynamicObjectRegistry::new();
        registry.add(&mut physics, VisualTransform::default(), "free", Vec3::new(0.5, 0.0, -1.0), BALL).expect("add");
        registry.add(&mut physics, VisualTransform::default(), "held", Vec3::new(-0.5, 0.0, -1.0), BALL).expect("add");
        registry.add(&mut physics, VisualTransform::default(), "far", Vec3::new(0.0, 0.0, -6.0), BALL).expect("add");
        let held = registry.get("held").expect("held").handles.body;
        physics.body_mut(held).expect("held body").set_body_type(RigidBodyType::KinematicPositionBased, true);
        physics.step(physics.fixed_dt());

        let thrown = registry.throw_nearby(&mut physics, Vec3::ZERO, Vec3::NEG_Z, 2.0, 6.0);
        assert_eq!(thrown, 1, "only the free ball in range is thrown");

        let velocity = |name: &str| {
            let handle = registry.get(name).expect("object").handles.body;
            physics.body(handle).map(|b| vec_from_rapier(b.linvel())).expect("body")
        };
        let free = velocity("free");
        assert!(free.y > 3.0 && free.z < -3.0, "thrown up and forward, got {free:?}");
        assert!(free.y > free.z.abs() * 0.9, "throw arcs higher than a kick");
        assert_eq!(velocity("held"), Vec3::ZERO);
        assert!(velocity("far").y <= 0.0);
    }
}
