use crate::config::CharacterConfig;
use crate::physics::{vec_from_rapier, vec_to_rapier, PhysicsWorld};
use crate::scene::SceneContext;
use glam::{Vec2, Vec3};
use rapier3d::prelude::{ColliderBuilder, ColliderHandle, RigidBodyBuilder, RigidBodyHandle};

/// How far above the capsule's lowest point the ground ray starts.
const GROUND_RAY_INSET: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterBody {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharacterStep {
    pub grounded: bool,
    pub jumped: bool,
}

/// Capsule body carrying the viewer around when physics is on. The camera follows the body.
pub struct CharacterController {
    config: CharacterConfig,
    body: Option<CharacterBody>,
    enabled: bool,
    grounded: bool,
}

impl CharacterController {
    pub fn new(config: CharacterConfig) -> Self {
        Self { config, body: None, enabled: false, grounded: false }
    }

    pub fn config(&self) -> &CharacterConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn body(&self) -> Option<CharacterBody> {
        self.body
    }

    /// Turn the controller on or off and return the resulting state.
    ///
    /// Enabling builds the capsule on first use and teleports it under the current eye with
    /// zero velocity. Disabling keeps the body but takes it out of the simulation.
    pub fn set_enabled(&mut self, ctx: &mut SceneContext, enabled: bool) -> bool {
        let Some(physics) = ctx.physics.as_mut() else {
            if enabled {
                log::warn!("Physics unavailable, character controller stays disabled");
            }
            self.enabled = false;
            self.grounded = false;
            return false;
        };
        if !enabled {
            if let Some(body) = self.body.and_then(|handles| physics.body_mut(handles.body)) {
                body.set_linvel(vec_to_rapier(Vec3::ZERO), false);
                body.set_enabled(false);
            }
            self.enabled = false;
            self.grounded = false;
            return false;
        }
        let center = ctx.viewpoint.eye_world() - Vec3::Y * self.eye_offset_from_center();
        let handles = match self.body {
            Some(handles) => handles,
            None => {
                let handles = self.build_body(physics, center);
                self.body = Some(handles);
                handles
            }
        };
        let Some(body) = physics.body_mut(handles.body) else {
            log::warn!("Character body missing from physics world");
            return false;
        };
        body.set_enabled(true);
        body.set_translation(vec_to_rapier(center), true);
        body.set_linvel(vec_to_rapier(Vec3::ZERO), true);
        body.set_angvel(vec_to_rapier(Vec3::ZERO), true);
        self.enabled = true;
        self.grounded = false;
        true
    }

    fn build_body(&self, physics: &mut PhysicsWorld, center: Vec3) -> CharacterBody {
        let body = RigidBodyBuilder::dynamic()
            .translation(vec_to_rapier(center))
            .lock_rotations()
            .ccd_enabled(true)
            .linear_damping(self.config.linear_damping)
            .build();
        let collider = ColliderBuilder::capsule_y(self.config.half_height(), self.config.radius)
            .mass(self.config.mass)
            .friction(0.0)
            .build();
        let (body, collider) = physics.insert_body(body, collider);
        log::debug!("Character capsule created at {center:?}");
        CharacterBody { body, collider }
    }

    fn eye_offset_from_center(&self) -> f32 {
        self.config.eye_height_fraction * self.config.height - self.config.height * 0.5
    }

    /// One frame of locomotion. `movement` is camera-relative: `x` strafes right, `y` walks
    /// forward.
    pub fn update(&mut self, ctx: &mut SceneContext, movement: Vec2, jump_requested: bool) -> CharacterStep {
        if !self.enabled {
            return CharacterStep::default();
        }
        let Some(handles) = self.body else {
            return CharacterStep::default();
        };
        let forward = ctx.viewpoint.forward_flat();
        let right = ctx.viewpoint.right_flat();
        let Some(physics) = ctx.physics.as_mut() else {
            log::warn!("Physics unavailable, character update skipped");
            return CharacterStep::default();
        };

        self.grounded = self.ground_check(physics);

        let mut wish = forward * movement.y + right * movement.x;
        if wish.length_squared() > 1.0 {
            wish = wish.normalize();
        }
        let horizontal = wish * self.config.move_speed;
        if let Some(body) = physics.body_mut(handles.body) {
            let current = vec_from_rapier(body.linvel());
            body.set_linvel(vec_to_rapier(Vec3::new(horizontal.x, current.y, horizontal.z)), true);
        }

        let jumped = jump_requested && self.jump(physics);

        if let Some(body) = physics.body(handles.body) {
            let center = vec_from_rapier(body.translation());
            let bottom = center.y - self.config.height * 0.5;
            let eye = Vec3::new(center.x, bottom + self.config.eye_height_fraction * self.config.height, center.z);
            ctx.viewpoint.place_eye_at(eye);
        }
        CharacterStep { grounded: self.grounded, jumped }
    }

    /// Short ray down from inside the bottom cap. Rising bodies are never grounded.
    pub fn ground_check(&self, physics: &PhysicsWorld) -> bool {
        let Some(handles) = self.body else {
            return false;
        };
        let Some(body) = physics.body(handles.body) else {
            return false;
        };
        let center = vec_from_rapier(body.translation());
        let vertical_velocity = body.linvel().y;
        let origin = Vec3::new(center.x, center.y - self.config.height * 0.5 + GROUND_RAY_INSET, center.z);
        let hit = physics.cast_ray_down(origin, self.config.ground_ray_length + GROUND_RAY_INSET, Some(handles.collider));
        hit.is_some() && vertical_velocity <= self.config.grounded_velocity_threshold
    }

    /// Apply the jump impulse when grounded. Grounded clears immediately and only comes back
    /// through a later ground check.
    pub fn jump(&mut self, physics: &mut PhysicsWorld) -> bool {
        if !self.enabled || !self.grounded {
            return false;
        }
        let Some(body) = self.body.and_then(|handles| physics.body_mut(handles.body)) else {
            return false;
        };
        body.apply_impulse(vec_to_rapier(Vec3::Y * self.config.jump_force * self.config.mass), true);
        self.grounded = false;
        true
    }
}
