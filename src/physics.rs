use crate::config::{PhysicsConfig, TimestepMode};
use anyhow::{anyhow, Result};
use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::{
    CCDSolver, Collider, ColliderBuilder, ColliderHandle, ColliderSet, DefaultBroadPhase, ImpulseJointSet,
    IntegrationParameters, IslandManager, Isometry, MultibodyJointSet, NarrowPhase, PhysicsPipeline, Point,
    QueryFilter, QueryPipeline, Ray, Real, RigidBody, RigidBodyBuilder, RigidBodyHandle, RigidBodySet, Vector,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub collider: ColliderHandle,
    pub distance: f32,
    pub point: Vec3,
}

pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    timestep: TimestepMode,
    max_substeps: u32,
    accumulator: f32,
    stepped_ticks: u64,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.fixed_dt.max(1.0e-4);
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vec_to_rapier(Vec3::from_array(config.gravity)),
            integration_parameters,
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            timestep: config.timestep,
            max_substeps: config.max_substeps.max(1),
            accumulator: 0.0,
            stepped_ticks: 0,
        }
    }

    pub fn fixed_dt(&self) -> f32 {
        self.integration_parameters.dt
    }

    pub fn timestep(&self) -> TimestepMode {
        self.timestep
    }

    pub fn stepped_ticks(&self) -> u64 {
        self.stepped_ticks
    }

    /// Advance the simulation for a frame of `dt` seconds and return the number of
    /// internal ticks run.
    ///
    /// `FixedTick` runs exactly one tick and ignores `dt`, so simulation speed tracks the
    /// frame rate. `Accumulated` runs as many whole ticks as `dt` covers, at most
    /// `max_substeps`; leftover time carries into the next frame and time beyond the cap
    /// is dropped.
    pub fn step(&mut self, dt: f32) -> u32 {
        match self.timestep {
            TimestepMode::FixedTick => {
                self.tick();
                1
            }
            TimestepMode::Accumulated => {
                let tick = self.integration_parameters.dt;
                self.accumulator += dt.max(0.0);
                let mut ticks = 0;
                while self.accumulator >= tick && ticks < self.max_substeps {
                    self.tick();
                    self.accumulator -= tick;
                    ticks += 1;
                }
                if ticks == self.max_substeps && self.accumulator >= tick {
                    self.accumulator %= tick;
                }
                ticks
            }
        }
    }

    fn tick(&mut self) {
        let hooks = ();
        let events = ();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &hooks,
            &events,
        );
        self.query_pipeline.update(&self.colliders);
        self.stepped_ticks += 1;
    }

    /// Refresh scene queries after inserting colliders outside of a step.
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    pub fn insert_body(&mut self, body: RigidBody, collider: Collider) -> (RigidBodyHandle, ColliderHandle) {
        let body_handle = self.bodies.insert(body);
        let collider_handle = self.colliders.insert_with_parent(collider, body_handle, &mut self.bodies);
        (body_handle, collider_handle)
    }

    /// Fixed triangle-mesh collider posed at `translation`/`rotation`.
    pub fn add_fixed_trimesh(
        &mut self,
        translation: Vec3,
        rotation: Quat,
        vertices: &[Vec3],
        triangles: Vec<[u32; 3]>,
    ) -> Result<(RigidBodyHandle, ColliderHandle)> {
        let points: Vec<Point<Real>> = vertices.iter().map(|v| Point::new(v.x, v.y, v.z)).collect();
        let collider = ColliderBuilder::trimesh(points, triangles)
            .map_err(|err| anyhow!("Invalid triangle mesh: {err:?}"))?
            .build();
        let body = RigidBodyBuilder::fixed().position(isometry(translation, rotation)).build();
        let handles = self.insert_body(body, collider);
        self.refresh_queries();
        Ok(handles)
    }

    /// Fixed box collider. `center` is in the body's local frame.
    pub fn add_fixed_cuboid(
        &mut self,
        translation: Vec3,
        rotation: Quat,
        center: Vec3,
        half_extents: Vec3,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(vec_to_rapier(center))
            .build();
        let body = RigidBodyBuilder::fixed().position(isometry(translation, rotation)).build();
        let handles = self.insert_body(body, collider);
        self.refresh_queries();
        handles
    }

    pub fn cast_ray(&self, origin: Vec3, dir: Vec3, max_distance: f32, filter: QueryFilter) -> Option<RayHit> {
        let dir = dir.normalize_or_zero();
        if dir == Vec3::ZERO || max_distance <= 0.0 {
            return None;
        }
        let ray = Ray::new(Point::new(origin.x, origin.y, origin.z), vec_to_rapier(dir));
        self.query_pipeline
            .cast_ray(&self.bodies, &self.colliders, &ray, max_distance, true, filter)
            .map(|(collider, distance)| RayHit { collider, distance, point: origin + dir * distance })
    }

    pub fn cast_ray_down(&self, origin: Vec3, max_distance: f32, exclude: Option<ColliderHandle>) -> Option<RayHit> {
        let filter = match exclude {
            Some(handle) => QueryFilter::default().exclude_collider(handle),
            None => QueryFilter::default(),
        };
        self.cast_ray(origin, Vec3::NEG_Y, max_distance, filter)
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}

pub fn vec_to_rapier(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

pub fn vec_from_rapier(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn quat_to_rapier(q: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub fn quat_from_rapier(q: &UnitQuaternion<Real>) -> Quat {
    let c = q.coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}

pub fn isometry(translation: Vec3, rotation: Quat) -> Isometry<Real> {
    Isometry::from_parts(Translation3::new(translation.x, translation.y, translation.z), quat_to_rapier(rotation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(mode: TimestepMode) -> PhysicsWorld {
        PhysicsWorld::new(&PhysicsConfig { timestep: mode, ..PhysicsConfig::default() })
    }

    #[test]
    fn fixed_tick_ignores_frame_delta() {
        let mut physics = world(TimestepMode::FixedTick);
        assert_eq!(physics.step(0.5), 1);
        assert_eq!(physics.step(0.0), 1);
        assert_eq!(physics.stepped_ticks(), 2);
    }

    #[test]
    fn accumulated_mode_substeps_and_carries_remainder() {
        let mut physics = world(TimestepMode::Accumulated);
        let tick = physics.fixed_dt();
        assert_eq!(physics.step(tick * 0.5), 0);
        assert_eq!(physics.step(tick * 0.6), 1, "two half frames add up to one tick");
        assert_eq!(physics.step(tick * 10.0), 4, "capped at max_substeps");
        assert_eq!(physics.stepped_ticks(), 5);
    }

    #[test]
    fn quaternion_round_trip_preserves_rotation() {
        let q = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(0.2);
        let back = quat_from_rapier(&quat_to_rapier(q));
        assert!(q.dot(back).abs() > 0.9999);
    }

    #[test]
    fn ray_hits_fixed_cuboid() {
        let mut physics = world(TimestepMode::FixedTick);
        let (_, collider) =
            physics.add_fixed_cuboid(Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY, Vec3::ZERO, Vec3::new(5.0, 0.5, 5.0));
        let hit = physics.cast_ray_down(Vec3::new(0.0, 2.0, 0.0), 5.0, None).expect("ground hit");
        assert_eq!(hit.collider, collider);
        assert!((hit.distance - 2.0).abs() < 1e-4);
        assert!(physics.cast_ray_down(Vec3::new(0.0, 2.0, 0.0), 5.0, Some(collider)).is_none());
    }
}
