use crate::assets::{AssetResolver, AssetSource};
use crate::collision_mesh::{collision_meshes_from_slice, CollisionMesh};
use crate::config::PhysicsConfig;
use crate::physics::PhysicsWorld;
use crate::scene::{CollisionRecord, CollisionShape, SceneContext};
use anyhow::Result;

/// Build a fresh physics world from the collision mesh asset and store it in the scene.
///
/// On any failure the scene is left without physics and a warning is logged; callers treat
/// that as "physics unavailable".
pub fn initialize<S: AssetSource>(
    ctx: &mut SceneContext,
    resolver: &mut AssetResolver<S>,
    mesh_name: &str,
    config: &PhysicsConfig,
) -> bool {
    match load_meshes(resolver, mesh_name) {
        Ok(meshes) => {
            let installed = install_collision_meshes(ctx, &meshes, config);
            log::info!("Physics ready: {installed} collision bodies from '{mesh_name}'");
            true
        }
        Err(err) => {
            log::warn!("Physics disabled: {err:#}");
            ctx.physics = None;
            false
        }
    }
}

fn load_meshes<S: AssetSource>(resolver: &mut AssetResolver<S>, mesh_name: &str) -> Result<Vec<CollisionMesh>> {
    let bytes = resolver.load_bytes(mesh_name)?;
    collision_meshes_from_slice(&bytes, mesh_name)
}

/// Replace the scene's physics world with one holding a fixed body per mesh. Returns the
/// number of bodies created.
pub fn install_collision_meshes(ctx: &mut SceneContext, meshes: &[CollisionMesh], config: &PhysicsConfig) -> usize {
    let mut physics = PhysicsWorld::new(config);
    let mut records = Vec::with_capacity(meshes.len());
    for mesh in meshes {
        if let Some(triangles) = mesh.triangles() {
            let count = triangles.len();
            match physics.add_fixed_trimesh(mesh.translation, mesh.rotation, &mesh.positions, triangles) {
                Ok((body, collider)) => {
                    records.push(CollisionRecord {
                        name: mesh.name.clone(),
                        body,
                        collider,
                        shape: CollisionShape::TriMesh { triangles: count },
                    });
                    continue;
                }
                Err(err) => log::warn!("Collision mesh '{}': {err:#}, using bounding box", mesh.name),
            }
        }
        let Some(bounds) = mesh.bounds() else {
            log::warn!("Collision mesh '{}' has no vertices, skipping", mesh.name);
            continue;
        };
        let (body, collider) =
            physics.add_fixed_cuboid(mesh.translation, mesh.rotation, bounds.center, bounds.half_extents);
        records.push(CollisionRecord {
            name: mesh.name.clone(),
            body,
            collider,
            shape: CollisionShape::Cuboid { half_extents: bounds.half_extents },
        });
    }
    let installed = records.len();
    ctx.collision_meshes = records;
    ctx.physics = Some(physics);
    ctx.physics_missing_warned = false;
    installed
}

/// Advance the scene's physics by a frame. Returns the ticks run; zero without physics.
pub fn step(ctx: &mut SceneContext, dt: f32) -> u32 {
    match ctx.physics.as_mut() {
        Some(physics) => physics.step(dt),
        None => {
            if !ctx.physics_missing_warned {
                log::warn!("Physics world not initialized, skipping simulation");
                ctx.physics_missing_warned = true;
            }
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimestepMode;
    use glam::{Quat, Vec3};

    fn floor(indices: Option<Vec<u32>>) -> CollisionMesh {
        CollisionMesh {
            name: "floor::0".into(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            positions: vec![
                Vec3::new(-5.0, 0.0, -5.0),
                Vec3::new(5.0, 0.0, -5.0),
                Vec3::new(5.0, 0.0, 5.0),
                Vec3::new(-5.0, 0.0, 5.0),
            ],
            indices,
        }
    }

    #[test]
    fn indexed_meshes_become_trimeshes_and_others_boxes() {
        let mut ctx = SceneContext::default();
        let meshes = [floor(Some(vec![0, 2, 1, 0, 3, 2])), CollisionMesh { name: "crate::0".into(), ..floor(None) }];
        assert_eq!(install_collision_meshes(&mut ctx, &meshes, &PhysicsConfig::default()), 2);
        assert_eq!(ctx.collision_meshes[0].shape, CollisionShape::TriMesh { triangles: 2 });
        assert!(matches!(ctx.collision_meshes[1].shape, CollisionShape::Cuboid { .. }));
        let physics = ctx.physics.as_ref().expect("physics");
        assert!(physics.cast_ray_down(Vec3::new(0.0, 1.0, 0.0), 2.0, None).is_some());
    }

    #[test]
    fn stepping_without_physics_is_a_no_op() {
        let mut ctx = SceneContext::default();
        assert_eq!(step(&mut ctx, 0.016), 0);
        assert_eq!(step(&mut ctx, 0.016), 0);
        assert!(ctx.physics_missing_warned);
    }

    #[test]
    fn fixed_tick_step_runs_once_per_frame() {
        let mut ctx = SceneContext::default();
        let config = PhysicsConfig { timestep: TimestepMode::FixedTick, ..PhysicsConfig::default() };
        install_collision_meshes(&mut ctx, &[floor(None)], &config);
        assert_eq!(step(&mut ctx, 0.5), 1);
    }
}
