use glam::{Quat, Vec2, Vec3};
use splat_viewer::camera::Viewpoint;
use splat_viewer::character::CharacterController;
use splat_viewer::collision;
use splat_viewer::config::{CharacterConfig, PhysicsConfig, TimestepMode};
use splat_viewer::physics::PhysicsWorld;
use splat_viewer::scene::SceneContext;

const DT: f32 = 1.0 / 60.0;

fn standing_scene(config: &CharacterConfig) -> (SceneContext, CharacterController) {
    let eye_height = config.eye_height_fraction * config.height;
    let mut ctx = SceneContext::new(Viewpoint::new(Vec3::new(0.0, eye_height + 0.02, 0.0), 0.0));
    let mut physics =
        PhysicsWorld::new(&PhysicsConfig { timestep: TimestepMode::FixedTick, ..PhysicsConfig::default() });
    physics.add_fixed_cuboid(Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY, Vec3::ZERO, Vec3::new(20.0, 0.5, 20.0));
    ctx.physics = Some(physics);
    let mut character = CharacterController::new(config.clone());
    assert!(character.set_enabled(&mut ctx, true));
    (ctx, character)
}

fn frame(ctx: &mut SceneContext, character: &mut CharacterController, jump: bool) -> (bool, bool) {
    collision::step(ctx, DT);
    let step = character.update(ctx, Vec2::ZERO, jump);
    (step.grounded, step.jumped)
}

fn settle(ctx: &mut SceneContext, character: &mut CharacterController) {
    for _ in 0..120 {
        if frame(ctx, character, false).0 {
            return;
        }
    }
    panic!("character never touched the ground");
}

fn vertical_velocity(ctx: &SceneContext, character: &CharacterController) -> f32 {
    let handle = character.body().expect("capsule").body;
    ctx.physics.as_ref().and_then(|physics| physics.body(handle)).map(|body| body.linvel().y).expect("body")
}

#[test]
fn jump_requires_ground_contact() {
    let config = CharacterConfig::default();
    let (mut ctx, mut character) = standing_scene(&config);
    assert!(!character.is_grounded(), "grounded is unknown until the first ground check");
    let physics = ctx.physics.as_mut().expect("physics");
    assert!(!character.jump(physics), "no jump before a ground check");

    settle(&mut ctx, &mut character);
    let (grounded, jumped) = frame(&mut ctx, &mut character, true);
    assert!(jumped, "grounded character jumps");
    assert!(!grounded, "grounded clears as soon as the impulse is applied");
    assert!(!character.is_grounded());

    let physics = ctx.physics.as_mut().expect("physics");
    assert!(!character.jump(physics), "no double jump");
}

#[test]
fn regrounding_needs_contact_and_low_vertical_speed() {
    let config = CharacterConfig::default();
    let threshold = config.grounded_velocity_threshold;
    let (mut ctx, mut character) = standing_scene(&config);
    settle(&mut ctx, &mut character);
    assert!(frame(&mut ctx, &mut character, true).1);

    let (grounded, _) = frame(&mut ctx, &mut character, false);
    assert!(!grounded, "still rising right after take-off even though the floor is close");
    assert!(vertical_velocity(&ctx, &character) > threshold);

    let mut landed = false;
    for _ in 0..180 {
        let (grounded, _) = frame(&mut ctx, &mut character, false);
        if grounded {
            assert!(vertical_velocity(&ctx, &character) <= threshold);
            landed = true;
            break;
        }
    }
    assert!(landed, "character lands again");
}

#[test]
fn camera_follows_capsule() {
    let config = CharacterConfig::default();
    let (mut ctx, mut character) = standing_scene(&config);
    settle(&mut ctx, &mut character);
    for _ in 0..60 {
        collision::step(&mut ctx, DT);
        character.update(&mut ctx, Vec2::new(0.0, 1.0), false);
    }
    let eye = ctx.viewpoint.eye_world();
    assert!(eye.z < -1.5, "walked forward along -Z, eye at {eye:?}");
    let expected_eye = config.eye_height_fraction * config.height;
    assert!((eye.y - expected_eye).abs() < 0.1, "eye height {} vs {expected_eye}", eye.y);
}
