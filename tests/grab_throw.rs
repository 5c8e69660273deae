use glam::Vec3;
use rapier3d::prelude::RigidBodyType;
use splat_viewer::camera::Viewpoint;
use splat_viewer::config::{InteractionConfig, PhysicsConfig, TimestepMode};
use splat_viewer::dynamics::{add_dynamic_object, VisualTransform};
use splat_viewer::events::{EventBus, Hand, ViewerEvent};
use splat_viewer::interaction::{GrabInteraction, HandJoints, HandsInput};
use splat_viewer::physics::{vec_from_rapier, PhysicsWorld};
use splat_viewer::scene::SceneContext;

const DT: f32 = 1.0 / 90.0;

fn scene_with(objects: &[(&str, Vec3)]) -> SceneContext {
    let mut ctx = SceneContext::new(Viewpoint::new(Vec3::ZERO, 0.0));
    let config = PhysicsConfig { timestep: TimestepMode::FixedTick, gravity: [0.0, 0.0, 0.0], ..PhysicsConfig::default() };
    ctx.physics = Some(PhysicsWorld::new(&config));
    for (name, position) in objects {
        add_dynamic_object(&mut ctx, VisualTransform::default(), name, 0.03, *position, 0.2, 0.3, 0.5)
            .expect("spawn object");
    }
    ctx
}

fn pinched_at(point: Vec3) -> HandJoints {
    HandJoints::new(point - Vec3::new(0.005, 0.0, 0.0), point + Vec3::new(0.005, 0.0, 0.0))
}

fn open_at(point: Vec3) -> HandJoints {
    HandJoints::new(point - Vec3::new(0.05, 0.0, 0.0), point + Vec3::new(0.05, 0.0, 0.0))
}

fn body_type(ctx: &SceneContext, name: &str) -> RigidBodyType {
    let handle = ctx.dynamics.get(name).expect("object").handles.body;
    ctx.physics.as_ref().and_then(|physics| physics.body(handle)).expect("body").body_type()
}

fn assert_exclusive(grab: &GrabInteraction, ctx: &SceneContext) {
    for object in ctx.dynamics.iter() {
        let holders = Hand::BOTH.iter().filter(|&&hand| grab.held(hand) == Some(object.name.as_str())).count();
        assert!(holders <= 1, "{} held by {holders} hands", object.name);
    }
}

#[test]
fn nearer_object_is_grabbed() {
    let mut ctx = scene_with(&[("far", Vec3::new(0.12, 0.0, 0.0)), ("near", Vec3::new(0.0, 0.05, 0.0))]);
    let mut grab = GrabInteraction::with_seed(InteractionConfig::default(), 1);
    let mut bus = EventBus::default();

    grab.update(&mut ctx, &HandsInput { left: pinched_at(Vec3::ZERO), ..Default::default() }, DT, &mut bus);

    assert_eq!(grab.held(Hand::Left), Some("near"));
    assert_eq!(body_type(&ctx, "near"), RigidBodyType::KinematicPositionBased);
    assert_eq!(body_type(&ctx, "far"), RigidBodyType::Dynamic);
    assert_eq!(bus.drain(), vec![ViewerEvent::ObjectGrabbed { hand: Hand::Left, name: "near".into() }]);
}

#[test]
fn object_held_by_other_hand_is_excluded_even_if_nearer() {
    let mut ctx = scene_with(&[("near", Vec3::new(0.0, 0.02, 0.0)), ("other", Vec3::new(0.1, 0.0, 0.0))]);
    let mut grab = GrabInteraction::with_seed(InteractionConfig::default(), 2);
    let mut bus = EventBus::default();

    let both = HandsInput { left: pinched_at(Vec3::ZERO), right: pinched_at(Vec3::ZERO) };
    grab.update(&mut ctx, &both, DT, &mut bus);

    assert_eq!(grab.held(Hand::Left), Some("near"), "left hand is evaluated first");
    assert_eq!(grab.held(Hand::Right), Some("other"));
    assert_exclusive(&grab, &ctx);
}

#[test]
fn lone_object_is_never_shared() {
    let mut ctx = scene_with(&[("only", Vec3::ZERO)]);
    let mut grab = GrabInteraction::with_seed(InteractionConfig::default(), 3);
    let mut bus = EventBus::default();

    let script = [
        HandsInput { left: pinched_at(Vec3::ZERO), right: open_at(Vec3::ZERO) },
        HandsInput { left: pinched_at(Vec3::ZERO), right: pinched_at(Vec3::ZERO) },
        HandsInput { left: open_at(Vec3::ZERO), right: pinched_at(Vec3::ZERO) },
        HandsInput { left: pinched_at(Vec3::ZERO), right: open_at(Vec3::ZERO) },
    ];
    for hands in &script {
        grab.update(&mut ctx, hands, DT, &mut bus);
        assert_exclusive(&grab, &ctx);
    }
    assert_eq!(grab.held(Hand::Right), None, "right pinched while left held it");
    assert_eq!(grab.held(Hand::Left), Some("only"), "left re-grabbed after release");
}

#[test]
fn release_with_empty_history_throws_with_zero_velocity() {
    let mut ctx = scene_with(&[("ball", Vec3::ZERO)]);
    let mut grab = GrabInteraction::with_seed(InteractionConfig::default(), 4);
    let mut bus = EventBus::default();

    grab.update(&mut ctx, &HandsInput { left: pinched_at(Vec3::ZERO), ..Default::default() }, DT, &mut bus);
    assert!(grab.hand(Hand::Left).velocity_history.is_empty(), "first valid frame has no previous position");
    grab.update(&mut ctx, &HandsInput { left: open_at(Vec3::ZERO), ..Default::default() }, 0.0, &mut bus);

    assert_eq!(grab.held(Hand::Left), None);
    assert_eq!(body_type(&ctx, "ball"), RigidBodyType::Dynamic);
    let handle = ctx.dynamics.get("ball").expect("ball").handles.body;
    let linvel = ctx.physics.as_ref().and_then(|p| p.body(handle)).map(|b| vec_from_rapier(b.linvel())).expect("body");
    assert_eq!(linvel, Vec3::ZERO);
    let events = bus.drain();
    assert_eq!(
        events.last(),
        Some(&ViewerEvent::ObjectThrown { hand: Hand::Left, name: "ball".into(), velocity: Vec3::ZERO })
    );
}

#[test]
fn throw_velocity_is_scaled_average_of_hand_motion() {
    let mut ctx = scene_with(&[("ball", Vec3::ZERO)]);
    let config = InteractionConfig::default();
    let multiplier = config.throw_multiplier;
    let mut grab = GrabInteraction::with_seed(config, 5);
    let mut bus = EventBus::default();

    let step = Vec3::new(0.0, 0.0, -0.02);
    let mut hand = Vec3::ZERO;
    grab.update(&mut ctx, &HandsInput { left: pinched_at(hand), ..Default::default() }, DT, &mut bus);
    for _ in 0..3 {
        hand += step;
        grab.update(&mut ctx, &HandsInput { left: pinched_at(hand), ..Default::default() }, DT, &mut bus);
    }
    hand += step;
    grab.update(&mut ctx, &HandsInput { left: open_at(hand), ..Default::default() }, DT, &mut bus);

    let Some(ViewerEvent::ObjectThrown { velocity, .. }) = bus.drain().pop() else {
        panic!("expected a throw event");
    };
    let expected = step / DT * multiplier;
    assert!((velocity - expected).length() < 1e-3, "got {velocity:?}, expected {expected:?}");
    assert!(grab.hand(Hand::Left).velocity_history.is_empty(), "history cleared on release");
}
