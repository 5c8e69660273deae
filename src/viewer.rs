use crate::assets::{AssetResolver, AssetSource};
use crate::audio::{AudioBackend, AudioManager, LogAudioBackend, SpatialAudio};
use crate::camera::Viewpoint;
use crate::character::CharacterController;
use crate::collision;
use crate::config::ViewerConfig;
use crate::drone::{DronePose, ScriptedMover};
use crate::dynamics::{add_dynamic_object, sync_visuals, VisualTransform};
use crate::events::{EventBus, Hand, ToggleFlags, Toggles, ViewerEvent};
use crate::hud::HudSnapshot;
use crate::input::Input;
use crate::interaction::{GrabInteraction, HandsInput};
use crate::lighting::SceneLights;
use crate::path::PathTracker;
use crate::scene::{PlacedObject, SceneContext, SplatBackground};
use crate::scene_config::{parse_entries, AudioSourceConfig, LightConfig, ObjectPlacement, PathPointConfig, RobotConfig};
use crate::time::FrameClock;
use glam::{Quat, Vec2, Vec3};
use serde::de::DeserializeOwned;

const CUE_LOG_CAPACITY: usize = 32;

/// Host-supplied state for one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub timestamp_ms: f64,
    /// Tracked head position in reference-frame space.
    pub head_local: Vec3,
    pub yaw: f32,
    pub hands: HandsInput,
}

#[derive(Debug, Clone, Default)]
pub struct FrameOutput {
    pub dt: f32,
    pub physics_ticks: u32,
    pub grounded: bool,
    pub jumped: bool,
    pub kicked: usize,
    pub thrown: usize,
    pub drone: Option<DronePose>,
    pub hud: Option<HudSnapshot>,
    pub events: Vec<ViewerEvent>,
}

/// Session root: owns the scene and every subsystem and runs them in a fixed order each
/// frame.
pub struct Viewer<S: AssetSource> {
    config: ViewerConfig,
    resolver: AssetResolver<S>,
    ctx: SceneContext,
    clock: FrameClock,
    input: Input,
    toggles: Toggles,
    bus: EventBus,
    character: CharacterController,
    grab: GrabInteraction,
    drone: Option<ScriptedMover>,
    path: PathTracker,
    audio: SpatialAudio<Box<dyn AudioBackend>>,
    cues: AudioManager,
    hud: Option<HudSnapshot>,
}

impl<S: AssetSource> Viewer<S> {
    pub fn load(config: ViewerConfig, source: S) -> Self {
        Self::load_with_audio(config, source, Box::new(LogAudioBackend::new()))
    }

    /// Assemble the scene step by step. A failing step logs a warning and leaves its
    /// feature disabled; the rest of the chain still runs.
    pub fn load_with_audio(config: ViewerConfig, source: S, audio_backend: Box<dyn AudioBackend>) -> Self {
        let resolver = AssetResolver::new(source, config.assets.local_root.clone(), config.assets.cdn_base.clone());
        let flags = config.toggles.flags();
        let input = match &config.input_bindings {
            Some(path) => Input::from_config(path),
            None => Input::new(),
        };
        let mut cues = AudioManager::new(CUE_LOG_CAPACITY);
        cues.set_enabled(flags.contains(ToggleFlags::AUDIO));
        let mut viewer = Self {
            resolver,
            ctx: SceneContext::new(Viewpoint::default()),
            clock: FrameClock::new(),
            input,
            toggles: Toggles::new(flags),
            bus: EventBus::default(),
            character: CharacterController::new(config.character.clone()),
            grab: GrabInteraction::new(config.interaction.clone()),
            drone: None,
            path: PathTracker::default(),
            audio: SpatialAudio::new(audio_backend, flags.contains(ToggleFlags::AUDIO)),
            cues,
            hud: None,
            config,
        };
        viewer.load_splat();
        viewer.load_physics();
        viewer.load_lighting();
        viewer.load_objects();
        viewer.load_audio();
        viewer.load_path();
        viewer.load_robot();
        viewer.apply_initial_toggles();
        log::info!(
            "Scene ready: {} objects ({} dynamic), {} lights, {} audio sources, {} path points, drone={}, physics={}",
            viewer.ctx.objects.len(),
            viewer.ctx.dynamics.len(),
            viewer.ctx.lights.len(),
            viewer.audio.sources().len(),
            viewer.path.markers().len(),
            viewer.drone.is_some(),
            viewer.ctx.has_physics()
        );
        viewer
    }

    fn load_splat(&mut self) {
        let filename = self.config.scene.splat.clone();
        let resolved = self.resolver.resolve(&filename);
        log::info!("Splat background: {}", resolved.location());
        self.ctx.splat = Some(SplatBackground { url: resolved.location().to_string(), local: resolved.is_local() });
    }

    fn load_physics(&mut self) {
        let mesh = self.config.scene.collision_mesh.clone();
        collision::initialize(&mut self.ctx, &mut self.resolver, &mesh, &self.config.physics);
    }

    fn load_lighting(&mut self) {
        let filename = self.config.scene.lighting.clone();
        let configs: Vec<LightConfig> = self.load_list(&filename, "lights");
        self.ctx.lights = SceneLights::from_configs(configs, self.toggles.enabled(ToggleFlags::HUD));
    }

    fn load_objects(&mut self) {
        let filename = self.config.scene.objects.clone();
        let placements: Vec<ObjectPlacement> = self.load_list(&filename, "objects");
        for placement in placements {
            let model_url = self.resolver.resolve(&placement.model).location().to_string();
            let transform = VisualTransform {
                translation: placement.position.into(),
                rotation: Quat::IDENTITY,
                scale: placement.scale.into(),
            };
            let dynamic = match &placement.dynamic {
                Some(body) => add_dynamic_object(
                    &mut self.ctx,
                    transform,
                    &placement.name,
                    body.radius,
                    transform.translation,
                    body.mass,
                    body.restitution,
                    body.friction,
                )
                .is_some(),
                None => false,
            };
            self.ctx.objects.push(PlacedObject { name: placement.name, model_url, transform, dynamic });
        }
    }

    fn load_audio(&mut self) {
        let filename = self.config.scene.audio.clone();
        let sources: Vec<AudioSourceConfig> = self.load_list(&filename, "sources");
        for source in sources {
            let url = self.resolver.resolve(&source.audio_url).location().to_string();
            self.audio.add_source(&source, url);
        }
    }

    fn load_path(&mut self) {
        let filename = self.config.scene.path.clone();
        let points: Vec<PathPointConfig> = self.load_list(&filename, "points");
        self.path = PathTracker::from_configs(points);
    }

    fn load_robot(&mut self) {
        let filename = self.config.scene.robot.clone();
        let parsed = self.resolver.load_bytes(&filename).and_then(|bytes| RobotConfig::parse(&bytes, &filename));
        match parsed {
            Ok(robot) => self.drone = Some(ScriptedMover::new(&robot, 0.0)),
            Err(err) => log::warn!("Drone disabled: {err:#}"),
        }
    }

    fn load_list<T: DeserializeOwned>(&mut self, filename: &str, wrapper_key: &str) -> Vec<T> {
        let parsed = self.resolver.load_bytes(filename).and_then(|bytes| parse_entries(&bytes, wrapper_key, filename));
        match parsed {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("Skipping {filename}: {err:#}");
                Vec::new()
            }
        }
    }

    fn apply_initial_toggles(&mut self) {
        if self.toggles.enabled(ToggleFlags::PHYSICS) && !self.character.set_enabled(&mut self.ctx, true) {
            self.toggles.set(ToggleFlags::PHYSICS, false, &mut self.bus);
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneContext {
        &self.ctx
    }

    pub fn scene_mut(&mut self) -> &mut SceneContext {
        &mut self.ctx
    }

    pub fn input_mut(&mut self) -> &mut Input {
        &mut self.input
    }

    pub fn toggles(&self) -> &Toggles {
        &self.toggles
    }

    pub fn character(&self) -> &CharacterController {
        &self.character
    }

    pub fn grab(&self) -> &GrabInteraction {
        &self.grab
    }

    pub fn drone(&self) -> Option<&ScriptedMover> {
        self.drone.as_ref()
    }

    pub fn path(&self) -> &PathTracker {
        &self.path
    }

    pub fn audio(&self) -> &SpatialAudio<Box<dyn AudioBackend>> {
        &self.audio
    }

    pub fn cues(&self) -> &AudioManager {
        &self.cues
    }

    pub fn hud(&self) -> Option<&HudSnapshot> {
        self.hud.as_ref()
    }

    /// Flip a toggle from outside the keyboard path. Subscribers see it next frame.
    pub fn set_toggle(&mut self, toggle: ToggleFlags, enabled: bool) -> bool {
        self.toggles.set(toggle, enabled, &mut self.bus)
    }

    pub fn frame(&mut self, frame: FrameInput) -> FrameOutput {
        let mut out = FrameOutput { dt: self.clock.tick(frame.timestamp_ms), ..FrameOutput::default() };
        self.ctx.viewpoint.head_local = frame.head_local;
        self.ctx.viewpoint.yaw = frame.yaw;

        let keys = self.input.take_frame();
        if keys.user_gesture {
            self.audio.user_gesture();
        }
        if keys.toggle_physics {
            self.toggles.toggle(ToggleFlags::PHYSICS, &mut self.bus);
        }
        if keys.toggle_hud {
            self.toggles.toggle(ToggleFlags::HUD, &mut self.bus);
        }
        if keys.toggle_audio {
            self.toggles.toggle(ToggleFlags::AUDIO, &mut self.bus);
        }

        self.dispatch_toggles();

        out.physics_ticks = collision::step(&mut self.ctx, out.dt);
        sync_visuals(&mut self.ctx);

        if self.character.is_enabled() {
            let step = self.character.update(&mut self.ctx, keys.movement, keys.jump);
            out.grounded = step.grounded;
            out.jumped = step.jumped;
            if step.jumped {
                self.bus.push(ViewerEvent::CharacterJumped);
            }
        } else {
            self.free_move(keys.movement, out.dt);
        }

        if keys.kick || keys.throw {
            self.push_nearby(keys.kick, keys.throw, &mut out);
        }

        self.grab.update(&mut self.ctx, &frame.hands, out.dt, &mut self.bus);

        if let Some(drone) = self.drone.as_mut() {
            let before = drone.phase();
            out.drone = Some(drone.update(frame.timestamp_ms));
            if drone.phase() != before {
                self.bus.push(ViewerEvent::DronePhaseChanged { phase: drone.phase().label(), waypoint: drone.waypoint_index() });
            }
        }

        let listener = self.ctx.viewpoint.eye_world();
        self.path.update(listener, &mut self.bus);
        self.audio.update(listener, &mut self.bus);

        self.hud = self.toggles.enabled(ToggleFlags::HUD).then(|| self.snapshot());
        out.hud = self.hud.clone();

        out.events = self.bus.drain();
        for event in &out.events {
            self.cues.handle_event(event);
            log::debug!("{event}");
        }
        out
    }

    fn dispatch_toggles(&mut self) {
        let pending = self.bus.drain();
        for event in &pending {
            let ViewerEvent::ToggleChanged { toggle, enabled } = *event else {
                continue;
            };
            if toggle == ToggleFlags::PHYSICS {
                let active = self.character.set_enabled(&mut self.ctx, enabled);
                if enabled && !active {
                    self.toggles.set(ToggleFlags::PHYSICS, false, &mut self.bus);
                }
            } else if toggle == ToggleFlags::HUD {
                self.ctx.lights.set_helpers_visible(enabled);
            } else if toggle == ToggleFlags::AUDIO {
                self.audio.set_enabled(enabled);
                self.cues.set_enabled(enabled);
            }
        }
        let follow_up = self.bus.drain();
        self.bus.extend(pending);
        self.bus.extend(follow_up);
    }

    /// Walk the reference frame directly when the character is off.
    fn free_move(&mut self, movement: Vec2, dt: f32) {
        if movement == Vec2::ZERO || dt <= 0.0 {
            return;
        }
        let view = &mut self.ctx.viewpoint;
        let mut wish = view.forward_flat() * movement.y + view.right_flat() * movement.x;
        if wish.length_squared() > 1.0 {
            wish = wish.normalize();
        }
        view.reference_frame.translation += wish * self.config.character.move_speed * dt;
    }

    fn push_nearby(&mut self, kick: bool, throw: bool, out: &mut FrameOutput) {
        let origin = self.ctx.viewpoint.eye_world();
        let forward = self.ctx.viewpoint.forward_flat();
        let Some(physics) = self.ctx.physics.as_mut() else {
            log::warn!("Physics unavailable, ignoring kick/throw");
            return;
        };
        let cfg = &self.config.interaction;
        if kick {
            out.kicked = self.ctx.dynamics.kick_nearby(physics, origin, forward, cfg.kick_radius, cfg.kick_strength);
            if out.kicked > 0 {
                self.bus.push(ViewerEvent::ObjectsKicked { count: out.kicked });
            }
        }
        if throw {
            out.thrown = self.ctx.dynamics.throw_nearby(physics, origin, forward, cfg.throw_radius, cfg.throw_strength);
            if out.thrown > 0 {
                self.bus.push(ViewerEvent::ObjectsThrown { count: out.thrown });
            }
        }
    }

    fn snapshot(&self) -> HudSnapshot {
        HudSnapshot {
            fps: self.clock.fps(),
            eye_position: self.ctx.viewpoint.eye_world(),
            grounded: self.character.is_grounded(),
            physics_enabled: self.character.is_enabled(),
            held_left: self.grab.held(Hand::Left).map(str::to_string),
            held_right: self.grab.held(Hand::Right).map(str::to_string),
            drone_phase: self.drone.as_ref().map(|drone| drone.phase().label()),
            active_waypoints: self.path.active_indices(),
        }
    }
}
