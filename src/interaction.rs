use crate::config::InteractionConfig;
use crate::events::{EventBus, Hand, ViewerEvent};
use crate::physics::{vec_to_rapier, PhysicsWorld};
use crate::scene::SceneContext;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rapier3d::prelude::{RigidBodyHandle, RigidBodyType};
use std::collections::VecDeque;

/// Tracked fingertip positions in reference-frame space. Either may drop out.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HandJoints {
    pub thumb_tip: Option<Vec3>,
    pub index_tip: Option<Vec3>,
}

impl HandJoints {
    pub fn new(thumb_tip: Vec3, index_tip: Vec3) -> Self {
        Self { thumb_tip: Some(thumb_tip), index_tip: Some(index_tip) }
    }

    pub fn pinch_point(&self) -> Option<Vec3> {
        Some((self.thumb_tip? + self.index_tip?) * 0.5)
    }

    pub fn pinch_distance(&self) -> Option<f32> {
        Some(self.thumb_tip?.distance(self.index_tip?))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HandsInput {
    pub left: HandJoints,
    pub right: HandJoints,
}

impl HandsInput {
    pub fn get(&self, hand: Hand) -> &HandJoints {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HandState {
    pub is_pinching: bool,
    pub grabbed: Option<String>,
    pub velocity_history: VecDeque<Vec3>,
    pub last_world_pinch: Option<Vec3>,
    capacity: usize,
}

impl HandState {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            is_pinching: false,
            grabbed: None,
            velocity_history: VecDeque::with_capacity(capacity),
            last_world_pinch: None,
            capacity,
        }
    }

    pub fn record_velocity(&mut self, sample: Vec3) {
        if self.velocity_history.len() == self.capacity {
            self.velocity_history.pop_front();
        }
        self.velocity_history.push_back(sample);
    }

    /// Mean of the recorded samples, zero when there are none.
    pub fn average_velocity(&self) -> Vec3 {
        if self.velocity_history.is_empty() {
            return Vec3::ZERO;
        }
        self.velocity_history.iter().copied().sum::<Vec3>() / self.velocity_history.len() as f32
    }
}

/// Pinch-to-grab for both tracked hands.
pub struct GrabInteraction {
    config: InteractionConfig,
    hands: [HandState; 2],
    rng: StdRng,
}

impl GrabInteraction {
    pub fn new(config: InteractionConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: InteractionConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: InteractionConfig, rng: StdRng) -> Self {
        let hands = [HandState::new(config.velocity_history), HandState::new(config.velocity_history)];
        Self { config, hands, rng }
    }

    pub fn hand(&self, hand: Hand) -> &HandState {
        &self.hands[slot(hand)]
    }

    pub fn held(&self, hand: Hand) -> Option<&str> {
        self.hand(hand).grabbed.as_deref()
    }

    pub fn holder_of(&self, name: &str) -> Option<Hand> {
        Hand::BOTH.into_iter().find(|&hand| self.held(hand) == Some(name))
    }

    /// Run both hands for this frame, left first.
    pub fn update(&mut self, ctx: &mut SceneContext, hands: &HandsInput, dt: f32, bus: &mut EventBus) {
        for hand in Hand::BOTH {
            self.update_hand(ctx, hand, hands.get(hand), dt, bus);
        }
    }

    fn update_hand(&mut self, ctx: &mut SceneContext, hand: Hand, joints: &HandJoints, dt: f32, bus: &mut EventBus) {
        let (Some(local_pinch), Some(pinch_distance)) = (joints.pinch_point(), joints.pinch_distance()) else {
            return;
        };
        let world_pinch = ctx.viewpoint.to_world(local_pinch);
        let pinching = pinch_distance < self.config.pinch_threshold;

        let state = &mut self.hands[slot(hand)];
        if let Some(previous) = state.last_world_pinch {
            if dt > 0.0 {
                state.record_velocity((world_pinch - previous) / dt);
            }
        }
        state.last_world_pinch = Some(world_pinch);
        let was_pinching = state.is_pinching;
        state.is_pinching = pinching;

        let Some(physics) = ctx.physics.as_mut() else {
            return;
        };

        if pinching && !was_pinching && self.hands[slot(hand)].grabbed.is_none() {
            let held: Vec<String> = self.hands.iter().filter_map(|h| h.grabbed.clone()).collect();
            let target = ctx
                .dynamics
                .nearest_within(physics, world_pinch, self.config.grab_radius, |name| held.iter().any(|h| h == name))
                .map(|object| (object.name.clone(), object.handles.body));
            if let Some((name, body_handle)) = target {
                if let Some(body) = physics.body_mut(body_handle) {
                    body.set_body_type(RigidBodyType::KinematicPositionBased, true);
                    body.set_linvel(vec_to_rapier(Vec3::ZERO), true);
                    body.set_angvel(vec_to_rapier(Vec3::ZERO), true);
                    log::debug!("{} hand grabbed '{name}'", hand.label());
                    bus.push(ViewerEvent::ObjectGrabbed { hand, name: name.clone() });
                    self.hands[slot(hand)].grabbed = Some(name);
                }
            }
        } else if !pinching && was_pinching {
            let body = self.held(hand).and_then(|name| ctx.dynamics.get(name)).map(|object| object.handles.body);
            self.release(physics, body, hand, bus);
        }

        if let Some(name) = self.hands[slot(hand)].grabbed.as_deref() {
            if let Some(body) = ctx.dynamics.get(name).and_then(|object| physics.body_mut(object.handles.body)) {
                body.set_next_kinematic_translation(vec_to_rapier(world_pinch));
            }
        }
    }

    fn release(&mut self, physics: &mut PhysicsWorld, body_handle: Option<RigidBodyHandle>, hand: Hand, bus: &mut EventBus) {
        let state = &mut self.hands[slot(hand)];
        let Some(name) = state.grabbed.take() else {
            return;
        };
        let velocity = state.average_velocity() * self.config.throw_multiplier;
        state.velocity_history.clear();
        let spin = self.config.max_spin.abs();
        let angvel = Vec3::new(
            self.rng.gen_range(-spin..=spin),
            self.rng.gen_range(-spin..=spin),
            self.rng.gen_range(-spin..=spin),
        );
        if let Some(body) = body_handle.and_then(|handle| physics.body_mut(handle)) {
            body.set_body_type(RigidBodyType::Dynamic, true);
            body.set_linvel(vec_to_rapier(velocity), true);
            body.set_angvel(vec_to_rapier(angvel), true);
        }
        log::debug!("{} hand threw '{name}' at {velocity:?}", hand.label());
        bus.push(ViewerEvent::ObjectThrown { hand, name, velocity });
    }
}

fn slot(hand: Hand) -> usize {
    match hand {
        Hand::Left => 0,
        Hand::Right => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_evicts_oldest_sample() {
        let mut state = HandState::new(2);
        state.record_velocity(Vec3::X);
        state.record_velocity(Vec3::Y);
        state.record_velocity(Vec3::Z);
        assert_eq!(state.velocity_history.iter().copied().collect::<Vec<_>>(), vec![Vec3::Y, Vec3::Z]);
        assert_eq!(state.average_velocity(), Vec3::new(0.0, 0.5, 0.5));
    }

    #[test]
    fn empty_history_averages_to_zero() {
        assert_eq!(HandState::new(5).average_velocity(), Vec3::ZERO);
    }

    #[test]
    fn missing_joint_means_no_pinch_point() {
        let joints = HandJoints { thumb_tip: Some(Vec3::ZERO), index_tip: None };
        assert!(joints.pinch_point().is_none());
        assert_eq!(HandJoints::new(Vec3::ZERO, Vec3::X).pinch_point(), Some(Vec3::new(0.5, 0.0, 0.0)));
    }

    #[test]
    fn skipped_hand_keeps_its_state() {
        let mut ctx = SceneContext::default();
        let mut grab = GrabInteraction::with_seed(InteractionConfig::default(), 7);
        let mut bus = EventBus::default();
        let pinch = HandsInput { left: HandJoints::new(Vec3::ZERO, Vec3::new(0.01, 0.0, 0.0)), ..Default::default() };
        grab.update(&mut ctx, &pinch, 0.016, &mut bus);
        assert!(grab.hand(Hand::Left).is_pinching);
        grab.update(&mut ctx, &HandsInput::default(), 0.016, &mut bus);
        assert!(grab.hand(Hand::Left).is_pinching);
        assert!(grab.hand(Hand::Right).last_world_pinch.is_none());
    }
}
