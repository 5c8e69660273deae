use crate::events::{EventBus, ViewerEvent};
use crate::scene_config::{AudioFalloff, AudioSourceConfig};
use anyhow::{bail, Result};
use glam::Vec3;
use std::collections::VecDeque;

/// Output device for spatial sources. `play` may be refused (autoplay policy); the source is
/// retried after the next user gesture.
pub trait AudioBackend {
    fn play(&mut self, id: usize, url: &str, looped: bool) -> Result<()>;
    fn pause(&mut self, id: usize);
    fn set_gain(&mut self, id: usize, gain: f32);
    fn user_gesture(&mut self) {}
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn play(&mut self, id: usize, url: &str, looped: bool) -> Result<()> {
        (**self).play(id, url, looped)
    }

    fn pause(&mut self, id: usize) {
        (**self).pause(id)
    }

    fn set_gain(&mut self, id: usize, gain: f32) {
        (**self).set_gain(id, gain)
    }

    fn user_gesture(&mut self) {
        (**self).user_gesture()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    Play { id: usize, url: String, looped: bool },
    Pause { id: usize },
    SetGain { id: usize, gain: f32 },
}

/// Backend that only logs and records calls. Used by the headless runner.
#[derive(Debug, Default)]
pub struct LogAudioBackend {
    calls: Vec<AudioCall>,
    autoplay_blocked: bool,
}

impl LogAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every `play` until a user gesture arrives, like a browser does.
    pub fn blocked_until_gesture() -> Self {
        Self { calls: Vec::new(), autoplay_blocked: true }
    }

    pub fn calls(&self) -> &[AudioCall] {
        &self.calls
    }
}

impl AudioBackend for LogAudioBackend {
    fn play(&mut self, id: usize, url: &str, looped: bool) -> Result<()> {
        if self.autoplay_blocked {
            bail!("playback of {url} requires a user gesture");
        }
        log::debug!("audio[{id}] play {url} looped={looped}");
        self.calls.push(AudioCall::Play { id, url: url.to_string(), looped });
        Ok(())
    }

    fn pause(&mut self, id: usize) {
        log::debug!("audio[{id}] pause");
        self.calls.push(AudioCall::Pause { id });
    }

    fn set_gain(&mut self, id: usize, gain: f32) {
        self.calls.push(AudioCall::SetGain { id, gain });
    }

    fn user_gesture(&mut self) {
        self.autoplay_blocked = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Blocked,
}

#[derive(Debug, Clone)]
pub struct AudioSource {
    pub url: String,
    pub position: Vec3,
    pub falloff: AudioFalloff,
    pub trigger_radius: f32,
    pub state: PlaybackState,
    pub gain: f32,
}

/// Inverse-distance attenuation with the distance clamped to `[ref, max]`.
pub fn inverse_distance_gain(falloff: &AudioFalloff, distance: f32) -> f32 {
    let reference = falloff.ref_distance.max(1.0e-3);
    let max = falloff.max_distance.max(reference);
    let clamped = distance.max(reference).min(max);
    falloff.volume * reference / (reference + falloff.rolloff_factor * (clamped - reference))
}

pub struct SpatialAudio<B: AudioBackend> {
    backend: B,
    sources: Vec<AudioSource>,
    enabled: bool,
}

impl<B: AudioBackend> SpatialAudio<B> {
    pub fn new(backend: B, enabled: bool) -> Self {
        Self { backend, sources: Vec::new(), enabled }
    }

    /// Register a source whose `audio_url` has already been resolved to `url`.
    pub fn add_source(&mut self, config: &AudioSourceConfig, url: String) -> usize {
        self.sources.push(AudioSource {
            url,
            position: config.audio_position.into(),
            falloff: config.falloff.clone(),
            trigger_radius: config.trigger_radius,
            state: PlaybackState::Idle,
            gain: 0.0,
        });
        self.sources.len() - 1
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn sources(&self) -> &[AudioSource] {
        &self.sources
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            for (id, source) in self.sources.iter_mut().enumerate() {
                if source.state == PlaybackState::Playing {
                    self.backend.pause(id);
                    source.state = PlaybackState::Paused;
                }
            }
        }
    }

    /// A key press or similar: blocked sources become eligible to play again.
    pub fn user_gesture(&mut self) {
        self.backend.user_gesture();
        for source in &mut self.sources {
            if source.state == PlaybackState::Blocked {
                source.state = PlaybackState::Idle;
            }
        }
    }

    pub fn playing_count(&self) -> usize {
        self.sources.iter().filter(|source| source.state == PlaybackState::Playing).count()
    }

    pub fn update(&mut self, listener: Vec3, bus: &mut EventBus) {
        for (id, source) in self.sources.iter_mut().enumerate() {
            let distance = source.position.distance(listener);
            let audible = self.enabled && distance <= source.trigger_radius;
            if !audible {
                if source.state == PlaybackState::Playing {
                    self.backend.pause(id);
                    source.state = PlaybackState::Paused;
                }
                continue;
            }
            if matches!(source.state, PlaybackState::Idle | PlaybackState::Paused) {
                match self.backend.play(id, &source.url, source.falloff.looped) {
                    Ok(()) => source.state = PlaybackState::Playing,
                    Err(err) => {
                        log::warn!("Audio source {} blocked: {err:#}", source.url);
                        source.state = PlaybackState::Blocked;
                        bus.push(ViewerEvent::AudioBlocked { url: source.url.clone() });
                        continue;
                    }
                }
            }
            if source.state == PlaybackState::Playing {
                source.gain = inverse_distance_gain(&source.falloff, distance);
                self.backend.set_gain(id, source.gain);
            }
        }
    }
}

/// Bounded log of recent interaction cues.
pub struct AudioManager {
    enabled: bool,
    capacity: usize,
    triggers: VecDeque<String>,
}

impl AudioManager {
    pub fn new(capacity: usize) -> Self {
        Self { enabled: true, capacity: capacity.max(1), triggers: VecDeque::new() }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn recent_triggers(&self) -> impl ExactSizeIterator<Item = &String> {
        self.triggers.iter()
    }

    pub fn handle_event(&mut self, event: &ViewerEvent) {
        if !self.enabled {
            return;
        }
        let label = match event {
            ViewerEvent::ObjectGrabbed { name, .. } => Some(format!("grab:{name}")),
            ViewerEvent::ObjectThrown { name, .. } => Some(format!("throw:{name}")),
            ViewerEvent::CharacterJumped => Some(String::from("jump")),
            ViewerEvent::ObjectsKicked { .. } => Some(String::from("kick")),
            ViewerEvent::ObjectsThrown { .. } => Some(String::from("toss")),
            ViewerEvent::WaypointEntered { index } => Some(format!("waypoint:{index}")),
            ViewerEvent::ToggleChanged { .. }
            | ViewerEvent::WaypointLeft { .. }
            | ViewerEvent::DronePhaseChanged { .. }
            | ViewerEvent::AudioBlocked { .. } => None,
        };
        if let Some(label) = label {
            self.push_trigger(label);
        }
    }

    fn push_trigger(&mut self, trigger: String) {
        if self.triggers.len() == self.capacity {
            self.triggers.pop_front();
        }
        self.triggers.push_back(trigger);
    }
}
