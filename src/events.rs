use bitflags::bitflags;
use glam::Vec3;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn label(self) -> &'static str {
        match self {
            Hand::Left => "left",
            Hand::Right => "right",
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ToggleFlags: u8 {
        const AUDIO = 0b001;
        const PHYSICS = 0b010;
        const HUD = 0b100;
    }
}

impl ToggleFlags {
    pub fn label(self) -> &'static str {
        if self == ToggleFlags::AUDIO {
            "audio"
        } else if self == ToggleFlags::PHYSICS {
            "physics"
        } else if self == ToggleFlags::HUD {
            "hud"
        } else {
            "mixed"
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    ToggleChanged { toggle: ToggleFlags, enabled: bool },
    ObjectGrabbed { hand: Hand, name: String },
    ObjectThrown { hand: Hand, name: String, velocity: Vec3 },
    CharacterJumped,
    ObjectsKicked { count: usize },
    ObjectsThrown { count: usize },
    WaypointEntered { index: usize },
    WaypointLeft { index: usize },
    DronePhaseChanged { phase: &'static str, waypoint: usize },
    AudioBlocked { url: String },
}

impl fmt::Display for ViewerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerEvent::ToggleChanged { toggle, enabled } => {
                write!(f, "ToggleChanged toggle={} enabled={}", toggle.label(), enabled)
            }
            ViewerEvent::ObjectGrabbed { hand, name } => {
                write!(f, "ObjectGrabbed hand={} name={}", hand.label(), name)
            }
            ViewerEvent::ObjectThrown { hand, name, velocity } => write!(
                f,
                "ObjectThrown hand={} name={} velocity=({:.2}, {:.2}, {:.2})",
                hand.label(),
                name,
                velocity.x,
                velocity.y,
                velocity.z
            ),
            ViewerEvent::CharacterJumped => write!(f, "CharacterJumped"),
            ViewerEvent::ObjectsKicked { count } => write!(f, "ObjectsKicked count={count}"),
            ViewerEvent::ObjectsThrown { count } => write!(f, "ObjectsThrown count={count}"),
            ViewerEvent::WaypointEntered { index } => write!(f, "WaypointEntered index={index}"),
            ViewerEvent::WaypointLeft { index } => write!(f, "WaypointLeft index={index}"),
            ViewerEvent::DronePhaseChanged { phase, waypoint } => {
                write!(f, "DronePhaseChanged phase={phase} waypoint={waypoint}")
            }
            ViewerEvent::AudioBlocked { url } => write!(f, "AudioBlocked url={url}"),
        }
    }
}

#[derive(Default)]
pub struct EventBus {
    events: Vec<ViewerEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: ViewerEvent) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = ViewerEvent>) {
        self.events.extend(events);
    }

    pub fn drain(&mut self) -> Vec<ViewerEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Audio/physics/HUD switches. Changes are published on the bus so every subscriber sees
/// them in the same frame, in publication order.
#[derive(Debug, Clone, Copy)]
pub struct Toggles {
    flags: ToggleFlags,
}

impl Toggles {
    pub fn new(flags: ToggleFlags) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> ToggleFlags {
        self.flags
    }

    pub fn enabled(&self, toggle: ToggleFlags) -> bool {
        self.flags.contains(toggle)
    }

    /// Returns true when the state actually changed.
    pub fn set(&mut self, toggle: ToggleFlags, enabled: bool, bus: &mut EventBus) -> bool {
        if self.flags.contains(toggle) == enabled {
            return false;
        }
        self.flags.set(toggle, enabled);
        bus.push(ViewerEvent::ToggleChanged { toggle, enabled });
        true
    }

    pub fn toggle(&mut self, toggle: ToggleFlags, bus: &mut EventBus) -> bool {
        let next = !self.flags.contains(toggle);
        self.set(toggle, next, bus);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_publish_only_changes() {
        let mut bus = EventBus::default();
        let mut toggles = Toggles::new(ToggleFlags::AUDIO);
        assert!(!toggles.set(ToggleFlags::AUDIO, true, &mut bus));
        assert!(bus.is_empty());
        assert!(toggles.toggle(ToggleFlags::HUD, &mut bus));
        assert!(!toggles.toggle(ToggleFlags::AUDIO, &mut bus));
        let events = bus.drain();
        assert_eq!(
            events,
            vec![
                ViewerEvent::ToggleChanged { toggle: ToggleFlags::HUD, enabled: true },
                ViewerEvent::ToggleChanged { toggle: ToggleFlags::AUDIO, enabled: false },
            ]
        );
        assert_eq!(toggles.flags(), ToggleFlags::HUD);
    }

    #[test]
    fn display_names_the_hand() {
        let event = ViewerEvent::ObjectGrabbed { hand: Hand::Right, name: "ball".into() };
        assert_eq!(event.to_string(), "ObjectGrabbed hand=right name=ball");
    }
}
