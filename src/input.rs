use glam::Vec2;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use winit::keyboard::{Key, NamedKey};

/// Everything the frame loop needs from the keyboard, read once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputFrame {
    /// `x` strafes right, `y` walks forward. Each axis is in [-1, 1].
    pub movement: Vec2,
    pub jump: bool,
    pub kick: bool,
    pub throw: bool,
    pub toggle_physics: bool,
    pub toggle_hud: bool,
    pub toggle_audio: bool,
    pub user_gesture: bool,
}

/// Keyboard state fed by the host's event handlers and drained by the frame loop.
pub struct Input {
    bindings: InputBindings,
    held: HashSet<InputKeyBinding>,
    jump_pressed: bool,
    kick_pressed: bool,
    throw_pressed: bool,
    physics_toggle: bool,
    hud_toggle: bool,
    audio_toggle: bool,
    gesture: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(path: impl AsRef<Path>) -> Self {
        let bindings = InputBindings::load_or_default(path);
        Self::with_bindings(bindings)
    }

    fn with_bindings(bindings: InputBindings) -> Self {
        Self {
            bindings,
            held: HashSet::new(),
            jump_pressed: false,
            kick_pressed: false,
            throw_pressed: false,
            physics_toggle: false,
            hud_toggle: false,
            audio_toggle: false,
            gesture: false,
        }
    }

    pub fn push(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::Key { key, pressed } => self.apply_key(&key, pressed),
        }
    }

    pub fn press(&mut self, key: Key) {
        self.push(InputEvent::Key { key, pressed: true });
    }

    pub fn release(&mut self, key: Key) {
        self.push(InputEvent::Key { key, pressed: false });
    }

    /// Snapshot for this frame. Edge-triggered actions are cleared; held keys stay held.
    pub fn take_frame(&mut self) -> InputFrame {
        let frame = InputFrame {
            movement: self.movement(),
            jump: self.jump_pressed,
            kick: self.kick_pressed,
            throw: self.throw_pressed,
            toggle_physics: self.physics_toggle,
            toggle_hud: self.hud_toggle,
            toggle_audio: self.audio_toggle,
            user_gesture: self.gesture,
        };
        self.jump_pressed = false;
        self.kick_pressed = false;
        self.throw_pressed = false;
        self.physics_toggle = false;
        self.hud_toggle = false;
        self.audio_toggle = false;
        self.gesture = false;
        frame
    }

    pub fn movement(&self) -> Vec2 {
        let held = |action: InputAction| {
            self.held.iter().any(|key| self.bindings.actions_for_key(key).any(|bound| bound == action))
        };
        let axis = |positive: bool, negative: bool| f32::from(u8::from(positive)) - f32::from(u8::from(negative));
        Vec2::new(
            axis(held(InputAction::MoveRight), held(InputAction::MoveLeft)),
            axis(held(InputAction::MoveForward), held(InputAction::MoveBackward)),
        )
    }

    fn apply_key(&mut self, key: &Key, pressed: bool) {
        if pressed {
            self.gesture = true;
        }
        let Some(binding_key) = InputKeyBinding::from_event_key(key) else {
            return;
        };
        let actions: Vec<_> = self.bindings.actions_for_key(&binding_key).collect();
        if pressed {
            self.held.insert(binding_key);
        } else {
            self.held.remove(&binding_key);
        }
        if !pressed {
            return;
        }
        for action in actions {
            match action {
                InputAction::Jump => self.jump_pressed = true,
                InputAction::Kick => self.kick_pressed = true,
                InputAction::Throw => self.throw_pressed = true,
                InputAction::TogglePhysics => self.physics_toggle = true,
                InputAction::ToggleHud => self.hud_toggle = true,
                InputAction::ToggleAudio => self.audio_toggle = true,
                InputAction::MoveForward | InputAction::MoveBackward | InputAction::MoveLeft | InputAction::MoveRight => {}
            }
        }
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::with_bindings(InputBindings::default())
    }
}

#[derive(Debug, Clone)]
struct InputBindings {
    key_to_actions: HashMap<InputKeyBinding, Vec<InputAction>>,
}

impl InputBindings {
    fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<InputConfigFile>(&contents) {
                Ok(config) => Self::from_config(config, &path.display().to_string()),
                Err(err) => {
                    log::warn!("Failed to parse {}: {err}. Falling back to default bindings.", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!("Failed to read {}: {err}. Falling back to default bindings.", path.display());
                Self::default()
            }
        }
    }

    fn from_config(config: InputConfigFile, origin: &str) -> Self {
        let overrides = config.into_overrides(origin);
        Self::with_overrides(overrides)
    }

    fn with_overrides(overrides: HashMap<InputAction, Vec<InputKeyBinding>>) -> Self {
        let mut action_map = Self::default_action_map();
        for (action, keys) in overrides {
            if keys.is_empty() {
                continue;
            }
            action_map.insert(action, keys);
        }
        Self::from_action_map(action_map)
    }

    fn default_action_map() -> HashMap<InputAction, Vec<InputKeyBinding>> {
        use InputAction::*;
        let mut map = HashMap::new();
        map.insert(MoveForward, vec![InputKeyBinding::character("w"), InputKeyBinding::named(NamedKeyCode::ArrowUp)]);
        map.insert(MoveBackward, vec![InputKeyBinding::character("s"), InputKeyBinding::named(NamedKeyCode::ArrowDown)]);
        map.insert(MoveLeft, vec![InputKeyBinding::character("a"), InputKeyBinding::named(NamedKeyCode::ArrowLeft)]);
        map.insert(MoveRight, vec![InputKeyBinding::character("d"), InputKeyBinding::named(NamedKeyCode::ArrowRight)]);
        map.insert(Jump, vec![InputKeyBinding::named(NamedKeyCode::Space)]);
        map.insert(Kick, vec![InputKeyBinding::character("k")]);
        map.insert(Throw, vec![InputKeyBinding::character("t")]);
        map.insert(TogglePhysics, vec![InputKeyBinding::character("p")]);
        map.insert(ToggleHud, vec![InputKeyBinding::character("h")]);
        map.insert(ToggleAudio, vec![InputKeyBinding::character("m")]);
        map
    }

    fn from_action_map(action_map: HashMap<InputAction, Vec<InputKeyBinding>>) -> Self {
        let mut key_to_actions: HashMap<InputKeyBinding, Vec<InputAction>> = HashMap::new();
        for (action, keys) in action_map {
            for key in keys {
                key_to_actions.entry(key).or_default().push(action);
            }
        }
        Self { key_to_actions }
    }

    fn actions_for_key(&self, key: &InputKeyBinding) -> impl Iterator<Item = InputAction> + '_ {
        self.key_to_actions.get(key).into_iter().flatten().copied()
    }
}

impl Default for InputBindings {
    fn default() -> Self {
        Self::from_action_map(Self::default_action_map())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InputKeyBinding {
    Character(String),
    Named(NamedKeyCode),
}

impl InputKeyBinding {
    fn character(ch: &str) -> Self {
        Self::Character(ch.to_lowercase())
    }

    fn named(named: NamedKeyCode) -> Self {
        Self::Named(named)
    }

    fn from_event_key(key: &Key) -> Option<Self> {
        match key {
            Key::Character(ch) => {
                let s = ch.to_string();
                if s.is_empty() {
                    None
                } else {
                    Some(Self::Character(s.to_lowercase()))
                }
            }
            Key::Named(named) => NamedKeyCode::from_named_key(named).map(Self::Named),
            _ => None,
        }
    }

    fn from_config_value(raw: &str) -> Result<Self, ()> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(());
        }
        if let Some(named) = NamedKeyCode::from_str(&normalized) {
            return Ok(Self::Named(named));
        }
        if normalized.chars().count() == 1 {
            return Ok(Self::Character(normalized));
        }
        Err(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NamedKeyCode {
    Space,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

impl NamedKeyCode {
    fn from_named_key(key: &NamedKey) -> Option<Self> {
        match key {
            NamedKey::Space => Some(Self::Space),
            NamedKey::ArrowUp => Some(Self::ArrowUp),
            NamedKey::ArrowDown => Some(Self::ArrowDown),
            NamedKey::ArrowLeft => Some(Self::ArrowLeft),
            NamedKey::ArrowRight => Some(Self::ArrowRight),
            _ => None,
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "space" => Some(Self::Space),
            "up" | "arrow_up" => Some(Self::ArrowUp),
            "down" | "arrow_down" => Some(Self::ArrowDown),
            "left" | "arrow_left" => Some(Self::ArrowLeft),
            "right" | "arrow_right" => Some(Self::ArrowRight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum InputAction {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    Jump,
    Kick,
    Throw,
    TogglePhysics,
    ToggleHud,
    ToggleAudio,
}

impl InputAction {
    fn from_str(value: &str) -> Option<Self> {
        match value {
            "move_forward" => Some(Self::MoveForward),
            "move_backward" => Some(Self::MoveBackward),
            "move_left" => Some(Self::MoveLeft),
            "move_right" => Some(Self::MoveRight),
            "jump" => Some(Self::Jump),
            "kick" => Some(Self::Kick),
            "throw" => Some(Self::Throw),
            "toggle_physics" => Some(Self::TogglePhysics),
            "toggle_hud" => Some(Self::ToggleHud),
            "toggle_audio" => Some(Self::ToggleAudio),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InputConfigFile {
    #[serde(default)]
    bindings: HashMap<String, Vec<String>>,
}

impl InputConfigFile {
    fn into_overrides(self, origin: &str) -> HashMap<InputAction, Vec<InputKeyBinding>> {
        let mut overrides = HashMap::new();
        for (action_name, keys) in self.bindings {
            let action_key = action_name.trim().to_lowercase();
            match InputAction::from_str(&action_key) {
                Some(action) => {
                    let mut parsed = Vec::new();
                    for key in keys {
                        match InputKeyBinding::from_config_value(&key) {
                            Ok(binding) => parsed.push(binding),
                            Err(_) => log::warn!("{origin}: unknown key '{key}' for action '{action_name}', ignoring."),
                        }
                    }
                    if parsed.is_empty() {
                        log::warn!("{origin}: action '{action_name}' has no valid keys, keeping defaults.");
                        continue;
                    }
                    overrides.insert(action, parsed);
                }
                None => log::warn!("{origin}: unknown action '{action_name}', ignoring."),
            }
        }
        overrides
    }
}

/// Logical key transition forwarded by the host window.
pub enum InputEvent {
    Key { key: Key, pressed: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_actions_fire_once_per_press() {
        let mut input = Input::new();
        input.press(Key::Named(NamedKey::Space));
        input.press(Key::Character("k".into()));
        let frame = input.take_frame();
        assert!(frame.jump && frame.kick && frame.user_gesture);
        assert_eq!(input.take_frame(), InputFrame::default());
    }

    #[test]
    fn arrows_and_letters_share_movement() {
        let mut input = Input::new();
        input.press(Key::Character("w".into()));
        input.press(Key::Named(NamedKey::ArrowUp));
        input.release(Key::Named(NamedKey::ArrowUp));
        assert_eq!(input.movement(), Vec2::new(0.0, 1.0), "W is still held");
        input.press(Key::Named(NamedKey::ArrowLeft));
        assert_eq!(input.take_frame().movement, Vec2::new(-1.0, 1.0));
        assert_eq!(input.take_frame().movement, Vec2::new(-1.0, 1.0), "held keys survive the frame");
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut input = Input::new();
        input.press(Key::Character("a".into()));
        input.press(Key::Character("d".into()));
        assert_eq!(input.movement().x, 0.0);
    }
}
