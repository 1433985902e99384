use std::collections::HashSet;

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
    Function(u8),
}

impl KeyCode {
    pub const ESCAPE: Self = Self::Named(NamedKey::Escape);

    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if ch.is_ascii_alphabetic() {
                return Some(Self::Character(ch.to_ascii_uppercase()));
            }
            if ch.is_ascii_digit() {
                return Some(Self::Digit(ch as u8 - b'0'));
            }
        }
        let index = name
            .strip_prefix(['F', 'f'])?
            .parse::<u8>()
            .ok()
            .filter(|index| (1..=15).contains(index))?;
        Some(Self::Function(index))
    }

    pub fn is_shift(self) -> bool {
        matches!(
            self,
            Self::Named(NamedKey::LeftShift | NamedKey::RightShift)
        )
    }

    /// Letter keys regardless of case.
    pub fn is_char(self, ch: char) -> bool {
        self == Self::Character(ch.to_ascii_uppercase())
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" => Space,
        "Enter" | "Return" => Enter,
        "Tab" => Tab,
        "Left" => Left,
        "Right" => Right,
        "Up" => Up,
        "Down" => Down,
        "Escape" | "Esc" => Escape,
        "Backspace" => Backspace,
        "Comma" | "," => Comma,
        "Period" | "." => Period,
        "Home" => Home,
        "End" => End,
        "PageUp" | "PgUp" => PageUp,
        "PageDown" | "PgDown" => PageDown,
        "LeftShift" | "LShift" => LeftShift,
        "RightShift" | "RShift" => RightShift,
        "LeftCtrl" | "LControl" => LeftCtrl,
        "RightCtrl" | "RControl" => RightCtrl,
        "LeftAlt" | "LAlt" => LeftAlt,
        "RightAlt" | "RAlt" => RightAlt,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Backspace,
    Comma,
    Period,
    Home,
    End,
    PageUp,
    PageDown,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
    LeftAlt,
    RightAlt,
}

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const RIGHT: Self = Self(1);
    pub const MIDDLE: Self = Self(2);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub text: Option<char>,
}

impl KeyEvent {
    pub fn new(key: KeyCode) -> Self {
        let text = match key {
            KeyCode::Character(ch) => Some(ch.to_ascii_lowercase()),
            KeyCode::Digit(d) => char::from_digit(u32::from(d), 10),
            KeyCode::Named(NamedKey::Space) => Some(' '),
            _ => None,
        };
        Self { key, text }
    }
}

/// Position along one mouse axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Axis {
    pub abs: i32,
    pub rel: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseEvent {
    pub x: Axis,
    pub y: Axis,
    /// Wheel.
    pub z: Axis,
    pub width: u32,
    pub height: u32,
}

impl MouseEvent {
    /// A relative movement with no absolute position.
    pub fn moved(rel_x: i32, rel_y: i32) -> Self {
        Self {
            x: Axis { abs: 0, rel: rel_x },
            y: Axis { abs: 0, rel: rel_y },
            ..Self::default()
        }
    }
}

/// Thread-safe snapshot of the keys and buttons currently held.
#[derive(Debug, Default)]
pub struct InputState {
    keys: RwLock<HashSet<KeyCode>>,
    mouse_buttons: RwLock<HashSet<MouseButton>>,
    mouse_position: RwLock<Vec2>,
    extents: RwLock<(u32, u32)>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&self, key: KeyCode) {
        self.keys.write().insert(key);
    }

    pub fn set_key_up(&self, key: KeyCode) {
        self.keys.write().remove(&key);
    }

    pub fn set_mouse_button_down(&self, button: MouseButton) {
        self.mouse_buttons.write().insert(button);
    }

    pub fn set_mouse_button_up(&self, button: MouseButton) {
        self.mouse_buttons.write().remove(&button);
    }

    /// Follows a mouse event, clamping the pointer to the window extents.
    pub fn track_mouse(&self, event: &MouseEvent) {
        let (width, height) = *self.extents.read();
        let mut position = self.mouse_position.write();
        position.x = (position.x + event.x.rel as f32).clamp(0.0, width as f32);
        position.y = (position.y + event.y.rel as f32).clamp(0.0, height as f32);
    }

    pub fn set_extents(&self, width: u32, height: u32) {
        *self.extents.write() = (width, height);
    }

    pub fn extents(&self) -> (u32, u32) {
        *self.extents.read()
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.read().contains(&key)
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.read().contains(&button)
    }

    pub fn is_key_down_by_name(&self, name: &str) -> bool {
        match parse_input_name(name) {
            Some(InputName::Key(key)) => self.is_key_down(key),
            Some(InputName::Mouse(button)) => self.is_mouse_button_down(button),
            None => false,
        }
    }

    pub fn mouse_position(&self) -> Vec2 {
        *self.mouse_position.read()
    }
}

enum InputName {
    Key(KeyCode),
    Mouse(MouseButton),
}

fn parse_input_name(name: &str) -> Option<InputName> {
    if let Some(button) = parse_mouse_button(name) {
        return Some(InputName::Mouse(button));
    }
    KeyCode::from_name(name).map(InputName::Key)
}

fn parse_mouse_button(name: &str) -> Option<MouseButton> {
    let prefix = name.get(..5)?;
    if !prefix.eq_ignore_ascii_case("mouse") {
        return None;
    }
    match &name[5..] {
        "" => Some(MouseButton::LEFT),
        suffix => {
            let index = suffix.parse::<u8>().ok()?;
            Some(MouseButton::new(index.saturating_sub(1)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_character_keys() {
        assert_eq!(
            KeyCode::from_name("Comma"),
            Some(KeyCode::Named(NamedKey::Comma))
        );
        assert_eq!(KeyCode::from_name("z"), Some(KeyCode::Character('Z')));
        assert_eq!(KeyCode::from_name("F12"), Some(KeyCode::Function(12)));
        assert_eq!(KeyCode::from_name("F99"), None);
        assert_eq!(KeyCode::from_name("Banana"), None);
    }

    #[test]
    fn key_events_carry_text() {
        assert_eq!(KeyEvent::new(KeyCode::Character('X')).text, Some('x'));
        assert_eq!(KeyEvent::new(KeyCode::Digit(7)).text, Some('7'));
        assert_eq!(KeyEvent::new(KeyCode::ESCAPE).text, None);
        assert!(KeyCode::Character('A').is_char('a'));
    }

    #[test]
    fn mouse_names_are_supported() {
        assert!(matches!(
            parse_input_name("Mouse1"),
            Some(InputName::Mouse(MouseButton::LEFT))
        ));
        assert!(matches!(
            parse_input_name("mouse3"),
            Some(InputName::Mouse(MouseButton::MIDDLE))
        ));
    }

    #[test]
    fn input_state_tracks_keys_and_pointer() {
        let state = InputState::new();
        state.set_key_down(KeyCode::Named(NamedKey::Space));
        assert!(state.is_key_down_by_name("Space"));
        state.set_key_up(KeyCode::Named(NamedKey::Space));
        assert!(!state.is_key_down_by_name("Space"));

        state.set_extents(100, 100);
        state.track_mouse(&MouseEvent::moved(150, 40));
        assert_eq!(state.mouse_position(), Vec2::new(100.0, 40.0));
        state.track_mouse(&MouseEvent::moved(-500, 0));
        assert_eq!(state.mouse_position().x, 0.0);
    }
}
