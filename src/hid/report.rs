//! HID report values handed to the transport

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pointer buttons, numbered as the host protocol numbers them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left = 0,
    Right = 1,
    Middle = 2,
}

/// Keyboard usage IDs used by the recognizers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Enter = 40,
    Escape = 41,
    Backspace = 42,
    Tab = 43,
    Space = 44,
    Right = 79,
    Left = 80,
    Down = 81,
    Up = 82,
}

impl Key {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Short label shown on the keypad while a swipe is in progress
    pub fn label(self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Escape => "Esc",
            Key::Backspace => "Bksp",
            Key::Tab => "Tab",
            Key::Space => "Space",
            Key::Right => "Right",
            Key::Left => "Left",
            Key::Down => "Down",
            Key::Up => "Up",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Modifier bit set of a keyboard report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const LEFT_CTRL: Modifiers = Modifiers(1 << 0);
    pub const LEFT_SHIFT: Modifiers = Modifiers(1 << 1);
    pub const LEFT_ALT: Modifiers = Modifiers(1 << 2);
    pub const LEFT_GUI: Modifiers = Modifiers(1 << 3);
    pub const RIGHT_CTRL: Modifiers = Modifiers(1 << 4);
    pub const RIGHT_SHIFT: Modifiers = Modifiers(1 << 5);
    pub const RIGHT_ALT: Modifiers = Modifiers(1 << 6);
    pub const RIGHT_GUI: Modifiers = Modifiers(1 << 7);

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 | rhs.0)
    }
}

/// One pointer report: absolute button state plus relative motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MouseReport {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
    pub dx: i8,
    pub dy: i8,
    pub wheel: i8,
}

impl MouseReport {
    pub fn has_motion(&self) -> bool {
        self.dx != 0 || self.dy != 0 || self.wheel != 0
    }
}

/// One keyboard report; unused key slots are 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub keys: [u8; 6],
}

impl KeyboardReport {
    /// All keys released
    pub fn keys_up(modifiers: Modifiers) -> Self {
        Self {
            modifiers: modifiers.bits(),
            keys: [0; 6],
        }
    }

    /// Holds up to six keys; extra keys are ignored
    pub fn with_keys(modifiers: Modifiers, keys: &[u8]) -> Self {
        let mut report = Self::keys_up(modifiers);
        for (slot, key) in report.keys.iter_mut().zip(keys) {
            *slot = *key;
        }
        report
    }

    pub fn pressed(&self) -> impl Iterator<Item = u8> + '_ {
        self.keys.iter().copied().filter(|k| *k != 0)
    }

    pub fn is_all_up(&self) -> bool {
        self.pressed().next().is_none()
    }
}
