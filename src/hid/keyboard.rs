//! Keyboard report helpers

use super::report::{Key, KeyboardReport, Modifiers};
use super::sink::HidSink;
use std::sync::Arc;
use tracing::debug;

/// Usage ID of `c` on a US layout and whether it needs shift
pub fn scancode_for(c: char) -> Option<(u8, bool)> {
    let code = match c {
        'a'..='z' => (c as u8 - b'a' + 0x04, false),
        'A'..='Z' => (c as u8 - b'A' + 0x04, true),
        '1'..='9' => (c as u8 - b'1' + 0x1E, false),
        '0' => (0x27, false),
        ' ' => (0x2C, false),
        '-' => (0x2D, false),
        '=' => (0x2E, false),
        '[' => (0x2F, false),
        ']' => (0x30, false),
        '\\' => (0x31, false),
        ';' => (0x33, false),
        '\'' => (0x34, false),
        '`' => (0x35, false),
        ',' => (0x36, false),
        '.' => (0x37, false),
        '/' => (0x38, false),
        '!' => (0x1E, true),
        '@' => (0x1F, true),
        '#' => (0x20, true),
        '$' => (0x21, true),
        '%' => (0x22, true),
        '^' => (0x23, true),
        '&' => (0x24, true),
        '*' => (0x25, true),
        '(' => (0x26, true),
        ')' => (0x27, true),
        '_' => (0x2D, true),
        '+' => (0x2E, true),
        '{' => (0x2F, true),
        '}' => (0x30, true),
        '|' => (0x31, true),
        ':' => (0x33, true),
        '"' => (0x34, true),
        '~' => (0x35, true),
        '<' => (0x36, true),
        '>' => (0x37, true),
        '?' => (0x38, true),
        _ => return None,
    };
    Some(code)
}

#[derive(Clone)]
pub struct KeyboardHelper {
    sink: Arc<dyn HidSink>,
}

impl KeyboardHelper {
    pub fn new(sink: Arc<dyn HidSink>) -> Self {
        Self { sink }
    }

    pub fn send_keys_down(&self, modifiers: Modifiers, keys: &[Key]) {
        let codes: Vec<u8> = keys.iter().map(|k| k.code()).collect();
        self.sink
            .send_keyboard(KeyboardReport::with_keys(modifiers, &codes));
    }

    pub fn send_keys_up(&self, modifiers: Modifiers) {
        self.sink.send_keyboard(KeyboardReport::keys_up(modifiers));
    }

    /// Full press and release of one key
    pub fn send_key_press(&self, key: Key) {
        debug!("Key press: {}", key);
        self.send_keys_down(Modifiers::NONE, &[key]);
        self.send_keys_up(Modifiers::NONE);
    }

    /// Types one character, returns `false` if it has no key on a US layout
    pub fn send_char(&self, c: char) -> bool {
        let Some((code, shift)) = scancode_for(c) else {
            debug!("No key for character {:?}", c);
            return false;
        };
        let modifiers = if shift {
            Modifiers::LEFT_SHIFT
        } else {
            Modifiers::NONE
        };
        self.sink
            .send_keyboard(KeyboardReport::with_keys(modifiers, &[code]));
        self.send_keys_up(Modifiers::NONE);
        true
    }

    /// Types a string one character at a time, skipping characters without a
    /// key; returns how many were typed
    pub fn send_text(&self, text: &str) -> usize {
        let typed = text.chars().filter(|&c| self.send_char(c)).count();
        debug!("Typed {} of {} characters", typed, text.chars().count());
        typed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::sink::RecordingSink;

    #[test]
    fn letters_digits_and_symbols_map_to_us_layout() {
        assert_eq!(scancode_for('a'), Some((0x04, false)));
        assert_eq!(scancode_for('Z'), Some((0x1D, true)));
        assert_eq!(scancode_for('1'), Some((0x1E, false)));
        assert_eq!(scancode_for('0'), Some((0x27, false)));
        assert_eq!(scancode_for('?'), Some((0x38, true)));
        assert_eq!(scancode_for('é'), None);
    }

    #[test]
    fn send_char_presses_then_releases() {
        let sink = Arc::new(RecordingSink::new());
        let helper = KeyboardHelper::new(sink.clone());

        assert!(helper.send_char('Q'));
        assert!(!helper.send_char('\u{263A}'));

        let reports = sink.keyboard_reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].modifiers, Modifiers::LEFT_SHIFT.bits());
        assert_eq!(reports[0].keys[0], 0x14);
        assert!(reports[1].is_all_up());
    }

    #[test]
    fn send_text_types_each_supported_character() {
        let sink = Arc::new(RecordingSink::new());
        let helper = KeyboardHelper::new(sink.clone());

        assert_eq!(helper.send_text("Hi \u{263A}!"), 4);

        let reports = sink.keyboard_reports();
        let downs: Vec<(u8, u8)> = reports
            .iter()
            .step_by(2)
            .map(|r| (r.modifiers, r.keys[0]))
            .collect();
        let shift = Modifiers::LEFT_SHIFT.bits();
        assert_eq!(downs, vec![(shift, 0x0B), (0, 0x0C), (0, 0x2C), (shift, 0x1E)]);
        assert!(reports.iter().skip(1).step_by(2).all(|r| r.is_all_up()));
    }
}
