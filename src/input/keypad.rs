//! Radial 4-/8-way keypad
//!
//! The outer ring of a circular widget is split into 16 sectors of π/8,
//! numbered counter-clockwise from the positive x axis. Pressing a sector
//! holds its cursor key (plus the diagonal partner in 8-way mode). A touch
//! starting in the center and sliding out selects a swipe key, typed once on
//! release. A double tap on the center types Enter.

use super::tap::{TapDetector, TapEvent};
use super::touch::{TouchAction, TouchEvent};
use crate::config::GestureTiming;
use crate::hid::{HidSink, Key, KeyboardHelper, Modifiers, MouseReport};
use std::f64::consts::{FRAC_PI_8, TAU};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Cursor key of each sector, as an index into `PRESS_KEYS`
const FOUR_WAY: [usize; 16] = [3, 3, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3];

/// Additional key held in 8-way mode for diagonal sectors
const EIGHT_WAY: [Option<usize>; 16] = [
    None,
    Some(0),
    Some(3),
    None,
    None,
    Some(1),
    Some(0),
    None,
    None,
    Some(2),
    Some(1),
    None,
    None,
    Some(3),
    Some(2),
    None,
];

const PRESS_KEYS: [Key; 4] = [Key::Up, Key::Left, Key::Down, Key::Right];
const SWIPE_KEYS: [Key; 4] = [Key::Escape, Key::Backspace, Key::Tab, Key::Space];
const CONFIRM_KEY: Key = Key::Enter;

/// One of the 16 angular sectors of the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sector(u8);

impl Sector {
    pub const COUNT: u8 = 16;

    pub fn new(index: u8) -> Option<Self> {
        (index < Self::COUNT).then_some(Self(index))
    }

    /// Sector containing the direction `(dx, dy)` in screen coordinates (y down)
    pub fn from_offset(dx: f32, dy: f32) -> Self {
        let mut theta = (-(dy as f64)).atan2(dx as f64);
        if theta < 0.0 {
            theta += TAU;
        }
        let index = (theta / FRAC_PI_8) as u8;
        Self(index.min(Self::COUNT - 1))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn press_key(self) -> Key {
        PRESS_KEYS[FOUR_WAY[self.0 as usize]]
    }

    pub fn diagonal_key(self) -> Option<Key> {
        EIGHT_WAY[self.0 as usize].map(|i| PRESS_KEYS[i])
    }

    pub fn swipe_key(self) -> Key {
        SWIPE_KEYS[FOUR_WAY[self.0 as usize]]
    }
}

/// Circle geometry of the widget in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeypadGeometry {
    pub center_x: f32,
    pub center_y: f32,
    pub center_size: f32,
    pub max_dist: f32,
}

impl KeypadGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        let center_x = (width / 2) as f32;
        let center_y = (height / 2) as f32;
        let radius = center_x.min(center_y);
        Self {
            center_x,
            center_y,
            center_size: radius * 0.4,
            max_dist: radius * 0.8,
        }
    }

    pub fn distance(&self, x: f32, y: f32) -> f32 {
        (x - self.center_x).hypot(y - self.center_y)
    }

    pub fn is_in_center(&self, x: f32, y: f32) -> bool {
        self.distance(x, y) <= self.center_size
    }

    pub fn sector(&self, x: f32, y: f32) -> Sector {
        Sector::from_offset(x - self.center_x, y - self.center_y)
    }

    /// Pulls a point outside the ring back onto it
    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        let dist = self.distance(x, y);
        if dist > self.max_dist {
            (
                self.center_x + (x - self.center_x) / dist * self.max_dist,
                self.center_y + (y - self.center_y) / dist * self.max_dist,
            )
        } else {
            (x, y)
        }
    }
}

/// Display side of the keypad
pub trait KeypadUi: Send + Sync {
    fn show_usage_hint(&self);

    fn show_dismiss_overlay(&self);

    fn set_pointer_position(&self, x: f32, y: f32);

    fn reset_pointer_position(&self);

    /// Label in the center; `eight_way` selects the 8-way artwork
    fn set_center_text(&self, text: &str, eight_way: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypadState {
    Center,
    Pressed(Sector),
    /// Touch that started in the center; `None` while it is still inside it
    Swiping(Option<Sector>),
}

pub struct RadialGestureRecognizer {
    geometry: KeypadGeometry,
    detector: TapDetector,
    keyboard: KeyboardHelper,
    sink: Arc<dyn HidSink>,
    ui: Arc<dyn KeypadUi>,
    eight_way: bool,
    from_center: bool,
    touch_area: Option<Sector>,
    swipe_area: Option<Sector>,
}

impl RadialGestureRecognizer {
    pub fn new(
        geometry: KeypadGeometry,
        timing: GestureTiming,
        sink: Arc<dyn HidSink>,
        ui: Arc<dyn KeypadUi>,
    ) -> Self {
        Self {
            geometry,
            detector: TapDetector::new(timing, true),
            keyboard: KeyboardHelper::new(sink.clone()),
            sink,
            ui,
            eight_way: false,
            from_center: false,
            touch_area: None,
            swipe_area: None,
        }
    }

    pub fn geometry(&self) -> &KeypadGeometry {
        &self.geometry
    }

    pub fn is_eight_way(&self) -> bool {
        self.eight_way
    }

    pub fn state(&self) -> KeypadState {
        match (self.swipe_area, self.touch_area) {
            (Some(sector), _) => KeypadState::Swiping(Some(sector)),
            (None, _) if self.from_center => KeypadState::Swiping(None),
            (None, Some(sector)) => KeypadState::Pressed(sector),
            (None, None) => KeypadState::Center,
        }
    }

    /// Returns to the idle state and releases every key
    pub fn resume(&mut self, eight_way: bool) {
        info!("Keypad resumed (8-way: {})", eight_way);
        self.eight_way = eight_way;
        self.ui.set_center_text("", eight_way);
        self.from_center = false;
        self.touch_area = None;
        self.swipe_area = None;
        self.send_key_state();
    }

    pub fn on_rotary_input(&self, delta: f32) {
        let wheel = delta.trunc().clamp(i8::MIN as f32, i8::MAX as f32) as i8;
        self.sink.send_mouse(MouseReport {
            wheel,
            ..MouseReport::default()
        });
    }

    pub fn on_touch_event(&mut self, event: &TouchEvent) {
        let (x, y) = event.position();
        match event.action {
            TouchAction::Down => {
                self.from_center = self.geometry.is_in_center(x, y);
                if !self.from_center {
                    self.on_area_swipe(None);
                }
                self.on_touch_down(x, y);
            }
            TouchAction::Move => self.on_touch_down(x, y),
            TouchAction::Up => {
                self.from_center = false;
                self.on_touch_up();
            }
            _ => {}
        }

        let taps = self.detector.on_touch_event(event);
        self.handle_taps(taps);
    }

    /// Fires pending single-tap and long-press timeouts
    pub fn poll(&mut self, now: Duration) {
        let taps = self.detector.poll(now);
        self.handle_taps(taps);
    }

    fn handle_taps(&self, taps: Vec<TapEvent>) {
        for tap in taps {
            match tap {
                TapEvent::SingleTapConfirmed { x, y } if self.geometry.is_in_center(x, y) => {
                    self.ui.show_usage_hint();
                }
                TapEvent::DoubleTap { x, y } if self.geometry.is_in_center(x, y) => {
                    debug!("Center double tap");
                    self.keyboard.send_key_press(CONFIRM_KEY);
                }
                TapEvent::LongPress { x, y } if self.geometry.is_in_center(x, y) => {
                    self.ui.show_dismiss_overlay();
                }
                _ => {}
            }
        }
    }

    fn on_touch_down(&mut self, x: f32, y: f32) {
        if self.geometry.is_in_center(x, y) {
            if self.from_center {
                self.on_area_swipe(None);
            }
            self.on_touch_up();
            return;
        }

        if self.from_center {
            self.on_area_swipe(Some(self.geometry.sector(x, y)));
        }

        let (x, y) = self.geometry.clamp(x, y);
        self.on_area_touch_down(x, y, self.geometry.sector(x, y));
    }

    fn on_area_touch_down(&mut self, x: f32, y: f32, area: Sector) {
        if self.touch_area != Some(area) && self.swipe_area.is_none() {
            self.touch_area = Some(area);
            self.send_key_state();
        }
        self.ui.set_pointer_position(x, y);
    }

    fn on_area_swipe(&mut self, area: Option<Sector>) {
        if area == self.swipe_area {
            return;
        }
        self.swipe_area = area;
        match area {
            Some(sector) => self.ui.set_center_text(sector.swipe_key().label(), false),
            None => self.ui.set_center_text("", self.eight_way),
        }
    }

    fn on_touch_up(&mut self) {
        match self.swipe_area {
            Some(sector) => {
                self.keyboard.send_key_press(sector.swipe_key());
                self.swipe_area = None;
            }
            None => {
                self.touch_area = None;
                self.send_key_state();
            }
        }
        self.ui.set_center_text("", self.eight_way);
        self.ui.reset_pointer_position();
    }

    fn send_key_state(&self) {
        let mut keys = Vec::with_capacity(2);
        if let Some(sector) = self.touch_area {
            keys.push(sector.press_key());
            if self.eight_way {
                keys.extend(sector.diagonal_key());
            }
        }
        debug!("Keypad keys held: {:?}", keys);
        self.keyboard.send_keys_down(Modifiers::NONE, &keys);
    }
}
