//! Multi-touch touchpad
//!
//! Tracks the centroid of all pointers on the surface. One finger moves the
//! pointer, two fingers dragged vertically scroll, a tap clicks, and a tap or
//! lift involving a second finger right-clicks. Motion and button edges are
//! accumulated and drained once per output tick.

use super::buttons::{ButtonLatch, PendingButtonQueue};
use super::carry::MotionAccumulator;
use super::tap::{DoubleTapPhase, TapDetector, TapEvent};
use super::touch::{TouchAction, TouchEvent};
use crate::config::GestureTiming;
use crate::hid::{MouseButton, MouseReport};
use std::time::Duration;
use tracing::{debug, trace};

/// Centroid travel, in pixels, per wheel count while scrolling
pub const SCROLL_DIVISOR: f32 = 10.0;

#[derive(Debug)]
pub struct MultiTouchGestureRecognizer {
    detector: TapDetector,
    last: (f32, f32),
    down_focus: (f32, f32),
    always_in_tap_region: bool,
    in_double_tap: bool,
    in_right_click: bool,
    motion: MotionAccumulator,
    buttons: PendingButtonQueue,
    latch: ButtonLatch,
}

impl MultiTouchGestureRecognizer {
    pub fn new(timing: GestureTiming, buttons: PendingButtonQueue) -> Self {
        Self {
            detector: TapDetector::new(timing, false),
            last: (0.0, 0.0),
            down_focus: (0.0, 0.0),
            always_in_tap_region: false,
            in_double_tap: false,
            in_right_click: false,
            motion: MotionAccumulator::new(),
            buttons,
            latch: ButtonLatch::default(),
        }
    }

    pub fn buttons(&self) -> &PendingButtonQueue {
        &self.buttons
    }

    pub fn is_right_click_candidate(&self) -> bool {
        self.in_right_click
    }

    pub fn is_in_tap_region(&self) -> bool {
        self.always_in_tap_region
    }

    pub fn on_rotary_input(&mut self, delta: f32) {
        self.motion.add(0.0, 0.0, delta as f64);
    }

    pub fn on_touch_event(&mut self, event: &TouchEvent) {
        let (fx, fy) = event.focus();
        let count = event.pointer_count();
        let pointer_up = event.action == TouchAction::PointerUp;

        if count > 1 && !pointer_up {
            self.in_right_click = true;
        }

        match event.action {
            TouchAction::Down | TouchAction::PointerDown => {
                if event.action == TouchAction::Down {
                    self.in_double_tap = false;
                }
                self.down_focus = (fx, fy);
                self.always_in_tap_region = true;
            }

            TouchAction::Move => {
                if self.always_in_tap_region {
                    let dx = (fx - self.down_focus.0) as i32;
                    let dy = (fy - self.down_focus.1) as i32;
                    let distance = dx * dx + dy * dy;
                    if distance as f32 > self.detector.timing().slop_square() {
                        self.always_in_tap_region = false;
                    }
                }

                if self.in_right_click && !self.always_in_tap_region && count > 1 {
                    let wheel = (self.last.1 - fy) / SCROLL_DIVISOR;
                    trace!("Scroll {:.2}", wheel);
                    self.motion.add(0.0, 0.0, wheel as f64);
                } else {
                    self.motion
                        .add((fx - self.last.0) as f64, (fy - self.last.1) as f64, 0.0);
                }
            }

            TouchAction::PointerUp => {
                if self.always_in_tap_region {
                    self.press();
                }
            }

            TouchAction::Up => {
                if self.in_right_click {
                    self.release();
                } else if self.always_in_tap_region && !self.in_double_tap {
                    self.press();
                }
            }

            TouchAction::Cancel => {}
        }

        self.last = (fx, fy);

        let taps = self.detector.on_touch_event(event);
        self.handle_taps(taps);
    }

    /// Produces the report for one output tick at `now`
    pub fn tick(&mut self, now: Duration) -> MouseReport {
        let taps = self.detector.poll(now);
        self.handle_taps(taps);

        let (dx, dy, wheel) = self.motion.drain_truncated();
        if let Some(edge) = self.buttons.pop() {
            self.latch.apply(edge);
        }

        MouseReport {
            left: self.latch.left,
            right: self.latch.right,
            middle: false,
            dx,
            dy,
            wheel,
        }
    }

    fn handle_taps(&mut self, taps: Vec<TapEvent>) {
        for tap in taps {
            match tap {
                TapEvent::SingleTapConfirmed { .. } => self.release(),
                TapEvent::DoubleTapEvent {
                    phase: DoubleTapPhase::Down,
                    ..
                } => self.in_double_tap = true,
                TapEvent::DoubleTapEvent {
                    phase: DoubleTapPhase::Up,
                    down_time,
                    time,
                } => {
                    self.in_double_tap = false;
                    self.release();
                    let quick =
                        time.saturating_sub(down_time) <= self.detector.timing().tap_timeout;
                    if self.always_in_tap_region && quick {
                        debug!("Double click");
                        self.press();
                        self.release();
                    }
                }
                _ => {}
            }
        }
    }

    fn press(&mut self) {
        let button = self.current_button();
        self.enqueue(button, true);
    }

    fn release(&mut self) {
        let button = self.current_button();
        self.enqueue(button, false);
        self.in_right_click = false;
    }

    fn current_button(&self) -> MouseButton {
        if self.in_right_click {
            MouseButton::Right
        } else {
            MouseButton::Left
        }
    }

    // Every edge goes out twice; some hosts drop a single report.
    fn enqueue(&self, button: MouseButton, pressed: bool) {
        debug!("Touchpad button {:?} pressed={}", button, pressed);
        self.buttons.push(button, pressed);
        self.buttons.push(button, pressed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::touch::Pointer;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn pad() -> MultiTouchGestureRecognizer {
        MultiTouchGestureRecognizer::new(GestureTiming::default(), PendingButtonQueue::new())
    }

    fn one(action: TouchAction, x: f32, y: f32, t: u64) -> TouchEvent {
        TouchEvent::single(action, x, y, ms(t))
    }

    fn two(action: TouchAction, y: f32, index: usize, t: u64) -> TouchEvent {
        TouchEvent::new(
            action,
            vec![
                Pointer { id: 0, x: 100.0, y },
                Pointer { id: 1, x: 150.0, y },
            ],
            index,
            ms(t),
        )
    }

    fn drain(pad: &mut MultiTouchGestureRecognizer, from: u64, ticks: u64) -> Vec<MouseReport> {
        (0..ticks).map(|i| pad.tick(ms(from + i * 11))).collect()
    }

    /// Final-state transitions of one button across a report sequence
    fn transitions(reports: &[MouseReport], button: impl Fn(&MouseReport) -> bool) -> Vec<bool> {
        let mut state = false;
        let mut out = Vec::new();
        for report in reports {
            if button(report) != state {
                state = button(report);
                out.push(state);
            }
        }
        out
    }

    #[test]
    fn two_finger_vertical_drag_scrolls() {
        let mut pad = pad();
        pad.on_touch_event(&one(TouchAction::Down, 100.0, 100.0, 0));
        pad.on_touch_event(&two(TouchAction::PointerDown, 100.0, 1, 5));
        for (i, y) in [130.0, 150.0, 170.0, 190.0].iter().enumerate() {
            pad.on_touch_event(&two(TouchAction::Move, *y, 0, 10 + i as u64 * 10));
        }

        let reports = drain(&mut pad, 60, 3);
        let wheel: i32 = reports.iter().map(|r| r.wheel as i32).sum();
        assert_eq!(wheel, -9);
        assert!(reports.iter().all(|r| r.dx == 0 && r.dy == 0));
    }

    #[test]
    fn one_finger_drag_never_scrolls() {
        let mut pad = pad();
        pad.on_touch_event(&one(TouchAction::Down, 100.0, 100.0, 0));
        for (i, y) in [110.0, 130.0, 150.0, 170.0].iter().enumerate() {
            pad.on_touch_event(&one(TouchAction::Move, 100.0, *y, 10 + i as u64 * 10));
        }
        pad.on_touch_event(&one(TouchAction::Up, 100.0, 170.0, 60));

        let reports = drain(&mut pad, 70, 40);
        assert!(reports.iter().all(|r| r.wheel == 0));
        assert_eq!(reports.iter().map(|r| r.dy as i32).sum::<i32>(), 70);
        assert!(reports.iter().all(|r| !r.left && !r.right));
    }

    #[test]
    fn single_tap_is_one_click() {
        let mut pad = pad();
        pad.on_touch_event(&one(TouchAction::Down, 50.0, 50.0, 0));
        pad.on_touch_event(&one(TouchAction::Up, 50.0, 50.0, 60));
        // press edge enqueued twice
        assert_eq!(pad.buttons().len(), 2);

        let reports = drain(&mut pad, 70, 60);
        assert_eq!(transitions(&reports, |r| r.left), vec![true, false]);
        assert!(pad.buttons().is_empty());
    }

    #[test]
    fn double_tap_is_two_clicks() {
        let mut pad = pad();
        pad.on_touch_event(&one(TouchAction::Down, 50.0, 50.0, 0));
        pad.on_touch_event(&one(TouchAction::Up, 50.0, 50.0, 50));
        pad.on_touch_event(&one(TouchAction::Down, 52.0, 50.0, 150));
        pad.on_touch_event(&one(TouchAction::Up, 52.0, 50.0, 200));

        let reports = drain(&mut pad, 210, 60);
        assert_eq!(
            transitions(&reports, |r| r.left),
            vec![true, false, true, false]
        );
    }

    #[test]
    fn double_tap_and_hold_drags() {
        let mut pad = pad();
        pad.on_touch_event(&one(TouchAction::Down, 50.0, 50.0, 0));
        pad.on_touch_event(&one(TouchAction::Up, 50.0, 50.0, 50));
        pad.on_touch_event(&one(TouchAction::Down, 50.0, 50.0, 150));
        pad.on_touch_event(&one(TouchAction::Move, 90.0, 50.0, 250));

        let held = drain(&mut pad, 260, 10);
        assert!(held.last().unwrap().left);
        assert_eq!(held.iter().map(|r| r.dx as i32).sum::<i32>(), 40);

        pad.on_touch_event(&one(TouchAction::Up, 90.0, 50.0, 400));
        let released = drain(&mut pad, 410, 10);
        assert!(transitions(&released, |r| r.left).is_empty());
        assert!(!released.last().unwrap().left);
    }

    #[test]
    fn two_finger_tap_is_right_click() {
        let mut pad = pad();
        pad.on_touch_event(&one(TouchAction::Down, 100.0, 100.0, 0));
        pad.on_touch_event(&two(TouchAction::PointerDown, 100.0, 1, 10));
        assert!(pad.is_right_click_candidate());
        pad.on_touch_event(&two(TouchAction::PointerUp, 100.0, 1, 60));
        pad.on_touch_event(&one(TouchAction::Up, 100.0, 100.0, 70));
        assert!(!pad.is_right_click_candidate());

        let reports = drain(&mut pad, 80, 60);
        assert_eq!(transitions(&reports, |r| r.right), vec![true, false]);
        assert!(reports.iter().all(|r| !r.left));
    }

    #[test]
    fn fractional_motion_is_carried() {
        let mut pad = pad();
        pad.on_touch_event(&one(TouchAction::Down, 0.0, 0.0, 0));
        pad.on_touch_event(&one(TouchAction::Move, 17.5, 0.0, 10));
        assert_eq!(pad.tick(ms(11)).dx, 17);
        pad.on_touch_event(&one(TouchAction::Move, 35.0, 0.0, 20));
        assert_eq!(pad.tick(ms(22)).dx, 18);
        assert_eq!(pad.tick(ms(33)).dx, 0);
    }

    #[test]
    fn rotary_input_adds_to_wheel() {
        let mut pad = pad();
        pad.on_rotary_input(2.5);
        assert_eq!(pad.tick(ms(0)).wheel, 2);
        pad.on_rotary_input(0.5);
        assert_eq!(pad.tick(ms(11)).wheel, 1);
    }
}
