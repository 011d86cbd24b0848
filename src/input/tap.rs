//! Tap, double-tap and long-press detection
//!
//! Timeouts are evaluated against event timestamps. Pending deadlines fire on
//! the next event or on [`TapDetector::poll`], whichever comes first, so a
//! caller without a steady event stream has to poll.

use super::touch::{TouchAction, TouchEvent};
use crate::config::GestureTiming;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoubleTapPhase {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapEvent {
    /// A tap that was not followed by a second one
    SingleTapConfirmed { x: f32, y: f32 },
    /// Second down of a double tap; carries the first tap's position
    DoubleTap { x: f32, y: f32 },
    /// Events of the second touch of a double tap
    DoubleTapEvent {
        phase: DoubleTapPhase,
        down_time: Duration,
        time: Duration,
    },
    LongPress { x: f32, y: f32 },
}

#[derive(Debug, Clone, Copy)]
struct Touch {
    x: f32,
    y: f32,
    time: Duration,
}

#[derive(Debug)]
pub struct TapDetector {
    timing: GestureTiming,
    long_press_enabled: bool,
    current_down: Option<Touch>,
    previous_up: Option<Touch>,
    down_focus: (f32, f32),
    tap_deadline: Option<Duration>,
    long_press_deadline: Option<Duration>,
    still_down: bool,
    in_long_press: bool,
    defer_confirm: bool,
    always_in_tap_region: bool,
    is_double_tapping: bool,
}

impl TapDetector {
    pub fn new(timing: GestureTiming, long_press_enabled: bool) -> Self {
        Self {
            timing,
            long_press_enabled,
            current_down: None,
            previous_up: None,
            down_focus: (0.0, 0.0),
            tap_deadline: None,
            long_press_deadline: None,
            still_down: false,
            in_long_press: false,
            defer_confirm: false,
            always_in_tap_region: false,
            is_double_tapping: false,
        }
    }

    pub fn timing(&self) -> &GestureTiming {
        &self.timing
    }

    /// Fires every deadline that has passed at `now`
    pub fn poll(&mut self, now: Duration) -> Vec<TapEvent> {
        let mut events = Vec::new();
        loop {
            let tap_due = self.tap_deadline.filter(|d| *d <= now);
            let long_press_due = self.long_press_deadline.filter(|d| *d <= now);
            match (tap_due, long_press_due) {
                (None, None) => break,
                (Some(tap), Some(long_press)) if long_press < tap => {
                    self.fire_long_press(&mut events)
                }
                (Some(_), _) => self.fire_tap(&mut events),
                (None, Some(_)) => self.fire_long_press(&mut events),
            }
        }
        events
    }

    pub fn on_touch_event(&mut self, event: &TouchEvent) -> Vec<TapEvent> {
        let mut events = self.poll(event.time);
        let (fx, fy) = event.focus();

        match event.action {
            TouchAction::Down => {
                let had_tap = self.tap_deadline.take().is_some();
                if had_tap && self.is_considered_double_tap(fx, fy, event.time) {
                    self.is_double_tapping = true;
                    if let Some(first) = self.current_down {
                        events.push(TapEvent::DoubleTap {
                            x: first.x,
                            y: first.y,
                        });
                    }
                    events.push(TapEvent::DoubleTapEvent {
                        phase: DoubleTapPhase::Down,
                        down_time: event.time,
                        time: event.time,
                    });
                } else {
                    self.tap_deadline = Some(event.time + self.timing.double_tap_timeout);
                }

                self.current_down = Some(Touch {
                    x: fx,
                    y: fy,
                    time: event.time,
                });
                self.down_focus = (fx, fy);
                self.always_in_tap_region = true;
                self.still_down = true;
                self.in_long_press = false;
                self.defer_confirm = false;

                if self.long_press_enabled {
                    self.long_press_deadline = Some(
                        event.time + self.timing.tap_timeout + self.timing.long_press_timeout,
                    );
                }
            }

            TouchAction::PointerDown => {
                self.down_focus = (fx, fy);
                self.cancel_taps();
            }

            TouchAction::PointerUp => {
                self.down_focus = (fx, fy);
            }

            TouchAction::Move => {
                if self.in_long_press {
                    // nothing until the finger lifts
                } else if self.is_double_tapping {
                    events.push(TapEvent::DoubleTapEvent {
                        phase: DoubleTapPhase::Move,
                        down_time: self.down_time(event.time),
                        time: event.time,
                    });
                } else if self.always_in_tap_region {
                    let dx = (fx - self.down_focus.0) as i32;
                    let dy = (fy - self.down_focus.1) as i32;
                    let distance = dx * dx + dy * dy;
                    if distance as f32 > self.timing.slop_square() {
                        trace!("Touch left tap region");
                        self.always_in_tap_region = false;
                        self.tap_deadline = None;
                        self.long_press_deadline = None;
                    }
                }
            }

            TouchAction::Up => {
                self.still_down = false;
                if self.is_double_tapping {
                    events.push(TapEvent::DoubleTapEvent {
                        phase: DoubleTapPhase::Up,
                        down_time: self.down_time(event.time),
                        time: event.time,
                    });
                } else if self.in_long_press {
                    self.tap_deadline = None;
                    self.in_long_press = false;
                } else if self.always_in_tap_region && self.defer_confirm {
                    events.push(TapEvent::SingleTapConfirmed { x: fx, y: fy });
                }

                self.previous_up = Some(Touch {
                    x: fx,
                    y: fy,
                    time: event.time,
                });
                self.is_double_tapping = false;
                self.defer_confirm = false;
                self.long_press_deadline = None;
            }

            TouchAction::Cancel => {
                self.cancel_taps();
                self.still_down = false;
            }
        }

        events
    }

    fn down_time(&self, fallback: Duration) -> Duration {
        self.current_down.map(|d| d.time).unwrap_or(fallback)
    }

    fn is_considered_double_tap(&self, x: f32, y: f32, time: Duration) -> bool {
        if !self.always_in_tap_region {
            return false;
        }
        let (Some(first_down), Some(first_up)) = (self.current_down, self.previous_up) else {
            return false;
        };

        let gap = time.saturating_sub(first_up.time);
        if gap > self.timing.double_tap_timeout || gap < self.timing.double_tap_min_time {
            return false;
        }

        let dx = first_down.x - x;
        let dy = first_down.y - y;
        dx * dx + dy * dy < self.timing.double_tap_slop_square()
    }

    fn fire_tap(&mut self, events: &mut Vec<TapEvent>) {
        self.tap_deadline = None;
        if self.still_down {
            self.defer_confirm = true;
        } else if let Some(down) = self.current_down {
            events.push(TapEvent::SingleTapConfirmed {
                x: down.x,
                y: down.y,
            });
        }
    }

    fn fire_long_press(&mut self, events: &mut Vec<TapEvent>) {
        self.long_press_deadline = None;
        self.tap_deadline = None;
        self.defer_confirm = false;
        self.in_long_press = true;
        if let Some(down) = self.current_down {
            events.push(TapEvent::LongPress {
                x: down.x,
                y: down.y,
            });
        }
    }

    fn cancel_taps(&mut self) {
        self.tap_deadline = None;
        self.long_press_deadline = None;
        self.is_double_tapping = false;
        self.always_in_tap_region = false;
        self.defer_confirm = false;
        self.in_long_press = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::touch::Pointer;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn at(action: TouchAction, x: f32, y: f32, t: u64) -> TouchEvent {
        TouchEvent::single(action, x, y, ms(t))
    }

    fn detector() -> TapDetector {
        TapDetector::new(GestureTiming::default(), true)
    }

    #[test]
    fn single_tap_is_confirmed_after_double_tap_timeout() {
        let mut d = detector();
        assert!(d.on_touch_event(&at(TouchAction::Down, 5.0, 5.0, 0)).is_empty());
        assert!(d.on_touch_event(&at(TouchAction::Up, 5.0, 5.0, 50)).is_empty());
        assert!(d.poll(ms(299)).is_empty());
        assert_eq!(
            d.poll(ms(300)),
            vec![TapEvent::SingleTapConfirmed { x: 5.0, y: 5.0 }]
        );
        assert!(d.poll(ms(2000)).is_empty());
    }

    #[test]
    fn second_tap_in_time_is_a_double_tap() {
        let mut d = detector();
        d.on_touch_event(&at(TouchAction::Down, 5.0, 5.0, 0));
        d.on_touch_event(&at(TouchAction::Up, 5.0, 5.0, 50));

        let events = d.on_touch_event(&at(TouchAction::Down, 8.0, 6.0, 150));
        assert_eq!(
            events,
            vec![
                TapEvent::DoubleTap { x: 5.0, y: 5.0 },
                TapEvent::DoubleTapEvent {
                    phase: DoubleTapPhase::Down,
                    down_time: ms(150),
                    time: ms(150),
                },
            ]
        );

        let events = d.on_touch_event(&at(TouchAction::Up, 8.0, 6.0, 200));
        assert_eq!(
            events,
            vec![TapEvent::DoubleTapEvent {
                phase: DoubleTapPhase::Up,
                down_time: ms(150),
                time: ms(200),
            }]
        );
        assert!(d.poll(ms(5000)).is_empty());
    }

    #[test]
    fn second_tap_too_late_is_two_single_taps() {
        let mut d = detector();
        d.on_touch_event(&at(TouchAction::Down, 5.0, 5.0, 0));
        d.on_touch_event(&at(TouchAction::Up, 5.0, 5.0, 50));
        let events = d.on_touch_event(&at(TouchAction::Down, 5.0, 5.0, 400));
        assert_eq!(events, vec![TapEvent::SingleTapConfirmed { x: 5.0, y: 5.0 }]);
    }

    #[test]
    fn holding_still_becomes_long_press() {
        let mut d = detector();
        d.on_touch_event(&at(TouchAction::Down, 1.0, 2.0, 0));
        assert!(d.poll(ms(599)).is_empty());
        assert_eq!(d.poll(ms(600)), vec![TapEvent::LongPress { x: 1.0, y: 2.0 }]);
        assert!(d.on_touch_event(&at(TouchAction::Up, 1.0, 2.0, 700)).is_empty());
        assert!(d.poll(ms(2000)).is_empty());
    }

    #[test]
    fn slow_tap_is_confirmed_on_lift() {
        let mut d = TapDetector::new(GestureTiming::default(), false);
        d.on_touch_event(&at(TouchAction::Down, 1.0, 1.0, 0));
        assert!(d.poll(ms(400)).is_empty());
        assert_eq!(
            d.on_touch_event(&at(TouchAction::Up, 1.0, 1.0, 450)),
            vec![TapEvent::SingleTapConfirmed { x: 1.0, y: 1.0 }]
        );
    }

    #[test]
    fn drag_is_not_a_tap() {
        let mut d = detector();
        d.on_touch_event(&at(TouchAction::Down, 0.0, 0.0, 0));
        d.on_touch_event(&at(TouchAction::Move, 40.0, 0.0, 20));
        d.on_touch_event(&at(TouchAction::Up, 40.0, 0.0, 60));
        assert!(d.poll(ms(5000)).is_empty());
    }

    #[test]
    fn movement_within_slop_keeps_tap() {
        let mut d = detector();
        d.on_touch_event(&at(TouchAction::Down, 0.0, 0.0, 0));
        d.on_touch_event(&at(TouchAction::Move, 10.0, 10.0, 20));
        d.on_touch_event(&at(TouchAction::Up, 10.0, 10.0, 60));
        assert_eq!(d.poll(ms(300)).len(), 1);
    }

    #[test]
    fn second_pointer_cancels_taps() {
        let mut d = detector();
        d.on_touch_event(&at(TouchAction::Down, 0.0, 0.0, 0));
        d.on_touch_event(&TouchEvent::new(
            TouchAction::PointerDown,
            vec![
                Pointer { id: 0, x: 0.0, y: 0.0 },
                Pointer { id: 1, x: 50.0, y: 0.0 },
            ],
            1,
            ms(10),
        ));
        d.on_touch_event(&at(TouchAction::Up, 0.0, 0.0, 60));
        assert!(d.poll(ms(5000)).is_empty());
    }
}
