//! Orientation-to-pointer processing
//!
//! Each orientation sample is turned into yaw/pitch, optionally stabilized,
//! and the angular change since the previous sample is accumulated. The output
//! tick quantizes the accumulated change into one [`MouseReport`], merging at
//! most one queued button edge.

use super::buttons::{ButtonLatch, PendingButtonQueue};
use super::carry::MotionAccumulator;
use crate::config::{HandMode, Settings};
use crate::hid::{MouseButton, MouseReport};
use crate::sensors::Quaternion;
use std::f64::consts::{FRAC_PI_4, PI, TAU};
use tracing::{debug, trace};

/// Report counts per radian (1024 counts per 45°)
pub const CURSOR_SPEED: f64 = 1024.0 / FRAC_PI_4;

/// Angular change, in counts, below which stabilization damps motion
pub const STABILIZE_BIAS: f64 = 16.0;

/// Normalizes an angle difference to (−π, π]
pub fn wrap_angle(mut angle: f64) -> f64 {
    while angle <= -PI {
        angle += TAU;
    }
    while angle > PI {
        angle -= TAU;
    }
    angle
}

/// Yaw and pitch of `q` after hand transforms, `None` for non-real results
pub fn yaw_pitch(q: Quaternion, hand: HandMode, lefty: bool) -> Option<(f64, f64)> {
    let (q0, mut q1, mut q2, q3) = (q.w, q.x, q.y, q.z);

    if lefty {
        q1 = -q1;
        q2 = -q2;
    }

    (q1, q2) = match hand {
        HandMode::Left => (-q2, q1),
        HandMode::Right => (q2, -q1),
        HandMode::Center => (q1, q2),
    };

    let yaw = (2.0 * (q0 * q3 - q1 * q2)).atan2(1.0 - 2.0 * (q1 * q1 + q3 * q3));
    let pitch = (2.0 * (q0 * q1 + q2 * q3)).asin();

    if yaw.is_finite() && pitch.is_finite() {
        Some((yaw, pitch))
    } else {
        None
    }
}

#[derive(Debug)]
pub struct OrientationProcessor {
    hand: HandMode,
    lefty: bool,
    stabilize: bool,
    baseline: Option<(f64, f64)>,
    motion: MotionAccumulator,
    buttons: PendingButtonQueue,
    latch: ButtonLatch,
}

impl OrientationProcessor {
    pub fn new(buttons: PendingButtonQueue) -> Self {
        Self {
            hand: HandMode::default(),
            lefty: false,
            stabilize: false,
            baseline: None,
            motion: MotionAccumulator::new(),
            buttons,
            latch: ButtonLatch::default(),
        }
    }

    pub fn from_settings(settings: &Settings, buttons: PendingButtonQueue) -> Self {
        let mut processor = Self::new(buttons);
        processor.hand = settings.hand_mode;
        processor.stabilize = settings.stabilize;
        processor
    }

    pub fn hand(&self) -> HandMode {
        self.hand
    }

    pub fn is_lefty(&self) -> bool {
        self.lefty
    }

    pub fn is_stabilized(&self) -> bool {
        self.stabilize
    }

    /// Filtered yaw/pitch of the last accepted sample
    pub fn baseline(&self) -> Option<(f64, f64)> {
        self.baseline
    }

    pub fn buttons(&self) -> &PendingButtonQueue {
        &self.buttons
    }

    pub fn set_hand(&mut self, hand: HandMode) {
        self.hand = hand;
        self.restart();
    }

    pub fn set_lefty(&mut self, lefty: bool) {
        self.lefty = lefty;
        self.restart();
    }

    pub fn set_stabilize(&mut self, stabilize: bool) {
        self.stabilize = stabilize;
        self.restart();
    }

    /// Forgets the baseline and any unsent motion; queued buttons are kept
    pub fn restart(&mut self) {
        debug!(
            "Resetting orientation filter (hand={:?}, lefty={}, stabilize={})",
            self.hand, self.lefty, self.stabilize
        );
        self.baseline = None;
        self.motion.reset();
    }

    pub fn enqueue_button(&self, button: MouseButton, pressed: bool) {
        self.buttons.push(button, pressed);
    }

    /// Adds motion in report counts, e.g. from a rotary input
    pub fn add_motion(&mut self, x: f64, y: f64, wheel: f64) {
        self.motion.add(x, y, wheel);
    }

    /// Applies one orientation sample, returns `false` if it was dropped
    pub fn on_sample(&mut self, q: Quaternion) -> bool {
        let Some((yaw, pitch)) = yaw_pitch(q, self.hand, self.lefty) else {
            trace!("Dropping orientation sample with non-real angles: {:?}", q);
            return false;
        };

        let Some((old_yaw, old_pitch)) = self.baseline else {
            self.baseline = Some((yaw, pitch));
            return true;
        };

        let new_yaw = wrap_angle(self.highpass(old_yaw, yaw));
        let new_pitch = self.highpass(old_pitch, pitch);

        let d_yaw = wrap_angle(old_yaw - new_yaw);
        let d_pitch = old_pitch - new_pitch;
        self.baseline = Some((new_yaw, new_pitch));
        self.motion
            .add(d_yaw * CURSOR_SPEED, d_pitch * CURSOR_SPEED, 0.0);
        true
    }

    fn highpass(&self, old: f64, new: f64) -> f64 {
        if !self.stabilize {
            return new;
        }
        let delta = wrap_angle(old - new);
        let alpha = (1.0 - (delta.abs() * CURSOR_SPEED / STABILIZE_BIAS).powi(3)).max(0.0);
        new + alpha * delta
    }

    /// Produces the report for one output tick
    pub fn tick(&mut self) -> MouseReport {
        let (dx, dy, wheel) = self.motion.drain_rounded();

        if let Some(edge) = self.buttons.pop() {
            debug!("Applying button edge: {:?}", edge);
            self.latch.apply(edge);
        }

        MouseReport {
            left: self.latch.left,
            right: self.latch.right,
            middle: self.latch.middle,
            dx,
            dy,
            wheel,
        }
    }
}
