//! Residual-carry accumulator shared by the pointer producers
//!
//! Motion is accumulated in report units (counts). Each drain emits what fits
//! into an `i8` report and keeps the rest, so over many ticks the emitted total
//! tracks the accumulated total within one count.

use tracing::debug;

/// Largest magnitude a single report axis can carry
pub const MAX_DELTA: f64 = 127.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionAccumulator {
    dx: f64,
    dy: f64,
    wheel: f64,
}

impl MotionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, dx: f64, dy: f64, wheel: f64) {
        self.dx += dx;
        self.dy += dy;
        self.wheel += wheel;
    }

    pub fn pending(&self) -> (f64, f64, f64) {
        (self.dx, self.dy, self.wheel)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Emits the rounded, range-limited motion
    ///
    /// An overflowing pointer axis is clamped to ±127 and the other pointer
    /// axis scaled by the same factor so the direction is kept. The wheel is
    /// clamped on its own.
    pub fn drain_rounded(&mut self) -> (i8, i8, i8) {
        let (mut x, mut y) = (self.dx, self.dy);

        if x.abs() > MAX_DELTA {
            debug!("Clamping x overflow {:.2}", x);
            y *= MAX_DELTA / x.abs();
            x = x.clamp(-MAX_DELTA, MAX_DELTA);
        }
        if y.abs() > MAX_DELTA {
            debug!("Clamping y overflow {:.2}", y);
            x *= MAX_DELTA / y.abs();
            y = y.clamp(-MAX_DELTA, MAX_DELTA);
        }
        let wheel = self.wheel.clamp(-MAX_DELTA, MAX_DELTA);

        self.emit(x.round(), y.round(), wheel.round())
    }

    /// Emits the integer part of each axis, truncated toward zero
    pub fn drain_truncated(&mut self) -> (i8, i8, i8) {
        let limit = |v: f64| v.trunc().clamp(-MAX_DELTA, MAX_DELTA);
        self.emit(limit(self.dx), limit(self.dy), limit(self.wheel))
    }

    fn emit(&mut self, x: f64, y: f64, wheel: f64) -> (i8, i8, i8) {
        self.dx -= x;
        self.dy -= y;
        self.wheel -= wheel;
        (x as i8, y as i8, wheel as i8)
    }
}
