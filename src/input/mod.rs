//! # Input Module
//!
//! Producers that turn motion and touch into HID reports.
//!
//! - [`orientation`]: air mouse driven by orientation samples
//! - [`keypad`]: radial 4-/8-way cursor keypad
//! - [`touchpad`]: multi-touch pointer, scroll and click surface
//!
//! The mouse producers share the residual-carry [`carry::MotionAccumulator`]
//! and the one-edge-per-tick [`buttons::PendingButtonQueue`].

pub mod buttons;
pub mod carry;
pub mod keypad;
pub mod orientation;
pub mod tap;
pub mod touch;
pub mod touchpad;

pub use buttons::{ButtonEdge, ButtonLatch, PendingButtonQueue};
pub use carry::MotionAccumulator;
pub use keypad::{KeypadGeometry, KeypadState, KeypadUi, RadialGestureRecognizer, Sector};
pub use orientation::OrientationProcessor;
pub use tap::{TapDetector, TapEvent};
pub use touch::{Pointer, TouchAction, TouchEvent};
pub use touchpad::MultiTouchGestureRecognizer;
