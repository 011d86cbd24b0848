//! # wristpoint
//!
//! Turns wrist motion and touch input into HID mouse and keyboard reports.
//!
//! - [`sensors`]: orientation/rate sources and gyroscope calibration
//! - [`input`]: the air mouse, radial keypad and touchpad producers
//! - [`pipeline`]: running sessions that tick producers into a [`hid::HidSink`]
//! - [`persistence`]: settings and calibration storage
//! - [`config`]: user settings and gesture timing

pub mod config;
pub mod hid;
pub mod input;
pub mod persistence;
pub mod pipeline;
pub mod sensors;
