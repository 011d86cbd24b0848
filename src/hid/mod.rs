//! # HID Module
//!
//! Report types and the sink they are delivered to. The transport behind
//! [`HidSink`] is injected by the host application.

pub mod keyboard;
pub mod report;
pub mod sink;

pub use keyboard::KeyboardHelper;
pub use report::{Key, KeyboardReport, Modifiers, MouseButton, MouseReport};
pub use sink::{HidReport, HidSink, RecordingSink, TracingSink};
