//! # Pipeline Module
//!
//! Running sessions that connect sample sources and touch input to a
//! [`HidSink`](crate::hid::HidSink).
//!
//! ```text
//! OrientationSource ─[Quaternion]→ sample task → OrientationProcessor ─┐
//!                                                                     ├→ ReportTicker → HidSink
//! TouchEvent ──────────────────→ MultiTouchGestureRecognizer ─────────┘
//! ```
//!
//! Each session owns a [`ReportTicker`] that drains its producer once per
//! sampling period.

pub mod keypad;
pub mod mouse;
pub mod ticker;
pub mod touchpad;

pub use keypad::KeypadSession;
pub use mouse::{MouseButtons, MousePipeline};
pub use ticker::ReportTicker;
pub use touchpad::TouchpadPipeline;

use crate::sensors::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// The session was stopped and no longer holds a sink
    #[error("Pipeline stopped: {0}")]
    Stopped(String),

    #[error("Task error: {0}")]
    TaskError(String),
}
