use super::report::{KeyboardReport, MouseReport};
use std::sync::Mutex;
use tracing::{debug, trace};

/// Fire-and-forget consumer of HID reports (the host transport)
pub trait HidSink: Send + Sync {
    fn send_mouse(&self, report: MouseReport);

    fn send_keyboard(&self, report: KeyboardReport);
}

/// Sink that only logs reports
#[derive(Debug, Default)]
pub struct TracingSink;

impl HidSink for TracingSink {
    fn send_mouse(&self, report: MouseReport) {
        if report.has_motion() {
            debug!("Mouse report: {:?}", report);
        } else {
            trace!("Mouse report: {:?}", report);
        }
    }

    fn send_keyboard(&self, report: KeyboardReport) {
        debug!("Keyboard report: {:?}", report);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HidReport {
    Mouse(MouseReport),
    Keyboard(KeyboardReport),
}

/// Sink that keeps every report in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<HidReport>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<HidReport> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn mouse_reports(&self) -> Vec<MouseReport> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                HidReport::Mouse(m) => Some(m),
                HidReport::Keyboard(_) => None,
            })
            .collect()
    }

    pub fn keyboard_reports(&self) -> Vec<KeyboardReport> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                HidReport::Keyboard(k) => Some(k),
                HidReport::Mouse(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn push(&self, report: HidReport) {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(report);
    }
}

impl HidSink for RecordingSink {
    fn send_mouse(&self, report: MouseReport) {
        self.push(HidReport::Mouse(report));
    }

    fn send_keyboard(&self, report: KeyboardReport) {
        self.push(HidReport::Keyboard(report));
    }
}
