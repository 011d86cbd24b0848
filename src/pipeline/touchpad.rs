//! Touchpad session
//!
//! Touch events are applied to the recognizer as they arrive; the ticker
//! drains it once per sampling period. Event and tick times are measured from
//! the session's own monotonic epoch.

use super::ticker::ReportTicker;
use super::PipelineError;
use crate::config::{GestureTiming, SamplingRate};
use crate::hid::HidSink;
use crate::input::{
    MultiTouchGestureRecognizer, PendingButtonQueue, Pointer, TouchAction, TouchEvent,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

pub struct TouchpadPipeline {
    recognizer: Arc<Mutex<MultiTouchGestureRecognizer>>,
    sink: Option<Arc<dyn HidSink>>,
    ticker: ReportTicker,
    epoch: Instant,
}

fn lock(
    recognizer: &Mutex<MultiTouchGestureRecognizer>,
) -> MutexGuard<'_, MultiTouchGestureRecognizer> {
    recognizer.lock().unwrap_or_else(|e| e.into_inner())
}

impl TouchpadPipeline {
    pub fn new(sink: Arc<dyn HidSink>, timing: GestureTiming, rate: SamplingRate) -> Self {
        let recognizer = MultiTouchGestureRecognizer::new(timing, PendingButtonQueue::new());
        Self {
            recognizer: Arc::new(Mutex::new(recognizer)),
            sink: Some(sink),
            ticker: ReportTicker::new("touchpad", rate.period()),
            epoch: Instant::now(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    /// Time since the session was created, the clock touch events are stamped with
    pub fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    pub fn start(&mut self) -> Result<(), PipelineError> {
        let Some(sink) = self.sink.clone() else {
            return Err(PipelineError::Stopped("touchpad pipeline has released its sink".into()));
        };

        let recognizer = self.recognizer.clone();
        let epoch = self.epoch;
        if self.ticker.start(move || {
            let report = lock(&recognizer).tick(epoch.elapsed());
            sink.send_mouse(report);
        }) {
            info!("Touchpad pipeline started");
        }
        Ok(())
    }

    /// Stops the session and releases the sink
    pub async fn stop(&mut self) -> Result<(), PipelineError> {
        let result = self.ticker.stop().await;
        self.sink = None;
        info!("Touchpad pipeline stopped");
        result
    }

    pub fn on_touch_event(&self, event: &TouchEvent) {
        lock(&self.recognizer).on_touch_event(event);
    }

    /// Builds an event stamped with the current session time and applies it
    pub fn touch(&self, action: TouchAction, pointers: Vec<Pointer>, action_index: usize) {
        let event = TouchEvent::new(action, pointers, action_index, self.now());
        self.on_touch_event(&event);
    }

    pub fn on_rotary_input(&self, delta: f32) {
        lock(&self.recognizer).on_rotary_input(delta);
    }
}
