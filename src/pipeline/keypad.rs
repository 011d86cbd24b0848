//! Keypad session
//!
//! The radial keypad sends keyboard reports straight from touch events. The
//! ticker here only polls the tap detector so single-tap and long-press
//! timeouts fire without further touches.

use super::ticker::ReportTicker;
use super::PipelineError;
use crate::config::{GestureTiming, Settings};
use crate::hid::HidSink;
use crate::input::{KeypadGeometry, KeypadUi, RadialGestureRecognizer, TouchAction, TouchEvent};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

const GESTURE_POLL_PERIOD: Duration = Duration::from_millis(10);

pub struct KeypadSession {
    recognizer: Arc<Mutex<Option<RadialGestureRecognizer>>>,
    ticker: ReportTicker,
    epoch: Instant,
}

type Slot = Option<RadialGestureRecognizer>;

fn lock(recognizer: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    recognizer.lock().unwrap_or_else(|e| e.into_inner())
}

fn stopped() -> PipelineError {
    PipelineError::Stopped("keypad session has released its sink".into())
}

impl KeypadSession {
    pub fn new(
        geometry: KeypadGeometry,
        timing: GestureTiming,
        sink: Arc<dyn HidSink>,
        ui: Arc<dyn KeypadUi>,
    ) -> Self {
        Self {
            recognizer: Arc::new(Mutex::new(Some(RadialGestureRecognizer::new(
                geometry, timing, sink, ui,
            )))),
            ticker: ReportTicker::new("keypad", GESTURE_POLL_PERIOD),
            epoch: Instant::now(),
        }
    }

    pub fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    /// Resets the keypad with the current 8-way preference and starts polling
    pub fn start(&mut self, settings: &Settings) -> Result<(), PipelineError> {
        lock(&self.recognizer)
            .as_mut()
            .ok_or_else(stopped)?
            .resume(settings.cursor_8_way);

        let recognizer = self.recognizer.clone();
        let epoch = self.epoch;
        if self.ticker.start(move || {
            if let Some(recognizer) = lock(&recognizer).as_mut() {
                recognizer.poll(epoch.elapsed());
            }
        }) {
            info!("Keypad session started");
        }
        Ok(())
    }

    /// Releases held keys, then drops the recognizer and with it the sink
    ///
    /// No report reaches the sink once this returns.
    pub async fn stop(&mut self) -> Result<(), PipelineError> {
        let result = self.ticker.stop().await;
        if let Some(mut recognizer) = lock(&self.recognizer).take() {
            recognizer.resume(false);
        }
        info!("Keypad session stopped");
        result
    }

    pub fn on_touch_event(&self, event: &TouchEvent) -> Result<(), PipelineError> {
        lock(&self.recognizer)
            .as_mut()
            .ok_or_else(stopped)?
            .on_touch_event(event);
        Ok(())
    }

    /// Single-pointer event stamped with the session time
    pub fn touch(&self, action: TouchAction, x: f32, y: f32) -> Result<(), PipelineError> {
        let event = TouchEvent::single(action, x, y, self.now());
        self.on_touch_event(&event)
    }

    pub fn on_rotary_input(&self, delta: f32) -> Result<(), PipelineError> {
        lock(&self.recognizer)
            .as_mut()
            .ok_or_else(stopped)?
            .on_rotary_input(delta);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::{Key, RecordingSink};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct HintCounter {
        hints: AtomicUsize,
    }

    impl KeypadUi for HintCounter {
        fn show_usage_hint(&self) {
            self.hints.fetch_add(1, Ordering::SeqCst);
        }
        fn show_dismiss_overlay(&self) {}
        fn set_pointer_position(&self, _x: f32, _y: f32) {}
        fn reset_pointer_position(&self) {}
        fn set_center_text(&self, _text: &str, _eight_way: bool) {}
    }

    fn session(sink: Arc<RecordingSink>, ui: Arc<HintCounter>) -> KeypadSession {
        KeypadSession::new(KeypadGeometry::new(200, 200), GestureTiming::default(), sink, ui)
    }

    #[tokio::test(start_paused = true)]
    async fn center_tap_shows_hint_without_further_touches() {
        let sink = Arc::new(RecordingSink::new());
        let ui = Arc::new(HintCounter::default());
        let mut keypad = session(sink, ui.clone());
        keypad.start(&Settings::default()).unwrap();

        keypad.touch(TouchAction::Down, 100.0, 100.0).unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        keypad.touch(TouchAction::Up, 100.0, 100.0).unwrap();
        assert_eq!(ui.hints.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(ui.hints.load(Ordering::SeqCst), 1);
        keypad.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_releases_held_keys() {
        let sink = Arc::new(RecordingSink::new());
        let mut keypad = session(sink.clone(), Arc::new(HintCounter::default()));
        keypad.start(&Settings::default()).unwrap();

        keypad.touch(TouchAction::Down, 190.0, 100.0).unwrap();
        let held: Vec<u8> = sink.keyboard_reports().last().unwrap().pressed().collect();
        assert_eq!(held, vec![Key::Right.code()]);

        keypad.stop().await.unwrap();
        assert!(sink.keyboard_reports().last().unwrap().is_all_up());
    }

    #[tokio::test(start_paused = true)]
    async fn input_after_stop_is_rejected() {
        let sink = Arc::new(RecordingSink::new());
        let mut keypad = session(sink.clone(), Arc::new(HintCounter::default()));
        keypad.start(&Settings::default()).unwrap();

        keypad.touch(TouchAction::Down, 190.0, 100.0).unwrap();
        keypad.stop().await.unwrap();
        let count = sink.reports().len();

        assert!(matches!(
            keypad.touch(TouchAction::Down, 190.0, 100.0),
            Err(PipelineError::Stopped(_))
        ));
        assert!(matches!(keypad.on_rotary_input(5.0), Err(PipelineError::Stopped(_))));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(sink.reports().len(), count);
        assert!(matches!(
            keypad.start(&Settings::default()),
            Err(PipelineError::Stopped(_))
        ));
    }
}
