//! Air-mouse session
//!
//! Orientation samples arrive over an mpsc channel and are folded into the
//! [`OrientationProcessor`] by a sample task. A [`ReportTicker`] drains the
//! processor once per sampling period and hands the report to the sink.

use super::ticker::ReportTicker;
use super::PipelineError;
use crate::config::{HandMode, SamplingRate, Settings};
use crate::hid::{HidSink, MouseButton};
use crate::input::{OrientationProcessor, PendingButtonQueue};
use crate::sensors::{OrientationSource, Quaternion, Vector3};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const SAMPLE_CHANNEL_CAPACITY: usize = 64;

/// Button controls for the air mouse; clones share the pipeline's queue
#[derive(Debug, Clone)]
pub struct MouseButtons {
    queue: PendingButtonQueue,
}

impl MouseButtons {
    pub fn button(&self, button: MouseButton, pressed: bool) {
        self.queue.push(button, pressed);
    }

    pub fn left_click_and_hold(&self) {
        self.button(MouseButton::Left, true);
    }

    pub fn right_click_and_hold(&self) {
        self.button(MouseButton::Right, true);
    }

    pub fn release(&self, button: MouseButton) {
        self.button(button, false);
    }

    /// Press immediately followed by release
    pub fn middle_click(&self) {
        self.button(MouseButton::Middle, true);
        self.button(MouseButton::Middle, false);
    }
}

pub struct MousePipeline {
    processor: Arc<Mutex<OrientationProcessor>>,
    buttons: PendingButtonQueue,
    sink: Option<Arc<dyn HidSink>>,
    source: Box<dyn OrientationSource>,
    bias: Vector3,
    ticker: ReportTicker,
    cancel: Option<CancellationToken>,
    sample_task: Option<JoinHandle<usize>>,
}

fn lock(processor: &Mutex<OrientationProcessor>) -> MutexGuard<'_, OrientationProcessor> {
    processor.lock().unwrap_or_else(|e| e.into_inner())
}

impl MousePipeline {
    /// `bias` is the calibrated gyroscope median handed to the source
    pub fn new(
        sink: Arc<dyn HidSink>,
        settings: &Settings,
        bias: Vector3,
        source: Box<dyn OrientationSource>,
    ) -> Self {
        let buttons = PendingButtonQueue::new();
        let processor = OrientationProcessor::from_settings(settings, buttons.clone());
        Self {
            processor: Arc::new(Mutex::new(processor)),
            buttons,
            sink: Some(sink),
            source,
            bias,
            ticker: ReportTicker::new("mouse", settings.sampling_rate().period()),
            cancel: None,
            sample_task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn buttons(&self) -> MouseButtons {
        MouseButtons {
            queue: self.buttons.clone(),
        }
    }

    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.is_running() {
            debug!("Mouse pipeline already running");
            return Ok(());
        }
        let Some(sink) = self.sink.clone() else {
            return Err(PipelineError::Stopped("mouse pipeline has released its sink".into()));
        };

        lock(&self.processor).restart();

        let (tx, rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        self.source.start(self.ticker.period(), self.bias, tx)?;

        let cancel = CancellationToken::new();
        self.sample_task = Some(spawn_sample_task(
            self.processor.clone(),
            rx,
            cancel.clone(),
        ));
        self.cancel = Some(cancel);

        let processor = self.processor.clone();
        self.ticker.start(move || {
            let report = lock(&processor).tick();
            sink.send_mouse(report);
        });

        info!("Mouse pipeline started (bias {})", self.bias);
        Ok(())
    }

    /// Stops the session and releases the sink
    ///
    /// No report reaches the sink once this returns.
    pub async fn stop(&mut self) -> Result<(), PipelineError> {
        let result = self.halt().await;
        self.sink = None;
        info!("Mouse pipeline stopped");
        result
    }

    pub fn set_hand(&self, hand: HandMode) {
        lock(&self.processor).set_hand(hand);
    }

    pub fn set_lefty(&self, lefty: bool) {
        lock(&self.processor).set_lefty(lefty);
    }

    pub fn set_stabilize(&self, stabilize: bool) {
        lock(&self.processor).set_stabilize(stabilize);
    }

    /// Switches the period, restarting the source and ticker if running
    pub async fn set_sampling_rate(&mut self, rate: SamplingRate) -> Result<(), PipelineError> {
        if self.ticker.period() == rate.period() {
            return Ok(());
        }
        let was_running = self.is_running();
        if was_running {
            self.halt().await?;
        }
        self.ticker.set_period(rate.period());
        debug!("Mouse sampling period set to {:?}", rate.period());
        if was_running {
            self.start()?;
        }
        Ok(())
    }

    pub fn on_rotary_input(&self, delta: f32) {
        lock(&self.processor).add_motion(0.0, 0.0, delta as f64);
    }

    async fn halt(&mut self) -> Result<(), PipelineError> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        let ticker_result = self.ticker.stop().await;
        self.source.stop();

        if let Some(handle) = self.sample_task.take() {
            match handle.await {
                Ok(applied) => debug!("Sample task finished after {} samples", applied),
                Err(e) => {
                    error!("Sample task panicked: {}", e);
                    return Err(PipelineError::TaskError(format!(
                        "Sample task panicked: {}",
                        e
                    )));
                }
            }
        }
        ticker_result
    }
}

fn spawn_sample_task(
    processor: Arc<Mutex<OrientationProcessor>>,
    mut rx: mpsc::Receiver<Quaternion>,
    cancel: CancellationToken,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut applied = 0usize;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sample = rx.recv() => match sample {
                    Some(q) => {
                        if lock(&processor).on_sample(q) {
                            applied += 1;
                        }
                    }
                    None => {
                        debug!("Orientation source closed its channel");
                        break;
                    }
                },
            }
        }
        applied
    })
}
