//! Fixed-period report timer
//!
//! Runs a callback on a tokio interval until cancelled. Stopping awaits the
//! task, so once [`ReportTicker::stop`] returns the callback will not run
//! again.

use super::PipelineError;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug)]
pub struct ReportTicker {
    name: String,
    period: Duration,
    cancel: Option<CancellationToken>,
    task_handle: Option<JoinHandle<u64>>,
}

impl ReportTicker {
    pub fn new(name: impl Into<String>, period: Duration) -> Self {
        Self {
            name: name.into(),
            period,
            cancel: None,
            task_handle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Takes effect on the next start
    pub fn set_period(&mut self, period: Duration) {
        self.period = period;
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Spawns the timer task; returns `false` if it was already running
    pub fn start<F>(&mut self, mut on_tick: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        if self.is_running() {
            debug!("Ticker already running: {}", self.name);
            return false;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = self.period;
        let name = self.name.clone();

        let task_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = 0u64;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("Ticker cancelled: {} after {} ticks", name, ticks);
                        break;
                    }
                    _ = interval.tick() => {
                        on_tick();
                        ticks += 1;
                    }
                }
            }
            ticks
        });

        info!("Ticker started: {} every {:?}", self.name, self.period);
        self.cancel = Some(cancel);
        self.task_handle = Some(task_handle);
        true
    }

    /// Cancels the timer and waits for the task to finish
    pub async fn stop(&mut self) -> Result<(), PipelineError> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }

        let Some(handle) = self.task_handle.take() else {
            debug!("Ticker already stopped: {}", self.name);
            return Ok(());
        };

        match handle.await {
            Ok(ticks) => {
                info!("Ticker stopped: {} ({} ticks)", self.name, ticks);
                Ok(())
            }
            Err(e) if e.is_cancelled() => {
                warn!("Ticker task aborted: {}", self.name);
                Ok(())
            }
            Err(e) => {
                error!("Ticker task panicked: {} - {}", self.name, e);
                Err(PipelineError::TaskError(format!(
                    "Ticker {} panicked: {}",
                    self.name, e
                )))
            }
        }
    }
}

impl Drop for ReportTicker {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ticks_at_period_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let mut ticker = ReportTicker::new("test", Duration::from_millis(10));

        assert!(ticker.start(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(ticker.is_running());

        // first tick is immediate, then one every 10 ms
        tokio::time::sleep(Duration::from_millis(95)).await;
        assert_eq!(count.load(Ordering::SeqCst), 10);

        ticker.stop().await.unwrap();
        assert!(!ticker.is_running());
        let stopped_at = count.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), stopped_at);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_ignored() {
        let count = Arc::new(AtomicUsize::new(0));
        let first = count.clone();
        let second = count.clone();
        let mut ticker = ReportTicker::new("test", Duration::from_millis(10));

        assert!(ticker.start(move || {
            first.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!ticker.start(move || {
            second.fetch_add(100, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_millis(25)).await;
        ticker.stop().await.unwrap();
        assert!(count.load(Ordering::SeqCst) < 100);
    }

    #[tokio::test]
    async fn stop_without_start_is_ok() {
        let mut ticker = ReportTicker::new("idle", Duration::from_millis(10));
        assert!(ticker.stop().await.is_ok());
    }
}
