//! Gyroscope calibration
//!
//! [`CalibrationCollector`] accumulates raw rotation-rate samples and keeps
//! streaming statistics. At each breakpoint of the sample-count table it
//! refreshes mean, median, standard deviation and the 95% confidence
//! half-width (Student's t). Calibration is complete once the last breakpoint
//! (200 samples) is reached. The collector itself does no I/O; [`CalibrationRun`]
//! saves its record on the blocking pool when a run starts and when it completes.
//!
//! [`CalibrationRun`] drives one calibration session against a [`RateSource`]:
//!
//! ```text
//! Acquiring ──► Collecting ──► Finished
//!     │                           ▲
//!     └───── (source failure) ────┘  reported once as `false`
//! ```

use super::source::{RateSource, SourceError};
use super::vector::Vector3;
use crate::persistence::{CalibrationRecord, PersistenceError, ProfileStore};
use chrono::{DateTime, Utc};
use statum::{machine, state};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Two-sided 95% Student's t critical values, one per breakpoint
const T_CRITICAL: [f64; 37] = [
    12.71, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179, 2.160,
    2.145, 2.131, 2.120, 2.110, 2.101, 2.093, 2.086, 2.080, 2.074, 2.069, 2.064, 2.060, 2.056,
    2.052, 2.048, 2.045, 2.042, 2.021, 2.009, 2.000, 1.990, 1.984, 1.980, 1.960,
];

/// Sample counts at which statistics are refreshed
const BREAKPOINTS: [usize; 37] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 40, 50, 60, 80, 100, 120, 200,
];

/// Samples needed before calibration counts as complete
pub const REQUIRED_SAMPLES: usize = BREAKPOINTS[BREAKPOINTS.len() - 1];

pub struct CalibrationCollector {
    store: Arc<dyn ProfileStore>,
    count: usize,
    complete: bool,
    completed_at: Option<DateTime<Utc>>,
    sum: Vector3,
    sum_sq: Vector3,
    history: [Vec<f64>; 3],
    mean: Vector3,
    median: Vector3,
    sigma: Vector3,
    delta: Vector3,
}

impl std::fmt::Debug for CalibrationCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationCollector")
            .field("count", &self.count)
            .field("complete", &self.complete)
            .field("completed_at", &self.completed_at)
            .field("mean", &self.mean)
            .field("median", &self.median)
            .field("sigma", &self.sigma)
            .field("delta", &self.delta)
            .finish()
    }
}

impl CalibrationCollector {
    /// Creates a collector seeded with whatever calibration the store holds
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        let record = match store.load_calibration() {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to load calibration, using zero bias: {}", e);
                CalibrationRecord::default()
            }
        };
        debug!("Loaded calibration record: {:?}", record);

        Self {
            store,
            count: 0,
            complete: record.complete,
            completed_at: record.completed_at,
            sum: Vector3::ZERO,
            sum_sq: Vector3::ZERO,
            history: Default::default(),
            mean: record.mean(),
            median: record.median(),
            sigma: record.sigma(),
            delta: record.delta(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// When the stored calibration finished, if it ever did
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn median(&self) -> Vector3 {
        self.median
    }

    pub fn mean(&self) -> Vector3 {
        self.mean
    }

    pub fn sigma(&self) -> Vector3 {
        self.sigma
    }

    pub fn delta(&self) -> Vector3 {
        self.delta
    }

    /// Lower and upper bound of the confidence interval around the mean
    pub fn confidence_interval(&self) -> (Vector3, Vector3) {
        let mut low = self.mean;
        low.subtract(self.delta);
        let mut high = self.mean;
        high.add(self.delta);
        (low, high)
    }

    pub fn record(&self) -> CalibrationRecord {
        CalibrationRecord {
            mean: self.mean.to_string(),
            median: self.median.to_string(),
            sigma: self.sigma.to_string(),
            delta: self.delta.to_string(),
            complete: self.complete,
            completed_at: self.completed_at,
        }
    }

    /// Discards all collected data, including the completion flag
    pub fn reset(&mut self) {
        self.complete = false;
        self.completed_at = None;
        self.count = 0;
        self.sum.reset();
        self.sum_sq.reset();
        self.mean.reset();
        self.median.reset();
        self.sigma.reset();
        self.delta.reset();
        self.history = Default::default();
        info!("Calibration data reset");
    }

    /// Adds one rotation-rate sample, returns `true` once calibration is complete
    pub fn add(&mut self, sample: Vector3) -> bool {
        if self.complete {
            return true;
        }

        self.history[0].push(sample.x);
        self.history[1].push(sample.y);
        self.history[2].push(sample.z);
        self.sum.add(sample);
        self.sum_sq.add(sample.squared());
        self.count += 1;

        if let Ok(idx) = BREAKPOINTS.binary_search(&self.count) {
            self.refresh_statistics(T_CRITICAL[idx]);

            if self.count >= REQUIRED_SAMPLES {
                self.complete = true;
                self.completed_at = Some(Utc::now());
                info!(
                    "Calibration complete after {} samples: median={} delta={}",
                    self.count, self.median, self.delta
                );
            }
        }

        self.complete
    }

    fn refresh_statistics(&mut self, t: f64) {
        let n = self.count as f64;

        self.median = Vector3::new(
            median_of(&self.history[0]),
            median_of(&self.history[1]),
            median_of(&self.history[2]),
        );

        self.mean.set(self.sum).divide(n);

        let mut variance = self.sum_sq;
        variance
            .divide(n)
            .subtract(self.mean.squared())
            .clamp_non_negative();

        let mut sample_variance = variance;
        if self.count > 1 {
            sample_variance.scale(n).divide(n - 1.0);
        } else {
            sample_variance.reset();
        }

        self.sigma.set(variance).sqrt();
        self.delta.set(sample_variance).sqrt().scale(t).divide(n.sqrt());

        let (low, high) = self.confidence_interval();
        debug!(
            "Calibration at {} samples: mean={} median={} sigma={} interval=[{} .. {}]",
            self.count, self.mean, self.median, self.sigma, low, high
        );
    }

    /// Writes the current record to the store on the blocking pool
    pub async fn save(&self) -> Result<(), CalibrationError> {
        let store = self.store.clone();
        let record = self.record();
        tokio::task::spawn_blocking(move || store.save_calibration(&record))
            .await
            .map_err(|e| {
                CalibrationError::TaskError(format!("Calibration save panicked: {}", e))
            })??;
        Ok(())
    }
}

fn median_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Receives the single result of a calibration run
pub trait CalibrationListener: Send + Sync {
    fn on_calibration_complete(&self, success: bool);
}

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    #[error("Persistence error: {0}")]
    PersistenceError(#[from] PersistenceError),

    #[error("Calibration task failed: {0}")]
    TaskError(String),
}

/// How a run left the collecting phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationOutcome {
    Complete,
    Cancelled,
    SourceClosed,
}

#[state]
#[derive(Debug, Clone)]
pub enum CalibrationPhase {
    Acquiring,
    Collecting,
    Finished,
}

#[machine]
pub struct CalibrationRun<S: CalibrationPhase> {
    collector: CalibrationCollector,
    source: Box<dyn RateSource>,
    listener: Arc<dyn CalibrationListener>,
    cancel: CancellationToken,
}

impl<S: CalibrationPhase> CalibrationRun<S> {
    pub fn collector(&self) -> &CalibrationCollector {
        &self.collector
    }
}

async fn persist(collector: &CalibrationCollector) {
    if let Err(e) = collector.save().await {
        warn!("Failed to persist calibration: {}", e);
    }
}

impl CalibrationRun<Acquiring> {
    pub fn create(
        collector: CalibrationCollector,
        source: Box<dyn RateSource>,
        listener: Arc<dyn CalibrationListener>,
        cancel: CancellationToken,
    ) -> Self {
        Self::new(collector, source, listener, cancel)
    }

    /// Starts the rate source and clears the stored calibration; a source
    /// failure is reported to the listener once
    pub async fn acquire(
        mut self,
    ) -> Result<(CalibrationRun<Collecting>, mpsc::Receiver<Vector3>), CalibrationError> {
        let (sender, receiver) = mpsc::channel(256);

        if let Err(e) = self.source.start(sender) {
            error!("Failed to acquire rotation-rate sensor: {}", e);
            self.listener.on_calibration_complete(false);
            return Err(e.into());
        }

        self.collector.reset();
        persist(&self.collector).await;
        info!("Rotation-rate sensor acquired, collecting calibration samples");
        Ok((self.transition(), receiver))
    }
}

impl CalibrationRun<Collecting> {
    /// Feeds samples to the collector until it completes, the source closes or
    /// the run is cancelled
    pub async fn collect(
        mut self,
        mut receiver: mpsc::Receiver<Vector3>,
    ) -> (CalibrationRun<Finished>, CalibrationOutcome) {
        let outcome = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Calibration cancelled after {} samples", self.collector.count());
                    break CalibrationOutcome::Cancelled;
                }

                sample = receiver.recv() => match sample {
                    Some(sample) => {
                        if self.collector.add(sample) {
                            break CalibrationOutcome::Complete;
                        }
                    }
                    None => {
                        warn!("Rotation-rate source closed before calibration completed");
                        break CalibrationOutcome::SourceClosed;
                    }
                }
            }
        };

        self.source.stop();
        match outcome {
            CalibrationOutcome::Complete => {
                persist(&self.collector).await;
                self.listener.on_calibration_complete(true);
            }
            CalibrationOutcome::SourceClosed => self.listener.on_calibration_complete(false),
            CalibrationOutcome::Cancelled => {}
        }

        (self.transition(), outcome)
    }
}

impl CalibrationRun<Finished> {
    pub fn into_collector(self) -> CalibrationCollector {
        self.collector
    }
}

/// Runs a calibration session in a tokio task
pub struct CalibrationHandle {
    cancel: CancellationToken,
    task_handle: JoinHandle<Result<(CalibrationOutcome, CalibrationCollector), CalibrationError>>,
}

impl CalibrationHandle {
    pub fn spawn(
        collector: CalibrationCollector,
        source: Box<dyn RateSource>,
        listener: Arc<dyn CalibrationListener>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let run = CalibrationRun::create(collector, source, listener, cancel.clone());

        info!("Spawning calibration task");
        let task_handle = tokio::spawn(async move {
            let (collecting, receiver) = run.acquire().await?;
            let (finished, outcome) = collecting.collect(receiver).await;
            debug!("Calibration task finished: {:?}", outcome);
            Ok((outcome, finished.into_collector()))
        });

        Self {
            cancel,
            task_handle,
        }
    }

    /// Stops the run without reporting a result
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the run to end and hands back the collector
    pub async fn join(
        self,
    ) -> Result<(CalibrationOutcome, CalibrationCollector), CalibrationError> {
        match self.task_handle.await {
            Ok(result) => result,
            Err(e) => {
                error!("Calibration task panicked: {}", e);
                Err(CalibrationError::TaskError(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::sensors::simulated::SimulatedRateSource;
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    fn collector() -> (Arc<MemoryStore>, CalibrationCollector) {
        let store = Arc::new(MemoryStore::new());
        let collector = CalibrationCollector::new(store.clone());
        (store, collector)
    }

    #[derive(Default)]
    struct RecordingListener {
        results: Mutex<Vec<bool>>,
    }

    impl CalibrationListener for RecordingListener {
        fn on_calibration_complete(&self, success: bool) {
            self.results.lock().unwrap().push(success);
        }
    }

    #[test]
    fn identical_samples_complete_with_zero_spread() {
        let (store, mut collector) = collector();
        let sample = Vector3::new(1.0, 2.0, 3.0);

        let done: Vec<bool> = (0..REQUIRED_SAMPLES).map(|_| collector.add(sample)).collect();

        assert!(done[..REQUIRED_SAMPLES - 1].iter().all(|d| !d));
        assert!(done[REQUIRED_SAMPLES - 1]);
        assert!(collector.is_complete());
        assert_eq!(collector.mean(), sample);
        assert_eq!(collector.median(), sample);
        assert_eq!(collector.sigma(), Vector3::ZERO);
        assert_eq!(collector.delta(), Vector3::ZERO);

        let record = collector.record();
        assert!(record.complete);
        assert!(record.completed_at.is_some());
        assert_eq!(record.mean(), sample);
        // nothing is written until a run saves it
        assert!(!store.load_calibration().unwrap().complete);
    }

    #[test]
    fn fewer_than_required_samples_never_complete() {
        let (store, mut collector) = collector();
        for i in 0..REQUIRED_SAMPLES - 1 {
            let v = i as f64 * 0.37 - 20.0;
            assert!(!collector.add(Vector3::new(v, -v, v * v)));
        }
        assert!(!collector.is_complete());
        assert!(!collector.record().complete);
    }

    #[test]
    fn add_after_completion_is_ignored() {
        let (_, mut collector) = collector();
        for _ in 0..REQUIRED_SAMPLES {
            collector.add(Vector3::new(0.5, 0.5, 0.5));
        }
        assert!(collector.add(Vector3::new(100.0, 100.0, 100.0)));
        assert_eq!(collector.count(), REQUIRED_SAMPLES);
        assert_eq!(collector.mean(), Vector3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn statistics_refresh_at_breakpoints() {
        let (_, mut collector) = collector();
        collector.add(Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(collector.mean(), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(collector.delta(), Vector3::ZERO);

        collector.add(Vector3::new(3.0, 5.0, 1.0));
        // n = 2: mean (2, 3, 1), population sigma (1, 2, 0)
        assert_eq!(collector.mean(), Vector3::new(2.0, 3.0, 1.0));
        assert_eq!(collector.median(), Vector3::new(2.0, 3.0, 1.0));
        assert_relative_eq!(collector.sigma().x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(collector.sigma().y, 2.0, epsilon = 1e-12);
        // sample sigma sqrt(2), delta = sqrt(2) * 4.303 / sqrt(2)
        assert_relative_eq!(collector.delta().x, 4.303, epsilon = 1e-9);

        collector.add(Vector3::new(8.0, 0.0, 1.0));
        assert_eq!(collector.median(), Vector3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn median_of_even_and_odd_counts() {
        assert_eq!(median_of(&[]), 0.0);
        assert_eq!(median_of(&[5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median_of(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn reset_clears_statistics_and_completion_flag() {
        let (_, mut collector) = collector();
        for _ in 0..REQUIRED_SAMPLES {
            collector.add(Vector3::new(1.0, 2.0, 3.0));
        }
        assert!(collector.record().complete);

        collector.reset();

        assert!(!collector.is_complete());
        assert_eq!(collector.count(), 0);
        assert_eq!(collector.median(), Vector3::ZERO);
        assert_eq!(collector.record(), CalibrationRecord::default());
    }

    #[test]
    fn new_collector_restores_persisted_median() {
        let store = Arc::new(MemoryStore::new());
        store
            .save_calibration(&CalibrationRecord {
                median: "0.10000000,0.20000000,0.30000000".into(),
                complete: true,
                ..CalibrationRecord::default()
            })
            .unwrap();
        let collector = CalibrationCollector::new(store);
        assert!(collector.is_complete());
        assert_eq!(collector.median(), Vector3::new(0.1, 0.2, 0.3));
    }

    #[tokio::test]
    async fn save_writes_record_to_store() {
        let (store, mut collector) = collector();
        for _ in 0..REQUIRED_SAMPLES {
            collector.add(Vector3::new(0.1, 0.2, 0.3));
        }
        collector.save().await.unwrap();
        assert_eq!(store.load_calibration().unwrap(), collector.record());
    }

    #[tokio::test(start_paused = true)]
    async fn run_reports_success_once() {
        let (store, collector) = collector();
        let listener = Arc::new(RecordingListener::default());
        let source = SimulatedRateSource::new(Vector3::new(0.01, -0.02, 0.005), 0.001);

        let handle = CalibrationHandle::spawn(collector, Box::new(source), listener.clone());
        let (outcome, collector) = handle.join().await.unwrap();

        assert_eq!(outcome, CalibrationOutcome::Complete);
        assert!(collector.is_complete());
        assert_relative_eq!(collector.median().x, 0.01, epsilon = 0.002);
        assert_eq!(*listener.results.lock().unwrap(), vec![true]);

        let stored = store.load_calibration().unwrap();
        assert!(stored.complete);
        assert!(stored.completed_at.is_some());
        assert_eq!(stored, collector.record());
    }

    #[tokio::test]
    async fn missing_sensor_reports_failure_once() {
        let (_, collector) = collector();
        let listener = Arc::new(RecordingListener::default());

        let handle = CalibrationHandle::spawn(
            collector,
            Box::new(SimulatedRateSource::unavailable()),
            listener.clone(),
        );

        assert!(matches!(
            handle.join().await,
            Err(CalibrationError::SourceError(SourceError::Unavailable(_)))
        ));
        assert_eq!(*listener.results.lock().unwrap(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_run_reports_nothing() {
        let (_, collector) = collector();
        let listener = Arc::new(RecordingListener::default());
        let source = SimulatedRateSource::new(Vector3::ZERO, 0.0);

        let handle = CalibrationHandle::spawn(collector, Box::new(source), listener.clone());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.cancel();
        let (outcome, collector) = handle.join().await.unwrap();

        assert_eq!(outcome, CalibrationOutcome::Cancelled);
        assert!(!collector.is_complete());
        assert!(listener.results.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn acquired_run_clears_stored_calibration() {
        let store = Arc::new(MemoryStore::new());
        store
            .save_calibration(&CalibrationRecord {
                median: "0.10000000,0.20000000,0.30000000".into(),
                complete: true,
                ..CalibrationRecord::default()
            })
            .unwrap();
        let collector = CalibrationCollector::new(store.clone());
        let source = SimulatedRateSource::new(Vector3::ZERO, 0.0);

        let handle = CalibrationHandle::spawn(
            collector,
            Box::new(source),
            Arc::new(RecordingListener::default()),
        );
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.cancel();
        handle.join().await.unwrap();

        assert_eq!(store.load_calibration().unwrap(), CalibrationRecord::default());
    }
}
