//! Simulated sensors for running the pipelines without hardware

use super::source::{OrientationSource, Quaternion, RateSource, SourceError};
use super::vector::Vector3;
use crate::config::SamplingRate;
use std::f64::consts::TAU;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Gyroscope reporting a constant bias plus a small deterministic jitter
#[derive(Debug)]
pub struct SimulatedRateSource {
    bias: Vector3,
    jitter: f64,
    period: Duration,
    available: bool,
    cancel: Option<CancellationToken>,
}

impl SimulatedRateSource {
    pub fn new(bias: Vector3, jitter: f64) -> Self {
        Self {
            bias,
            jitter,
            period: SamplingRate::High.period(),
            available: true,
            cancel: None,
        }
    }

    /// A device without a gyroscope
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Vector3::ZERO, 0.0)
        }
    }
}

impl RateSource for SimulatedRateSource {
    fn start(&mut self, sender: mpsc::Sender<Vector3>) -> Result<(), SourceError> {
        if !self.available {
            return Err(SourceError::Unavailable("no gyroscope present".into()));
        }
        if self.cancel.is_some() {
            return Err(SourceError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());
        let (bias, jitter, period) = (self.bias, self.jitter, self.period);

        info!("Starting simulated rotation-rate source at {:?}", period);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut i = 0u64;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let t = i as f64;
                        let mut sample = bias;
                        sample.add(Vector3::new(
                            jitter * (t * 1.7).sin(),
                            jitter * (t * 2.3).cos(),
                            jitter * (t * 0.9).sin(),
                        ));
                        if sender.send(sample).await.is_err() {
                            break;
                        }
                        i += 1;
                    }
                }
            }
            debug!("Simulated rotation-rate source stopped");
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

/// Orientation tracing a circle of `radius` radians once per `revolution`
#[derive(Debug)]
pub struct SimulatedOrientationSource {
    radius: f64,
    revolution: Duration,
    cancel: Option<CancellationToken>,
}

impl SimulatedOrientationSource {
    pub fn circle(radius: f64, revolution: Duration) -> Self {
        Self {
            radius,
            revolution,
            cancel: None,
        }
    }
}

impl OrientationSource for SimulatedOrientationSource {
    fn start(
        &mut self,
        period: Duration,
        bias: Vector3,
        sender: mpsc::Sender<Quaternion>,
    ) -> Result<(), SourceError> {
        if self.cancel.is_some() {
            return Err(SourceError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());
        let radius = self.radius;
        let step = period.as_secs_f64() / self.revolution.as_secs_f64().max(f64::EPSILON);

        info!(
            "Starting simulated orientation source at {:?} with bias {}",
            period, bias
        );
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut phase = 0.0f64;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let angle = phase * TAU;
                        let q = Quaternion::from_yaw_pitch(
                            radius * angle.cos(),
                            radius * angle.sin(),
                        );
                        if sender.send(q).await.is_err() {
                            break;
                        }
                        phase = (phase + step).fract();
                    }
                }
            }
            debug!("Simulated orientation source stopped");
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}
