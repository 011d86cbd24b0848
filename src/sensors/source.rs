//! Upstream sample sources
//!
//! Orientation fusion and the raw gyroscope live outside this crate; the
//! pipelines only see them through these two traits. A source pushes samples
//! into the tokio channel it is given on `start` until `stop` is called.

use super::vector::Vector3;
use std::time::Duration;
use tokio::sync::mpsc;

/// A unit rotation, `q0 = w`, `q1 = x`, `q2 = y`, `q3 = z`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Builds a quaternion from the `[x, y, z, w]` layout fusion libraries emit
    pub fn from_xyzw(v: [f64; 4]) -> Self {
        Self::new(v[3], v[0], v[1], v[2])
    }

    /// Rotation by `yaw` around z followed by `pitch` around x
    ///
    /// For |pitch| < π/2 this is the exact inverse of the yaw/pitch extraction
    /// done by the orientation processor in held-in-hand mode.
    pub fn from_yaw_pitch(yaw: f64, pitch: f64) -> Self {
        let (sz, cz) = (yaw / 2.0).sin_cos();
        let (sx, cx) = (pitch / 2.0).sin_cos();
        Self::new(cz * cx, cz * sx, sz * sx, sz * cx)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Sensor unavailable: {0}")]
    Unavailable(String),

    #[error("Source is already running")]
    AlreadyRunning,
}

/// Opaque orientation fusion, started with the gyroscope bias to subtract
pub trait OrientationSource: Send {
    fn start(
        &mut self,
        period: Duration,
        bias: Vector3,
        sender: mpsc::Sender<Quaternion>,
    ) -> Result<(), SourceError>;

    fn stop(&mut self);
}

/// Raw 3-axis rotation rate, used only during calibration
pub trait RateSource: Send {
    fn start(&mut self, sender: mpsc::Sender<Vector3>) -> Result<(), SourceError>;

    fn stop(&mut self);
}
