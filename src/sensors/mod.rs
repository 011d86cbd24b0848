//! # Sensors Module
//!
//! Sample sources and gyroscope calibration.
//!
//! - [`source`]: the orientation and rotation-rate source traits
//! - [`calibration`]: streaming bias statistics and the calibration run
//! - [`simulated`]: hardware-free sources
//! - [`vector`]: the 3-axis vector used by the statistics

pub mod calibration;
pub mod simulated;
pub mod source;
pub mod vector;

pub use calibration::{
    CalibrationCollector, CalibrationError, CalibrationHandle, CalibrationListener,
    CalibrationOutcome,
};
pub use source::{OrientationSource, Quaternion, RateSource, SourceError};
pub use vector::Vector3;
