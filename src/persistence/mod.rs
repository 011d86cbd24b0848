//! # Persistence Module
//!
//! Stores the two pieces of state that survive restarts: the user [`Settings`]
//! and the gyroscope [`CalibrationRecord`]. The core only needs read-on-start
//! and write-on-completion/reset, so storage sits behind the [`ProfileStore`]
//! trait; [`store::TomlFileStore`] keeps TOML files in the user's config
//! directory and [`store::MemoryStore`] keeps everything in memory.
//!
//! Missing or corrupted files degrade to defaults instead of failing, so a
//! damaged calibration file means "zero bias", never "no mouse".

pub mod store;

use crate::config::Settings;
use crate::sensors::vector::Vector3;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use store::{MemoryStore, TomlFileStore};

/// Errors raised while reading or writing persisted state
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {0}: {1}")]
    Serialize(&'static str, toml::ser::Error),

    #[error("Could not determine a configuration directory")]
    NoConfigDir,
}

/// Calibration statistics as stored on disk
///
/// Vectors are kept in their decimal text form (`"x,y,z"`) so the file stays
/// readable and a hand-edited value that no longer parses only zeroes that
/// vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationRecord {
    pub mean: String,
    pub median: String,
    pub sigma: String,
    pub delta: String,
    pub complete: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for CalibrationRecord {
    fn default() -> Self {
        let zero = Vector3::ZERO.to_string();
        Self {
            mean: zero.clone(),
            median: zero.clone(),
            sigma: zero.clone(),
            delta: zero,
            complete: false,
            completed_at: None,
        }
    }
}

impl CalibrationRecord {
    pub fn mean(&self) -> Vector3 {
        Vector3::parse_or_zero(&self.mean)
    }

    pub fn median(&self) -> Vector3 {
        Vector3::parse_or_zero(&self.median)
    }

    pub fn sigma(&self) -> Vector3 {
        Vector3::parse_or_zero(&self.sigma)
    }

    pub fn delta(&self) -> Vector3 {
        Vector3::parse_or_zero(&self.delta)
    }
}

/// Key-value style storage for settings and calibration
pub trait ProfileStore: Send + Sync {
    fn load_settings(&self) -> Result<Settings, PersistenceError>;

    fn save_settings(&self, settings: &Settings) -> Result<(), PersistenceError>;

    fn load_calibration(&self) -> Result<CalibrationRecord, PersistenceError>;

    fn save_calibration(&self, record: &CalibrationRecord) -> Result<(), PersistenceError>;
}
