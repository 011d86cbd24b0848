use super::{CalibrationRecord, PersistenceError, ProfileStore};
use crate::config::Settings;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

const APP_DIR: &str = "wristpoint";
const SETTINGS_FILE: &str = "settings.toml";
const CALIBRATION_FILE: &str = "calibration.toml";

/// Stores settings and calibration as TOML files in one directory
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    base_path: PathBuf,
}

impl TomlFileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Uses `<config dir>/wristpoint`, e.g. `~/.config/wristpoint` on Linux
    pub fn in_config_dir() -> Result<Self, PersistenceError> {
        let mut base_path = dirs::config_dir().ok_or(PersistenceError::NoConfigDir)?;
        base_path.push(APP_DIR);
        Ok(Self::new(base_path))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn read_or_default<T: DeserializeOwned + Default>(
        &self,
        file: &str,
        what: &'static str,
    ) -> Result<T, PersistenceError> {
        let path = self.base_path.join(file);
        if !path.exists() {
            debug!("{} file {:?} does not exist, using default", what, path);
            return Ok(T::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })?;

        match toml::from_str(&content) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Corrupted {} file {:?}, using default: {}", what, path, e);
                Ok(T::default())
            }
        }
    }

    fn write<T: Serialize>(
        &self,
        file: &str,
        what: &'static str,
        value: &T,
    ) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.base_path).map_err(|source| PersistenceError::Io {
            path: self.base_path.clone(),
            source,
        })?;

        let content =
            toml::to_string_pretty(value).map_err(|e| PersistenceError::Serialize(what, e))?;

        let path = self.base_path.join(file);
        std::fs::write(&path, content).map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })?;

        info!("Saved {} to {:?}", what, path);
        Ok(())
    }
}

impl ProfileStore for TomlFileStore {
    fn load_settings(&self) -> Result<Settings, PersistenceError> {
        self.read_or_default(SETTINGS_FILE, "settings")
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), PersistenceError> {
        self.write(SETTINGS_FILE, "settings", settings)
    }

    fn load_calibration(&self) -> Result<CalibrationRecord, PersistenceError> {
        self.read_or_default(CALIBRATION_FILE, "calibration")
    }

    fn save_calibration(&self, record: &CalibrationRecord) -> Result<(), PersistenceError> {
        self.write(CALIBRATION_FILE, "calibration", record)
    }
}

/// In-memory store, for tests and for hosts that persist elsewhere
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Mutex<Settings>,
    calibration: Mutex<CalibrationRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
            calibration: Mutex::new(CalibrationRecord::default()),
        }
    }
}

impl ProfileStore for MemoryStore {
    fn load_settings(&self) -> Result<Settings, PersistenceError> {
        Ok(self
            .settings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), PersistenceError> {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner()) = settings.clone();
        Ok(())
    }

    fn load_calibration(&self) -> Result<CalibrationRecord, PersistenceError> {
        Ok(self
            .calibration
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn save_calibration(&self, record: &CalibrationRecord) -> Result<(), PersistenceError> {
        *self.calibration.lock().unwrap_or_else(|e| e.into_inner()) = record.clone();
        Ok(())
    }
}
