//! User settings and tuning constants for the input pipelines

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the watch is worn: left wrist, held in the hand, or right wrist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HandMode {
    #[default]
    Left,
    Center,
    Right,
}

/// Output/sample period of the pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SamplingRate {
    /// 11.25 ms (~88.9 Hz)
    #[default]
    High,
    /// 20 ms (50 Hz)
    Low,
}

impl SamplingRate {
    pub fn from_reduced_rate(reduced_rate: bool) -> Self {
        if reduced_rate {
            SamplingRate::Low
        } else {
            SamplingRate::High
        }
    }

    pub fn period(self) -> Duration {
        match self {
            SamplingRate::High => Duration::from_micros(11_250),
            SamplingRate::Low => Duration::from_micros(20_000),
        }
    }
}

/// Boolean preferences that can be read or written individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Cursor8Way,
    ReducedRate,
    Stabilize,
    StayConnected,
}

/// Persisted user settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hand_mode: HandMode,
    pub cursor_8_way: bool,
    pub reduced_rate: bool,
    pub stabilize: bool,
    pub stay_connected: bool,
}

impl Settings {
    pub fn get(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::Cursor8Way => self.cursor_8_way,
            SettingKey::ReducedRate => self.reduced_rate,
            SettingKey::Stabilize => self.stabilize,
            SettingKey::StayConnected => self.stay_connected,
        }
    }

    pub fn set(&mut self, key: SettingKey, enabled: bool) {
        match key {
            SettingKey::Cursor8Way => self.cursor_8_way = enabled,
            SettingKey::ReducedRate => self.reduced_rate = enabled,
            SettingKey::Stabilize => self.stabilize = enabled,
            SettingKey::StayConnected => self.stay_connected = enabled,
        }
    }

    pub fn sampling_rate(&self) -> SamplingRate {
        SamplingRate::from_reduced_rate(self.reduced_rate)
    }
}

/// Timeouts and distances used by the tap detector
///
/// Defaults follow the usual touch-screen conventions: a tap must finish within
/// 100 ms to count as "quick", a second tap must start within 300 ms, and a
/// press held for 500 ms past the tap timeout becomes a long press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureTiming {
    pub tap_timeout: Duration,
    pub double_tap_timeout: Duration,
    /// Second taps landing sooner than this after the first lift are not double taps
    pub double_tap_min_time: Duration,
    pub long_press_timeout: Duration,
    /// Movement tolerance in pixels before a touch stops being a tap
    pub touch_slop: f32,
    /// Maximum distance in pixels between the two downs of a double tap
    pub double_tap_slop: f32,
}

impl Default for GestureTiming {
    fn default() -> Self {
        Self {
            tap_timeout: Duration::from_millis(100),
            double_tap_timeout: Duration::from_millis(300),
            double_tap_min_time: Duration::from_millis(40),
            long_press_timeout: Duration::from_millis(500),
            touch_slop: 16.0,
            double_tap_slop: 100.0,
        }
    }
}

impl GestureTiming {
    pub fn slop_square(&self) -> f32 {
        self.touch_slop * self.touch_slop
    }

    pub fn double_tap_slop_square(&self) -> f32 {
        self.double_tap_slop * self.double_tap_slop
    }
}
