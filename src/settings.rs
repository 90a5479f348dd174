use std::{collections::HashMap, fs, io, path::Path, time::Duration};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::error::SequenceFileError;
use crate::geometry::Rgb;

pub const KEY_ENABLE_VALIDATION: &str = "EnableClickValidation";
pub const KEY_VALIDATION_AREA_SIZE: &str = "ValidationAreaSize";
pub const KEY_MARKER_MIN_RED: &str = "MarkerMinRed";
pub const KEY_MARKER_MIN_GREEN: &str = "MarkerMinGreen";
pub const KEY_MARKER_MAX_BLUE: &str = "MarkerMaxBlue";
pub const KEY_COUNTDOWN_INTERVAL_MS: &str = "CountdownIntervalMs";

/// Flat key-value settings store. Reads never fail; unparsable values yield the default.
pub trait Settings: Send + Sync {
    fn get_string(&self, key: &str, default: &str) -> String;

    /// Accepts `true`/`false` in any letter case.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get_string(key, "").trim() {
            v if v.eq_ignore_ascii_case("true") => true,
            v if v.eq_ignore_ascii_case("false") => false,
            _ => default,
        }
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get_string(key, "").trim().parse().unwrap_or(default)
    }
}

#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self { Self::default() }

    pub fn with(self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&self, key: &str, value: impl ToString) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    /// Loads a flat JSON object. A missing file is treated as empty settings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SequenceFileError> {
        let text = match fs::read_to_string(path.as_ref()) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("settings file {} not found, using defaults", path.as_ref().display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let map: HashMap<String, Value> = serde_json::from_str(&text)?;
        let values = map
            .into_iter()
            .map(|(k, v)| {
                let s = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, s)
            })
            .collect();
        Ok(Self { values: Mutex::new(values) })
    }
}

impl Settings for MemorySettings {
    fn get_string(&self, key: &str, default: &str) -> String {
        self.values.lock().get(key).cloned().unwrap_or_else(|| default.to_string())
    }
}

/// Colour heuristic for the "click failed" marker drawn near the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerPolicy {
    pub min_red: u8,
    pub min_green: u8,
    pub max_blue: u8,
}

impl Default for MarkerPolicy {
    fn default() -> Self { Self { min_red: 200, min_green: 200, max_blue: 100 } }
}

impl MarkerPolicy {
    pub fn matches(&self, c: Rgb) -> bool {
        c.r > self.min_red && c.g > self.min_green && c.b < self.max_blue
    }
}

/// Engine tunables resolved once per run from a [`Settings`] store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub validation_enabled: bool,
    pub validation_area_size: i32,
    pub marker: MarkerPolicy,
    pub countdown_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validation_enabled: false,
            validation_area_size: 50,
            marker: MarkerPolicy::default(),
            countdown_interval: Duration::from_millis(50),
        }
    }
}

fn channel(settings: &dyn Settings, key: &str, default: u8) -> u8 {
    settings.get_int(key, default as i64).clamp(0, 255) as u8
}

impl EngineConfig {
    pub fn from_settings(settings: &dyn Settings) -> Self {
        let defaults = Self::default();
        Self {
            validation_enabled: settings.get_bool(KEY_ENABLE_VALIDATION, defaults.validation_enabled),
            validation_area_size: settings
                .get_int(KEY_VALIDATION_AREA_SIZE, defaults.validation_area_size as i64)
                .clamp(1, 4096) as i32,
            marker: MarkerPolicy {
                min_red: channel(settings, KEY_MARKER_MIN_RED, defaults.marker.min_red),
                min_green: channel(settings, KEY_MARKER_MIN_GREEN, defaults.marker.min_green),
                max_blue: channel(settings, KEY_MARKER_MAX_BLUE, defaults.marker.max_blue),
            },
            countdown_interval: Duration::from_millis(
                settings.get_int(KEY_COUNTDOWN_INTERVAL_MS, 50).clamp(10, 10_000) as u64,
            ),
        }
    }
}
