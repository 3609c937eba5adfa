use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_WIDTH: u32 = 600;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const DEFAULT_TARGET_FPS: u32 = 24;
pub const DEFAULT_RESET_INTERVAL_SECONDS: u32 = 5;
const DEFAULT_METRICS_LOG_INTERVAL_MS: u64 = 1000;

/// Engine construction parameters. Frozen once the engine starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    pub show_fps: bool,
    pub reset_interval_seconds: u32,
    pub metrics_log_interval_ms: u64,
    pub window_title: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            target_fps: DEFAULT_TARGET_FPS,
            show_fps: false,
            reset_interval_seconds: DEFAULT_RESET_INTERVAL_SECONDS,
            metrics_log_interval_ms: DEFAULT_METRICS_LOG_INTERVAL_MS,
            window_title: "Canvas Engine".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),
}

impl EngineConfig {
    /// Milliseconds between dispatched ticks.
    pub fn target_interval_ms(&self) -> f64 {
        1000.0 / self.target_fps.max(1) as f64
    }

    pub fn metrics_log_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_log_interval_ms.max(1))
    }

    /// Lenient loader: any missing, unknown, non-positive or ill-typed field
    /// keeps its default. Only malformed JSON is an error.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(raw).map_err(ConfigError::Syntax)?;
        Ok(Self::from_value(&value))
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(fields) = value.as_object() else {
            warn!("config root is not an object; using defaults");
            return defaults;
        };

        for key in fields.keys() {
            if !KNOWN_FIELDS.contains(&key.as_str()) {
                warn!(field = key.as_str(), "ignoring unknown config field");
            }
        }

        Self {
            width: positive_u32(fields, "width", defaults.width),
            height: positive_u32(fields, "height", defaults.height),
            target_fps: positive_u32(fields, "targetFps", defaults.target_fps),
            show_fps: flag(fields, "showFps", defaults.show_fps),
            reset_interval_seconds: positive_u32(
                fields,
                "resetIntervalSeconds",
                defaults.reset_interval_seconds,
            ),
            metrics_log_interval_ms: positive_u32(
                fields,
                "metricsLogIntervalMs",
                defaults.metrics_log_interval_ms as u32,
            ) as u64,
            window_title: text(fields, "windowTitle", defaults.window_title),
        }
    }
}

const KNOWN_FIELDS: [&str; 7] = [
    "width",
    "height",
    "targetFps",
    "showFps",
    "resetIntervalSeconds",
    "metricsLogIntervalMs",
    "windowTitle",
];

fn positive_u32(fields: &Map<String, Value>, key: &'static str, fallback: u32) -> u32 {
    let Some(value) = fields.get(key) else {
        return fallback;
    };
    let parsed = value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|v| v.is_finite() && v.fract() == 0.0 && *v >= 0.0)
                .map(|v| v as u64)
        })
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0);
    match parsed {
        Some(v) => v,
        None => {
            warn!(field = key, value = %value, fallback, "invalid config value; using default");
            fallback
        }
    }
}

fn flag(fields: &Map<String, Value>, key: &'static str, fallback: bool) -> bool {
    match fields.get(key) {
        None => fallback,
        Some(Value::Bool(v)) => *v,
        Some(other) => {
            warn!(field = key, value = %other, fallback, "invalid config value; using default");
            fallback
        }
    }
}

fn text(fields: &Map<String, Value>, key: &'static str, fallback: String) -> String {
    match fields.get(key) {
        None => fallback,
        Some(Value::String(v)) if !v.trim().is_empty() => v.clone(),
        Some(other) => {
            warn!(field = key, value = %other, "invalid config value; using default");
            fallback
        }
    }
}
