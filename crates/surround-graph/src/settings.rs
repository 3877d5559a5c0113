//! User-facing routing preferences, persisted as a flat JSON document.

use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::warn;

pub const SURROUND_SINK_DEFAULT: &str = "surround_sink_default";
pub const ENABLED_APPS: &str = "enabled_apps";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("settings {path} are not a JSON object: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to write settings {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Key-value settings owned outside the engine.
pub trait SettingsStore: Send + Sync {
    /// Re-read the backing document. On error the store holds no values.
    fn reload(&self) -> Result<(), SettingsError>;

    fn get(&self, key: &str) -> Option<Value>;

    /// Store a value and persist it.
    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError>;
}

#[derive(Debug, Default)]
pub struct InMemorySettings {
    values: RwLock<Map<String, Value>>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }
}

impl SettingsStore for InMemorySettings {
    fn reload(&self) -> Result<(), SettingsError> {
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON file store. A missing file reads as empty; writes are atomic.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl JsonFileSettings {
    /// Open the document at `path`. Unreadable content is logged and treated
    /// as empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = load_document(&path).unwrap_or_else(|e| {
            warn!(error = %e, "starting with empty settings");
            Map::new()
        });
        Self {
            path,
            values: RwLock::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, values: &Map<String, Value>) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(values).map_err(|e| write_err(io::Error::from(e)))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        // Atomic write: write to temp, then rename
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, json).map_err(write_err)?;
        std::fs::rename(&temp_path, &self.path).map_err(write_err)?;

        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn reload(&self) -> Result<(), SettingsError> {
        let loaded = load_document(&self.path);
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        match loaded {
            Ok(map) => {
                *values = map;
                Ok(())
            }
            Err(e) => {
                values.clear();
                Err(e)
            }
        }
    }

    fn get(&self, key: &str) -> Option<Value> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
        self.save(&values)
    }
}

fn load_document(path: &Path) -> Result<Map<String, Value>, SettingsError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if contents.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(SettingsError::Parse {
            path: path.to_path_buf(),
            message: format!("found {}", json_kind(&other)),
        }),
        Err(e) => Err(SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The two preferences the policy reads, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingSettings {
    /// Force the surround sink to be the system default output.
    pub surround_sink_default: bool,
    /// Application names routed through the surround sink, in insertion order.
    pub enabled_apps: Vec<String>,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            surround_sink_default: true,
            enabled_apps: Vec::new(),
        }
    }
}

impl RoutingSettings {
    pub fn read(store: &dyn SettingsStore) -> Self {
        let defaults = Self::default();
        Self {
            surround_sink_default: store
                .get(SURROUND_SINK_DEFAULT)
                .and_then(|v| v.as_bool())
                .unwrap_or(defaults.surround_sink_default),
            enabled_apps: store
                .get(ENABLED_APPS)
                .map(|v| string_list(&v))
                .unwrap_or(defaults.enabled_apps),
        }
    }

    pub fn is_enabled(&self, app: &str) -> bool {
        self.enabled_apps.iter().any(|a| a == app)
    }
}

fn string_list(value: &Value) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in value.as_array().into_iter().flatten() {
        if let Some(s) = item.as_str() {
            if !out.iter().any(|existing| existing == s) {
                out.push(s.to_string());
            }
        }
    }
    out
}

/// Re-read the store so a mutation builds on edits made by other writers.
fn refreshed(store: &dyn SettingsStore) -> RoutingSettings {
    if let Err(e) = store.reload() {
        warn!(error = %e, "settings reload failed; using defaults");
    }
    RoutingSettings::read(store)
}

/// Add `app` to the enabled list. Returns whether the list changed.
pub fn enable_app(store: &dyn SettingsStore, app: &str) -> Result<bool, SettingsError> {
    let mut apps = refreshed(store).enabled_apps;
    if apps.iter().any(|a| a == app) {
        return Ok(false);
    }
    apps.push(app.to_string());
    store.set(ENABLED_APPS, Value::from(apps))?;
    Ok(true)
}

/// Remove `app` from the enabled list. Returns whether the list changed.
pub fn disable_app(store: &dyn SettingsStore, app: &str) -> Result<bool, SettingsError> {
    let apps = refreshed(store).enabled_apps;
    if !apps.iter().any(|a| a == app) {
        return Ok(false);
    }
    let remaining: Vec<String> = apps.into_iter().filter(|a| a != app).collect();
    store.set(ENABLED_APPS, Value::from(remaining))?;
    Ok(true)
}

/// Returns whether the stored preference changed.
pub fn set_surround_default(store: &dyn SettingsStore, enabled: bool) -> Result<bool, SettingsError> {
    let current = refreshed(store).surround_sink_default;
    store.set(SURROUND_SINK_DEFAULT, Value::Bool(enabled))?;
    Ok(current != enabled)
}
