//! Infrastructure configuration - things that cannot change at runtime.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// JSON document holding the enabled-app list and default-sink preference.
    /// Default: ~/.config/surround/settings.json
    #[serde(default = "PathsConfig::default_settings_file")]
    pub settings_file: PathBuf,
}

impl PathsConfig {
    fn default_settings_file() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("surround/settings.json"))
            .unwrap_or_else(|| PathBuf::from(".config/surround/settings.json"))
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            settings_file: Self::default_settings_file(),
        }
    }
}

/// External audio-control tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// PulseAudio-compatible control tool used for listings, moves and volumes.
    /// Default: pactl
    #[serde(default = "ToolsConfig::default_pactl")]
    pub pactl: String,

    /// WirePlumber control tool used to set the default sink.
    /// Default: wpctl
    #[serde(default = "ToolsConfig::default_wpctl")]
    pub wpctl: String,

    /// User runtime directory exported to child processes.
    ///
    /// When set, children get `XDG_RUNTIME_DIR=<dir>` and
    /// `DBUS_SESSION_BUS_ADDRESS=unix:path=<dir>/bus`. Needed when the daemon
    /// runs outside the desktop session (e.g. from a system service).
    #[serde(default)]
    pub runtime_dir: Option<PathBuf>,
}

impl ToolsConfig {
    fn default_pactl() -> String {
        "pactl".to_string()
    }

    fn default_wpctl() -> String {
        "wpctl".to_string()
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            pactl: Self::default_pactl(),
            wpctl: Self::default_wpctl(),
            runtime_dir: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

/// Infrastructure configuration - cannot change at runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfraConfig {
    /// Filesystem paths.
    #[serde(default)]
    pub paths: PathsConfig,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Logging.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
