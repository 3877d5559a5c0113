//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, SurroundConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in load order (system, user, local).
///
/// Only returns files that exist. If `cli_path` is provided and exists, it
/// replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/surround/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("surround/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("surround.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file into a raw table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Deep-merge `overlay` into `base`. Nested tables merge key by key; any other
/// value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Deserialize a merged table, filling gaps with compiled defaults.
///
/// `origin` names the file reported in parse errors.
pub fn from_table(table: toml::Table, origin: Option<&PathBuf>) -> Result<SurroundConfig, ConfigError> {
    let mut config: SurroundConfig =
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: origin.cloned().unwrap_or_else(|| PathBuf::from("<merged>")),
                message: e.to_string(),
            })?;

    config.infra.paths.settings_file = expand_path(&config.infra.paths.settings_file.to_string_lossy());
    if let Some(dir) = config.infra.tools.runtime_dir.take() {
        config.infra.tools.runtime_dir = Some(expand_path(&dir.to_string_lossy()));
    }

    Ok(config)
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut SurroundConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("SURROUND_SETTINGS_FILE") {
        config.infra.paths.settings_file = expand_path(&v);
        sources.env_overrides.push("SURROUND_SETTINGS_FILE".to_string());
    }

    // Tools
    if let Ok(v) = env::var("SURROUND_PACTL") {
        config.infra.tools.pactl = v;
        sources.env_overrides.push("SURROUND_PACTL".to_string());
    }
    if let Ok(v) = env::var("SURROUND_WPCTL") {
        config.infra.tools.wpctl = v;
        sources.env_overrides.push("SURROUND_WPCTL".to_string());
    }
    if let Ok(v) = env::var("SURROUND_RUNTIME_DIR") {
        config.infra.tools.runtime_dir = Some(expand_path(&v));
        sources.env_overrides.push("SURROUND_RUNTIME_DIR".to_string());
    }

    // Telemetry
    if let Ok(v) = env::var("SURROUND_LOG_LEVEL") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("SURROUND_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Ok(v) = env::var("RUST_LOG") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    // Routing
    if let Ok(v) = env::var("SURROUND_POLL_INTERVAL_SECS") {
        if let Ok(secs) = v.parse() {
            config.routing.poll_interval_secs = secs;
            sources.env_overrides.push("SURROUND_POLL_INTERVAL_SECS".to_string());
        }
    }
    if let Ok(v) = env::var("SURROUND_FILTER_SINK") {
        config.routing.filter_sink = v;
        sources.env_overrides.push("SURROUND_FILTER_SINK".to_string());
    }
    if let Ok(v) = env::var("SURROUND_DEVICE_SINK") {
        config.routing.device_sink = v;
        sources.env_overrides.push("SURROUND_DEVICE_SINK".to_string());
    }
    if let Ok(v) = env::var("SURROUND_FALLBACK_SINK") {
        config.routing.fallback_sink = v;
        sources.env_overrides.push("SURROUND_FALLBACK_SINK".to_string());
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}
