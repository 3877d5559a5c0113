//! Configuration loading for the surround routing daemon.
//!
//! Configuration is split into two categories:
//!
//! - **Infrastructure** (`InfraConfig`): paths, tool locations, logging.
//! - **Routing** (`RoutingConfig`): the sink names the policy looks for,
//!   the poll interval and the ignored process binaries.
//!
//! The user-facing routing *state* (enabled apps, default-sink preference)
//! is not configuration; it lives in the settings document named by
//! `paths.settings_file` and is owned by the engine at runtime.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/surround/config.toml` (system)
//! 2. `~/.config/surround/config.toml` (user)
//! 3. `./surround.toml` (local override, replaced by `--config`)
//! 4. Environment variables (`SURROUND_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! settings_file = "~/.config/surround/settings.json"
//!
//! [tools]
//! pactl = "pactl"
//! wpctl = "wpctl"
//! runtime_dir = "/run/user/1000"
//!
//! [telemetry]
//! log_level = "info"
//!
//! [routing]
//! filter_sink = "input.virtual-surround-sound-filter"
//! device_sink = "input.virtual-surround-sound-input"
//! fallback_sink = "input.virtual-sink"
//! poll_interval_secs = 30
//! ignored_binaries = ["steamwebhelper"]
//! ```

pub mod infra;
pub mod loader;
pub mod routing;

pub use infra::{InfraConfig, PathsConfig, TelemetryConfig, ToolsConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use routing::RoutingConfig;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurroundConfig {
    /// Infrastructure - cannot change at runtime.
    #[serde(flatten)]
    pub infra: InfraConfig,

    /// Routing policy.
    #[serde(default)]
    pub routing: RoutingConfig,
}

impl SurroundConfig {
    /// Load configuration from all sources, letting `config_path` replace
    /// `./surround.toml`, and report where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::load_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let mut config = loader::from_table(merged, sources.files.last())?;
        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Poll interval as a `Duration`, never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.routing.poll_interval_secs.max(1))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Build TOML manually for nicer formatting
        let mut output = String::new();

        output.push_str("# Surround routing configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!(
            "settings_file = {}\n",
            quote(&self.infra.paths.settings_file.display().to_string())
        ));

        output.push_str("\n[tools]\n");
        output.push_str(&format!("pactl = {}\n", quote(&self.infra.tools.pactl)));
        output.push_str(&format!("wpctl = {}\n", quote(&self.infra.tools.wpctl)));
        if let Some(dir) = &self.infra.tools.runtime_dir {
            output.push_str(&format!("runtime_dir = {}\n", quote(&dir.display().to_string())));
        }

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = {}\n",
            quote(&self.infra.telemetry.log_level)
        ));

        output.push_str("\n[routing]\n");
        output.push_str(&format!("filter_sink = {}\n", quote(&self.routing.filter_sink)));
        output.push_str(&format!("device_sink = {}\n", quote(&self.routing.device_sink)));
        output.push_str(&format!(
            "fallback_sink = {}\n",
            quote(&self.routing.fallback_sink)
        ));
        output.push_str(&format!(
            "poll_interval_secs = {}\n",
            self.routing.poll_interval_secs
        ));
        output.push_str("ignored_binaries = [\n");
        for binary in &self.routing.ignored_binaries {
            output.push_str(&format!("    {},\n", quote(binary)));
        }
        output.push_str("]\n");

        output
    }
}

fn quote(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}
