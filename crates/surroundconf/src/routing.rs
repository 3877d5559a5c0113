//! Routing policy configuration - which sinks the policy looks for and how
//! often it runs.

use serde::{Deserialize, Serialize};

/// Node name of the sink that applies the virtual-surround effect.
pub const DEFAULT_FILTER_SINK: &str = "input.virtual-surround-sound-filter";

/// Node name of the hardware-facing sink fed by the filter.
pub const DEFAULT_DEVICE_SINK: &str = "input.virtual-surround-sound-input";

/// Node name of the stereo fallback sink.
pub const DEFAULT_FALLBACK_SINK: &str = "input.virtual-sink";

/// Routing policy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Surround filter sink node name. The policy does nothing until it exists.
    #[serde(default = "RoutingConfig::default_filter_sink")]
    pub filter_sink: String,

    /// Surround device sink node name (optional in the audio graph).
    #[serde(default = "RoutingConfig::default_device_sink")]
    pub device_sink: String,

    /// Fallback sink node name for streams that leave the surround path.
    #[serde(default = "RoutingConfig::default_fallback_sink")]
    pub fallback_sink: String,

    /// Seconds between reconciliation passes.
    /// Default: 30
    #[serde(default = "RoutingConfig::default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Process binaries whose streams are never routed.
    /// Default: ["steamwebhelper"]
    #[serde(default = "RoutingConfig::default_ignored_binaries")]
    pub ignored_binaries: Vec<String>,
}

impl RoutingConfig {
    fn default_filter_sink() -> String {
        DEFAULT_FILTER_SINK.to_string()
    }

    fn default_device_sink() -> String {
        DEFAULT_DEVICE_SINK.to_string()
    }

    fn default_fallback_sink() -> String {
        DEFAULT_FALLBACK_SINK.to_string()
    }

    fn default_poll_interval_secs() -> u64 {
        30
    }

    fn default_ignored_binaries() -> Vec<String> {
        vec!["steamwebhelper".to_string()]
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            filter_sink: Self::default_filter_sink(),
            device_sink: Self::default_device_sink(),
            fallback_sink: Self::default_fallback_sink(),
            poll_interval_secs: Self::default_poll_interval_secs(),
            ignored_binaries: Self::default_ignored_binaries(),
        }
    }
}
