use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Property keys read from the audio server's records.
pub mod keys {
    pub const OBJECT_ID: &str = "object.id";
    pub const PRIORITY_SESSION: &str = "priority.session";
    pub const NODE_VIRTUAL: &str = "node.virtual";
    pub const NODE_NAME: &str = "node.name";
    pub const NODE_DESCRIPTION: &str = "node.description";
    pub const APPLICATION_NAME: &str = "application.name";
    pub const PROCESS_BINARY: &str = "application.process.binary";
    pub const TARGET_OBJECT: &str = "target.object";
    pub const MEDIA_NAME: &str = "media.name";
}

// --- Raw records, shaped like `pactl -f json` output -----------------------

/// A sink object as emitted by the structured listing.
///
/// Every field is optional; the tool omits or mistypes fields depending on
/// version and node state. The normalizer decides what is usable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSink {
    #[serde(default)]
    pub index: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub channel_map: Option<Value>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub properties: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub ports: Vec<RawPort>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPort {
    #[serde(default)]
    pub availability: Option<Value>,
}

/// A sink input (application stream) as emitted by the structured listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSinkInput {
    #[serde(default)]
    pub index: Option<Value>,
    #[serde(default)]
    pub sink: Option<Value>,
    #[serde(default)]
    pub format: Option<Value>,
    #[serde(default)]
    pub sample_specification: Option<Value>,
    #[serde(default)]
    pub channel_map: Option<Value>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub volume: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub properties: Map<String, Value>,
}

/// Accept any JSON value, keeping it only when it is an object.
fn lenient_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

/// Accept any JSON value, keeping the array elements that deserialize.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

// --- Canonical records -----------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkPort {
    pub availability: String,
}

/// Both identities a sink needs before the policy may target it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkTarget {
    /// Identity accepted by the default-sink setter.
    pub object_id: u32,
    /// Session handle accepted by the stream-move command.
    pub index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkRecord {
    pub object_id: Option<u32>,
    pub index: Option<u32>,
    pub name: String,
    pub description: String,
    pub channel_map: Vec<String>,
    pub properties: BTreeMap<String, String>,
    pub ports: Vec<SinkPort>,
}

impl SinkRecord {
    /// Both identities, or `None` when the sink is inert for routing.
    pub fn target(&self) -> Option<SinkTarget> {
        Some(SinkTarget {
            object_id: self.object_id?,
            index: self.index?,
        })
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn is_virtual(&self) -> bool {
        self.property(keys::NODE_VIRTUAL) == Some("true")
    }

    /// Human label: node description, then description, then node name.
    pub fn display_name(&self) -> &str {
        self.property(keys::NODE_DESCRIPTION)
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.description.as_str()).filter(|s| !s.is_empty()))
            .or_else(|| Some(self.name.as_str()).filter(|s| !s.is_empty()))
            .unwrap_or("unknown sink")
    }
}

/// Decoded stream format. Empty strings mean "not reported".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFormat {
    /// Base codec, e.g. `pcm`.
    pub format: String,
    pub sample_format: String,
    pub rate: String,
    pub channels: String,
    pub channel_map: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub index: u32,
    /// Index of the sink the stream currently plays to.
    pub sink: Option<u32>,
    /// Non-empty when something outside this engine pinned the stream.
    pub target_object: String,
    pub application_name: Option<String>,
    pub binary: String,
    pub properties: BTreeMap<String, String>,
    pub format: StreamFormat,
    /// Per-channel volume, e.g. `front-left: 100%, front-right: 100%`.
    pub volume: String,
}

impl StreamRecord {
    pub fn is_pinned(&self) -> bool {
        !self.target_object.trim().is_empty()
    }

    pub fn display_name(&self) -> String {
        self.application_name
            .clone()
            .unwrap_or_else(|| format!("Sink Input {}", self.index))
    }
}

/// Everything one reconciliation pass knows about the audio graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSnapshot {
    pub sinks: Vec<SinkRecord>,
    pub streams: Vec<StreamRecord>,
    /// Node name of the current default sink, when the tool reported one.
    pub default_sink: Option<String>,
}

impl AudioSnapshot {
    pub fn sink_by_name(&self, name: &str) -> Option<&SinkRecord> {
        self.sinks.iter().find(|s| s.name == name)
    }

    pub fn sink_by_object_id(&self, object_id: u32) -> Option<&SinkRecord> {
        self.sinks.iter().find(|s| s.object_id == Some(object_id))
    }
}

/// One corrective step computed by the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoutingAction {
    SetDefaultSink {
        object_id: u32,
    },
    MoveStream {
        stream_index: u32,
        target_sink_index: u32,
        application: String,
    },
}

impl fmt::Display for RoutingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetDefaultSink { object_id } => write!(f, "set default sink to object {}", object_id),
            Self::MoveStream {
                stream_index,
                target_sink_index,
                application,
            } => write!(
                f,
                "move {} (sink input {}) to sink {}",
                application, stream_index, target_sink_index
            ),
        }
    }
}
