//! Audio state collection through the PulseAudio-compatible control tool.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::plain::PlainSinkInputParser;
use super::runner::{ToolError, ToolRunner};
use crate::normalize::Normalizer;
use crate::patterns::patterns;
use crate::types::{AudioSnapshot, RawSink, RawSinkInput, SinkRecord, StreamRecord};

/// Structured `-f json list <kind>` output: a JSON array of loosely typed
/// objects. Elements that do not deserialize are skipped.
pub struct JsonListing;

impl JsonListing {
    pub fn parse<T: DeserializeOwned>(kind: &str, text: &str) -> Vec<T> {
        let items: Vec<Value> = match serde_json::from_str(text) {
            Ok(items) => items,
            Err(e) => {
                error!(kind, error = %e, "listing is not a JSON array");
                return Vec::new();
            }
        };

        items
            .into_iter()
            .enumerate()
            .filter_map(|(position, item)| match serde_json::from_value(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(kind, position, error = %e, "skipping malformed record");
                    None
                }
            })
            .collect()
    }
}

/// Reads sinks, streams and the current default sink. Every failure
/// degrades to an empty result and a log line.
pub struct Collector {
    runner: Arc<dyn ToolRunner>,
    pactl: String,
    normalizer: Normalizer,
}

impl Collector {
    pub fn new(runner: Arc<dyn ToolRunner>, pactl: impl Into<String>, normalizer: Normalizer) -> Self {
        Self {
            runner,
            pactl: pactl.into(),
            normalizer,
        }
    }

    pub fn list_sinks(&self) -> Vec<SinkRecord> {
        let Some(text) = self.query(&["-f", "json", "list", "sinks"]) else {
            return Vec::new();
        };

        JsonListing::parse::<RawSink>("sinks", &text)
            .into_iter()
            .map(|raw| self.normalizer.normalize_sink(raw))
            .collect()
    }

    pub fn list_streams(&self) -> Vec<StreamRecord> {
        let Some(text) = self.query(&["-f", "json", "list", "sink-inputs"]) else {
            return Vec::new();
        };

        let mut streams: Vec<StreamRecord> = JsonListing::parse::<RawSinkInput>("sink-inputs", &text)
            .into_iter()
            .filter_map(|raw| self.normalizer.normalize_stream(raw))
            .collect();

        if streams.is_empty() {
            return streams;
        }

        if let Some(plain) = self.query(&["list", "sink-inputs"]) {
            let names = PlainSinkInputParser::parse(&plain);
            for stream in streams.iter_mut().filter(|s| s.application_name.is_none()) {
                if let Some(name) = names.get(&stream.index) {
                    debug!(index = stream.index, name = %name, "application name from plain listing");
                    stream.application_name = Some(name.clone());
                }
            }
        }

        streams
    }

    /// Node name of the current default sink.
    pub fn default_sink_name(&self) -> Option<String> {
        let text = self.query(&["get-default-sink"])?;
        let first_line = text.lines().next()?.trim();
        if first_line.is_empty() {
            return None;
        }

        let name = patterns()
            .default_sink
            .captures(first_line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(first_line);
        Some(name.to_string())
    }

    pub fn snapshot(&self) -> AudioSnapshot {
        AudioSnapshot {
            sinks: self.list_sinks(),
            streams: self.list_streams(),
            default_sink: self.default_sink_name(),
        }
    }

    fn query(&self, args: &[&str]) -> Option<String> {
        match self.runner.run(&self.pactl, args) {
            Ok(text) => Some(text),
            Err(e @ ToolError::Missing { .. }) => {
                error!(error = %e, "audio control tool unavailable");
                None
            }
            Err(e) => {
                error!(command = %args.join(" "), error = %e, "audio query failed");
                None
            }
        }
    }
}
