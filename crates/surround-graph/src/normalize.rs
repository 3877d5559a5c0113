//! Raw listing records → canonical `SinkRecord` / `StreamRecord`.
//!
//! The structured listing is loosely typed: ids arrive as numbers or strings,
//! property maps may be null, and stream format details are buried in a
//! free-text format string with escaped, quoted `key = "value"` pairs.
//! Everything here is a default-guarded lookup; nothing fails.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

use crate::patterns::patterns;
use crate::types::{keys, RawSink, RawSinkInput, SinkPort, SinkRecord, StreamFormat, StreamRecord};

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    ignored_binaries: HashSet<String>,
}

impl Normalizer {
    pub fn new<I, S>(ignored_binaries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored_binaries: ignored_binaries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn normalize_sink(&self, raw: RawSink) -> SinkRecord {
        let properties = string_properties(&raw.properties);
        let object_id = properties.get(keys::OBJECT_ID).and_then(|v| parse_id_str(v));

        SinkRecord {
            object_id,
            index: parse_id(raw.index.as_ref()),
            name: raw.name.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            channel_map: parse_channel_map(raw.channel_map.as_ref()),
            properties,
            ports: raw
                .ports
                .iter()
                .map(|port| SinkPort {
                    availability: port
                        .availability
                        .as_ref()
                        .and_then(value_to_string)
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }

    /// Canonical stream, or `None` when the stream belongs to an ignored or
    /// unidentifiable process, or has no usable index.
    pub fn normalize_stream(&self, raw: RawSinkInput) -> Option<StreamRecord> {
        let properties = string_properties(&raw.properties);

        let binary = properties
            .get(keys::PROCESS_BINARY)
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())?;
        if self.is_ignored(binary) {
            return None;
        }
        let binary = binary.to_string();

        let index = parse_id(raw.index.as_ref())?;

        let format_string = raw.format.as_ref().and_then(Value::as_str).unwrap_or_default();
        let sample_spec = raw
            .sample_specification
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default();

        Some(StreamRecord {
            index,
            sink: parse_id(raw.sink.as_ref()),
            target_object: properties.get(keys::TARGET_OBJECT).cloned().unwrap_or_default(),
            application_name: resolve_application_name(&properties),
            binary,
            format: parse_format(format_string, sample_spec, raw.channel_map.as_ref()),
            volume: volume_description(&raw.volume),
            properties,
        })
    }

    pub fn is_ignored(&self, binary: &str) -> bool {
        self.ignored_binaries.contains(binary)
    }
}

/// `application.name`, then `media.name`, then nothing.
pub fn resolve_application_name(properties: &BTreeMap<String, String>) -> Option<String> {
    properties
        .get(keys::APPLICATION_NAME)
        .and_then(|name| clean_application_name(name))
        .or_else(|| {
            properties
                .get(keys::MEDIA_NAME)
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        })
}

/// Trimmed name, treating blank and the literal `(null)` as absent.
pub fn clean_application_name(name: &str) -> Option<String> {
    let cleaned = name.trim();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("(null)") {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Scalar JSON value as text. Objects, arrays and null have no text form.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_properties(map: &Map<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(key, value)| value_to_string(value).map(|v| (key.clone(), v)))
        .collect()
}

/// Non-negative id from a number or numeric string.
pub fn parse_id(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_i64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => parse_id_str(s),
        _ => None,
    }
}

fn parse_id_str(value: &str) -> Option<u32> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|v| u32::try_from(v).ok())
}

/// Decode a stream's format description.
///
/// Fields come from the quoted pairs in `format_string` when present and fall
/// back to the `sample_spec` text (`float32le 2ch 48000Hz`). The channel map
/// falls back to the record's own `channel_map` field.
pub fn parse_format(format_string: &str, sample_spec: &str, channel_map: Option<&Value>) -> StreamFormat {
    let p = patterns();

    let base_format = format_string
        .split(',')
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    let mut sample_format = extract_format_field(format_string, &p.sample_format);
    let mut rate = extract_format_field(format_string, &p.rate);
    let mut channels = extract_format_field(format_string, &p.channels);
    let extracted_map = extract_format_field(format_string, &p.channel_map);
    let channel_map = if extracted_map.is_empty() {
        parse_channel_map(channel_map)
    } else {
        split_channel_map(&extracted_map)
    };

    if !sample_spec.trim().is_empty() {
        if sample_format.is_empty() {
            sample_format = sample_spec.split_whitespace().next().unwrap_or_default().to_string();
        }
        if rate.is_empty() {
            rate = first_capture(&p.spec_rate, sample_spec);
        }
        if channels.is_empty() {
            channels = first_capture(&p.spec_channels, sample_spec);
        }
    }

    StreamFormat {
        format: if base_format.is_empty() {
            sample_format.clone()
        } else {
            base_format
        },
        sample_format,
        rate,
        channels,
        channel_map,
    }
}

fn first_capture(pattern: &Regex, text: &str) -> String {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn extract_format_field(format_string: &str, pattern: &Regex) -> String {
    if format_string.is_empty() {
        return String::new();
    }
    pattern
        .captures(format_string)
        .and_then(|caps| caps.get(1))
        .map(|m| clean_format_token(m.as_str()))
        .unwrap_or_default()
}

/// Unescape, trim, and drop one pair of surrounding double quotes.
pub fn clean_format_token(value: &str) -> String {
    let decoded = unescape(value);
    let cleaned = decoded.trim();
    let cleaned = if cleaned.len() >= 2 && cleaned.starts_with('"') && cleaned.ends_with('"') {
        cleaned[1..cleaned.len() - 1].trim()
    } else {
        cleaned
    };
    cleaned.to_string()
}

/// Resolve backslash escapes. Unknown escapes are kept verbatim.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('x') => push_code_point(&mut out, &mut chars, 'x', 2),
            Some('u') => push_code_point(&mut out, &mut chars, 'u', 4),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

fn push_code_point(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    marker: char,
    width: usize,
) {
    let mut digits = String::with_capacity(width);
    while digits.len() < width {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }

    let decoded = (digits.len() == width)
        .then(|| u32::from_str_radix(&digits, 16).ok())
        .flatten()
        .and_then(char::from_u32);

    match decoded {
        Some(c) => out.push(c),
        None => {
            out.push('\\');
            out.push(marker);
            out.push_str(&digits);
        }
    }
}

/// Channel map from a comma-joined string or a JSON array.
pub fn parse_channel_map(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(value_to_string)
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        Some(Value::String(s)) => split_channel_map(&clean_format_token(s)),
        _ => Vec::new(),
    }
}

fn split_channel_map(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// `front-left: 100%, front-right: 95%` from a `{channel: {value_percent}}` map.
pub fn volume_description(volume: &Map<String, Value>) -> String {
    volume
        .iter()
        .filter_map(|(channel, details)| {
            let percent = details.get("value_percent")?.as_str()?;
            (!percent.is_empty()).then(|| format!("{}: {}", channel, percent))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
