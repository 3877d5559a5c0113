//! Every text pattern used to scrape the audio-control tool's output.
//!
//! Kept in one table so a change in the tool's output format is a one-file
//! audit.

use regex::Regex;
use std::sync::OnceLock;

pub struct Patterns {
    /// `format.sample_format = "\"float32le\""` inside a format string.
    pub sample_format: Regex,
    pub rate: Regex,
    pub channels: Regex,
    pub channel_map: Regex,
    /// `48000Hz` / `48000 Hz` in a free-text sample specification.
    pub spec_rate: Regex,
    /// `2ch` in a free-text sample specification.
    pub spec_channels: Regex,
    /// `Sink Input #42` record header in plain-text listings.
    pub sink_input_header: Regex,
    /// `application.name = "Game"` property line.
    pub application_name: Regex,
    /// `node.name = "game-output"` property line.
    pub node_name: Regex,
    /// `Default Sink: name` / `default = name` prefix on the default-sink query.
    pub default_sink: Regex,
}

/// Quoted value with backslash escapes, captured without the outer quotes.
const QUOTED: &str = r#""((?:\\.|[^"])*)""#;

fn format_field(key: &str) -> Regex {
    let pattern = format!(r"{}\s*=\s*{}", regex::escape(key), QUOTED);
    Regex::new(&pattern).expect("format field pattern is valid")
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

/// Compiled pattern table.
pub fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        sample_format: format_field("format.sample_format"),
        rate: format_field("format.rate"),
        channels: format_field("format.channels"),
        channel_map: format_field("format.channel_map"),
        spec_rate: Regex::new(r"(?i)(\d+)\s*Hz").expect("rate pattern is valid"),
        spec_channels: Regex::new(r"(?i)(\d+)ch").expect("channels pattern is valid"),
        sink_input_header: Regex::new(r"^Sink Input #(\d+)").expect("header pattern is valid"),
        application_name: Regex::new(r#"^application\.name\s*=\s*"([^"]*)""#)
            .expect("application.name pattern is valid"),
        node_name: Regex::new(r#"^node\.name\s*=\s*"([^"]*)""#).expect("node.name pattern is valid"),
        default_sink: Regex::new(r"(?i)default(?:\s+sink)?\s*[:=]\s*(\S+)")
            .expect("default sink pattern is valid"),
    })
}
