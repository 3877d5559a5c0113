//! Per-channel volume profiles for the surround filter sink.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

pub const FULL_VOLUME: u32 = 100;

/// Short channel code for a server channel token, e.g. `front-left` → `FL`.
pub fn channel_code(token: &str) -> Option<&'static str> {
    match token.trim().to_ascii_lowercase().as_str() {
        "front-left" => Some("FL"),
        "front-right" => Some("FR"),
        "front-center" => Some("FC"),
        "lfe" => Some("LFE"),
        "rear-left" => Some("RL"),
        "rear-right" => Some("RR"),
        "side-left" => Some("SL"),
        "side-right" => Some("SR"),
        _ => None,
    }
}

pub const CHANNEL_CODES: [&str; 8] = ["FL", "FR", "FC", "LFE", "RL", "RR", "SL", "SR"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixerProfile {
    pub name: String,
    /// Channel code → volume percent.
    pub volumes: BTreeMap<String, u32>,
}

impl MixerProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volumes: BTreeMap::new(),
        }
    }

    pub fn with_volume(mut self, code: &str, percent: u32) -> Self {
        self.volumes.insert(code.to_ascii_uppercase(), percent);
        self
    }

    /// Percent for a server channel token; unmapped or unset channels play
    /// at full volume.
    pub fn percent_for(&self, channel: &str) -> u32 {
        channel_code(channel)
            .and_then(|code| self.volumes.get(code).copied())
            .unwrap_or(FULL_VOLUME)
    }

    /// One percent per channel, in the sink's channel order.
    pub fn percents(&self, channel_map: &[String]) -> Vec<u32> {
        channel_map.iter().map(|c| self.percent_for(c)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected CODE=PERCENT with CODE one of FL, FR, FC, LFE, RL, RR, SL, SR: {0}")]
pub struct ParseVolumeError(String);

/// `FL=80` style assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelVolume {
    pub code: &'static str,
    pub percent: u32,
}

impl FromStr for ChannelVolume {
    type Err = ParseVolumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (code, percent) = s.split_once('=').ok_or_else(|| ParseVolumeError(s.to_string()))?;
        let code = code.trim().to_ascii_uppercase();
        let code = CHANNEL_CODES
            .iter()
            .find(|c| **c == code)
            .copied()
            .ok_or_else(|| ParseVolumeError(s.to_string()))?;
        let percent = percent
            .trim()
            .trim_end_matches('%')
            .parse()
            .map_err(|_| ParseVolumeError(s.to_string()))?;
        Ok(Self { code, percent })
    }
}

impl FromIterator<ChannelVolume> for MixerProfile {
    fn from_iter<I: IntoIterator<Item = ChannelVolume>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new("custom"), |profile, v| profile.with_volume(v.code, v.percent))
    }
}
