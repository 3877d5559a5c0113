//! Applies routing actions through the audio-control tools.
//!
//! Every command reports success as a bool; failures are logged, never raised.

use std::sync::Arc;
use tracing::{error, info};

use crate::mixer::MixerProfile;
use crate::sources::runner::ToolRunner;
use crate::types::RoutingAction;

pub struct Executor {
    runner: Arc<dyn ToolRunner>,
    pactl: String,
    wpctl: String,
}

impl Executor {
    pub fn new(runner: Arc<dyn ToolRunner>, pactl: impl Into<String>, wpctl: impl Into<String>) -> Self {
        Self {
            runner,
            pactl: pactl.into(),
            wpctl: wpctl.into(),
        }
    }

    pub fn set_default_sink(&self, object_id: u32) -> bool {
        let id = object_id.to_string();
        let ok = self.invoke(&self.wpctl, &["set-default", &id]);
        if ok {
            info!(object_id, "default sink set");
        }
        ok
    }

    pub fn move_stream(&self, stream_index: u32, sink_index: u32) -> bool {
        let stream = stream_index.to_string();
        let sink = sink_index.to_string();
        let ok = self.invoke(&self.pactl, &["move-sink-input", &stream, &sink]);
        if ok {
            info!(stream_index, sink_index, "stream moved");
        }
        ok
    }

    /// Set one volume per channel of `sink_index`, in `channel_map` order.
    pub fn set_channel_volumes(&self, sink_index: u32, channel_map: &[String], profile: &MixerProfile) -> bool {
        if channel_map.is_empty() {
            error!(sink_index, "sink reports no channel map; volumes not set");
            return false;
        }

        let percents: Vec<String> = profile
            .percents(channel_map)
            .into_iter()
            .map(|p| format!("{}%", p))
            .collect();
        if percents.is_empty() {
            return false;
        }

        let sink = sink_index.to_string();
        let mut args = vec!["set-sink-volume", sink.as_str()];
        args.extend(percents.iter().map(String::as_str));

        let ok = self.invoke(&self.pactl, &args);
        if ok {
            info!(sink_index, profile = %profile.name, volumes = %percents.join(" "), "channel volumes set");
        }
        ok
    }

    pub fn apply(&self, action: &RoutingAction) -> bool {
        match action {
            RoutingAction::SetDefaultSink { object_id } => self.set_default_sink(*object_id),
            RoutingAction::MoveStream {
                stream_index,
                target_sink_index,
                ..
            } => self.move_stream(*stream_index, *target_sink_index),
        }
    }

    fn invoke(&self, program: &str, args: &[&str]) -> bool {
        match self.runner.run(program, args) {
            Ok(_) => true,
            Err(e) => {
                error!(command = %format!("{} {}", program, args.join(" ")), error = %e, "command failed");
                false
            }
        }
    }
}
