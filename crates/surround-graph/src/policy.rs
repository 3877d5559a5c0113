//! Desired-state computation: which default sink, and which streams move.
//!
//! `plan` is pure. It never touches the audio server; the reconciler applies
//! the returned actions and logs the skips.

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::priority::highest_priority_sink;
use crate::settings::RoutingSettings;
use crate::types::{AudioSnapshot, RoutingAction, SinkRecord, SinkTarget};

/// Node names of the three sinks the policy routes between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkNames {
    /// Processing node applying the surround effect. Required.
    pub filter: String,
    /// Endpoint the filter feeds; preferred routing target when present.
    pub device: String,
    /// Plain stereo sink that non-enabled apps fall back to.
    pub fallback: String,
}

impl SinkNames {
    pub fn new(filter: impl Into<String>, device: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            device: device.into(),
            fallback: fallback.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("surround filter sink {name} not found")]
    FilterSinkMissing { name: String },

    #[error("surround filter sink {name} is missing its object id or index")]
    FilterSinkIncomplete { name: String },
}

/// Where non-enabled streams go and what the default becomes when the
/// surround sink is not forced as default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultCandidate {
    pub object_id: Option<u32>,
    pub index: Option<u32>,
}

/// A decision the policy could not carry out for lack of metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    FallbackSinkMissing { name: String },
    FallbackSinkIncomplete { name: String },
    /// Resolver chose a sink that is no longer in the snapshot.
    PrioritySinkVanished { object_id: u32 },
    NoDefaultCandidate,
    DeviceSinkUnresolved,
    DefaultCandidateUnresolved,
    FallbackIndexUnresolved { stream_index: u32, application: String },
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FallbackSinkMissing { name } => {
                write!(f, "fallback sink {} is missing; using the highest priority sink", name)
            }
            Self::FallbackSinkIncomplete { name } => {
                write!(f, "fallback sink {} lacks an object id or index; using the highest priority sink", name)
            }
            Self::PrioritySinkVanished { object_id } => {
                write!(f, "highest priority sink (object {}) not found; cannot determine its index", object_id)
            }
            Self::NoDefaultCandidate => write!(f, "no fallback default sink; leaving default unchanged"),
            Self::DeviceSinkUnresolved => {
                write!(f, "surround device sink id not resolved; cannot update default sink")
            }
            Self::DefaultCandidateUnresolved => {
                write!(f, "fallback default sink id not resolved; cannot update default sink")
            }
            Self::FallbackIndexUnresolved {
                stream_index,
                application,
            } => write!(
                f,
                "fallback sink index unresolved; cannot move {} (sink input {}) off surround",
                application, stream_index
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingPlan {
    pub actions: Vec<RoutingAction>,
    pub skipped: Vec<Skip>,
    /// Sink index enabled streams are routed to.
    pub routing_target: u32,
    pub default_candidate: DefaultCandidate,
}

impl RoutingPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

pub fn plan(
    snapshot: &AudioSnapshot,
    settings: &RoutingSettings,
    names: &SinkNames,
) -> Result<RoutingPlan, PolicyError> {
    let filter = snapshot
        .sink_by_name(&names.filter)
        .ok_or_else(|| PolicyError::FilterSinkMissing {
            name: names.filter.clone(),
        })?
        .target()
        .ok_or_else(|| PolicyError::FilterSinkIncomplete {
            name: names.filter.clone(),
        })?;

    let device = snapshot.sink_by_name(&names.device);
    let device_object_id = device.and_then(|d| d.object_id);
    let device_index = device.and_then(|d| d.index);
    let routing_target = device_index.unwrap_or(filter.index);

    let mut plan = RoutingPlan {
        routing_target,
        ..Default::default()
    };

    plan.default_candidate = default_candidate(snapshot, names, &mut plan.skipped);

    let desired_default = if settings.surround_sink_default {
        device_object_id.or_else(|| {
            plan.skipped.push(Skip::DeviceSinkUnresolved);
            None
        })
    } else {
        plan.default_candidate.object_id.or_else(|| {
            plan.skipped.push(Skip::DefaultCandidateUnresolved);
            None
        })
    };
    if let Some(object_id) = desired_default {
        if !is_current_default(snapshot, object_id) {
            plan.actions.push(RoutingAction::SetDefaultSink { object_id });
        }
    }

    let surround_indices: BTreeSet<u32> = std::iter::once(filter.index).chain(device_index).collect();

    for stream in &snapshot.streams {
        if stream.is_pinned() {
            continue;
        }
        let Some(app) = stream.application_name.as_deref() else {
            continue;
        };

        if settings.is_enabled(app) {
            if stream.sink != Some(routing_target) {
                plan.actions.push(RoutingAction::MoveStream {
                    stream_index: stream.index,
                    target_sink_index: routing_target,
                    application: app.to_string(),
                });
            }
        } else if stream.sink.is_some_and(|s| surround_indices.contains(&s)) {
            match plan.default_candidate.index {
                Some(target_sink_index) => plan.actions.push(RoutingAction::MoveStream {
                    stream_index: stream.index,
                    target_sink_index,
                    application: app.to_string(),
                }),
                None => plan.skipped.push(Skip::FallbackIndexUnresolved {
                    stream_index: stream.index,
                    application: app.to_string(),
                }),
            }
        }
    }

    Ok(plan)
}

/// Fallback sink when complete, else the highest priority physical sink.
fn default_candidate(snapshot: &AudioSnapshot, names: &SinkNames, skipped: &mut Vec<Skip>) -> DefaultCandidate {
    match snapshot.sink_by_name(&names.fallback).map(SinkRecord::target) {
        Some(Some(SinkTarget { object_id, index })) => {
            return DefaultCandidate {
                object_id: Some(object_id),
                index: Some(index),
            }
        }
        Some(None) => skipped.push(Skip::FallbackSinkIncomplete {
            name: names.fallback.clone(),
        }),
        None => skipped.push(Skip::FallbackSinkMissing {
            name: names.fallback.clone(),
        }),
    }

    let candidate = match highest_priority_sink(&snapshot.sinks) {
        Some(object_id) => match snapshot.sink_by_object_id(object_id) {
            Some(sink) => DefaultCandidate {
                object_id: sink.object_id,
                index: sink.index,
            },
            None => {
                skipped.push(Skip::PrioritySinkVanished { object_id });
                DefaultCandidate::default()
            }
        },
        None => DefaultCandidate::default(),
    };

    if candidate.object_id.is_none() || candidate.index.is_none() {
        skipped.push(Skip::NoDefaultCandidate);
    }
    candidate
}

fn is_current_default(snapshot: &AudioSnapshot, object_id: u32) -> bool {
    snapshot
        .default_sink
        .as_deref()
        .and_then(|name| snapshot.sink_by_name(name))
        .is_some_and(|sink| sink.object_id == Some(object_id))
}
