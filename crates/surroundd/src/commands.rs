//! One-shot CLI command implementations

use anyhow::{Context, Result};
use std::process::ExitCode;
use surround_graph::{
    highest_priority_sink, ChannelVolume, MixerProfile, PassReport, Reconciler, SinkRecord, StreamRecord,
};
use surroundconf::{ConfigSources, SurroundConfig};

fn found(any: bool) -> ExitCode {
    if any {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

pub fn list_sinks(reconciler: &Reconciler, json: bool) -> Result<ExitCode> {
    let sinks = reconciler.collector().list_sinks();
    if sinks.is_empty() {
        eprintln!("No sinks found.");
        return Ok(ExitCode::FAILURE);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&sinks)?);
    } else {
        for sink in &sinks {
            println!("{}", sink_line(sink));
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn list_apps(reconciler: &Reconciler, json: bool) -> Result<ExitCode> {
    let streams = reconciler.collector().list_streams();
    if streams.is_empty() {
        eprintln!("No running apps detected.");
        return Ok(ExitCode::FAILURE);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&streams)?);
        return Ok(ExitCode::SUCCESS);
    }

    let settings = reconciler.routing_settings();
    for stream in &streams {
        let enabled = stream
            .application_name
            .as_deref()
            .is_some_and(|name| settings.is_enabled(name));
        println!("{}", stream_line(stream, enabled));
    }
    Ok(ExitCode::SUCCESS)
}

pub fn priority_sink(reconciler: &Reconciler) -> ExitCode {
    let sinks = reconciler.collector().list_sinks();
    match highest_priority_sink(&sinks) {
        Some(object_id) => {
            let label = sinks
                .iter()
                .find(|s| s.object_id == Some(object_id))
                .map(|s| s.display_name().to_string())
                .unwrap_or_default();
            println!("{}\t{}", object_id, label);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("No eligible sink found.");
            ExitCode::FAILURE
        }
    }
}

pub fn default_sink(reconciler: &Reconciler) -> ExitCode {
    match reconciler.collector().default_sink_name() {
        Some(name) => {
            println!("{}", name);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("Default sink could not be determined.");
            ExitCode::FAILURE
        }
    }
}

pub fn enable(reconciler: &Reconciler, app: &str) -> Result<ExitCode> {
    let changed = reconciler
        .enable_app(app)
        .with_context(|| format!("Failed to enable {}", app))?;
    println!(
        "{}",
        if changed {
            format!("Enabled virtual surround for {}.", app)
        } else {
            format!("{} was already enabled.", app)
        }
    );
    print_report(&reconciler.reconcile_once());
    Ok(ExitCode::SUCCESS)
}

pub fn disable(reconciler: &Reconciler, app: &str) -> Result<ExitCode> {
    let changed = reconciler
        .disable_app(app)
        .with_context(|| format!("Failed to disable {}", app))?;
    println!(
        "{}",
        if changed {
            format!("Disabled virtual surround for {}.", app)
        } else {
            format!("{} was not enabled.", app)
        }
    );
    print_report(&reconciler.reconcile_once());
    Ok(ExitCode::SUCCESS)
}

pub fn surround_default(reconciler: &Reconciler, enabled: bool) -> Result<ExitCode> {
    reconciler
        .set_surround_default(enabled)
        .context("Failed to store default sink preference")?;
    if enabled {
        println!("Virtual surround sound set as the default sink.");
    } else {
        println!("Virtual surround sound is no longer the default sink.");
    }
    print_report(&reconciler.reconcile_once());
    Ok(ExitCode::SUCCESS)
}

pub fn status(reconciler: &Reconciler) -> ExitCode {
    let settings = reconciler.routing_settings();
    println!("Surround sink as default: {}", if settings.surround_sink_default { "on" } else { "off" });
    if settings.enabled_apps.is_empty() {
        println!("Enabled apps: none");
    } else {
        println!("Enabled apps: {}", settings.enabled_apps.join(", "));
    }

    match reconciler.preview() {
        Ok((snapshot, plan)) => {
            println!(
                "Default sink: {}",
                snapshot.default_sink.as_deref().unwrap_or("unknown")
            );
            println!("Routing target: sink {}", plan.routing_target);
            match (plan.default_candidate.object_id, plan.default_candidate.index) {
                (Some(object_id), Some(index)) => {
                    println!("Fallback sink: object {} (sink {})", object_id, index)
                }
                _ => println!("Fallback sink: unresolved"),
            }
            println!("Streams: {}", snapshot.streams.len());
            if plan.actions.is_empty() {
                println!("Routing is up to date.");
            } else {
                println!("Pending:");
                for action in &plan.actions {
                    println!("  {}", action);
                }
            }
            for skip in &plan.skipped {
                println!("  warning: {}", skip);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Routing unavailable: {}", e);
            ExitCode::FAILURE
        }
    }
}

pub fn mixer(reconciler: &Reconciler, name: &str, volumes: Vec<ChannelVolume>) -> ExitCode {
    let mut profile: MixerProfile = volumes.into_iter().collect();
    profile.name = name.to_string();

    if reconciler.apply_mixer_profile(&profile) {
        println!("Applied mixer profile {}.", profile.name);
        ExitCode::SUCCESS
    } else {
        eprintln!("Failed to apply mixer profile {}.", profile.name);
        ExitCode::FAILURE
    }
}

pub fn reconcile(reconciler: &Reconciler) -> ExitCode {
    let report = reconciler.reconcile_once();
    print_report(&report);
    found(report.aborted.is_none() && report.failed.is_empty())
}

pub fn config(config: &SurroundConfig, sources: &ConfigSources) -> ExitCode {
    if sources.files.is_empty() {
        println!("# No config files found; using defaults");
    } else {
        for file in &sources.files {
            println!("# Loaded: {}", file.display());
        }
    }
    for var in &sources.env_overrides {
        println!("# Env override: {}", var);
    }
    println!();
    print!("{}", config.to_toml());
    ExitCode::SUCCESS
}

fn print_report(report: &PassReport) {
    if let Some(e) = &report.aborted {
        println!("Routing pass aborted: {}", e);
        return;
    }
    for action in &report.applied {
        println!("  {}", action);
    }
    for action in &report.failed {
        println!("  failed: {}", action);
    }
}

fn sink_line(sink: &SinkRecord) -> String {
    format!(
        "{:>5}  {:>5}  {}  ({})",
        opt(sink.index),
        opt(sink.object_id),
        sink.name,
        sink.display_name()
    )
}

fn stream_line(stream: &StreamRecord, enabled: bool) -> String {
    let format = &stream.format;
    let mut details: Vec<String> = Vec::new();
    if !format.format.is_empty() {
        details.push(format.format.clone());
    }
    if !format.sample_format.is_empty() && format.sample_format != format.format {
        details.push(format.sample_format.clone());
    }
    if !format.rate.is_empty() {
        details.push(format!("{} Hz", format.rate));
    }
    if !format.channels.is_empty() {
        details.push(format!("{} ch", format.channels));
    }

    format!(
        "{:>5}  sink {:>5}  [{}]  {} ({}){}{}",
        stream.index,
        opt(stream.sink),
        if enabled { "surround" } else { "stereo" },
        stream.display_name(),
        stream.binary,
        if details.is_empty() {
            String::new()
        } else {
            format!("  {}", details.join(", "))
        },
        if stream.is_pinned() {
            format!("  pinned to {}", stream.target_object.trim())
        } else {
            String::new()
        }
    )
}

fn opt(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
