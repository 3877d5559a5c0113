//! surroundd - keeps application audio routed through the virtual surround sink
//!
//! Subcommands:
//! - `surroundd run` - Reconcile routing continuously (default)
//! - `surroundd list-sinks` / `list-apps` - Inspect the audio graph
//! - `surroundd enable <APP>` / `disable <APP>` - Edit the surround app list
//! - `surroundd reconcile` - Run a single pass and exit

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use surround_graph::{
    ChannelVolume, Collector, Executor, JsonFileSettings, Normalizer, Reconciler, SinkNames, SystemRunner,
};
use surroundconf::SurroundConfig;

mod commands;
mod daemon;
mod telemetry;

#[derive(Parser, Debug)]
#[command(name = "surroundd")]
#[command(about = "Keeps application audio routed through the virtual surround sink")]
#[command(version)]
struct Cli {
    /// Config file, replacing ./surround.toml
    #[arg(short, long, env = "SURROUND_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "info,surround_graph=debug"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile routing continuously until SIGINT/SIGTERM
    Run,

    /// List output sinks
    ListSinks {
        /// Print canonical records as JSON
        #[arg(long)]
        json: bool,
    },

    /// List running application streams
    ListApps {
        /// Print canonical records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the highest priority physical sink
    PrioritySink,

    /// Show the current default sink
    DefaultSink,

    /// Route an application through the surround sink
    Enable {
        /// Application name as shown by list-apps
        app: String,
    },

    /// Stop routing an application through the surround sink
    Disable {
        /// Application name as shown by list-apps
        app: String,
    },

    /// Make the surround sink the system default output, or stop doing so
    SurroundDefault {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Show preferences and what the next pass would do
    Status,

    /// Set per-channel volumes on the surround filter sink
    Mixer {
        /// Channel volumes, e.g. FL=100 FR=100 LFE=60
        #[arg(required = true)]
        volumes: Vec<ChannelVolume>,

        /// Profile name used in logs
        #[arg(long, default_value = "custom")]
        name: String,
    },

    /// Run a single reconciliation pass and exit
    Reconcile,

    /// Print the effective configuration
    Config,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let (config, sources) =
        SurroundConfig::load_with_sources_from(cli.config.as_deref()).context("Failed to load configuration")?;

    telemetry::init(cli.log_level.as_deref().unwrap_or(&config.infra.telemetry.log_level));
    for file in &sources.files {
        tracing::debug!("Loaded config: {}", file.display());
    }

    let reconciler = Arc::new(build_reconciler(&config));

    let code = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            daemon::run(reconciler, config.poll_interval()).await?;
            ExitCode::SUCCESS
        }
        Commands::ListSinks { json } => commands::list_sinks(&reconciler, json)?,
        Commands::ListApps { json } => commands::list_apps(&reconciler, json)?,
        Commands::PrioritySink => commands::priority_sink(&reconciler),
        Commands::DefaultSink => commands::default_sink(&reconciler),
        Commands::Enable { app } => commands::enable(&reconciler, &app)?,
        Commands::Disable { app } => commands::disable(&reconciler, &app)?,
        Commands::SurroundDefault { state } => commands::surround_default(&reconciler, state == Toggle::On)?,
        Commands::Status => commands::status(&reconciler),
        Commands::Mixer { volumes, name } => commands::mixer(&reconciler, &name, volumes),
        Commands::Reconcile => commands::reconcile(&reconciler),
        Commands::Config => commands::config(&config, &sources),
    };

    Ok(code)
}

fn build_reconciler(config: &SurroundConfig) -> Reconciler {
    let tools = &config.infra.tools;
    let routing = &config.routing;

    let runner = Arc::new(SystemRunner::new().with_runtime_dir(tools.runtime_dir.clone()));
    let settings = Arc::new(JsonFileSettings::open(&config.infra.paths.settings_file));
    tracing::debug!("Settings file: {}", settings.path().display());

    Reconciler::new(
        Collector::new(
            runner.clone(),
            tools.pactl.clone(),
            Normalizer::new(routing.ignored_binaries.iter().cloned()),
        ),
        Executor::new(runner, tools.pactl.clone(), tools.wpctl.clone()),
        settings,
        SinkNames::new(&routing.filter_sink, &routing.device_sink, &routing.fallback_sink),
    )
}
