//! The reconciliation pass and the background loop that repeats it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::executor::Executor;
use crate::mixer::MixerProfile;
use crate::policy::{plan, PolicyError, RoutingPlan, SinkNames, Skip};
use crate::settings::{self, RoutingSettings, SettingsError, SettingsStore};
use crate::sources::pactl::Collector;
use crate::types::{AudioSnapshot, RoutingAction};

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub applied: Vec<RoutingAction>,
    pub failed: Vec<RoutingAction>,
    pub skipped: Vec<Skip>,
    /// Set when the policy refused to plan; nothing was applied.
    pub aborted: Option<PolicyError>,
}

impl PassReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.failed.is_empty()
    }
}

pub struct Reconciler {
    collector: Collector,
    executor: Executor,
    settings: Arc<dyn SettingsStore>,
    names: SinkNames,
    pass_lock: Mutex<()>,
    wake: Arc<Notify>,
}

impl Reconciler {
    pub fn new(collector: Collector, executor: Executor, settings: Arc<dyn SettingsStore>, names: SinkNames) -> Self {
        Self {
            collector,
            executor,
            settings,
            names,
            pass_lock: Mutex::new(()),
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    pub fn names(&self) -> &SinkNames {
        &self.names
    }

    /// Current preferences, re-read from the backing store.
    pub fn routing_settings(&self) -> RoutingSettings {
        if let Err(e) = self.settings.reload() {
            warn!(error = %e, "settings unreadable; using defaults");
        }
        RoutingSettings::read(self.settings.as_ref())
    }

    /// Observe, plan, act. Blocks on the audio tools; only one pass runs at
    /// a time.
    pub fn reconcile_once(&self) -> PassReport {
        let _guard = self.pass_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let settings = self.routing_settings();
        let snapshot = self.collector.snapshot();
        debug!(
            sinks = snapshot.sinks.len(),
            streams = snapshot.streams.len(),
            default_sink = ?snapshot.default_sink,
            "audio state collected"
        );

        let plan = match plan(&snapshot, &settings, &self.names) {
            Ok(plan) => plan,
            Err(e) => {
                error!(error = %e, "routing pass aborted");
                return PassReport {
                    aborted: Some(e),
                    ..Default::default()
                };
            }
        };

        for skip in &plan.skipped {
            warn!("{}", skip);
        }

        let mut report = PassReport {
            skipped: plan.skipped,
            ..Default::default()
        };
        for action in plan.actions {
            info!("{}", action);
            if self.executor.apply(&action) {
                report.applied.push(action);
            } else {
                report.failed.push(action);
            }
        }

        if !report.is_noop() {
            info!(
                applied = report.applied.len(),
                failed = report.failed.len(),
                "routing pass complete"
            );
        }
        report
    }

    /// Plan against the live graph without applying anything.
    pub fn preview(&self) -> Result<(AudioSnapshot, RoutingPlan), PolicyError> {
        let settings = self.routing_settings();
        let snapshot = self.collector.snapshot();
        let plan = plan(&snapshot, &settings, &self.names)?;
        Ok((snapshot, plan))
    }

    /// Wake the background loop for an immediate pass. Coalesces: several
    /// requests before the loop wakes yield one pass.
    pub fn request_pass(&self) {
        self.wake.notify_one();
    }

    pub fn enable_app(&self, app: &str) -> Result<bool, SettingsError> {
        let changed = settings::enable_app(self.settings.as_ref(), app)?;
        if changed {
            info!(app, "surround enabled for app");
            self.request_pass();
        } else {
            info!(app, "app was already enabled");
        }
        Ok(changed)
    }

    pub fn disable_app(&self, app: &str) -> Result<bool, SettingsError> {
        let changed = settings::disable_app(self.settings.as_ref(), app)?;
        if changed {
            info!(app, "surround disabled for app");
            self.request_pass();
        } else {
            info!(app, "app was not enabled");
        }
        Ok(changed)
    }

    pub fn set_surround_default(&self, enabled: bool) -> Result<bool, SettingsError> {
        let changed = settings::set_surround_default(self.settings.as_ref(), enabled)?;
        info!(enabled, "surround sink as default");
        self.request_pass();
        Ok(changed)
    }

    /// Apply per-channel volumes to the surround filter sink.
    pub fn apply_mixer_profile(&self, profile: &MixerProfile) -> bool {
        let sinks = self.collector.list_sinks();
        let Some(filter) = sinks.iter().find(|s| s.name == self.names.filter) else {
            error!(sink = %self.names.filter, "surround filter sink not found; mixer profile not applied");
            return false;
        };
        let Some(index) = filter.index else {
            error!(sink = %self.names.filter, "surround filter sink has no index; mixer profile not applied");
            return false;
        };
        self.executor.set_channel_volumes(index, &filter.channel_map, profile)
    }
}

/// Running background loop.
pub struct ReconcileHandle {
    reconciler: Arc<Reconciler>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl ReconcileHandle {
    pub fn request_pass(&self) {
        self.reconciler.request_pass();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait for the loop to exit. A pass already in flight
    /// completes first.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "reconcile loop ended abnormally");
        }
    }
}

/// Run a pass now, then every `interval`, plus whenever a pass is requested,
/// until `cancel` fires.
pub fn spawn_reconcile_loop(
    reconciler: Arc<Reconciler>,
    interval: Duration,
    cancel: CancellationToken,
) -> ReconcileHandle {
    let task = {
        let reconciler = reconciler.clone();
        let cancel = cancel.clone();
        let wake = reconciler.wake.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            info!(interval_secs = interval.as_secs(), "reconcile loop started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("reconcile loop shutting down");
                        break;
                    }
                    _ = ticker.tick() => {}
                    _ = wake.notified() => {
                        debug!("out-of-band pass requested");
                        ticker.reset();
                    }
                }

                let pass = reconciler.clone();
                match tokio::task::spawn_blocking(move || pass.reconcile_once()).await {
                    Ok(report) => debug!(
                        applied = report.applied.len(),
                        aborted = report.aborted.is_some(),
                        "pass finished"
                    ),
                    Err(e) => error!(error = %e, "reconcile pass panicked; continuing"),
                }
            }
        })
    };

    ReconcileHandle {
        reconciler,
        cancel,
        task,
    }
}
