pub mod executor;
pub mod mixer;
pub mod normalize;
pub mod patterns;
pub mod policy;
pub mod priority;
pub mod reconcile;
pub mod settings;
pub mod sources;
pub mod types;

pub use executor::Executor;
pub use mixer::{ChannelVolume, MixerProfile};
pub use normalize::Normalizer;
pub use policy::{plan, DefaultCandidate, PolicyError, RoutingPlan, SinkNames, Skip};
pub use priority::highest_priority_sink;
pub use reconcile::{spawn_reconcile_loop, PassReport, ReconcileHandle, Reconciler};
pub use settings::{InMemorySettings, JsonFileSettings, RoutingSettings, SettingsError, SettingsStore};
pub use sources::*;
pub use types::*;
