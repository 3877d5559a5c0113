//! Log subscriber setup. Logs go to stderr so listings on stdout stay
//! pipeable.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `directives` is an `EnvFilter`
/// string such as `info` or `info,surround_graph=debug`.
pub fn init(directives: &str) {
    let env_filter = EnvFilter::try_new(directives).unwrap_or_else(|e| {
        eprintln!("invalid log filter {:?} ({}), falling back to info", directives, e);
        EnvFilter::new("info")
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
