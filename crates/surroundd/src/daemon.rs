//! Long-running mode: reconcile on a timer until told to stop.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use surround_graph::{spawn_reconcile_loop, Reconciler};
use tokio_util::sync::CancellationToken;

pub async fn run(reconciler: Arc<Reconciler>, interval: Duration) -> Result<()> {
    let shutdown_token = CancellationToken::new();

    #[cfg(unix)]
    let (mut sigterm, mut sighup) = {
        use tokio::signal::unix::{signal, SignalKind};
        (
            signal(SignalKind::terminate()).context("Failed to set up SIGTERM handler")?,
            signal(SignalKind::hangup()).context("Failed to set up SIGHUP handler")?,
        )
    };

    tracing::info!(
        filter_sink = %reconciler.names().filter,
        device_sink = %reconciler.names().device,
        fallback_sink = %reconciler.names().fallback,
        "surround routing daemon starting"
    );
    let handle = spawn_reconcile_loop(reconciler, interval, shutdown_token.clone());

    loop {
        #[cfg(unix)]
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, shutting down...");
                break;
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down...");
                break;
            }
            _ = sighup.recv() => {
                tracing::info!("Received SIGHUP, running a pass now");
                handle.request_pass();
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
            tracing::info!("Received Ctrl+C, shutting down...");
            break;
        }
    }

    handle.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
