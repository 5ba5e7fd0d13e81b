//! Binary entrypoint: loads configuration, wires the application, and runs
//! the worker loop and sweeper until asked to stop.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use clipforge::app;
use clipforge::guard::PathGuard;
use clipforge::worker;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let transport = match build_transport() {
        Ok(transport) => transport,
        Err(err) => {
            error!(%err, "failed to construct chat transport");
            std::process::exit(1);
        }
    };

    let ctx = match app::bootstrap(transport).await {
        Ok(ctx) => ctx,
        Err(err) => {
            error!(%err, "startup configuration error");
            std::process::exit(1);
        }
    };

    let guard = ctx.guard.clone();
    let worker_ctx = ctx.clone();

    let worker_handle = tokio::spawn(async move { worker::run(worker_ctx).await });
    let sweeper_handle = tokio::spawn(async move { PathGuard::run_sweeper(guard).await });

    info!("engine running, press Ctrl+C to stop");
    wait_for_shutdown().await;
    info!("shutdown signal received, stopping");

    worker_handle.abort();
    sweeper_handle.abort();
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}

/// The concrete chat transport is deliberately not part of this crate (see
/// `transport::ChatTransport`'s doc comment); a real deployment links a
/// platform-specific adapter crate here. Until one is wired in, refuse to
/// start rather than run with a transport that silently drops every message.
fn build_transport() -> anyhow::Result<Arc<dyn clipforge::transport::ChatTransport>> {
    anyhow::bail!(
        "no ChatTransport implementation linked; provide one via a platform adapter crate"
    )
}
